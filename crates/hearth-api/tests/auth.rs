mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use serde_json::json;

use hearth_api::config::Config;

use common::{PASSWORD, TestApp};

#[tokio::test]
async fn protected_routes_require_a_cookie() {
    let app = TestApp::new().await;

    let reply = app.call(Method::GET, "/api/channels", None, None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.detail(), "Not authenticated");

    let reply = app.call(Method::GET, "/api/health", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["status"], "ok");
}

#[tokio::test]
async fn unknown_token_is_rejected() {
    let app = TestApp::new().await;
    let reply = app.get("/api/auth/me", "session_id=not-a-real-token").await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.detail(), "Invalid session");
}

#[tokio::test]
async fn signup_sets_session_and_me_works() {
    let app = TestApp::new().await;
    let reply = app.signup("alice").await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.json()["message"], "Signup successful");
    assert_eq!(reply.json()["user"]["status"], "online");

    let cookie = reply.session_cookie().unwrap();
    let set_cookie = reply.headers["set-cookie"].to_str().unwrap().to_ascii_lowercase();
    assert!(set_cookie.contains("httponly"));
    assert!(set_cookie.contains("samesite=lax"));

    let me = app.get("/api/auth/me", &cookie).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.json()["username"], "alice");
    assert!(me.json().get("password_hash").is_none());
}

#[tokio::test]
async fn duplicate_signup_conflicts() {
    let app = TestApp::new().await;
    app.user("alice").await;

    let reply = app.signup("alice").await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
    assert_eq!(reply.detail(), "Username already registered");

    let reply = app
        .call(
            Method::POST,
            "/api/auth/signup",
            None,
            Some(json!({"username": "alice2", "email": "alice@example.com", "password": PASSWORD})),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
    assert_eq!(reply.detail(), "Email already registered");
}

#[tokio::test]
async fn signup_validates_input() {
    let app = TestApp::new().await;
    let reply = app
        .call(
            Method::POST,
            "/api/auth/signup",
            None,
            Some(json!({"username": "bob", "email": "not-an-email", "password": PASSWORD})),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = app
        .call(
            Method::POST,
            "/api/auth/signup",
            None,
            Some(json!({"username": "bob", "email": "bob@example.com", "password": "short"})),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = app
        .call(Method::POST, "/api/auth/signup", None, Some(json!({"username": "bob"})))
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_logout_invalidates_token() {
    let app = TestApp::new().await;
    app.user("alice").await;

    let wrong = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"username": "alice", "password": "wrong-password"})),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.detail(), "Invalid username or password");

    let login = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"username": "alice", "password": PASSWORD})),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);
    let cookie = login.session_cookie().unwrap();
    assert_eq!(app.get("/api/auth/me", &cookie).await.status, StatusCode::OK);

    let out = app.call(Method::POST, "/api/auth/logout", Some(&cookie), None).await;
    assert_eq!(out.status, StatusCode::OK);
    assert_eq!(out.json()["message"], "Logout successful");

    let reused = app.get("/api/auth/me", &cookie).await;
    assert_eq!(reused.status, StatusCode::UNAUTHORIZED);

    let user = app.state.db.get_user_by_username("alice").unwrap().unwrap();
    assert_eq!(user.status, "offline");
}

#[tokio::test]
async fn logout_without_cookie_succeeds() {
    let app = TestApp::new().await;
    let reply = app.call(Method::POST, "/api/auth/logout", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
}

#[tokio::test]
async fn expired_session_is_deleted_on_use() {
    let app = TestApp::new().await;
    let (alice, _) = app.user("alice").await;

    let now = Utc::now();
    app.state
        .db
        .create_session("stale-token", alice, now - Duration::hours(48), now - Duration::hours(24))
        .unwrap();

    let first = app.get("/api/auth/me", "session_id=stale-token").await;
    assert_eq!(first.status, StatusCode::UNAUTHORIZED);
    assert_eq!(first.detail(), "Session expired");

    let second = app.get("/api/auth/me", "session_id=stale-token").await;
    assert_eq!(second.detail(), "Invalid session");
}

#[tokio::test]
async fn check_reports_without_failing() {
    let app = TestApp::new().await;
    let (alice, cookie) = app.user("alice").await;

    let anon = app.call(Method::GET, "/api/auth/check", None, None).await;
    assert_eq!(anon.status, StatusCode::OK);
    assert_eq!(anon.json()["authenticated"], false);

    let authed = app.get("/api/auth/check", &cookie).await;
    assert_eq!(authed.json()["authenticated"], true);
    assert_eq!(authed.json()["user_id"], alice);
}

#[tokio::test]
async fn session_cookie_attributes() {
    let app = TestApp::new().await;
    let reply = app.signup("alice").await;
    let set_cookie = reply.headers["set-cookie"].to_str().unwrap();

    let attrs: Vec<String> = set_cookie
        .split(';')
        .map(|a| a.trim().to_ascii_lowercase())
        .collect();
    assert!(attrs.contains(&"httponly".to_string()));
    assert!(attrs.contains(&"samesite=lax".to_string()));
    assert!(attrs.contains(&"path=/".to_string()));
    assert!(attrs.contains(&format!("max-age={}", 24 * 3600)));
}

#[tokio::test]
async fn orphaned_session_is_rejected() {
    let app = TestApp::new().await;
    let now = Utc::now();
    app.state
        .db
        .create_session("orphan-token", 9999, now, now + Duration::hours(1))
        .unwrap();

    let reply = app.get("/api/auth/me", "session_id=orphan-token").await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.detail(), "User not found");
}

#[tokio::test]
async fn options_requests_skip_the_gate() {
    let app = TestApp::new().await;
    let reply = app.call(Method::OPTIONS, "/api/channels", None, None).await;
    assert_ne!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn each_login_gets_its_own_session() {
    let app = TestApp::new().await;
    let (_, from_signup) = app.user("alice").await;

    let login = || {
        app.call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"username": "alice", "password": PASSWORD})),
        )
    };
    let laptop = login().await.session_cookie().unwrap();
    let phone = login().await.session_cookie().unwrap();
    assert_ne!(laptop, phone);

    for cookie in [&from_signup, &laptop, &phone] {
        assert_eq!(app.get("/api/auth/me", cookie).await.status, StatusCode::OK);
    }

    // logging out one device leaves the others alone
    app.call(Method::POST, "/api/auth/logout", Some(&laptop), None).await;
    assert_eq!(app.get("/api/auth/me", &laptop).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.get("/api/auth/me", &phone).await.status, StatusCode::OK);
}

#[tokio::test]
async fn out_of_range_ttl_fails_without_panicking() {
    let app = TestApp::with_config(Config {
        session_ttl_hours: i64::MAX / 1000,
        ..Config::default()
    })
    .await;

    let reply = app.signup("alice").await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.detail(), "Internal server error");
}
