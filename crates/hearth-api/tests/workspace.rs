mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use serde_json::json;

use common::{Part, TestApp};

#[tokio::test]
async fn direct_messages_between_two_users() {
    let app = TestApp::new().await;
    let (alice_id, alice) = app.user("alice").await;
    let (bob_id, bob) = app.user("bob").await;

    let receiver = bob_id.to_string();
    let sent = app
        .form(
            "/api/direct-messages",
            &alice,
            &[Part::Text("receiver_id", &receiver), Part::Text("content", "hi bob")],
        )
        .await;
    assert_eq!(sent.status, StatusCode::CREATED);
    assert_eq!(sent.json()["sender_id"], alice_id);
    assert_eq!(sent.json()["is_read"], false);
    let dm_id = sent.json()["id"].as_i64().unwrap();

    let own = alice_id.to_string();
    let to_self = app
        .form(
            "/api/direct-messages",
            &alice,
            &[Part::Text("receiver_id", &own), Part::Text("content", "note to self")],
        )
        .await;
    assert_eq!(to_self.status, StatusCode::BAD_REQUEST);

    let nobody = app
        .form(
            "/api/direct-messages",
            &alice,
            &[Part::Text("receiver_id", "9999"), Part::Text("content", "hello?")],
        )
        .await;
    assert_eq!(nobody.status, StatusCode::NOT_FOUND);

    let convs = app.get("/api/direct-messages/conversations", &bob).await;
    assert_eq!(convs.json()[0]["user_id"], alice_id);

    let uri = format!("/api/direct-messages/{}/read", dm_id);
    let by_sender = app.call(Method::PATCH, &uri, Some(&alice), None).await;
    assert_eq!(by_sender.status, StatusCode::FORBIDDEN);
    let by_receiver = app.call(Method::PATCH, &uri, Some(&bob), None).await;
    assert_eq!(by_receiver.status, StatusCode::OK);
    assert_eq!(by_receiver.json()["is_read"], true);

    let thread = app.get(&format!("/api/direct-messages/conversation/{}", alice_id), &bob).await;
    assert_eq!(thread.json().as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn search_respects_private_channels() {
    let app = TestApp::new().await;
    let (_, alice) = app.user("alice").await;
    let (_, bob) = app.user("bob").await;
    let general = app.channel(&alice, "general", false).await;
    let secret = app.channel(&alice, "secret", true).await;
    app.message(&alice, general, "launch plan ready").await;
    app.message(&alice, secret, "launch plan secret").await;
    app.call(Method::POST, &format!("/api/channels/{}/join", general), Some(&bob), None)
        .await;

    let mine = app.get("/api/search?q=launch&search_type=messages", &alice).await;
    assert_eq!(mine.status, StatusCode::OK);
    assert_eq!(mine.json()["total_count"], 2);

    let theirs = app.get("/api/search?q=launch&search_type=messages", &bob).await;
    assert_eq!(theirs.json()["total_count"], 1);
    assert_eq!(theirs.json()["results"][0]["result_type"], "message");

    let missing = app.get("/api/search", &bob).await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);

    let too_many = app.get("/api/search?q=launch&limit=500", &bob).await;
    assert_eq!(too_many.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bookmarks_need_exactly_one_target() {
    let app = TestApp::new().await;
    let (_, alice) = app.user("alice").await;
    let general = app.channel(&alice, "general", false).await;
    let msg = app.message(&alice, general, "save me").await;

    let none = app.post("/api/bookmarks", &alice, json!({})).await;
    assert_eq!(none.status, StatusCode::BAD_REQUEST);

    let both = app
        .post("/api/bookmarks", &alice, json!({"message_id": msg, "direct_message_id": 1}))
        .await;
    assert_eq!(both.status, StatusCode::BAD_REQUEST);

    let ok = app.post("/api/bookmarks", &alice, json!({"message_id": msg})).await;
    assert_eq!(ok.status, StatusCode::CREATED);
    let dup = app.post("/api/bookmarks", &alice, json!({"message_id": msg})).await;
    assert_eq!(dup.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn drafts_upsert_per_target() {
    let app = TestApp::new().await;
    let (_, alice) = app.user("alice").await;
    let general = app.channel(&alice, "general", false).await;

    let first = app
        .post("/api/drafts", &alice, json!({"channel_id": general, "content": "half a thought"}))
        .await;
    assert_eq!(first.status, StatusCode::OK);
    let second = app
        .post("/api/drafts", &alice, json!({"channel_id": general, "content": "a whole thought"}))
        .await;
    assert_eq!(second.json()["id"], first.json()["id"]);

    let fetched = app.get(&format!("/api/drafts/channel/{}", general), &alice).await;
    assert_eq!(fetched.json()["content"], "a whole thought");
}

#[tokio::test]
async fn scheduled_messages_must_be_in_the_future() {
    let app = TestApp::new().await;
    let (_, alice) = app.user("alice").await;
    let general = app.channel(&alice, "general", false).await;

    let past = app
        .post(
            "/api/scheduled",
            &alice,
            json!({
                "channel_id": general,
                "content": "too late",
                "scheduled_for": Utc::now() - Duration::hours(1),
            }),
        )
        .await;
    assert_eq!(past.status, StatusCode::BAD_REQUEST);

    let future = app
        .post(
            "/api/scheduled",
            &alice,
            json!({
                "channel_id": general,
                "content": "standup",
                "scheduled_for": Utc::now() + Duration::hours(1),
            }),
        )
        .await;
    assert_eq!(future.status, StatusCode::CREATED);
    let id = future.json()["id"].as_i64().unwrap();

    let cancelled = app
        .call(Method::DELETE, &format!("/api/scheduled/{}", id), Some(&alice), None)
        .await;
    assert_eq!(cancelled.status, StatusCode::OK);
    assert_eq!(cancelled.json()["status"], "cancelled");

    let pending = app.get("/api/scheduled", &alice).await;
    assert!(pending.json().as_array().unwrap().is_empty());
}

#[tokio::test]
async fn scheduled_time_without_offset_is_utc() {
    let app = TestApp::new().await;
    let (_, alice) = app.user("alice").await;
    let general = app.channel(&alice, "general", false).await;

    let at = (Utc::now() + Duration::hours(2)).naive_utc();
    let naive = at.format("%Y-%m-%dT%H:%M:%S").to_string();
    let created = app
        .post(
            "/api/scheduled",
            &alice,
            json!({"channel_id": general, "content": "standup", "scheduled_for": naive}),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);

    let stored: chrono::DateTime<Utc> =
        created.json()["scheduled_for"].as_str().unwrap().parse().unwrap();
    assert_eq!(stored.naive_utc().format("%Y-%m-%dT%H:%M:%S").to_string(), naive);

    let garbage = app
        .post(
            "/api/scheduled",
            &alice,
            json!({"channel_id": general, "content": "standup", "scheduled_for": "soon"}),
        )
        .await;
    assert!(garbage.status.is_client_error());
}

#[tokio::test]
async fn contacts_reject_self_and_duplicates() {
    let app = TestApp::new().await;
    let (alice_id, alice) = app.user("alice").await;
    let (bob_id, _) = app.user("bob").await;

    let own = app.post("/api/users/contacts", &alice, json!({"contact_id": alice_id})).await;
    assert_eq!(own.status, StatusCode::BAD_REQUEST);

    let added = app.post("/api/users/contacts", &alice, json!({"contact_id": bob_id})).await;
    assert_eq!(added.status, StatusCode::CREATED);
    let again = app.post("/api/users/contacts", &alice, json!({"contact_id": bob_id})).await;
    assert_eq!(again.status, StatusCode::CONFLICT);

    let removed = app
        .call(Method::DELETE, &format!("/api/users/contacts/{}", bob_id), Some(&alice), None)
        .await;
    assert_eq!(removed.status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn permalinks_resolve_for_readers_only() {
    let app = TestApp::new().await;
    let (_, alice) = app.user("alice").await;
    let (_, bob) = app.user("bob").await;
    let secret = app.channel(&alice, "secret", true).await;
    let msg = app.message(&alice, secret, "classified").await;

    let created = app.post("/api/permalinks", &alice, json!({"message_id": msg})).await;
    assert_eq!(created.status, StatusCode::CREATED);
    let slug = created.json()["permalink"].as_str().unwrap().to_string();

    let again = app.post("/api/permalinks", &alice, json!({"message_id": msg})).await;
    assert_eq!(again.status, StatusCode::OK);
    assert_eq!(again.json()["permalink"], slug.as_str());

    let resolved = app.get(&format!("/api/permalinks/{}", slug), &alice).await;
    assert_eq!(resolved.json()["message"]["content"], "classified");

    let outsider = app.get(&format!("/api/permalinks/{}", slug), &bob).await;
    assert_eq!(outsider.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn calls_end_once() {
    let app = TestApp::new().await;
    let (_, alice) = app.user("alice").await;
    let (bob_id, bob) = app.user("bob").await;

    let bad = app
        .post("/api/calls/start", &alice, json!({"dm_user_id": bob_id, "call_type": "hologram"}))
        .await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);

    let started = app
        .post("/api/calls/start", &alice, json!({"dm_user_id": bob_id, "call_type": "video"}))
        .await;
    assert_eq!(started.status, StatusCode::CREATED);
    assert!(started.json()["call_url"].as_str().unwrap().starts_with("/calls/join/"));
    let id = started.json()["id"].as_i64().unwrap();

    let active = app.get("/api/calls/active", &bob).await;
    assert_eq!(active.json()["active_calls"].as_array().unwrap().len(), 1);

    let uri = format!("/api/calls/{}/end", id);
    let ended = app.call(Method::POST, &uri, Some(&bob), None).await;
    assert_eq!(ended.status, StatusCode::OK);
    let again = app.call(Method::POST, &uri, Some(&alice), None).await;
    assert_eq!(again.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn custom_emoji_requires_an_image() {
    let app = TestApp::new().await;
    let (_, alice) = app.user("alice").await;

    let not_image = app
        .form(
            "/api/emojis",
            &alice,
            &[
                Part::Text("name", ":party:"),
                Part::File {
                    name: "image",
                    filename: "party.txt",
                    content_type: "text/plain",
                    data: b"nope",
                },
            ],
        )
        .await;
    assert_eq!(not_image.status, StatusCode::BAD_REQUEST);

    let created = app
        .form(
            "/api/emojis",
            &alice,
            &[
                Part::Text("name", ":party:"),
                Part::File {
                    name: "image",
                    filename: "party.png",
                    content_type: "image/png",
                    data: b"\x89PNG fake",
                },
            ],
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.json()["name"], "party");
    let id = created.json()["id"].as_i64().unwrap();

    let image = app.get(&format!("/api/emojis/{}/image", id), &alice).await;
    assert_eq!(image.status, StatusCode::OK);
    assert_eq!(image.headers["content-type"], "image/png");
}

#[tokio::test]
async fn duplicate_emoji_name_conflicts_and_keeps_one_file() {
    let app = TestApp::new().await;
    let (_, alice) = app.user("alice").await;
    let (_, bob) = app.user("bob").await;

    let parts = [
        Part::Text("name", "shipit"),
        Part::File {
            name: "image",
            filename: "shipit.gif",
            content_type: "image/gif",
            data: b"GIF89a",
        },
    ];
    let first = app.form("/api/emojis", &alice, &parts).await;
    assert_eq!(first.status, StatusCode::CREATED);

    let dup = app.form("/api/emojis", &bob, &parts).await;
    assert_eq!(dup.status, StatusCode::CONFLICT);
    assert_eq!(dup.detail(), "Emoji name already exists");

    let stored = std::fs::read_dir(app.state.storage.resolve("emojis")).unwrap().count();
    assert_eq!(stored, 1);
}
