#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use hearth_api::config::Config;
use hearth_api::storage::Storage;
use hearth_api::{AppState, AppStateInner};
use hearth_db::Database;

pub const PASSWORD: &str = "password123";
const BOUNDARY: &str = "hearth-test-boundary";

pub struct TestApp {
    pub state: AppState,
    _uploads: TempDir,
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }

    pub fn detail(&self) -> String {
        self.json()["detail"].as_str().unwrap_or_default().to_string()
    }

    /// `name=value` pair from the session Set-Cookie header.
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("session_id="))
            .and_then(|v| v.split(';').next())
            .map(str::to_string)
    }
}

pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        filename: &'a str,
        content_type: &'a str,
        data: &'a [u8],
    },
}

pub fn multipart(parts: &[Part<'_>]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n", name, value)
                        .as_bytes(),
                );
            }
            Part::File {
                name,
                filename,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        name, filename, content_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(Config::default()).await
    }

    pub async fn with_config(config: Config) -> Self {
        let uploads = tempfile::tempdir().unwrap();
        let storage = Storage::new(uploads.path().to_path_buf()).await.unwrap();
        let state = Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            config,
            storage,
        });
        Self {
            state,
            _uploads: uploads,
        }
    }

    fn router(&self) -> Router {
        hearth_api::router(self.state.clone())
    }

    pub async fn send(&self, req: Request<Body>) -> Reply {
        let resp = self.router().oneshot(req).await.unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.into_body().collect().await.unwrap().to_bytes().to_vec();
        Reply {
            status,
            headers,
            body,
        }
    }

    pub async fn call(&self, method: Method, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Reply {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(c) = cookie {
            req = req.header(header::COOKIE, c);
        }
        let req = match body {
            Some(v) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(v.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        self.send(req).await
    }

    pub async fn get(&self, uri: &str, cookie: &str) -> Reply {
        self.call(Method::GET, uri, Some(cookie), None).await
    }

    pub async fn post(&self, uri: &str, cookie: &str, body: Value) -> Reply {
        self.call(Method::POST, uri, Some(cookie), Some(body)).await
    }

    pub async fn form(&self, uri: &str, cookie: &str, parts: &[Part<'_>]) -> Reply {
        let (content_type, body) = multipart(parts);
        let req = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::COOKIE, cookie)
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap();
        self.send(req).await
    }

    pub async fn signup(&self, username: &str) -> Reply {
        self.call(
            Method::POST,
            "/api/auth/signup",
            None,
            Some(json!({
                "username": username,
                "email": format!("{}@example.com", username),
                "password": PASSWORD,
            })),
        )
        .await
    }

    /// Signs up `username` and returns (user id, cookie).
    pub async fn user(&self, username: &str) -> (i64, String) {
        let reply = self.signup(username).await;
        assert_eq!(reply.status, StatusCode::CREATED, "{:?}", reply.json());
        let id = reply.json()["user"]["id"].as_i64().unwrap();
        (id, reply.session_cookie().unwrap())
    }

    pub async fn channel(&self, cookie: &str, name: &str, is_private: bool) -> i64 {
        let reply = self
            .post("/api/channels", cookie, json!({"name": name, "is_private": is_private}))
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{:?}", reply.json());
        reply.json()["id"].as_i64().unwrap()
    }

    pub async fn message(&self, cookie: &str, channel_id: i64, content: &str) -> i64 {
        let channel = channel_id.to_string();
        let reply = self
            .form(
                "/api/messages",
                cookie,
                &[Part::Text("channel_id", &channel), Part::Text("content", content)],
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{:?}", reply.json());
        reply.json()["id"].as_i64().unwrap()
    }
}
