mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{Part, TestApp};

#[tokio::test]
async fn private_channels_are_hidden_from_outsiders() {
    let app = TestApp::new().await;
    let (_, alice) = app.user("alice").await;
    let (_, bob) = app.user("bob").await;

    let secret = app.channel(&alice, "secret", true).await;
    let general = app.channel(&alice, "general", false).await;
    app.message(&alice, secret, "hidden").await;

    let reply = app.get(&format!("/api/channels/{}", secret), &bob).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert_eq!(reply.detail(), "Not a member of this private channel");

    let reply = app.get(&format!("/api/messages/channel/{}", secret), &bob).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let reply = app.get(&format!("/api/channels/{}", general), &bob).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["name"], "general");

    let join = app.call(Method::POST, &format!("/api/channels/{}/join", secret), Some(&bob), None).await;
    assert_eq!(join.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn channel_names_are_unique_and_lookup_by_name_works() {
    let app = TestApp::new().await;
    let (_, alice) = app.user("alice").await;
    app.channel(&alice, "general", false).await;

    let dup = app.post("/api/channels", &alice, json!({"name": "general"})).await;
    assert_eq!(dup.status, StatusCode::CONFLICT);

    let by_name = app.get("/api/channels/general", &alice).await;
    assert_eq!(by_name.status, StatusCode::OK);
    assert_eq!(by_name.json()["members"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn join_then_post_then_leave() {
    let app = TestApp::new().await;
    let (_, alice) = app.user("alice").await;
    let (_, bob) = app.user("bob").await;
    let general = app.channel(&alice, "general", false).await;

    // outsiders may read a public channel but not post to it
    let channel = general.to_string();
    let reply = app
        .form(
            "/api/messages",
            &bob,
            &[Part::Text("channel_id", &channel), Part::Text("content", "hi")],
        )
        .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let join = app.call(Method::POST, &format!("/api/channels/{}/join", general), Some(&bob), None).await;
    assert_eq!(join.status, StatusCode::OK);
    let again = app.call(Method::POST, &format!("/api/channels/{}/join", general), Some(&bob), None).await;
    assert_eq!(again.status, StatusCode::CONFLICT);

    app.message(&bob, general, "hi").await;

    let leave = app.call(Method::POST, &format!("/api/channels/{}/leave", general), Some(&bob), None).await;
    assert_eq!(leave.status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn only_the_author_edits_or_deletes() {
    let app = TestApp::new().await;
    let (_, alice) = app.user("alice").await;
    let (_, bob) = app.user("bob").await;
    let general = app.channel(&alice, "general", false).await;
    app.call(Method::POST, &format!("/api/channels/{}/join", general), Some(&bob), None).await;
    let msg = app.message(&alice, general, "first draft").await;

    let uri = format!("/api/messages/{}", msg);
    let by_bob = app.call(Method::PUT, &uri, Some(&bob), Some(json!({"content": "hijack"}))).await;
    assert_eq!(by_bob.status, StatusCode::FORBIDDEN);

    let edited = app.call(Method::PUT, &uri, Some(&alice), Some(json!({"content": "final"}))).await;
    assert_eq!(edited.status, StatusCode::OK);
    assert_eq!(edited.json()["content"], "final");
    assert!(edited.json()["edited_at"].is_string());

    let del = app.call(Method::DELETE, &uri, Some(&bob), None).await;
    assert_eq!(del.status, StatusCode::FORBIDDEN);
    let del = app.call(Method::DELETE, &uri, Some(&alice), None).await;
    assert_eq!(del.status, StatusCode::NO_CONTENT);

    let gone = app.call(Method::DELETE, &uri, Some(&alice), None).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn empty_messages_are_rejected() {
    let app = TestApp::new().await;
    let (_, alice) = app.user("alice").await;
    let general = app.channel(&alice, "general", false).await;

    let channel = general.to_string();
    let reply = app
        .form(
            "/api/messages",
            &alice,
            &[Part::Text("channel_id", &channel), Part::Text("content", "   ")],
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn attachments_are_stored_and_downloadable() {
    let app = TestApp::new().await;
    let (_, alice) = app.user("alice").await;
    let general = app.channel(&alice, "general", false).await;

    let channel = general.to_string();
    let reply = app
        .form(
            "/api/messages",
            &alice,
            &[
                Part::Text("channel_id", &channel),
                Part::File {
                    name: "files",
                    filename: "notes.TXT",
                    content_type: "text/plain",
                    data: b"meeting at noon",
                },
            ],
        )
        .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    let attachment = &reply.json()["attachments"][0];
    assert_eq!(attachment["filename"], "notes.TXT");
    assert_eq!(attachment["file_type"], "document");
    assert_eq!(attachment["file_size"], 15);
    assert!(attachment["file_path"].as_str().unwrap().ends_with(".txt"));

    let id = attachment["id"].as_i64().unwrap();
    let download = app.get(&format!("/api/attachments/download/{}", id), &alice).await;
    assert_eq!(download.status, StatusCode::OK);
    assert_eq!(download.body, b"meeting at noon");
}

#[tokio::test]
async fn pinning_twice_conflicts() {
    let app = TestApp::new().await;
    let (_, alice) = app.user("alice").await;
    let general = app.channel(&alice, "general", false).await;
    let msg = app.message(&alice, general, "remember this").await;

    let uri = format!("/api/pins/channels/{}/messages/{}", general, msg);
    let first = app.call(Method::POST, &uri, Some(&alice), None).await;
    assert_eq!(first.status, StatusCode::CREATED);

    let second = app.call(Method::POST, &uri, Some(&alice), None).await;
    assert_eq!(second.status, StatusCode::CONFLICT);
    assert_eq!(second.detail(), "Message already pinned");

    let pins = app.get(&format!("/api/pins/channels/{}", general), &alice).await;
    assert_eq!(pins.json().as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn reactions_are_unique_per_user_and_emoji() {
    let app = TestApp::new().await;
    let (_, alice) = app.user("alice").await;
    let general = app.channel(&alice, "general", false).await;
    let msg = app.message(&alice, general, "ship it").await;

    let uri = format!("/api/messages/{}/reactions", msg);
    let first = app.post(&uri, &alice, json!({"emoji": "👍"})).await;
    assert_eq!(first.status, StatusCode::CREATED);
    let second = app.post(&uri, &alice, json!({"emoji": "👍"})).await;
    assert_eq!(second.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn invite_adds_member_and_notifies() {
    let app = TestApp::new().await;
    let (_, alice) = app.user("alice").await;
    let (bob_id, bob) = app.user("bob").await;
    let secret = app.channel(&alice, "secret", true).await;

    let reply = app
        .call(Method::POST, &format!("/api/channels/{}/invite/{}", secret, bob_id), Some(&alice), None)
        .await;
    assert_eq!(reply.status, StatusCode::OK);

    let readable = app.get(&format!("/api/messages/channel/{}", secret), &bob).await;
    assert_eq!(readable.status, StatusCode::OK);
    let system = &readable.json()[0];
    assert_eq!(system["is_system_message"], true);

    let unread = app.get("/api/notifications/unread-count", &bob).await;
    assert_eq!(unread.json()["unread_count"], 1);
}

#[tokio::test]
async fn mentions_notify_the_mentioned_user() {
    let app = TestApp::new().await;
    let (_, alice) = app.user("alice").await;
    let (bob_id, bob) = app.user("bob").await;
    let general = app.channel(&alice, "general", false).await;

    let channel = general.to_string();
    let html = format!(r#"<p>hey <span class="mention" data-user-id="{}">@bob</span></p>"#, bob_id);
    let reply = app
        .form(
            "/api/messages",
            &alice,
            &[
                Part::Text("channel_id", &channel),
                Part::Text("content", "hey @bob"),
                Part::Text("formatted_content", &html),
            ],
        )
        .await;
    assert_eq!(reply.status, StatusCode::CREATED);

    let notes = app.get("/api/notifications", &bob).await;
    let notes = notes.json();
    assert_eq!(notes.as_array().unwrap().len(), 1);
    assert_eq!(notes[0]["notification_type"], "mention");
}

#[tokio::test]
async fn only_the_creator_deletes_a_channel() {
    let app = TestApp::new().await;
    let (_, alice) = app.user("alice").await;
    let (_, bob) = app.user("bob").await;
    let general = app.channel(&alice, "general", false).await;
    app.call(Method::POST, &format!("/api/channels/{}/join", general), Some(&bob), None).await;

    let uri = format!("/api/channels/{}", general);
    let by_member = app.call(Method::DELETE, &uri, Some(&bob), None).await;
    assert_eq!(by_member.status, StatusCode::FORBIDDEN);

    let by_creator = app.call(Method::DELETE, &uri, Some(&alice), None).await;
    assert_eq!(by_creator.status, StatusCode::NO_CONTENT);
    assert_eq!(app.get(&uri, &alice).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invite_permissions_depend_on_visibility() {
    let app = TestApp::new().await;
    let (_, alice) = app.user("alice").await;
    let (bob_id, bob) = app.user("bob").await;
    let (carol_id, carol) = app.user("carol").await;
    let (dave_id, _) = app.user("dave").await;

    // private: members other than the creator may not invite
    let secret = app.channel(&alice, "secret", true).await;
    let invite = |channel: i64, user: i64| format!("/api/channels/{}/invite/{}", channel, user);
    let added = app.call(Method::POST, &invite(secret, bob_id), Some(&alice), None).await;
    assert_eq!(added.status, StatusCode::OK);
    let by_member = app.call(Method::POST, &invite(secret, carol_id), Some(&bob), None).await;
    assert_eq!(by_member.status, StatusCode::FORBIDDEN);

    // public: any member may invite, outsiders may not
    let general = app.channel(&alice, "general", false).await;
    let by_outsider = app.call(Method::POST, &invite(general, dave_id), Some(&carol), None).await;
    assert_eq!(by_outsider.status, StatusCode::FORBIDDEN);
    let added = app.call(Method::POST, &invite(general, carol_id), Some(&alice), None).await;
    assert_eq!(added.status, StatusCode::OK);
    let by_new_member = app.call(Method::POST, &invite(general, dave_id), Some(&carol), None).await;
    assert_eq!(by_new_member.status, StatusCode::OK);

    let again = app.call(Method::POST, &invite(general, dave_id), Some(&alice), None).await;
    assert_eq!(again.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn pin_requires_the_message_to_be_in_the_channel() {
    let app = TestApp::new().await;
    let (_, alice) = app.user("alice").await;
    let general = app.channel(&alice, "general", false).await;
    let random = app.channel(&alice, "random", false).await;
    let elsewhere = app.message(&alice, random, "wrong room").await;

    let uri = format!("/api/pins/channels/{}/messages/{}", general, elsewhere);
    let reply = app.call(Method::POST, &uri, Some(&alice), None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.detail(), "Message not found in this channel");
}
