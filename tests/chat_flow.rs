use std::sync::Arc;

use anonimka::api::{build_router, AppState};
use anonimka::db::{AdId, ChatKey, Database, NewAd};
use anonimka::notify::Notifier;
use anonimka::store::{ActivityTracker, SessionStore};
use anonimka::tests::util::{init_test_db, test_app};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn seed_ad(db: &anonimka::db::Database, owner: &str) -> i64 {
    db.create_ad(
        &NewAd {
            user_token: owner,
            tg_id: None,
            gender: "Парень",
            target: "Девушку",
            goal: "Общение",
            age_from: None,
            age_to: None,
            my_age: Some(25),
            body_type: None,
            text: "Ищу собеседника",
            country: "Россия",
            region: "",
            city: "Москва",
        },
        100,
    )
    .await
    .unwrap()
    .id
}

#[tokio::test]
async fn request_accept_message_flow() {
    let db = init_test_db().await;
    let app = test_app(db.clone());
    let ad_id = seed_ad(&db, "owner").await;

    // initiator opens a request
    let response = app
        .clone()
        .oneshot(post(
            "/api/chats",
            json!({ "ad_id": ad_id, "user_token": "guest" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let chat_id = body["chat"]["id"].as_i64().unwrap();
    assert_eq!(body["created"], json!(true));

    // messages are rejected while pending
    let response = app
        .clone()
        .oneshot(post(
            &format!("/api/chats/{chat_id}/messages"),
            json!({ "user_token": "guest", "text": "привет" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], json!("NOT_ACCEPTED"));

    // a stranger cannot accept
    let response = app
        .clone()
        .oneshot(post(
            &format!("/api/chats/{chat_id}/accept"),
            json!({ "user_token": "guest" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // the owner accepts
    let response = app
        .clone()
        .oneshot(post(
            &format!("/api/chats/{chat_id}/accept"),
            json!({ "user_token": "owner" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // now messages flow both ways
    for (sender, text) in [("guest", "привет"), ("owner", "здравствуйте")] {
        let response = app
            .clone()
            .oneshot(post(
                &format!("/api/chats/{chat_id}/messages"),
                json!({ "user_token": sender, "text": text }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(get(&format!(
            "/api/chats/{chat_id}/messages?user_token=guest"
        )))
        .await
        .unwrap();
    let body = body_json(response).await;
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["message"], json!("привет"));

    // unread counter for the owner, then read receipt
    let response = app
        .clone()
        .oneshot(get("/api/messages/unread?user_token=owner"))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["total"], json!(1));

    let response = app
        .clone()
        .oneshot(post(
            &format!("/api/chats/{chat_id}/messages/read"),
            json!({ "user_token": "owner" }),
        ))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["updated"], json!(1));
}

#[tokio::test]
async fn duplicate_request_returns_existing_chat() {
    let db = init_test_db().await;
    let app = test_app(db.clone());
    let ad_id = seed_ad(&db, "owner").await;

    let first = body_json(
        app.clone()
            .oneshot(post(
                "/api/chats",
                json!({ "ad_id": ad_id, "user_token": "guest" }),
            ))
            .await
            .unwrap(),
    )
    .await;

    let again = body_json(
        app.clone()
            .oneshot(post(
                "/api/chats",
                json!({ "ad_id": ad_id, "user_token": "guest" }),
            ))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(again["created"], json!(false));
    assert_eq!(again["chat"]["id"], first["chat"]["id"]);
}

#[tokio::test]
async fn opening_message_rides_with_the_request() {
    let db = init_test_db().await;
    let app = test_app(db.clone());
    let ad_id = seed_ad(&db, "owner").await;

    let response = app
        .clone()
        .oneshot(post(
            "/api/chats",
            json!({ "ad_id": ad_id, "user_token": "guest", "message": " Привет! " }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let chat_id = body_json(response).await["chat"]["id"].as_i64().unwrap();

    // the message landed even though the chat is still pending
    let response = app
        .clone()
        .oneshot(get(&format!(
            "/api/chats/{chat_id}/messages?user_token=owner"
        )))
        .await
        .unwrap();
    let body = body_json(response).await;
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["message"], json!("Привет!"));
}

#[tokio::test]
async fn own_ad_and_unknown_ad_are_rejected() {
    let db = init_test_db().await;
    let app = test_app(db.clone());
    let ad_id = seed_ad(&db, "owner").await;

    let response = app
        .clone()
        .oneshot(post(
            "/api/chats",
            json!({ "ad_id": ad_id, "user_token": "owner" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(post(
            "/api/chats",
            json!({ "ad_id": 9999, "user_token": "guest" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn chat_block_gates_messages() {
    let db = init_test_db().await;
    let app = test_app(db.clone());
    let ad_id = seed_ad(&db, "owner").await;
    let chat = db.create_chat(AdId(ad_id), "guest", "owner", 100).await.unwrap();
    db.accept_chat(ChatKey(chat.id), "owner").await.unwrap();

    let response = app
        .clone()
        .oneshot(post(
            &format!("/api/chats/{}/block", chat.id),
            json!({ "user_token": "owner" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(post(
            &format!("/api/chats/{}/messages", chat.id),
            json!({ "user_token": "guest", "text": "ау" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], json!("CHAT_BLOCKED"));

    // only the blocker can unblock
    let response = app
        .clone()
        .oneshot(post(
            &format!("/api/chats/{}/unblock", chat.id),
            json!({ "user_token": "guest" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(post(
            &format!("/api/chats/{}/unblock", chat.id),
            json!({ "user_token": "owner" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(post(
            &format!("/api/chats/{}/messages", chat.id),
            json!({ "user_token": "guest", "text": "ау" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn user_level_block_prevents_new_requests() {
    let db = init_test_db().await;
    let app = test_app(db.clone());
    let ad_id = seed_ad(&db, "owner").await;
    db.block_user("owner", "guest", "Гость", 100).await.unwrap();

    let response = app
        .clone()
        .oneshot(post(
            "/api/chats",
            json!({ "ad_id": ad_id, "user_token": "guest" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], json!("BLOCKED"));
}

fn app_with_bot(db: Database, server: &MockServer) -> axum::Router {
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let bot = teloxide::Bot::with_client("TEST", client)
        .set_api_url(reqwest::Url::parse(&server.uri()).unwrap());
    build_router(Arc::new(AppState {
        db,
        web_sessions: SessionStore::new(),
        tg_sessions: SessionStore::new(),
        activity: ActivityTracker::new(),
        notifier: Notifier::new(Some(bot), "https://example.org/webapp"),
        token_secret: "test-secret".to_string(),
        bot_token: Some("TEST".to_string()),
    }))
}

#[tokio::test]
async fn message_notification_falls_back_to_ad_tg_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/botTEST/SendMessage"))
        .and(body_partial_json(json!({ "chat_id": 777 })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"ok":true,"result":{"message_id":1,"date":0,"chat":{"id":777,"type":"private"}}}"#,
            "application/json",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let db = init_test_db().await;
    // the owner attached a tg_id to the ad but never ran an auth flow
    let ad = db
        .create_ad(
            &NewAd {
                user_token: "owner",
                tg_id: Some(777),
                gender: "Парень",
                target: "Девушку",
                goal: "Общение",
                age_from: None,
                age_to: None,
                my_age: None,
                body_type: None,
                text: "Ищу собеседника",
                country: "Россия",
                region: "",
                city: "Москва",
            },
            100,
        )
        .await
        .unwrap();
    let chat = db.create_chat(AdId(ad.id), "guest", "owner", 100).await.unwrap();
    db.accept_chat(ChatKey(chat.id), "owner").await.unwrap();

    let app = app_with_bot(db, &server);
    let response = app
        .oneshot(post(
            &format!("/api/chats/{}/messages", chat.id),
            json!({ "user_token": "guest", "text": "привет" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    server.verify().await;
}

#[tokio::test]
async fn reject_clears_pending_request() {
    let db = init_test_db().await;
    let app = test_app(db.clone());
    let ad_id = seed_ad(&db, "owner").await;
    let chat = db.create_chat(AdId(ad_id), "guest", "owner", 100).await.unwrap();

    let response = app
        .clone()
        .oneshot(get("/api/chats/pending?user_token=owner"))
        .await
        .unwrap();
    assert_eq!(
        body_json(response).await["chats"].as_array().unwrap().len(),
        1
    );

    let response = app
        .clone()
        .oneshot(post(
            &format!("/api/chats/{}/reject", chat.id),
            json!({ "user_token": "owner" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get("/api/chats/count?user_token=owner"))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["count"], json!(0));
}
