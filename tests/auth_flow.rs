use anonimka::tests::util::{init_test_db, test_app};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

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

#[tokio::test]
async fn login_code_roundtrip() {
    let db = init_test_db().await;
    let app = test_app(db.clone());

    let response = app
        .clone()
        .oneshot(post(
            "/api/auth/code/generate",
            json!({ "telegram_id": 42, "user_data": { "first_name": "Кот" } }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let code = body["code"].as_str().unwrap().to_string();
    assert_eq!(code.len(), 4);

    let response = app
        .clone()
        .oneshot(post("/api/auth/code/verify", json!({ "code": code })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["telegram_id"], json!(42));
    assert_eq!(body["user"]["first_name"], json!("Кот"));
    let token = body["user_token"].as_str().unwrap();
    assert_eq!(token.len(), 64);

    // the code is burned
    let response = app
        .clone()
        .oneshot(post("/api/auth/code/verify", json!({ "code": code })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // the user row was created with the derived token
    let user = db.user_by_token(token).await.unwrap().unwrap();
    assert_eq!(user.id, 42);
}

#[tokio::test]
async fn bad_code_is_rejected() {
    let db = init_test_db().await;
    let app = test_app(db);

    let response = app
        .oneshot(post("/api/auth/code/verify", json!({ "code": "000000" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], json!("BAD_CODE"));
}

#[tokio::test]
async fn web_session_push_then_poll_is_one_shot() {
    let db = init_test_db().await;
    let app = test_app(db);

    let response = app
        .clone()
        .oneshot(post(
            "/api/auth",
            json!({ "auth_token": "sess-1", "user": { "id": 7 } }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get("/api/auth?auth_token=sess-1"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["user"]["id"], json!(7));

    // consumed on first read
    let response = app
        .clone()
        .oneshot(get("/api/auth?auth_token=sess-1"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["pending"], json!(true));
}

#[tokio::test]
async fn tg_sessions_are_separate_from_web_sessions() {
    let db = init_test_db().await;
    let app = test_app(db);

    app.clone()
        .oneshot(post(
            "/api/telegram-auth",
            json!({ "auth_token": "sess-1", "user": { "id": 9 } }),
        ))
        .await
        .unwrap();

    // the web store does not see the Mini App session
    let response = app
        .clone()
        .oneshot(get("/api/auth?auth_token=sess-1"))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["pending"], json!(true));

    let response = app
        .clone()
        .oneshot(get("/api/telegram-auth?auth_token=sess-1"))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["user"]["id"], json!(9));
}

#[tokio::test]
async fn init_data_auth_requires_configured_bot() {
    let db = init_test_db().await;
    let app = test_app(db);

    let response = app
        .oneshot(post(
            "/api/auth/telegram-init",
            json!({ "init_data": "user=%7B%22id%22%3A1%7D&hash=00" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
