use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use axum_extra::headers::{Authorization, HeaderMapExt};
use serde_json::{Value, json};
use std::sync::Arc;
use todo_server::auth::{AuthState, Credentials};
use todo_server::todo::TodoState;
use todo_server::web::create_router;
use tower::ServiceExt;

mod common;

const TEST_USER: &str = "admin";
const TEST_PASSWORD: &str = "hunter2";

async fn setup_app() -> anyhow::Result<Router> {
    // Allow multiple calls to init for tests.
    let _ = tracing_subscriber::fmt().try_init();
    let db = common::setup_db().await?;
    let credentials = Credentials::from_plaintext(TEST_USER, TEST_PASSWORD)?;
    let auth_state = Arc::new(AuthState::new(credentials));
    let todo_state = Arc::new(TodoState { db: Arc::new(db) });
    Ok(create_router(auth_state, todo_state))
}

/// Builds a request carrying valid Basic credentials.
fn authorized_request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    let mut request = match body {
        Some(json_body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json_body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    request
        .headers_mut()
        .typed_insert(Authorization::basic(TEST_USER, TEST_PASSWORD));
    request
}

async fn read_json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn rejects_requests_without_credentials() {
    let app = setup_app().await.expect("Failed to setup test app");

    for (method, uri) in [
        (Method::GET, "/"),
        (Method::GET, "/list"),
        (Method::POST, "/add"),
        (Method::POST, "/update/1"),
        (Method::DELETE, "/delete/1"),
    ] {
        let request = Request::builder()
            .method(method.clone())
            .uri(uri)
            .body(Body::empty())
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();

        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "{} {} should require credentials",
            method,
            uri
        );
        let challenge = response
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .expect("401 response should carry a Basic challenge");
        assert_eq!(challenge, "Basic realm=\"todo\"");
    }
}

#[tokio::test]
async fn rejects_requests_with_wrong_password() {
    let app = setup_app().await.expect("Failed to setup test app");

    let mut request = Request::builder()
        .method(Method::GET)
        .uri("/list")
        .body(Body::empty())
        .unwrap();
    request
        .headers_mut()
        .typed_insert(Authorization::basic(TEST_USER, "wrong"));

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn can_add_todo() {
    let app = setup_app().await.expect("Failed to setup test app");

    let request = authorized_request(
        Method::POST,
        "/add",
        Some(json!({"title": "Buy milk", "text": "2%"})),
    );
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(
        body,
        json!({"id": 1, "title": "Buy milk", "text": "2%", "is_complete": false})
    );
}

#[tokio::test]
async fn can_add_todo_with_missing_fields() {
    let app = setup_app().await.expect("Failed to setup test app");

    let request = authorized_request(Method::POST, "/add", Some(json!({})));
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(
        body,
        json!({"id": 1, "title": null, "text": null, "is_complete": false})
    );
}

#[tokio::test]
async fn can_list_todos() {
    let app = setup_app().await.expect("Failed to setup test app");

    let request = authorized_request(
        Method::POST,
        "/add",
        Some(json!({"title": "Buy milk", "text": "2%"})),
    );
    app.clone().oneshot(request).await.unwrap();

    let response = app
        .oneshot(authorized_request(Method::GET, "/list", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(
        body,
        json!([{"id": 1, "title": "Buy milk", "text": "2%", "is_complete": false}])
    );
}

#[tokio::test]
async fn can_update_todo_partially() {
    let app = setup_app().await.expect("Failed to setup test app");

    let request = authorized_request(
        Method::POST,
        "/add",
        Some(json!({"title": "Buy milk", "text": "2%"})),
    );
    app.clone().oneshot(request).await.unwrap();

    let response = app
        .clone()
        .oneshot(authorized_request(
            Method::POST,
            "/update/1",
            Some(json!({"is_complete": true})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(
        body,
        json!({"id": 1, "title": "Buy milk", "text": "2%", "is_complete": true})
    );

    // Falsy fields are ignored: is_complete stays true.
    let response = app
        .oneshot(authorized_request(
            Method::POST,
            "/update/1",
            Some(json!({"is_complete": false, "title": ""})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(
        body,
        json!({"id": 1, "title": "Buy milk", "text": "2%", "is_complete": true})
    );
}

#[tokio::test]
async fn update_unknown_todo_returns_not_found() {
    let app = setup_app().await.expect("Failed to setup test app");

    let response = app
        .oneshot(authorized_request(
            Method::POST,
            "/update/42",
            Some(json!({"title": "Ghost"})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = read_json_body(response).await;
    assert_eq!(body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn can_delete_todo() {
    let app = setup_app().await.expect("Failed to setup test app");

    let request = authorized_request(
        Method::POST,
        "/add",
        Some(json!({"title": "Buy milk", "text": "2%"})),
    );
    app.clone().oneshot(request).await.unwrap();

    let response = app
        .clone()
        .oneshot(authorized_request(Method::DELETE, "/delete/1", None))
        .await
        .unwrap();

    // The deleted record's data comes back in the response body.
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(
        body,
        json!({"id": 1, "title": "Buy milk", "text": "2%", "is_complete": false})
    );

    // And the record is gone from the list.
    let response = app
        .oneshot(authorized_request(Method::GET, "/list", None))
        .await
        .unwrap();
    let body = read_json_body(response).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn delete_unknown_todo_returns_not_found() {
    let app = setup_app().await.expect("Failed to setup test app");

    let response = app
        .oneshot(authorized_request(Method::DELETE, "/delete/42", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = read_json_body(response).await;
    assert_eq!(body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn can_render_todo_list_page() {
    let app = setup_app().await.expect("Failed to setup test app");

    let request = authorized_request(
        Method::POST,
        "/add",
        Some(json!({"title": "Buy milk", "text": "2%"})),
    );
    app.clone().oneshot(request).await.unwrap();

    let response = app
        .oneshot(authorized_request(Method::GET, "/", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get(header::CONTENT_TYPE).unwrap();
    assert!(
        content_type
            .to_str()
            .unwrap()
            .starts_with("text/html")
    );

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body_text = std::str::from_utf8(&body).unwrap();
    assert!(body_text.contains("Buy milk"));
    assert!(body_text.contains("2%"));
}

#[tokio::test]
async fn health_check_is_public() {
    let app = setup_app().await.expect("Failed to setup test app");

    let request = Request::builder()
        .method(Method::GET)
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = setup_app().await.expect("Failed to setup test app");

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api-docs/openapi.json")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert!(body["paths"].get("/add").is_some());
    assert!(body["paths"].get("/update/{id}").is_some());
}
