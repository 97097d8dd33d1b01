//! End-to-end tests driving the router without a listening socket

use axum::{
    body::{Body, Bytes},
    http::{header, Request, StatusCode},
    Router,
};
use color_eyre::Result;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use stile::{
    clock::{TestClock, UnixTime},
    privileges, Audience, Issuer, SigningKey, TokenIssuer,
};
use stile_todos::{
    config::AuthConfig,
    credentials::{CredentialStore, Identity},
    routes,
    store::{NewTodo, TodoStore},
};
use tower::ServiceExt;

const KEY: &[u8; 32] = b"integration test signing key 32B";
const ISSUER: &str = "stile-todos";
const AUDIENCE: &str = "stile-todos-api";

fn auth_config() -> Result<AuthConfig> {
    Ok(AuthConfig::new(
        SigningKey::new(*KEY)?,
        Issuer::from_static(ISSUER),
        Audience::from_static(AUDIENCE),
    ))
}

/// An app seeded with one todo and three identities of differing privilege
fn app() -> Result<Router> {
    let mut credentials = CredentialStore::new();
    credentials.register(Identity::new(
        "admin",
        "SecurePassword123",
        privileges![CanView, CanDelete],
    ));
    credentials.register(Identity::new("reader", "ReadOnly456", privileges![CanView]));
    credentials.register(Identity::new("intern", "Temp789", privileges![]));

    let todos = TodoStore::new();
    todos.add(NewTodo {
        title: "wash dishes".to_owned(),
        completed: false,
    });

    Ok(routes::router(&auth_config()?, credentials, todos))
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Bytes) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

async fn try_login(app: &Router, username: &str, password: &str) -> (StatusCode, Bytes) {
    let req = Request::builder()
        .method("POST")
        .uri("/api/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"userName": username, "password": password}).to_string(),
        ))
        .unwrap();
    send(app, req).await
}

async fn login(app: &Router, username: &str, password: &str) -> String {
    let (status, body) = try_login(app, username, password).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    body["token"].as_str().unwrap().to_owned()
}

fn authed(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn login_with_bad_credentials_is_a_bad_request() -> Result<()> {
    let app = app()?;

    for (user, pass) in [
        ("admin", "WrongPassword"),
        ("nobody", "SecurePassword123"),
        ("", "SecurePassword123"),
        ("admin", ""),
    ] {
        let (status, body) = try_login(&app, user, pass).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{user:?}/{pass:?}");
        assert!(body.is_empty());
    }
    Ok(())
}

#[tokio::test]
async fn login_with_a_partial_body_fails_closed() -> Result<()> {
    let app = app()?;

    let req = Request::builder()
        .method("POST")
        .uri("/api/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"userName": "admin"}).to_string()))
        .unwrap();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn login_accepts_any_field_name_casing() -> Result<()> {
    let app = app()?;

    let req = Request::builder()
        .method("POST")
        .uri("/api/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"USERNAME": "reader", "PASSWORD": "ReadOnly456"}).to_string(),
        ))
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body)?;
    assert!(body["token"].is_string());
    Ok(())
}

#[tokio::test]
async fn login_yields_a_compact_token() -> Result<()> {
    let app = app()?;
    let token = login(&app, "reader", "ReadOnly456").await;
    assert_eq!(token.split('.').count(), 3);
    Ok(())
}

#[tokio::test]
async fn todos_require_a_token() -> Result<()> {
    let app = app()?;

    let req = Request::builder()
        .uri("/api/todos")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));

    let (status, _) = send(&app, authed("GET", "/api/todos", "not.a.token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn viewer_can_list_and_fetch() -> Result<()> {
    let app = app()?;
    let token = login(&app, "reader", "ReadOnly456").await;

    let (status, body) = send(&app, authed("GET", "/api/todos", &token)).await;
    assert_eq!(status, StatusCode::OK);
    let todos: Value = serde_json::from_slice(&body)?;
    assert_eq!(todos.as_array().map(Vec::len), Some(1));

    let (status, body) = send(&app, authed("GET", "/api/todos/1", &token)).await;
    assert_eq!(status, StatusCode::OK);
    let todo: Value = serde_json::from_slice(&body)?;
    assert_eq!(todo["title"], "wash dishes");

    let (status, _) = send(&app, authed("GET", "/api/todos/99", &token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn grantless_token_cannot_view() -> Result<()> {
    let app = app()?;
    let token = login(&app, "intern", "Temp789").await;

    let (status, _) = send(&app, authed("GET", "/api/todos", &token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn any_authenticated_identity_can_create() -> Result<()> {
    let app = app()?;
    let token = login(&app, "intern", "Temp789").await;

    let req = Request::builder()
        .method("POST")
        .uri("/api/todos")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"title": "walk dog"}).to_string()))
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    let todo: Value = serde_json::from_slice(&body)?;
    assert_eq!(todo["id"], 2);
    assert_eq!(todo["completed"], false);

    let req = Request::builder()
        .method("POST")
        .uri("/api/todos")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"title": "walk dog"}).to_string()))
        .unwrap();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn deleting_needs_the_delete_privilege() -> Result<()> {
    let app = app()?;

    let reader = login(&app, "reader", "ReadOnly456").await;
    let (status, _) = send(&app, authed("DELETE", "/api/todos/1", &reader)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // still there
    let (status, _) = send(&app, authed("GET", "/api/todos/1", &reader)).await;
    assert_eq!(status, StatusCode::OK);

    let admin = login(&app, "admin", "SecurePassword123").await;
    let (status, _) = send(&app, authed("DELETE", "/api/todos/1", &admin)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, authed("DELETE", "/api/todos/1", &admin)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn non_numeric_id_is_rejected_after_authentication() -> Result<()> {
    let app = app()?;

    // without a token, authentication wins
    let req = Request::builder()
        .uri("/api/todos/not-a-number")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // with one, the path is parsed and rejected before any policy check
    let token = login(&app, "reader", "ReadOnly456").await;
    let (status, _) = send(&app, authed("GET", "/api/todos/not-a-number", &token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn expired_token_is_unauthorized() -> Result<()> {
    let app = app()?;

    let issuer = TokenIssuer::new(
        SigningKey::new(*KEY)?,
        Issuer::from_static(ISSUER),
        Audience::from_static(AUDIENCE),
    );
    let stale = issuer.issue(privileges![CanView], &TestClock::new(UnixTime(1_000)))?;

    let (status, _) = send(&app, authed("GET", "/api/todos", stale.as_str())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn token_signed_with_a_foreign_key_is_unauthorized() -> Result<()> {
    let app = app()?;

    let issuer = TokenIssuer::new(
        SigningKey::new(*b"a different shared secret 32Byte")?,
        Issuer::from_static(ISSUER),
        Audience::from_static(AUDIENCE),
    );
    let now = TestClock::new(UnixTime::from(std::time::SystemTime::now()));
    let forged = issuer.issue(privileges![CanView, CanDelete], &now)?;

    let (status, _) = send(&app, authed("GET", "/api/todos", forged.as_str())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn token_from_a_foreign_issuer_is_unauthorized() -> Result<()> {
    let app = app()?;

    let issuer = TokenIssuer::new(
        SigningKey::new(*KEY)?,
        Issuer::from_static("somebody-else"),
        Audience::from_static(AUDIENCE),
    );
    let now = TestClock::new(UnixTime::from(std::time::SystemTime::now()));
    let token = issuer.issue(privileges![CanView], &now)?;

    let (status, _) = send(&app, authed("GET", "/api/todos", token.as_str())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}
