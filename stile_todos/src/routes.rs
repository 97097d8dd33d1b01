//! The route table and its handlers
//!
//! Everything under `/api/todos` sits behind the token layer, so a request
//! reaching a handler always carries verified claims. `/api/login` is
//! registered after the layer and stays open. Within a handler, path
//! parameters are declared before the guard so an unparseable id is
//! rejected after authentication but before any policy check.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use stile::{clock::System, Token, TokenIssuer};
use stile_axum::TokenAuthorizer;

use crate::{
    config::AuthConfig,
    credentials::CredentialStore,
    store::{NewTodo, Todo, TodoStore},
};

mod guards {
    stile_axum::grant_guards! {
        pub guard Admin = "can_delete";
        pub guard Viewer = "can_view";
        pub guard Authenticated = *;
    }
}

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    issuer: Arc<TokenIssuer>,
    credentials: Arc<CredentialStore>,
    todos: Arc<TodoStore>,
}

/// A login attempt
///
/// Field names are matched case-insensitively, so `userName`, `USERNAME`,
/// and `username` all carry the login name. Missing fields deserialize as
/// empty strings, which the credential store fails closed on, so a partial
/// body is a plain bad request rather than a serde error.
#[derive(Debug)]
struct LoginRequest {
    user_name: String,
    password: String,
}

impl<'de> Deserialize<'de> for LoginRequest {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LoginVisitor;

        impl<'de> serde::de::Visitor<'de> for LoginVisitor {
            type Value = LoginRequest;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("an object with userName and password fields")
            }

            fn visit_map<A: serde::de::MapAccess<'de>>(
                self,
                mut map: A,
            ) -> Result<Self::Value, A::Error> {
                let mut user_name = None;
                let mut password = None;
                while let Some(key) = map.next_key::<String>()? {
                    if key.eq_ignore_ascii_case("username") {
                        user_name = Some(map.next_value()?);
                    } else if key.eq_ignore_ascii_case("password") {
                        password = Some(map.next_value()?);
                    } else {
                        let _ = map.next_value::<serde::de::IgnoredAny>()?;
                    }
                }
                Ok(LoginRequest {
                    user_name: user_name.unwrap_or_default(),
                    password: password.unwrap_or_default(),
                })
            }
        }

        deserializer.deserialize_map(LoginVisitor)
    }
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    token: Token,
}

async fn login(State(state): State<AppState>, Json(login): Json<LoginRequest>) -> Response {
    if !state.credentials.is_valid(&login.user_name, &login.password) {
        tracing::debug!(username = %login.user_name, "login rejected");
        return StatusCode::BAD_REQUEST.into_response();
    }

    let grants = state.credentials.grants(&login.user_name);
    match state.issuer.issue(grants, &System) {
        Ok(token) => {
            tracing::debug!(username = %login.user_name, "login accepted");
            Json(LoginResponse { token }).into_response()
        }
        Err(err) => {
            tracing::error!(error = %err, "token issuance failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn list_todos(_: guards::Viewer, State(state): State<AppState>) -> Json<Vec<Todo>> {
    Json(state.todos.list())
}

async fn get_todo(
    Path(id): Path<u64>,
    _: guards::Viewer,
    State(state): State<AppState>,
) -> Response {
    match state.todos.find(id) {
        Some(todo) => Json(todo).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn create_todo(
    _: guards::Authenticated,
    State(state): State<AppState>,
    Json(new): Json<NewTodo>,
) -> Json<Todo> {
    Json(state.todos.add(new))
}

async fn delete_todo(
    Path(id): Path<u64>,
    _: guards::Admin,
    State(state): State<AppState>,
) -> StatusCode {
    if state.todos.remove(id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// Builds the service router
///
/// The login route is added after the token layer so it remains reachable
/// without credentials.
pub fn router(auth: &AuthConfig, credentials: CredentialStore, todos: TodoStore) -> Router {
    let authorizer = TokenAuthorizer::new().with_terse_error_handler();

    let state = AppState {
        issuer: Arc::new(auth.issuer()),
        credentials: Arc::new(credentials),
        todos: Arc::new(todos),
    };

    Router::new()
        .route("/api/todos", get(list_todos).post(create_todo))
        .route("/api/todos/:id", get(get_todo).delete(delete_todo))
        .layer(authorizer.token_layer(auth.verifier()))
        .route("/api/login", post(login))
        .with_state(state)
}
