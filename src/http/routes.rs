//! Route handlers.
//!
//! Handlers run only after the whole pipeline accepted the request, so an
//! [`Identity`] is available on every path that is not excluded from
//! authentication.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{AccountId, AuthService, Identity, Role};
use crate::error::ApiError;
use crate::security::hpp::ensure_allowed_fields;

/// Fields a teacher record may carry on create.
pub const TEACHER_FIELDS: &[&str] = &["first_name", "last_name", "email", "class", "subject"];

const RESET_REQUESTED: &str =
    "if an account with that email exists, a password reset link has been sent";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/execs/login", post(login))
        .route("/execs/logout", post(logout))
        .route("/execs/me", get(me))
        .route("/execs/{id}/updatepassword", post(update_password))
        .route("/execs/forgotpassword", post(forgot_password))
        .route("/execs/resetpassword/reset", post(reset_password))
        .route("/teachers", post(create_teachers))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePasswordRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: String,
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = payload?;
    let outcome = state.auth.login(&body.username, &body.password).await?;

    Ok((
        [(header::SET_COOKIE, outcome.cookie)],
        Json(json!({ "status": "success", "token": outcome.token })),
    ))
}

async fn logout(State(state): State<AppState>, identity: Identity) -> impl IntoResponse {
    tracing::info!(account = identity.subject_id, "Logout");
    (
        [(header::SET_COOKIE, state.auth.logout())],
        Json(json!({ "status": "success", "message": "logged out successfully" })),
    )
}

async fn me(identity: Identity) -> Json<Identity> {
    Json(identity)
}

async fn update_password(
    State(state): State<AppState>,
    Path(account): Path<AccountId>,
    identity: Identity,
    payload: Result<Json<UpdatePasswordRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    if !identity.may_act_for(account) {
        return Err(ApiError::Forbidden(
            "you may only change your own password".into(),
        ));
    }

    let Json(body) = payload?;
    state
        .auth
        .update_password(account, &body.current_password, &body.new_password)
        .await?;

    Ok(Json(json!({ "status": "success", "message": "password updated successfully" })))
}

async fn forgot_password(
    State(state): State<AppState>,
    payload: Result<Json<ForgotPasswordRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = payload?;
    state.auth.forgot_password(&body.email).await?;
    Ok(Json(json!({ "status": "success", "message": RESET_REQUESTED })))
}

async fn reset_password(
    State(state): State<AppState>,
    payload: Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = payload?;
    state
        .auth
        .reset_password(&body.token, &body.new_password, &body.confirm_password)
        .await?;
    Ok(Json(json!({ "status": "success", "message": "password reset successfully" })))
}

/// Accepts one teacher object or an array of them. Persistence is outside
/// this service; the payload is validated and echoed back.
async fn create_teachers(
    identity: Identity,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    identity.require_role(&[Role::Admin, Role::Manager])?;
    let Json(value) = payload?;
    ensure_allowed_fields(&value, |field| TEACHER_FIELDS.contains(&field))?;

    let teachers = match value {
        Value::Array(items) if items.iter().all(Value::is_object) => items,
        object @ Value::Object(_) => vec![object],
        _ => {
            return Err(ApiError::Validation(
                "expected a teacher object or an array of teacher objects".into(),
            ))
        }
    };

    tracing::info!(account = identity.subject_id, count = teachers.len(), "Teachers accepted");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "status": "success", "count": teachers.len(), "data": teachers })),
    ))
}
