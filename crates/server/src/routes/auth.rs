use axum::{
    Extension, Json, Router,
    extract::State,
    http::header,
    response::{IntoResponse, Json as ResponseJson},
    routing::{get, post},
};
use db::models::worker::{CreateWorker, Worker};
use deployment::Deployment;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    DeploymentImpl,
    error::ApiError,
    http::auth::{CurrentWorker, SESSION_COOKIE, SessionToken},
};

#[derive(Debug, Deserialize, TS)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, TS)]
pub struct LoginResponse {
    pub token: String,
    pub worker: Worker,
}

pub async fn register(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateWorker>,
) -> Result<ResponseJson<ApiResponse<Worker>>, ApiError> {
    payload.validate().map_err(ApiError::BadRequest)?;

    let password_hash = deployment.auth().hash_password(&payload.password)?;
    let worker = Worker::create(
        &deployment.db().pool,
        &payload,
        password_hash,
        Uuid::new_v4(),
    )
    .await?;

    tracing::info!(worker_id = %worker.id, username = %worker.username, "Registered worker");
    Ok(ResponseJson(ApiResponse::success(worker)))
}

pub async fn login(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session_ttl_hours = { deployment.config().read().await.session_ttl_hours };

    let (worker, session) = deployment
        .auth()
        .login(
            &deployment.db().pool,
            &payload.username,
            &payload.password,
            session_ttl_hours,
        )
        .await?;

    let cookie = format!(
        "{SESSION_COOKIE}={}; HttpOnly; Path=/; Max-Age={}; SameSite=Lax",
        session.token,
        session_ttl_hours.max(1) * 3600
    );
    let body = ApiResponse::success(LoginResponse {
        token: session.token.clone(),
        worker,
    });
    Ok(([(header::SET_COOKIE, cookie)], ResponseJson(body)))
}

pub async fn logout(
    State(deployment): State<DeploymentImpl>,
    Extension(SessionToken(token)): Extension<SessionToken>,
) -> Result<impl IntoResponse, ApiError> {
    deployment
        .auth()
        .logout(&deployment.db().pool, &token)
        .await?;

    let cookie = format!("{SESSION_COOKIE}=; HttpOnly; Path=/; Max-Age=0; SameSite=Lax");
    Ok((
        [(header::SET_COOKIE, cookie)],
        ResponseJson(ApiResponse::success(())),
    ))
}

pub async fn me(
    Extension(CurrentWorker(worker)): Extension<CurrentWorker>,
) -> ResponseJson<ApiResponse<Worker>> {
    ResponseJson(ApiResponse::success(worker))
}

/// Endpoints reachable without a session.
pub fn public_router() -> Router<DeploymentImpl> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

/// Endpoints that require a session (mounted behind the auth middleware).
pub fn session_router() -> Router<DeploymentImpl> {
    Router::new()
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
}
