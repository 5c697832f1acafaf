use axum::{
    Json,
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use db::models::worker::Worker;
use deployment::Deployment;
use utils::response::ApiResponse;

use crate::DeploymentImpl;

pub const SESSION_COOKIE: &str = "workboard_session";

/// The authenticated worker for the current request.
#[derive(Clone)]
pub struct CurrentWorker(pub Worker);

/// The raw session token the request authenticated with (used by logout).
#[derive(Clone)]
pub struct SessionToken(pub String);

fn parse_authorization_bearer(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    let (prefix, rest) = trimmed.split_once(' ')?;
    if !prefix.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = rest.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

fn extract_cookie_token(req: &Request) -> Option<String> {
    let cookies = req.headers().get(header::COOKIE)?.to_str().ok()?;
    for pair in cookies.split(';') {
        let Some((name, value)) = pair.trim().split_once('=') else {
            continue;
        };
        if name == SESSION_COOKIE {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return None;
            }
            return Some(trimmed.to_string());
        }
    }
    None
}

fn extract_request_token(req: &Request) -> Option<String> {
    // 1) Authorization: Bearer <token>
    if let Some(value) = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_authorization_bearer)
    {
        return Some(value.to_string());
    }

    // 2) Session cookie set by login
    extract_cookie_token(req)
}

fn unauthorized(req: &Request, reason: &'static str) -> Response {
    tracing::warn!(
        path = %req.uri().path(),
        method = %req.method(),
        reason,
        "Unauthorized API request"
    );
    let response = ApiResponse::<()>::error("Unauthorized");
    (axum::http::StatusCode::UNAUTHORIZED, Json(response)).into_response()
}

pub async fn require_session_auth(
    State(deployment): State<DeploymentImpl>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(token) = extract_request_token(&req) else {
        return unauthorized(&req, "missing_token");
    };

    match deployment
        .auth()
        .authenticate(&deployment.db().pool, &token)
        .await
    {
        Ok(Some(worker)) => {
            req.extensions_mut().insert(CurrentWorker(worker));
            req.extensions_mut().insert(SessionToken(token));
            next.run(req).await
        }
        Ok(None) => unauthorized(&req, "invalid_or_expired_token"),
        Err(err) => {
            tracing::error!(error = %err, "Failed to authenticate request");
            let response = ApiResponse::<()>::error("Internal server error");
            (
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                Json(response),
            )
                .into_response()
        }
    }
}
