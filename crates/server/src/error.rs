use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use db::{
    DbErr,
    models::{
        board::BoardError, position::PositionError, project::ProjectError,
        session::SessionError, task::TaskError, team::TeamError, worker::WorkerError,
    },
};
use deployment::DeploymentError;
use services::services::{
    attachment::AttachmentError,
    auth::AuthError,
    config::ConfigError,
    project::ProjectServiceError,
    team::TeamServiceError,
};
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Project(#[from] ProjectError),
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    Worker(#[from] WorkerError),
    #[error(transparent)]
    Team(#[from] TeamError),
    #[error(transparent)]
    Position(#[from] PositionError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Attachment(#[from] AttachmentError),
    #[error(transparent)]
    TeamService(#[from] TeamServiceError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Deployment(#[from] DeploymentError),
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
}

impl From<&'static str> for ApiError {
    fn from(msg: &'static str) -> Self {
        ApiError::BadRequest(msg.to_string())
    }
}

impl From<ProjectServiceError> for ApiError {
    fn from(err: ProjectServiceError) -> Self {
        match err {
            ProjectServiceError::Database(db_err) => ApiError::Database(db_err),
            ProjectServiceError::Project(proj_err) => ApiError::Project(proj_err),
            ProjectServiceError::Team(team_err) => ApiError::Team(team_err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_type) = match &self {
            ApiError::Project(err) => match err {
                ProjectError::ProjectNotFound => (StatusCode::NOT_FOUND, "ProjectError"),
                ProjectError::DuplicateName => (StatusCode::CONFLICT, "ProjectError"),
                ProjectError::TeamNotFound | ProjectError::OwnerNotFound => {
                    (StatusCode::BAD_REQUEST, "ProjectError")
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "ProjectError"),
            },
            ApiError::Board(err) => match err {
                BoardError::BoardNotFound | BoardError::ProjectNotFound => {
                    (StatusCode::NOT_FOUND, "BoardError")
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "BoardError"),
            },
            ApiError::Task(err) => match err {
                TaskError::TaskNotFound => (StatusCode::NOT_FOUND, "TaskError"),
                TaskError::BoardNotFound
                | TaskError::TaskTypeNotFound
                | TaskError::WorkerNotFound => (StatusCode::BAD_REQUEST, "TaskError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "TaskError"),
            },
            ApiError::Worker(err) => match err {
                WorkerError::WorkerNotFound => (StatusCode::NOT_FOUND, "WorkerError"),
                WorkerError::PositionNotFound => (StatusCode::BAD_REQUEST, "WorkerError"),
                WorkerError::DuplicateUsername => (StatusCode::CONFLICT, "WorkerError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "WorkerError"),
            },
            ApiError::Team(err) => match err {
                TeamError::TeamNotFound => (StatusCode::NOT_FOUND, "TeamError"),
                TeamError::WorkerNotFound => (StatusCode::BAD_REQUEST, "TeamError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "TeamError"),
            },
            ApiError::Position(err) => match err {
                PositionError::PositionNotFound => (StatusCode::NOT_FOUND, "PositionError"),
                PositionError::DuplicateName => (StatusCode::CONFLICT, "PositionError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "PositionError"),
            },
            ApiError::Session(err) => match err {
                SessionError::WorkerNotFound => (StatusCode::BAD_REQUEST, "SessionError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "SessionError"),
            },
            ApiError::Auth(err) => match err {
                AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "AuthError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "AuthError"),
            },
            ApiError::Attachment(err) => match err {
                AttachmentError::NotFound => (StatusCode::NOT_FOUND, "AttachmentError"),
                AttachmentError::TooLarge(_, _) => {
                    (StatusCode::PAYLOAD_TOO_LARGE, "AttachmentError")
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "AttachmentError"),
            },
            ApiError::TeamService(err) => match err {
                TeamServiceError::ProjectNotFound => (StatusCode::NOT_FOUND, "TeamServiceError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "TeamServiceError"),
            },
            ApiError::Config(err) => match err {
                ConfigError::ValidationError(_) => (StatusCode::BAD_REQUEST, "ConfigError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "ConfigError"),
            },
            ApiError::Deployment(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DeploymentError"),
            ApiError::Database(db_err) => match db_err {
                DbErr::RecordNotFound(_) => (StatusCode::NOT_FOUND, "DatabaseError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "DatabaseError"),
            },
            ApiError::Multipart(_) => (StatusCode::BAD_REQUEST, "MultipartError"),
            ApiError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IoError"),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BadRequest"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "ConflictError"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "ForbiddenError"),
        };

        let error_message = match &self {
            ApiError::Multipart(_) => {
                "Failed to upload file. Please ensure the file is valid and try again.".to_string()
            }
            ApiError::Attachment(AttachmentError::TooLarge(size, max)) => format!(
                "This file is too large ({:.1} MB). Maximum file size is {:.1} MB.",
                *size as f64 / 1_048_576.0,
                *max as f64 / 1_048_576.0
            ),
            ApiError::Unauthorized => "Unauthorized. Please sign in again.".to_string(),
            ApiError::Project(ProjectError::DuplicateName)
            | ApiError::Worker(WorkerError::DuplicateUsername)
            | ApiError::Position(PositionError::DuplicateName)
            | ApiError::Auth(AuthError::InvalidCredentials) => self.to_string(),
            ApiError::NotFound(msg)
            | ApiError::Internal(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Conflict(msg)
            | ApiError::Forbidden(msg) => msg.clone(),
            _ => format!("{}: {}", error_type, self),
        };

        if status_code.is_server_error() {
            tracing::error!(
                status = %status_code,
                error_type,
                error = %self,
                "API request failed"
            );
        }
        let response = ApiResponse::<()>::error(&error_message);
        (status_code, Json(response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_maps_to_expected_http_statuses() {
        assert_eq!(
            ApiError::BadRequest("bad".to_string())
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Forbidden("nope".to_string())
                .into_response()
                .status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::NotFound("missing".to_string())
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Conflict("conflict".to_string())
                .into_response()
                .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::Internal("boom".to_string())
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn domain_errors_map_to_expected_http_statuses() {
        assert_eq!(
            ApiError::from(ProjectError::ProjectNotFound)
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(ProjectError::DuplicateName)
                .into_response()
                .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(TaskError::BoardNotFound)
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(AuthError::InvalidCredentials)
                .into_response()
                .status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(AttachmentError::TooLarge(20, 10))
                .into_response()
                .status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }
}
