use axum::{
    Extension, Router,
    http::header,
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::get,
};
use db::models::attachment::Attachment;

use crate::{
    DeploymentImpl, error::ApiError, middleware::load_attachment_middleware,
};

/// Serve the stored file with a guessed content type.
pub async fn download_attachment(
    Extension(attachment): Extension<Attachment>,
) -> Result<Response, ApiError> {
    let bytes = match tokio::fs::read(&attachment.file_path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::NotFound("Attachment file not found".to_string()));
        }
        Err(err) => return Err(ApiError::Io(err)),
    };

    let mime = mime_guess::from_path(&attachment.file_path).first_or_octet_stream();
    Ok((
        [
            (header::CONTENT_TYPE, mime.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", attachment.name),
            ),
        ],
        bytes,
    )
        .into_response())
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let attachment_id_router = Router::new()
        .route("/file", get(download_attachment))
        .layer(from_fn_with_state(
            deployment.clone(),
            load_attachment_middleware::<DeploymentImpl>,
        ));

    Router::new().nest("/attachments/{attachment_id}", attachment_id_router)
}
