use std::sync::Arc;

use async_trait::async_trait;
use db::DBService;
use services::services::{
    attachment::{AttachmentError, AttachmentService},
    auth::AuthService,
    config::{Config, ConfigError},
    project::ProjectService,
    team::TeamService,
};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Database(#[from] db::DbErr),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Attachment(#[from] AttachmentError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The service container handed to every request handler.
#[async_trait]
pub trait Deployment: Clone + Send + Sync + 'static {
    async fn new() -> Result<Self, DeploymentError>;

    fn config(&self) -> &Arc<RwLock<Config>>;
    fn db(&self) -> &DBService;
    fn auth(&self) -> &AuthService;
    fn attachments(&self) -> &AttachmentService;
    fn teams(&self) -> &TeamService;
    fn projects(&self) -> &ProjectService;
}
