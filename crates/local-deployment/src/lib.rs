use std::sync::Arc;

use async_trait::async_trait;
use db::DBService;
use deployment::{Deployment, DeploymentError};
use services::services::{
    attachment::AttachmentService,
    auth::AuthService,
    config::{Config, load_config_from_file, save_config_to_file},
    project::ProjectService,
    team::TeamService,
};
use tokio::sync::RwLock;
use utils::assets::config_path;

#[derive(Clone)]
pub struct LocalDeployment {
    config: Arc<RwLock<Config>>,
    db: DBService,
    auth: AuthService,
    attachments: AttachmentService,
    teams: TeamService,
    projects: ProjectService,
}

#[async_trait]
impl Deployment for LocalDeployment {
    async fn new() -> Result<Self, DeploymentError> {
        let config = Self::load_runtime_config().await?;
        let max_upload_size_bytes = { config.read().await.max_upload_size_bytes };

        let db = DBService::new().await?;
        let attachments = AttachmentService::new(max_upload_size_bytes)?;
        Self::spawn_orphaned_attachment_cleanup(attachments.clone(), db.clone());

        Ok(Self {
            config,
            db,
            auth: AuthService::new(),
            attachments,
            teams: TeamService::new(),
            projects: ProjectService::new(),
        })
    }

    fn config(&self) -> &Arc<RwLock<Config>> {
        &self.config
    }

    fn db(&self) -> &DBService {
        &self.db
    }

    fn auth(&self) -> &AuthService {
        &self.auth
    }

    fn attachments(&self) -> &AttachmentService {
        &self.attachments
    }

    fn teams(&self) -> &TeamService {
        &self.teams
    }

    fn projects(&self) -> &ProjectService {
        &self.projects
    }
}

impl LocalDeployment {
    async fn load_runtime_config() -> Result<Arc<RwLock<Config>>, DeploymentError> {
        let raw_config = load_config_from_file(&config_path()).await;
        let normalized = raw_config.normalized();
        save_config_to_file(&normalized, &config_path()).await?;
        Ok(Arc::new(RwLock::new(normalized)))
    }

    fn spawn_orphaned_attachment_cleanup(attachments: AttachmentService, db: DBService) {
        tokio::spawn(async move {
            tracing::info!("Starting orphaned attachment cleanup...");
            match attachments.delete_orphaned(&db.pool).await {
                Ok(0) => {}
                Ok(removed) => tracing::info!("Removed {removed} orphaned attachments"),
                Err(e) => tracing::error!("Failed to clean up orphaned attachments: {}", e),
            }
        });
    }
}
