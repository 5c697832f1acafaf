use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use db::models::{project::Project, task::Task, worker::Worker};
use deployment::Deployment;
use serde::Serialize;
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError};

#[derive(Debug, Serialize, TS)]
pub struct DashboardStats {
    pub projects: i64,
    pub active_projects: i64,
    pub tasks: i64,
    pub workers: i64,
}

pub async fn get_dashboard(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<DashboardStats>>, ApiError> {
    let pool = &deployment.db().pool;
    let stats = DashboardStats {
        projects: Project::count(pool).await?,
        active_projects: Project::count_active(pool).await?,
        tasks: Task::count(pool).await?,
        workers: Worker::count(pool).await?,
    };
    Ok(ResponseJson(ApiResponse::success(stats)))
}

pub fn router() -> Router<DeploymentImpl> {
    Router::new().route("/dashboard", get(get_dashboard))
}
