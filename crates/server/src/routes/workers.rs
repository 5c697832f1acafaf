use axum::{
    Extension, Json, Router,
    extract::{Multipart, Query, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::{
    Page,
    project::Project,
    task::Task,
    worker::{CreateWorker, Worker},
};
use deployment::Deployment;
use serde::{Deserialize, Serialize};
use services::services::attachment::UploadedFile;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    DeploymentImpl, error::ApiError, middleware::load_worker_middleware,
};

#[derive(Debug, Deserialize)]
pub struct WorkerListQuery {
    pub first_name: Option<String>,
    pub page: Option<u64>,
}

#[derive(Debug, Serialize, TS)]
pub struct ProjectTasks {
    pub project_id: Uuid,
    pub project_name: String,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Serialize, TS)]
pub struct WorkerWithTasks {
    #[serde(flatten)]
    #[ts(flatten)]
    pub worker: Worker,
    pub tasks_by_project: Vec<ProjectTasks>,
}

pub async fn get_workers(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<WorkerListQuery>,
) -> Result<ResponseJson<ApiResponse<Page<Worker>>>, ApiError> {
    let page = Worker::search_page(
        &deployment.db().pool,
        query.first_name.as_deref(),
        query.page.unwrap_or(1),
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(page)))
}

/// Worker detail with assigned tasks grouped by project.
pub async fn get_worker(
    Extension(worker): Extension<Worker>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<WorkerWithTasks>>, ApiError> {
    let pool = &deployment.db().pool;
    let assigned = Task::find_by_assignee(pool, worker.id).await?;

    let mut by_project: Vec<(Uuid, Vec<Task>)> = Vec::new();
    for (project_id, task) in assigned {
        match by_project.iter_mut().find(|(id, _)| *id == project_id) {
            Some((_, tasks)) => tasks.push(task),
            None => by_project.push((project_id, vec![task])),
        }
    }

    let mut tasks_by_project = Vec::with_capacity(by_project.len());
    for (project_id, tasks) in by_project {
        let Some(project) = Project::find_by_id(pool, project_id).await? else {
            continue;
        };
        tasks_by_project.push(ProjectTasks {
            project_id,
            project_name: project.name,
            tasks,
        });
    }
    tasks_by_project.sort_by(|a, b| a.project_name.cmp(&b.project_name));

    Ok(ResponseJson(ApiResponse::success(WorkerWithTasks {
        worker,
        tasks_by_project,
    })))
}

pub async fn create_worker(
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
    Ok(ResponseJson(ApiResponse::success(worker)))
}

/// Store an uploaded avatar image for the worker.
pub async fn upload_avatar(
    Extension(worker): Extension<Worker>,
    State(deployment): State<DeploymentImpl>,
    mut multipart: Multipart,
) -> Result<ResponseJson<ApiResponse<Worker>>, ApiError> {
    let mut upload: Option<UploadedFile> = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            let file_name = field.file_name().unwrap_or("avatar").to_string();
            let bytes = field.bytes().await?;
            upload = Some(UploadedFile {
                file_name,
                data: bytes.to_vec(),
            });
        }
    }
    let upload = upload.ok_or_else(|| {
        ApiError::BadRequest("Missing 'file' field in multipart payload".to_string())
    })?;

    let avatar_path = deployment.attachments().store_avatar(upload).await?;
    let updated =
        Worker::set_avatar_path(&deployment.db().pool, worker.id, avatar_path).await?;
    Ok(ResponseJson(ApiResponse::success(updated)))
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let worker_id_router = Router::new()
        .route("/", get(get_worker))
        .route("/avatar", post(upload_avatar))
        .layer(from_fn_with_state(
            deployment.clone(),
            load_worker_middleware::<DeploymentImpl>,
        ));

    Router::new()
        .route("/workers", get(get_workers).post(create_worker))
        .nest("/workers/{worker_id}", worker_id_router)
}
