use axum::{
    Extension, Json, Router,
    extract::{Multipart, Query, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, put},
};
use db::{TransactionTrait, models::{
    Page,
    board::Board,
    task::{CreateTask, Task, TaskWithDetails, UpdateTask},
}};
use deployment::Deployment;
use serde::Deserialize;
use services::services::attachment::UploadedFile;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    DeploymentImpl,
    error::ApiError,
    http::auth::CurrentWorker,
    middleware::load_task_middleware,
    routes::authz,
};

#[derive(Debug, Deserialize)]
pub struct TaskListQuery {
    pub page: Option<u64>,
}

#[derive(Debug, Deserialize, TS)]
pub struct ChangeTaskBoard {
    pub board_id: Uuid,
}

pub async fn get_tasks(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<TaskListQuery>,
) -> Result<ResponseJson<ApiResponse<Page<Task>>>, ApiError> {
    let page = Task::find_page(&deployment.db().pool, query.page.unwrap_or(1)).await?;
    Ok(ResponseJson(ApiResponse::success(page)))
}

pub async fn get_task(
    Extension(task): Extension<Task>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<TaskWithDetails>>, ApiError> {
    let details = task.with_details(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(details)))
}

/// Create a task on a board from a multipart payload: a `task` JSON part plus
/// any number of `files` parts that become attachments.
pub async fn create_task(
    Extension(board): Extension<Board>,
    Extension(CurrentWorker(worker)): Extension<CurrentWorker>,
    State(deployment): State<DeploymentImpl>,
    multipart: Multipart,
) -> Result<ResponseJson<ApiResponse<TaskWithDetails>>, ApiError> {
    let project = authz::project_for_board(&deployment, &board).await?;
    authz::require_member_or_owner(
        &deployment,
        &project,
        worker.id,
        authz::TEAM_EDIT_PROJECT_MESSAGE,
    )
    .await?;

    let max_upload = deployment.attachments().max_upload_size_bytes();
    let (payload, files) = parse_task_multipart(multipart, max_upload).await?;
    payload.validate().map_err(ApiError::BadRequest)?;

    let outside = deployment
        .projects()
        .assignees_outside_team(&deployment.db().pool, &project, &payload.assignee_ids)
        .await?;
    if !outside.is_empty() {
        return Err(ApiError::BadRequest(
            "Assignees must be members of the project's team".to_string(),
        ));
    }

    let pool = &deployment.db().pool;
    let task_id = Uuid::new_v4();
    tracing::debug!("Creating task '{}' on board {}", payload.name, board.id);

    let tx = pool.begin().await?;
    let task = Task::create(&tx, board.id, &payload, task_id).await?;
    tx.commit().await?;

    // Attachment creation is deliberately outside the transaction: the task
    // row stays, files are rolled back by the service on partial failure.
    deployment
        .attachments()
        .attach_uploads(pool, task.id, files)
        .await?;

    let details = task.with_details(pool).await?;
    Ok(ResponseJson(ApiResponse::success(details)))
}

pub async fn update_task(
    Extension(task): Extension<Task>,
    Extension(CurrentWorker(worker)): Extension<CurrentWorker>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<UpdateTask>,
) -> Result<ResponseJson<ApiResponse<TaskWithDetails>>, ApiError> {
    let board = board_for_task(&deployment, &task).await?;
    let project = authz::project_for_board(&deployment, &board).await?;
    authz::require_member_or_owner(
        &deployment,
        &project,
        worker.id,
        authz::TEAM_EDIT_TASK_MESSAGE,
    )
    .await?;
    payload.validate().map_err(ApiError::BadRequest)?;

    if let Some(assignee_ids) = &payload.assignee_ids {
        let outside = deployment
            .projects()
            .assignees_outside_team(&deployment.db().pool, &project, assignee_ids)
            .await?;
        if !outside.is_empty() {
            return Err(ApiError::BadRequest(
                "Assignees must be members of the project's team".to_string(),
            ));
        }
    }

    let updated = Task::update(&deployment.db().pool, task.id, &payload).await?;
    let details = updated.with_details(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(details)))
}

pub async fn change_task_board(
    Extension(task): Extension<Task>,
    Extension(CurrentWorker(worker)): Extension<CurrentWorker>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<ChangeTaskBoard>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let board = board_for_task(&deployment, &task).await?;
    let project = authz::project_for_board(&deployment, &board).await?;
    authz::require_member_or_owner(
        &deployment,
        &project,
        worker.id,
        authz::TEAM_EDIT_TASK_MESSAGE,
    )
    .await?;

    let target = Board::find_by_id(&deployment.db().pool, payload.board_id)
        .await?
        .ok_or_else(|| ApiError::BadRequest("Target board not found".to_string()))?;
    if target.project_id != project.id {
        return Err(ApiError::BadRequest(
            "Target board belongs to a different project".to_string(),
        ));
    }

    let moved = Task::change_board(&deployment.db().pool, task.id, target.id).await?;
    Ok(ResponseJson(ApiResponse::success(moved)))
}

pub async fn delete_task(
    Extension(task): Extension<Task>,
    Extension(CurrentWorker(worker)): Extension<CurrentWorker>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let board = board_for_task(&deployment, &task).await?;
    let project = authz::project_for_board(&deployment, &board).await?;
    authz::require_member_or_owner(
        &deployment,
        &project,
        worker.id,
        authz::TEAM_DELETE_TASK_MESSAGE,
    )
    .await?;

    let pool = &deployment.db().pool;
    deployment
        .attachments()
        .delete_task_attachments(pool, task.id)
        .await?;

    let rows_affected = Task::delete(pool, task.id).await?;
    if rows_affected == 0 {
        return Err(ApiError::NotFound("Task not found".to_string()));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

async fn board_for_task(deployment: &DeploymentImpl, task: &Task) -> Result<Board, ApiError> {
    Board::find_by_id(&deployment.db().pool, task.board_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Board not found".to_string()))
}

async fn parse_task_multipart(
    mut multipart: Multipart,
    max_upload_size_bytes: u64,
) -> Result<(CreateTask, Vec<UploadedFile>), ApiError> {
    let mut payload: Option<CreateTask> = None;
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("task") => {
                let bytes = field.bytes().await?;
                payload = Some(serde_json::from_slice(&bytes).map_err(|err| {
                    ApiError::BadRequest(format!("Invalid task payload: {err}"))
                })?);
            }
            Some("files") => {
                let file_name = field.file_name().unwrap_or("attachment").to_string();
                let bytes = field.bytes().await?;
                if bytes.len() as u64 > max_upload_size_bytes {
                    return Err(ApiError::Attachment(
                        services::services::attachment::AttachmentError::TooLarge(
                            bytes.len() as u64,
                            max_upload_size_bytes,
                        ),
                    ));
                }
                files.push(UploadedFile {
                    file_name,
                    data: bytes.to_vec(),
                });
            }
            _ => {}
        }
    }

    let payload = payload.ok_or_else(|| {
        ApiError::BadRequest("Missing 'task' field in multipart payload".to_string())
    })?;
    Ok((payload, files))
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let task_id_router = Router::new()
        .route("/", get(get_task).put(update_task).delete(delete_task))
        .route("/board", put(change_task_board))
        .layer(from_fn_with_state(
            deployment.clone(),
            load_task_middleware::<DeploymentImpl>,
        ));

    Router::new()
        .route("/tasks", get(get_tasks))
        .nest("/tasks/{task_id}", task_id_router)
}
