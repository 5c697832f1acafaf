use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::get,
};
use db::models::{
    Page,
    task_type::{CreateTaskType, TaskType, UpdateTaskType},
};
use deployment::Deployment;
use serde::Deserialize;
use utils::response::ApiResponse;

use crate::{
    DeploymentImpl, error::ApiError, middleware::load_task_type_middleware,
};

#[derive(Debug, Deserialize)]
pub struct TaskTypeListQuery {
    pub page: Option<u64>,
}

pub async fn get_task_types(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<TaskTypeListQuery>,
) -> Result<ResponseJson<ApiResponse<Page<TaskType>>>, ApiError> {
    let page = TaskType::find_page(&deployment.db().pool, query.page.unwrap_or(1)).await?;
    Ok(ResponseJson(ApiResponse::success(page)))
}

pub async fn create_task_type(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateTaskType>,
) -> Result<ResponseJson<ApiResponse<TaskType>>, ApiError> {
    payload.validate().map_err(ApiError::BadRequest)?;
    let task_type = TaskType::create(&deployment.db().pool, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(task_type)))
}

pub async fn get_task_type(
    Extension(task_type): Extension<TaskType>,
) -> ResponseJson<ApiResponse<TaskType>> {
    ResponseJson(ApiResponse::success(task_type))
}

pub async fn update_task_type(
    Extension(task_type): Extension<TaskType>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<UpdateTaskType>,
) -> Result<ResponseJson<ApiResponse<TaskType>>, ApiError> {
    let updated = TaskType::update(&deployment.db().pool, task_type.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(updated)))
}

pub async fn delete_task_type(
    Extension(task_type): Extension<TaskType>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let rows_affected = TaskType::delete(&deployment.db().pool, task_type.id).await?;
    if rows_affected == 0 {
        return Err(ApiError::NotFound("Task type not found".to_string()));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let task_type_id_router = Router::new()
        .route(
            "/",
            get(get_task_type)
                .put(update_task_type)
                .delete(delete_task_type),
        )
        .layer(from_fn_with_state(
            deployment.clone(),
            load_task_type_middleware::<DeploymentImpl>,
        ));

    Router::new()
        .route("/task-types", get(get_task_types).post(create_task_type))
        .nest("/task-types/{task_type_id}", task_type_id_router)
}
