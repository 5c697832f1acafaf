use axum::{
    Extension, Json, Router,
    extract::State,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{post, put},
};
use db::models::{
    board::{Board, CreateBoard, UpdateBoard},
    project::Project,
};
use deployment::Deployment;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    DeploymentImpl,
    error::ApiError,
    http::auth::CurrentWorker,
    middleware::load_board_middleware,
    routes::authz,
};

pub async fn create_board(
    Extension(project): Extension<Project>,
    Extension(CurrentWorker(worker)): Extension<CurrentWorker>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateBoard>,
) -> Result<ResponseJson<ApiResponse<Board>>, ApiError> {
    authz::require_member_or_owner(
        &deployment,
        &project,
        worker.id,
        authz::TEAM_EDIT_PROJECT_MESSAGE,
    )
    .await?;
    payload.validate().map_err(ApiError::BadRequest)?;

    let board = Board::create(
        &deployment.db().pool,
        project.id,
        &payload,
        Uuid::new_v4(),
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(board)))
}

pub async fn update_board(
    Extension(board): Extension<Board>,
    Extension(CurrentWorker(worker)): Extension<CurrentWorker>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<UpdateBoard>,
) -> Result<ResponseJson<ApiResponse<Board>>, ApiError> {
    let project = authz::project_for_board(&deployment, &board).await?;
    authz::require_owner(&project, worker.id, authz::OWNER_EDIT_BOARD_MESSAGE)?;

    let board = Board::update(&deployment.db().pool, board.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(board)))
}

pub async fn delete_board(
    Extension(board): Extension<Board>,
    Extension(CurrentWorker(worker)): Extension<CurrentWorker>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let project = authz::project_for_board(&deployment, &board).await?;
    authz::require_owner(&project, worker.id, authz::OWNER_DELETE_BOARD_MESSAGE)?;

    let rows_affected = Board::delete(&deployment.db().pool, board.id).await?;
    if rows_affected == 0 {
        return Err(ApiError::NotFound("Board not found".to_string()));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let board_id_router = Router::new()
        .route("/", put(update_board).delete(delete_board))
        .route("/tasks", post(super::tasks::create_task))
        .layer(from_fn_with_state(
            deployment.clone(),
            load_board_middleware::<DeploymentImpl>,
        ));

    Router::new().nest("/boards/{board_id}", board_id_router)
}
