use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::get,
};
use db::models::{
    Page,
    position::{CreatePosition, Position, UpdatePosition},
};
use deployment::Deployment;
use serde::Deserialize;
use utils::response::ApiResponse;

use crate::{
    DeploymentImpl, error::ApiError, middleware::load_position_middleware,
};

#[derive(Debug, Deserialize)]
pub struct PositionListQuery {
    pub page: Option<u64>,
}

pub async fn get_positions(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<PositionListQuery>,
) -> Result<ResponseJson<ApiResponse<Page<Position>>>, ApiError> {
    let page = Position::find_page(&deployment.db().pool, query.page.unwrap_or(1)).await?;
    Ok(ResponseJson(ApiResponse::success(page)))
}

pub async fn create_position(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreatePosition>,
) -> Result<ResponseJson<ApiResponse<Position>>, ApiError> {
    payload.validate().map_err(ApiError::BadRequest)?;
    let position = Position::create(&deployment.db().pool, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(position)))
}

pub async fn get_position(
    Extension(position): Extension<Position>,
) -> ResponseJson<ApiResponse<Position>> {
    ResponseJson(ApiResponse::success(position))
}

pub async fn update_position(
    Extension(position): Extension<Position>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<UpdatePosition>,
) -> Result<ResponseJson<ApiResponse<Position>>, ApiError> {
    let updated = Position::update(&deployment.db().pool, position.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(updated)))
}

pub async fn delete_position(
    Extension(position): Extension<Position>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let rows_affected = Position::delete(&deployment.db().pool, position.id).await?;
    if rows_affected == 0 {
        return Err(ApiError::NotFound("Position not found".to_string()));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let position_id_router = Router::new()
        .route(
            "/",
            get(get_position)
                .put(update_position)
                .delete(delete_position),
        )
        .layer(from_fn_with_state(
            deployment.clone(),
            load_position_middleware::<DeploymentImpl>,
        ));

    Router::new()
        .route("/positions", get(get_positions).post(create_position))
        .nest("/positions/{position_id}", position_id_router)
}
