use axum::{
    Extension, Json, Router,
    extract::State,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::team::{CreateTeam, Team, TeamWithMembers, UpdateTeam};
use deployment::Deployment;
use utils::response::ApiResponse;

use crate::{
    DeploymentImpl, error::ApiError, middleware::load_team_middleware,
};

async fn with_members(
    deployment: &DeploymentImpl,
    team: Team,
) -> Result<TeamWithMembers, ApiError> {
    let members = Team::members(&deployment.db().pool, team.id).await?;
    Ok(TeamWithMembers { team, members })
}

pub async fn create_team(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateTeam>,
) -> Result<ResponseJson<ApiResponse<TeamWithMembers>>, ApiError> {
    payload.validate().map_err(ApiError::BadRequest)?;

    let team = Team::create_with_members(&deployment.db().pool, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(
        with_members(&deployment, team).await?,
    )))
}

pub async fn get_team(
    Extension(team): Extension<Team>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<TeamWithMembers>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(
        with_members(&deployment, team).await?,
    )))
}

pub async fn update_team(
    Extension(team): Extension<Team>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<UpdateTeam>,
) -> Result<ResponseJson<ApiResponse<TeamWithMembers>>, ApiError> {
    let updated = Team::update(&deployment.db().pool, team.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(
        with_members(&deployment, updated).await?,
    )))
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let team_id_router = Router::new()
        .route("/", get(get_team).put(update_team))
        .layer(from_fn_with_state(
            deployment.clone(),
            load_team_middleware::<DeploymentImpl>,
        ));

    Router::new()
        .route("/teams", post(create_team))
        .nest("/teams/{team_id}", team_id_router)
}
