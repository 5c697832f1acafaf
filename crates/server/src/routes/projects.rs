use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::{
    Page,
    board::Board,
    project::{CreateProject, Project, UpdateProject},
};
use deployment::Deployment;
use serde::{Deserialize, Serialize};
use services::services::team::ToggleMembership;
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{
    DeploymentImpl,
    error::ApiError,
    http::auth::CurrentWorker,
    middleware::load_project_middleware,
    routes::authz,
};

#[derive(Debug, Deserialize)]
pub struct ProjectListQuery {
    pub name: Option<String>,
    pub page: Option<u64>,
}

#[derive(Debug, Serialize, TS)]
pub struct ProjectWithBoards {
    #[serde(flatten)]
    #[ts(flatten)]
    pub project: Project,
    pub boards: Vec<Board>,
}

pub async fn get_projects(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<ProjectListQuery>,
) -> Result<ResponseJson<ApiResponse<Page<Project>>>, ApiError> {
    let page = Project::search_page(
        &deployment.db().pool,
        query.name.as_deref(),
        query.page.unwrap_or(1),
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(page)))
}

pub async fn create_project(
    State(deployment): State<DeploymentImpl>,
    Extension(CurrentWorker(worker)): Extension<CurrentWorker>,
    Json(payload): Json<CreateProject>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    payload.validate().map_err(ApiError::BadRequest)?;

    tracing::debug!("Creating project '{}'", payload.name);
    let project = deployment
        .projects()
        .create_project(&deployment.db().pool, &payload, worker.id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(project)))
}

pub async fn get_project(
    Extension(project): Extension<Project>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<ProjectWithBoards>>, ApiError> {
    let boards = Board::find_by_project_id(&deployment.db().pool, project.id).await?;
    Ok(ResponseJson(ApiResponse::success(ProjectWithBoards {
        project,
        boards,
    })))
}

pub async fn update_project(
    Extension(existing_project): Extension<Project>,
    Extension(CurrentWorker(worker)): Extension<CurrentWorker>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<UpdateProject>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    authz::require_owner(
        &existing_project,
        worker.id,
        authz::OWNER_EDIT_PROJECT_MESSAGE,
    )?;
    payload.validate().map_err(ApiError::BadRequest)?;

    let project = Project::update(&deployment.db().pool, existing_project.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(project)))
}

pub async fn delete_project(
    Extension(project): Extension<Project>,
    Extension(CurrentWorker(worker)): Extension<CurrentWorker>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    authz::require_owner(&project, worker.id, authz::OWNER_DELETE_PROJECT_MESSAGE)?;

    let rows_affected = Project::delete(&deployment.db().pool, project.id).await?;
    if rows_affected == 0 {
        return Err(ApiError::NotFound("Project not found".to_string()));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn toggle_team_membership(
    Extension(project): Extension<Project>,
    Extension(CurrentWorker(worker)): Extension<CurrentWorker>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<ToggleMembership>>, ApiError> {
    let result = deployment
        .teams()
        .toggle_project_membership(&deployment.db().pool, project.id, worker.id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(result)))
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let project_id_router = Router::new()
        .route(
            "/",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/team/toggle", post(toggle_team_membership))
        .route("/boards", post(super::boards::create_board))
        .layer(from_fn_with_state(
            deployment.clone(),
            load_project_middleware::<DeploymentImpl>,
        ));

    let projects_router = Router::new()
        .route("/", get(get_projects).post(create_project))
        .nest("/{id}", project_id_router);

    Router::new().nest("/projects", projects_router)
}
