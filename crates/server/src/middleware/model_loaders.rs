use std::{fmt::Display, future::Future};

use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use db::{
    DBService,
    models::{
        attachment::Attachment, board::Board, position::Position, project::Project, task::Task,
        task_type::TaskType, team::Team, worker::Worker,
    },
};
use deployment::Deployment;
use uuid::Uuid;

pub trait ModelLoaderDeps {
    fn db_service(&self) -> &DBService;
}

impl<D> ModelLoaderDeps for D
where
    D: Deployment,
{
    fn db_service(&self) -> &DBService {
        self.db()
    }
}

async fn fetch_model_or_status<M, E, Fut>(
    model_name: &'static str,
    model_id: Uuid,
    load_future: Fut,
) -> Result<M, StatusCode>
where
    E: Display,
    Fut: Future<Output = Result<Option<M>, E>>,
{
    match load_future.await {
        Ok(Some(model)) => Ok(model),
        Ok(None) => {
            tracing::warn!("{model_name} {model_id} not found");
            Err(StatusCode::NOT_FOUND)
        }
        Err(error) => {
            tracing::error!("Failed to fetch {model_name} {model_id}: {error}");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn load_request_extension<M, E, Fut>(
    request: Request,
    next: Next,
    model_name: &'static str,
    model_id: Uuid,
    load_future: Fut,
) -> Result<Response, StatusCode>
where
    M: Clone + Send + Sync + 'static,
    E: Display,
    Fut: Future<Output = Result<Option<M>, E>>,
{
    let model = fetch_model_or_status(model_name, model_id, load_future).await?;
    let mut request = request;
    request.extensions_mut().insert(model);
    Ok(next.run(request).await)
}

pub async fn load_project_middleware<S>(
    State(deployment): State<S>,
    Path(project_id): Path<Uuid>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode>
where
    S: ModelLoaderDeps,
{
    load_request_extension(
        request,
        next,
        "Project",
        project_id,
        Project::find_by_id(&deployment.db_service().pool, project_id),
    )
    .await
}

pub async fn load_board_middleware<S>(
    State(deployment): State<S>,
    Path(board_id): Path<Uuid>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode>
where
    S: ModelLoaderDeps,
{
    load_request_extension(
        request,
        next,
        "Board",
        board_id,
        Board::find_by_id(&deployment.db_service().pool, board_id),
    )
    .await
}

pub async fn load_task_middleware<S>(
    State(deployment): State<S>,
    Path(task_id): Path<Uuid>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode>
where
    S: ModelLoaderDeps,
{
    load_request_extension(
        request,
        next,
        "Task",
        task_id,
        Task::find_by_id(&deployment.db_service().pool, task_id),
    )
    .await
}

pub async fn load_worker_middleware<S>(
    State(deployment): State<S>,
    Path(worker_id): Path<Uuid>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode>
where
    S: ModelLoaderDeps,
{
    load_request_extension(
        request,
        next,
        "Worker",
        worker_id,
        Worker::find_by_id(&deployment.db_service().pool, worker_id),
    )
    .await
}

pub async fn load_team_middleware<S>(
    State(deployment): State<S>,
    Path(team_id): Path<Uuid>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode>
where
    S: ModelLoaderDeps,
{
    load_request_extension(
        request,
        next,
        "Team",
        team_id,
        Team::find_by_id(&deployment.db_service().pool, team_id),
    )
    .await
}

pub async fn load_task_type_middleware<S>(
    State(deployment): State<S>,
    Path(task_type_id): Path<Uuid>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode>
where
    S: ModelLoaderDeps,
{
    load_request_extension(
        request,
        next,
        "TaskType",
        task_type_id,
        TaskType::find_by_id(&deployment.db_service().pool, task_type_id),
    )
    .await
}

pub async fn load_position_middleware<S>(
    State(deployment): State<S>,
    Path(position_id): Path<Uuid>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode>
where
    S: ModelLoaderDeps,
{
    load_request_extension(
        request,
        next,
        "Position",
        position_id,
        Position::find_by_id(&deployment.db_service().pool, position_id),
    )
    .await
}

pub async fn load_attachment_middleware<S>(
    State(deployment): State<S>,
    Path(attachment_id): Path<Uuid>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode>
where
    S: ModelLoaderDeps,
{
    load_request_extension(
        request,
        next,
        "Attachment",
        attachment_id,
        Attachment::find_by_id(&deployment.db_service().pool, attachment_id),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::fetch_model_or_status;

    #[tokio::test]
    async fn fetch_model_or_status_returns_not_found_on_missing_model() {
        let result = fetch_model_or_status::<String, &'static str, _>(
            "Project",
            uuid::Uuid::new_v4(),
            async { Ok(None) },
        )
        .await;

        assert_eq!(result.unwrap_err(), axum::http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn fetch_model_or_status_returns_internal_error_on_fetch_failure() {
        let result = fetch_model_or_status::<String, &'static str, _>(
            "Project",
            uuid::Uuid::new_v4(),
            async { Err("db unavailable") },
        )
        .await;

        assert_eq!(
            result.unwrap_err(),
            axum::http::StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
