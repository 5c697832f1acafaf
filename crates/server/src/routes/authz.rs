use db::models::{board::Board, project::Project};
use deployment::Deployment;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError};

pub(crate) const TEAM_EDIT_PROJECT_MESSAGE: &str = "You are not allowed to edit this project. \
     Only the team members of the project can edit it.";
pub(crate) const TEAM_EDIT_TASK_MESSAGE: &str = "You are not allowed to edit this task. \
     Only the team members of the project can edit it.";
pub(crate) const TEAM_DELETE_TASK_MESSAGE: &str = "You are not allowed to delete this task. \
     Only the team members of the project can delete it.";
pub(crate) const OWNER_EDIT_PROJECT_MESSAGE: &str = "You are not allowed to edit this project. \
     Only the owner of the project can edit it.";
pub(crate) const OWNER_DELETE_PROJECT_MESSAGE: &str = "You are not allowed to delete this \
     project. Only the owner of the project can delete it.";
pub(crate) const OWNER_EDIT_BOARD_MESSAGE: &str = "You are not allowed to edit this board. \
     Only the owner of the project can edit it.";
pub(crate) const OWNER_DELETE_BOARD_MESSAGE: &str = "You are not allowed to delete this board. \
     Only the owner of the project can delete it.";

pub(crate) async fn project_for_board(
    deployment: &DeploymentImpl,
    board: &Board,
) -> Result<Project, ApiError> {
    Project::find_by_id(&deployment.db().pool, board.project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))
}

/// Team-member-or-owner gate used by task and board mutations.
pub(crate) async fn require_member_or_owner(
    deployment: &DeploymentImpl,
    project: &Project,
    worker_id: Uuid,
    message: &str,
) -> Result<(), ApiError> {
    let allowed = deployment
        .projects()
        .can_modify(&deployment.db().pool, project, worker_id)
        .await?;
    if allowed {
        Ok(())
    } else {
        Err(ApiError::Forbidden(message.to_string()))
    }
}

/// Owner-only gate used by project and board update/delete.
pub(crate) fn require_owner(
    project: &Project,
    worker_id: Uuid,
    message: &str,
) -> Result<(), ApiError> {
    if project.owner_id == worker_id {
        Ok(())
    } else {
        Err(ApiError::Forbidden(message.to_string()))
    }
}
