use db::{
    DbErr, DbPool, TransactionTrait,
    models::{
        project::{Project, ProjectError},
        team::{Team, TeamError},
    },
};
use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

const TEAM_NAME_MAX_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum TeamServiceError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Project(#[from] ProjectError),
    #[error(transparent)]
    Team(#[from] TeamError),
    #[error("Project not found")]
    ProjectNotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "lowercase")]
pub enum MembershipChange {
    Joined,
    Left,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct ToggleMembership {
    pub change: MembershipChange,
    pub team_id: Uuid,
}

#[derive(Clone, Default)]
pub struct TeamService;

impl TeamService {
    pub fn new() -> Self {
        Self
    }

    /// Toggle a worker's membership in the project's team, creating the team
    /// first when the project has none. The ensure-team step and the toggle
    /// run in one transaction so concurrent toggles cannot mint two teams.
    pub async fn toggle_project_membership(
        &self,
        pool: &DbPool,
        project_id: Uuid,
        worker_id: Uuid,
    ) -> Result<ToggleMembership, TeamServiceError> {
        let tx = pool.begin().await?;

        let project = Project::find_by_id(&tx, project_id)
            .await?
            .ok_or(TeamServiceError::ProjectNotFound)?;

        let team_id = match project.team_id {
            Some(team_id) => team_id,
            None => {
                let team = Team::create(&tx, &team_name_for_project(&project.name)).await?;
                Project::set_team(&tx, project.id, team.id).await?;
                tracing::info!(
                    project_id = %project.id,
                    team_id = %team.id,
                    "Auto-provisioned team for project"
                );
                team.id
            }
        };

        let change = if Team::is_member(&tx, team_id, worker_id).await? {
            Team::remove_member(&tx, team_id, worker_id).await?;
            MembershipChange::Left
        } else {
            Team::add_members(&tx, team_id, &[worker_id]).await?;
            MembershipChange::Joined
        };

        tx.commit().await?;
        Ok(ToggleMembership { change, team_id })
    }
}

fn team_name_for_project(project_name: &str) -> String {
    let truncated: String = project_name.chars().take(TEAM_NAME_MAX_CHARS).collect();
    format!("team: {truncated}")
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use db::models::{
        project::CreateProject,
        worker::{CreateWorker, Worker},
    };
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use super::*;

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    async fn create_worker(db: &DbPool, username: &str) -> Worker {
        Worker::create(
            db,
            &CreateWorker {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                password: "secret-password".to_string(),
                first_name: None,
                last_name: None,
                position_id: None,
            },
            "hash".to_string(),
            Uuid::new_v4(),
        )
        .await
        .unwrap()
    }

    async fn create_teamless_project(db: &DbPool, owner_id: Uuid, name: &str) -> Project {
        Project::create(
            db,
            &CreateProject {
                name: name.to_string(),
                description: "desc".to_string(),
                deadline: Utc::now().date_naive(),
            },
            owner_id,
            None,
            Uuid::new_v4(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn toggle_auto_provisions_a_named_team() {
        let db = setup_db().await;
        let owner = create_worker(&db, "owner").await;
        let project = create_teamless_project(&db, owner.id, "Big Launch").await;
        assert!(project.team_id.is_none());

        let service = TeamService::new();
        let result = service
            .toggle_project_membership(&db, project.id, owner.id)
            .await
            .unwrap();
        assert_eq!(result.change, MembershipChange::Joined);

        let reloaded = Project::find_by_id(&db, project.id).await.unwrap().unwrap();
        assert_eq!(reloaded.team_id, Some(result.team_id));

        let team = Team::find_by_id(&db, result.team_id).await.unwrap().unwrap();
        assert_eq!(team.name, "team: Big Launch");
    }

    #[tokio::test]
    async fn toggle_twice_is_an_involution() {
        let db = setup_db().await;
        let owner = create_worker(&db, "owner").await;
        let member = create_worker(&db, "member").await;
        let project = create_teamless_project(&db, owner.id, "Involution").await;

        let service = TeamService::new();
        let first = service
            .toggle_project_membership(&db, project.id, member.id)
            .await
            .unwrap();
        assert_eq!(first.change, MembershipChange::Joined);
        assert!(Team::is_member(&db, first.team_id, member.id).await.unwrap());

        let second = service
            .toggle_project_membership(&db, project.id, member.id)
            .await
            .unwrap();
        assert_eq!(second.change, MembershipChange::Left);
        assert_eq!(second.team_id, first.team_id);
        assert!(!Team::is_member(&db, first.team_id, member.id).await.unwrap());
    }

    #[test]
    fn long_project_names_are_truncated_in_the_team_name() {
        let long_name = "x".repeat(300);
        let team_name = team_name_for_project(&long_name);
        assert_eq!(team_name.len(), "team: ".len() + TEAM_NAME_MAX_CHARS);
    }
}
