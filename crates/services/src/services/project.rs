use db::{
    DbErr, DbPool, TransactionTrait,
    models::{
        project::{CreateProject, Project, ProjectError},
        team::{Team, TeamError},
    },
};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ProjectServiceError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Project(#[from] ProjectError),
    #[error(transparent)]
    Team(#[from] TeamError),
}

pub type Result<T> = std::result::Result<T, ProjectServiceError>;

#[derive(Clone, Default)]
pub struct ProjectService;

impl ProjectService {
    pub fn new() -> Self {
        Self
    }

    /// Create a project owned by `owner_id`, with a fresh team named after
    /// the project attached to it.
    pub async fn create_project(
        &self,
        pool: &DbPool,
        data: &CreateProject,
        owner_id: Uuid,
    ) -> Result<Project> {
        let tx = pool.begin().await?;
        let team = Team::create(&tx, &data.name).await?;
        let project =
            Project::create(&tx, data, owner_id, Some(team.id), Uuid::new_v4()).await?;
        tx.commit().await?;

        tracing::debug!(project_id = %project.id, team_id = %team.id, "Created project with team");
        Ok(project)
    }

    pub fn is_owner(&self, project: &Project, worker_id: Uuid) -> bool {
        project.owner_id == worker_id
    }

    /// Owner-or-team-member check used by every board/task mutation.
    pub async fn can_modify(
        &self,
        pool: &DbPool,
        project: &Project,
        worker_id: Uuid,
    ) -> Result<bool> {
        if project.owner_id == worker_id {
            return Ok(true);
        }
        match project.team_id {
            Some(team_id) => Ok(Team::is_member(pool, team_id, worker_id).await?),
            None => Ok(false),
        }
    }

    /// Assignees must come from the project's team (or be its owner).
    /// Returns the offending ids, empty when all are allowed.
    pub async fn assignees_outside_team(
        &self,
        pool: &DbPool,
        project: &Project,
        assignee_ids: &[Uuid],
    ) -> Result<Vec<Uuid>> {
        let mut outside = Vec::new();
        for &assignee_id in assignee_ids {
            if assignee_id == project.owner_id {
                continue;
            }
            let is_member = match project.team_id {
                Some(team_id) => Team::is_member(pool, team_id, assignee_id).await?,
                None => false,
            };
            if !is_member {
                outside.push(assignee_id);
            }
        }
        Ok(outside)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use db::models::worker::{CreateWorker, Worker};
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

    fn create_data(name: &str) -> CreateProject {
        CreateProject {
            name: name.to_string(),
            description: "desc".to_string(),
            deadline: Utc::now().date_naive(),
        }
    }

    #[tokio::test]
    async fn creating_a_project_auto_creates_its_team() {
        let db = setup_db().await;
        let owner = create_worker(&db, "owner").await;
        let service = ProjectService::new();

        let project = service
            .create_project(&db, &create_data("Atlas"), owner.id)
            .await
            .unwrap();

        let team_id = project.team_id.expect("team attached");
        let team = Team::find_by_id(&db, team_id).await.unwrap().unwrap();
        assert_eq!(team.name, "Atlas");
        assert_eq!(project.owner_id, owner.id);
    }

    #[tokio::test]
    async fn can_modify_requires_ownership_or_membership() {
        let db = setup_db().await;
        let owner = create_worker(&db, "owner").await;
        let member = create_worker(&db, "member").await;
        let outsider = create_worker(&db, "outsider").await;
        let service = ProjectService::new();

        let project = service
            .create_project(&db, &create_data("Hermes"), owner.id)
            .await
            .unwrap();
        let team_id = project.team_id.unwrap();
        Team::add_members(&db, team_id, &[member.id]).await.unwrap();

        assert!(service.can_modify(&db, &project, owner.id).await.unwrap());
        assert!(service.can_modify(&db, &project, member.id).await.unwrap());
        assert!(!service.can_modify(&db, &project, outsider.id).await.unwrap());
        assert!(!service.is_owner(&project, member.id));
    }

    #[tokio::test]
    async fn assignees_outside_the_team_are_reported() {
        let db = setup_db().await;
        let owner = create_worker(&db, "owner").await;
        let member = create_worker(&db, "member").await;
        let outsider = create_worker(&db, "outsider").await;
        let service = ProjectService::new();

        let project = service
            .create_project(&db, &create_data("Demeter"), owner.id)
            .await
            .unwrap();
        Team::add_members(&db, project.team_id.unwrap(), &[member.id])
            .await
            .unwrap();

        let outside = service
            .assignees_outside_team(&db, &project, &[owner.id, member.id, outsider.id])
            .await
            .unwrap();
        assert_eq!(outside, vec![outsider.id]);
    }
}
