use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::entities::project;
use crate::models::{Page, ids};

const PAGE_SIZE: u64 = 3;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Project not found")]
    ProjectNotFound,
    #[error("A project with this name already exists")]
    DuplicateName,
    #[error("Team not found")]
    TeamNotFound,
    #[error("Owner not found")]
    OwnerNotFound,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub deadline: NaiveDate,
    pub is_completed: bool,
    pub team_id: Option<Uuid>,
    pub owner_id: Uuid,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateProject {
    pub name: String,
    pub description: String,
    pub deadline: NaiveDate,
}

#[derive(Debug, Deserialize, TS)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub is_completed: Option<bool>,
}

impl CreateProject {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Project name must not be empty".to_string());
        }
        if self.deadline < Utc::now().date_naive() {
            return Err("Deadline cannot be in the past".to_string());
        }
        Ok(())
    }
}

impl UpdateProject {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err("Project name must not be empty".to_string());
            }
        }
        if let Some(deadline) = self.deadline {
            if deadline < Utc::now().date_naive() {
                return Err("Deadline cannot be in the past".to_string());
            }
        }
        Ok(())
    }
}

impl Project {
    async fn from_model<C: ConnectionTrait>(db: &C, model: project::Model) -> Result<Self, DbErr> {
        let team_id = match model.team_id {
            Some(id) => ids::team_uuid_by_id(db, id).await?,
            None => None,
        };
        let owner_id = ids::worker_uuid_by_id(db, model.owner_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Worker not found".to_string()))?;
        Ok(Self {
            id: model.uuid,
            name: model.name,
            description: model.description,
            deadline: model.deadline,
            is_completed: model.is_completed,
            team_id,
            owner_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }

    pub async fn count<C: ConnectionTrait>(db: &C) -> Result<i64, DbErr> {
        let count = project::Entity::find().count(db).await?;
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    pub async fn count_active<C: ConnectionTrait>(db: &C) -> Result<i64, DbErr> {
        let count = project::Entity::find()
            .filter(project::Column::IsCompleted.eq(false))
            .count(db)
            .await?;
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = project::Entity::find()
            .filter(project::Column::Uuid.eq(id))
            .one(db)
            .await?;
        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    pub async fn find_by_name<C: ConnectionTrait>(
        db: &C,
        name: &str,
    ) -> Result<Option<Self>, DbErr> {
        let record = project::Entity::find()
            .filter(project::Column::Name.eq(name))
            .one(db)
            .await?;
        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    /// Newest-first listing with an optional case-insensitive name filter.
    pub async fn search_page<C: ConnectionTrait>(
        db: &C,
        name: Option<&str>,
        page: u64,
    ) -> Result<Page<Self>, DbErr> {
        let mut query = project::Entity::find().order_by_desc(project::Column::Id);
        if let Some(name) = name.filter(|s| !s.is_empty()) {
            query = query.filter(project::Column::Name.contains(name));
        }
        let paginator = query.paginate(db, PAGE_SIZE);
        let totals = paginator.num_items_and_pages().await?;
        let page_index = page.saturating_sub(1);
        let records = paginator.fetch_page(page_index).await?;

        let mut items = Vec::with_capacity(records.len());
        for model in records {
            items.push(Self::from_model(db, model).await?);
        }
        Ok(Page {
            items,
            page: page_index + 1,
            per_page: PAGE_SIZE,
            total_items: totals.number_of_items,
            total_pages: totals.number_of_pages,
        })
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateProject,
        owner_id: Uuid,
        team_id: Option<Uuid>,
        project_id: Uuid,
    ) -> Result<Self, ProjectError> {
        let owner_row_id = ids::worker_id_by_uuid(db, owner_id)
            .await?
            .ok_or(ProjectError::OwnerNotFound)?;
        let team_row_id = match team_id {
            Some(team_id) => Some(
                ids::team_id_by_uuid(db, team_id)
                    .await?
                    .ok_or(ProjectError::TeamNotFound)?,
            ),
            None => None,
        };

        let now = Utc::now();
        let active = project::ActiveModel {
            uuid: Set(project_id),
            name: Set(data.name.clone()),
            description: Set(data.description.clone()),
            deadline: Set(data.deadline),
            is_completed: Set(false),
            team_id: Set(team_row_id),
            owner_id: Set(owner_row_id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active.insert(db).await.map_err(map_unique_violation)?;
        Self::from_model(db, model).await.map_err(ProjectError::from)
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        data: &UpdateProject,
    ) -> Result<Self, ProjectError> {
        let record = project::Entity::find()
            .filter(project::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(ProjectError::ProjectNotFound)?;

        let mut active: project::ActiveModel = record.into();
        if let Some(name) = data.name.clone() {
            active.name = Set(name);
        }
        if let Some(description) = data.description.clone() {
            active.description = Set(description);
        }
        if let Some(deadline) = data.deadline {
            active.deadline = Set(deadline);
        }
        if let Some(is_completed) = data.is_completed {
            active.is_completed = Set(is_completed);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(db).await.map_err(map_unique_violation)?;
        Self::from_model(db, updated).await.map_err(ProjectError::from)
    }

    pub async fn set_team<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        team_id: Uuid,
    ) -> Result<(), ProjectError> {
        let record = project::Entity::find()
            .filter(project::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(ProjectError::ProjectNotFound)?;
        let team_row_id = ids::team_id_by_uuid(db, team_id)
            .await?
            .ok_or(ProjectError::TeamNotFound)?;

        let mut active: project::ActiveModel = record.into();
        active.team_id = Set(Some(team_row_id));
        active.updated_at = Set(Utc::now());
        active.update(db).await?;
        Ok(())
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let result = project::Entity::delete_many()
            .filter(project::Column::Uuid.eq(id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}

fn map_unique_violation(err: DbErr) -> ProjectError {
    if matches!(
        err.sql_err(),
        Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
    ) {
        ProjectError::DuplicateName
    } else {
        ProjectError::Database(err)
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use crate::models::worker::{CreateWorker, Worker};

    use super::*;

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    async fn create_owner(db: &sea_orm::DatabaseConnection) -> Worker {
        Worker::create(
            db,
            &CreateWorker {
                username: "owner".to_string(),
                email: "owner@example.com".to_string(),
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
    async fn duplicate_project_name_fails_at_the_model_layer() {
        let db = setup_db().await;
        let owner = create_owner(&db).await;

        Project::create(&db, &create_data("Apollo"), owner.id, None, Uuid::new_v4())
            .await
            .unwrap();
        let err = Project::create(&db, &create_data("Apollo"), owner.id, None, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, ProjectError::DuplicateName));
    }

    #[tokio::test]
    async fn past_deadline_fails_validation() {
        let past = CreateProject {
            name: "Late".to_string(),
            description: "desc".to_string(),
            deadline: Utc::now().date_naive() - chrono::Duration::days(2),
        };
        assert!(past.validate().is_err());

        let future = CreateProject {
            name: "On time".to_string(),
            description: "desc".to_string(),
            deadline: Utc::now().date_naive() + chrono::Duration::days(1),
        };
        assert!(future.validate().is_ok());
    }

    #[tokio::test]
    async fn search_filters_by_name_substring() {
        let db = setup_db().await;
        let owner = create_owner(&db).await;
        for name in ["Website redesign", "Backend rewrite", "Website launch"] {
            Project::create(&db, &create_data(name), owner.id, None, Uuid::new_v4())
                .await
                .unwrap();
        }

        let page = Project::search_page(&db, Some("Website"), 1).await.unwrap();
        assert_eq!(page.total_items, 2);

        let all = Project::search_page(&db, None, 1).await.unwrap();
        assert_eq!(all.total_items, 3);
        assert_eq!(all.per_page, 3);
    }
}
