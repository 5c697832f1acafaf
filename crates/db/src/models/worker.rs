use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::entities::worker;
use crate::models::{Page, ids};

const PAGE_SIZE: u64 = 5;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Worker not found")]
    WorkerNotFound,
    #[error("Position not found")]
    PositionNotFound,
    #[error("A worker with this username already exists")]
    DuplicateUsername,
}

/// Public worker representation. The password hash never leaves the db layer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Worker {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub position_id: Option<Uuid>,
    pub avatar_path: Option<String>,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateWorker {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub position_id: Option<Uuid>,
}

impl CreateWorker {
    pub fn validate(&self) -> Result<(), String> {
        if self.username.trim().is_empty() {
            return Err("Username must not be empty".to_string());
        }
        if self.password.len() < 8 {
            return Err("Password must be at least 8 characters long".to_string());
        }
        Ok(())
    }
}

impl Worker {
    async fn from_model<C: ConnectionTrait>(db: &C, model: worker::Model) -> Result<Self, DbErr> {
        let position_id = match model.position_id {
            Some(id) => ids::position_uuid_by_id(db, id).await?,
            None => None,
        };
        Ok(Self {
            id: model.uuid,
            username: model.username,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            position_id,
            avatar_path: model.avatar_path,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }

    pub async fn count<C: ConnectionTrait>(db: &C) -> Result<i64, DbErr> {
        let count = worker::Entity::find().count(db).await?;
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = worker::Entity::find()
            .filter(worker::Column::Uuid.eq(id))
            .one(db)
            .await?;
        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    /// Credential lookup for the auth layer; the only place the stored hash
    /// is handed out.
    pub async fn find_by_username_with_hash<C: ConnectionTrait>(
        db: &C,
        username: &str,
    ) -> Result<Option<(Self, String)>, DbErr> {
        let record = worker::Entity::find()
            .filter(worker::Column::Username.eq(username))
            .one(db)
            .await?;
        match record {
            Some(model) => {
                let hash = model.password_hash.clone();
                Ok(Some((Self::from_model(db, model).await?, hash)))
            }
            None => Ok(None),
        }
    }

    pub async fn search_page<C: ConnectionTrait>(
        db: &C,
        first_name: Option<&str>,
        page: u64,
    ) -> Result<Page<Self>, DbErr> {
        let mut query = worker::Entity::find().order_by_asc(worker::Column::Id);
        if let Some(first_name) = first_name.filter(|s| !s.is_empty()) {
            query = query.filter(worker::Column::FirstName.contains(first_name));
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
        data: &CreateWorker,
        password_hash: String,
        worker_id: Uuid,
    ) -> Result<Self, WorkerError> {
        let position_row_id = match data.position_id {
            Some(position_id) => Some(
                ids::position_id_by_uuid(db, position_id)
                    .await?
                    .ok_or(WorkerError::PositionNotFound)?,
            ),
            None => None,
        };

        let now = Utc::now();
        let active = worker::ActiveModel {
            uuid: Set(worker_id),
            username: Set(data.username.clone()),
            email: Set(data.email.clone()),
            password_hash: Set(password_hash),
            first_name: Set(data.first_name.clone()),
            last_name: Set(data.last_name.clone()),
            position_id: Set(position_row_id),
            avatar_path: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active.insert(db).await.map_err(|err| {
            if matches!(
                err.sql_err(),
                Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
            ) {
                WorkerError::DuplicateUsername
            } else {
                WorkerError::Database(err)
            }
        })?;
        Self::from_model(db, model).await.map_err(WorkerError::from)
    }

    pub async fn set_avatar_path<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        avatar_path: String,
    ) -> Result<Self, WorkerError> {
        let record = worker::Entity::find()
            .filter(worker::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(WorkerError::WorkerNotFound)?;

        let previous = record.avatar_path.clone();
        let mut active: worker::ActiveModel = record.into();
        active.avatar_path = Set(Some(avatar_path));
        active.updated_at = Set(Utc::now());
        let updated = active.update(db).await?;

        if let Some(previous) = previous {
            tracing::debug!(worker_id = %id, path = %previous, "Replacing previous avatar");
        }
        Self::from_model(db, updated).await.map_err(WorkerError::from)
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use super::*;

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    fn create_data(username: &str, first_name: Option<&str>) -> CreateWorker {
        CreateWorker {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password: "secret-password".to_string(),
            first_name: first_name.map(str::to_string),
            last_name: None,
            position_id: None,
        }
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let db = setup_db().await;
        Worker::create(&db, &create_data("bob", None), "h".to_string(), Uuid::new_v4())
            .await
            .unwrap();
        let err = Worker::create(&db, &create_data("bob", None), "h".to_string(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::DuplicateUsername));
    }

    #[tokio::test]
    async fn search_filters_by_first_name() {
        let db = setup_db().await;
        for (username, first_name) in [("a1", Some("Anna")), ("a2", Some("Annabel")), ("b1", Some("Bert"))] {
            Worker::create(&db, &create_data(username, first_name), "h".to_string(), Uuid::new_v4())
                .await
                .unwrap();
        }

        let page = Worker::search_page(&db, Some("Ann"), 1).await.unwrap();
        assert_eq!(page.total_items, 2);
        assert!(page.items.iter().all(|w| w
            .first_name
            .as_deref()
            .unwrap_or_default()
            .starts_with("Ann")));

        let all = Worker::search_page(&db, None, 1).await.unwrap();
        assert_eq!(all.total_items, 3);
    }

    #[tokio::test]
    async fn password_hash_is_not_exposed_on_lookup() {
        let db = setup_db().await;
        let created = Worker::create(
            &db,
            &create_data("carol", Some("Carol")),
            "stored-hash".to_string(),
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let (worker, hash) = Worker::find_by_username_with_hash(&db, "carol")
            .await
            .unwrap()
            .expect("worker");
        assert_eq!(worker.id, created.id);
        assert_eq!(hash, "stored-hash");
    }
}
