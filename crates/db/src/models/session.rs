use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set,
};
use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::entities::session;
use crate::models::ids;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Worker not found")]
    WorkerNotFound,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct Session {
    pub id: Uuid,
    pub worker_id: Uuid,
    #[serde(skip_serializing)]
    pub token: String,
    #[ts(type = "Date")]
    pub expires_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
}

impl Session {
    async fn from_model<C: ConnectionTrait>(db: &C, model: session::Model) -> Result<Self, DbErr> {
        let worker_id = ids::worker_uuid_by_id(db, model.worker_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Worker not found".to_string()))?;
        Ok(Self {
            id: model.uuid,
            worker_id,
            token: model.token,
            expires_at: model.expires_at,
            created_at: model.created_at,
        })
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        worker_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        let worker_row_id = ids::worker_id_by_uuid(db, worker_id)
            .await?
            .ok_or(SessionError::WorkerNotFound)?;

        let active = session::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            worker_id: Set(worker_row_id),
            token: Set(token.to_string()),
            expires_at: Set(expires_at),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        let model = active.insert(db).await?;
        Self::from_model(db, model).await.map_err(SessionError::from)
    }

    /// Look up a session that has not expired yet.
    pub async fn find_valid_by_token<C: ConnectionTrait>(
        db: &C,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Self>, DbErr> {
        let record = session::Entity::find()
            .filter(session::Column::Token.eq(token))
            .filter(session::Column::ExpiresAt.gt(now))
            .one(db)
            .await?;
        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    pub async fn delete_by_token<C: ConnectionTrait>(db: &C, token: &str) -> Result<u64, DbErr> {
        let result = session::Entity::delete_many()
            .filter(session::Column::Token.eq(token))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn prune_expired_before<C: ConnectionTrait>(
        db: &C,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, DbErr> {
        let result = session::Entity::delete_many()
            .filter(session::Column::ExpiresAt.lte(cutoff))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use crate::models::worker::{CreateWorker, Worker};

    use super::*;

    async fn setup() -> (sea_orm::DatabaseConnection, Worker) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        let worker = Worker::create(
            &db,
            &CreateWorker {
                username: "gale".to_string(),
                email: "gale@example.com".to_string(),
                password: "secret-password".to_string(),
                first_name: None,
                last_name: None,
                position_id: None,
            },
            "hash".to_string(),
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        (db, worker)
    }

    #[tokio::test]
    async fn expired_sessions_are_invalid_and_prunable() {
        let (db, worker) = setup().await;
        let now = Utc::now();

        Session::create(&db, worker.id, "live", now + chrono::Duration::hours(1))
            .await
            .unwrap();
        Session::create(&db, worker.id, "stale", now - chrono::Duration::hours(1))
            .await
            .unwrap();

        assert!(Session::find_valid_by_token(&db, "live", now)
            .await
            .unwrap()
            .is_some());
        assert!(Session::find_valid_by_token(&db, "stale", now)
            .await
            .unwrap()
            .is_none());

        let pruned = Session::prune_expired_before(&db, now).await.unwrap();
        assert_eq!(pruned, 1);
        assert!(Session::find_valid_by_token(&db, "live", now)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn delete_by_token_revokes_the_session() {
        let (db, worker) = setup().await;
        let now = Utc::now();

        Session::create(&db, worker.id, "tok", now + chrono::Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(Session::delete_by_token(&db, "tok").await.unwrap(), 1);
        assert!(Session::find_valid_by_token(&db, "tok", now)
            .await
            .unwrap()
            .is_none());
    }
}
