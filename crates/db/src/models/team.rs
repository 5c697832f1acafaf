use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::entities::{team, team_member};
use crate::models::{ids, worker::Worker};

#[derive(Debug, Error)]
pub enum TeamError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Team not found")]
    TeamNotFound,
    #[error("Worker not found")]
    WorkerNotFound,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, TS)]
pub struct CreateTeam {
    pub name: String,
    #[serde(default)]
    pub member_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, TS)]
pub struct UpdateTeam {
    pub name: Option<String>,
    pub member_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct TeamWithMembers {
    #[serde(flatten)]
    #[ts(flatten)]
    pub team: Team,
    pub members: Vec<Worker>,
}

impl CreateTeam {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Team name must not be empty".to_string());
        }
        Ok(())
    }
}

impl Team {
    fn from_model(model: team::Model) -> Self {
        Self {
            id: model.uuid,
            name: model.name,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = team::Entity::find()
            .filter(team::Column::Uuid.eq(id))
            .one(db)
            .await?;
        Ok(record.map(Self::from_model))
    }

    pub async fn create<C: ConnectionTrait>(db: &C, name: &str) -> Result<Self, DbErr> {
        let now = Utc::now();
        let active = team::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let model = active.insert(db).await?;
        Ok(Self::from_model(model))
    }

    pub async fn create_with_members<C: ConnectionTrait>(
        db: &C,
        data: &CreateTeam,
    ) -> Result<Self, TeamError> {
        let team = Self::create(db, &data.name).await?;
        Self::add_members(db, team.id, &data.member_ids).await?;
        Ok(team)
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        data: &UpdateTeam,
    ) -> Result<Self, TeamError> {
        let record = team::Entity::find()
            .filter(team::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(TeamError::TeamNotFound)?;

        let mut active: team::ActiveModel = record.into();
        if let Some(name) = data.name.clone() {
            active.name = Set(name);
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(db).await?;

        if let Some(member_ids) = &data.member_ids {
            Self::set_members(db, updated.uuid, member_ids).await?;
        }
        Ok(Self::from_model(updated))
    }

    /// Replace the member set wholesale.
    pub async fn set_members<C: ConnectionTrait>(
        db: &C,
        team_id: Uuid,
        member_ids: &[Uuid],
    ) -> Result<(), TeamError> {
        let team_row_id = ids::team_id_by_uuid(db, team_id)
            .await?
            .ok_or(TeamError::TeamNotFound)?;

        team_member::Entity::delete_many()
            .filter(team_member::Column::TeamId.eq(team_row_id))
            .exec(db)
            .await?;
        Self::add_members(db, team_id, member_ids).await
    }

    /// Add members, skipping ones already present.
    pub async fn add_members<C: ConnectionTrait>(
        db: &C,
        team_id: Uuid,
        member_ids: &[Uuid],
    ) -> Result<(), TeamError> {
        let team_row_id = ids::team_id_by_uuid(db, team_id)
            .await?
            .ok_or(TeamError::TeamNotFound)?;

        let mut inserts = Vec::new();
        for &worker_id in member_ids {
            let worker_row_id = ids::worker_id_by_uuid(db, worker_id)
                .await?
                .ok_or(TeamError::WorkerNotFound)?;
            inserts.push(team_member::ActiveModel {
                uuid: Set(Uuid::new_v4()),
                team_id: Set(team_row_id),
                worker_id: Set(worker_row_id),
                created_at: Set(Utc::now()),
                ..Default::default()
            });
        }

        if !inserts.is_empty() {
            team_member::Entity::insert_many(inserts)
                .on_conflict(
                    sea_orm::sea_query::OnConflict::columns([
                        team_member::Column::TeamId,
                        team_member::Column::WorkerId,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec_without_returning(db)
                .await?;
        }

        Ok(())
    }

    pub async fn remove_member<C: ConnectionTrait>(
        db: &C,
        team_id: Uuid,
        worker_id: Uuid,
    ) -> Result<(), TeamError> {
        let team_row_id = ids::team_id_by_uuid(db, team_id)
            .await?
            .ok_or(TeamError::TeamNotFound)?;
        let worker_row_id = ids::worker_id_by_uuid(db, worker_id)
            .await?
            .ok_or(TeamError::WorkerNotFound)?;

        team_member::Entity::delete_many()
            .filter(team_member::Column::TeamId.eq(team_row_id))
            .filter(team_member::Column::WorkerId.eq(worker_row_id))
            .exec(db)
            .await?;
        Ok(())
    }

    pub async fn is_member<C: ConnectionTrait>(
        db: &C,
        team_id: Uuid,
        worker_id: Uuid,
    ) -> Result<bool, DbErr> {
        let team_row_id = match ids::team_id_by_uuid(db, team_id).await? {
            Some(id) => id,
            None => return Ok(false),
        };
        let worker_row_id = match ids::worker_id_by_uuid(db, worker_id).await? {
            Some(id) => id,
            None => return Ok(false),
        };

        let exists = team_member::Entity::find()
            .filter(team_member::Column::TeamId.eq(team_row_id))
            .filter(team_member::Column::WorkerId.eq(worker_row_id))
            .one(db)
            .await?
            .is_some();
        Ok(exists)
    }

    pub async fn members<C: ConnectionTrait>(
        db: &C,
        team_id: Uuid,
    ) -> Result<Vec<Worker>, DbErr> {
        let team_row_id = match ids::team_id_by_uuid(db, team_id).await? {
            Some(id) => id,
            None => return Ok(Vec::new()),
        };

        let links = team_member::Entity::find()
            .filter(team_member::Column::TeamId.eq(team_row_id))
            .order_by_asc(team_member::Column::CreatedAt)
            .all(db)
            .await?;

        let mut members = Vec::with_capacity(links.len());
        for link in links {
            if let Some(worker_id) = ids::worker_uuid_by_id(db, link.worker_id).await? {
                if let Some(worker) = Worker::find_by_id(db, worker_id).await? {
                    members.push(worker);
                }
            }
        }
        Ok(members)
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

    async fn create_worker(db: &sea_orm::DatabaseConnection, username: &str) -> Worker {
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

    #[tokio::test]
    async fn membership_add_remove_roundtrip() {
        let db = setup_db().await;
        let worker = create_worker(&db, "dana").await;
        let team = Team::create(&db, "Development Team").await.unwrap();

        assert!(!Team::is_member(&db, team.id, worker.id).await.unwrap());

        Team::add_members(&db, team.id, &[worker.id]).await.unwrap();
        assert!(Team::is_member(&db, team.id, worker.id).await.unwrap());

        // Adding again is a no-op thanks to the unique pair index.
        Team::add_members(&db, team.id, &[worker.id]).await.unwrap();
        assert_eq!(Team::members(&db, team.id).await.unwrap().len(), 1);

        Team::remove_member(&db, team.id, worker.id).await.unwrap();
        assert!(!Team::is_member(&db, team.id, worker.id).await.unwrap());
    }

    #[tokio::test]
    async fn set_members_replaces_the_member_set() {
        let db = setup_db().await;
        let first = create_worker(&db, "erin").await;
        let second = create_worker(&db, "frank").await;
        let team = Team::create_with_members(
            &db,
            &CreateTeam {
                name: "Ops".to_string(),
                member_ids: vec![first.id],
            },
        )
        .await
        .unwrap();

        Team::set_members(&db, team.id, &[second.id]).await.unwrap();
        let members = Team::members(&db, team.id).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].id, second.id);
    }
}
