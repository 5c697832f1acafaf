use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::entities::board;
use crate::models::ids;

#[derive(Debug, Error)]
pub enum BoardError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Board not found")]
    BoardNotFound,
    #[error("Project not found")]
    ProjectNotFound,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Board {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub color: Option<String>,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateBoard {
    pub name: String,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize, TS)]
pub struct UpdateBoard {
    pub name: Option<String>,
    pub color: Option<String>,
}

impl CreateBoard {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Board name must not be empty".to_string());
        }
        Ok(())
    }
}

impl Board {
    async fn from_model<C: ConnectionTrait>(db: &C, model: board::Model) -> Result<Self, DbErr> {
        let project_id = ids::project_uuid_by_id(db, model.project_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Project not found".to_string()))?;
        Ok(Self {
            id: model.uuid,
            project_id,
            name: model.name,
            color: model.color,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = board::Entity::find()
            .filter(board::Column::Uuid.eq(id))
            .one(db)
            .await?;
        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    pub async fn find_by_project_id<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let project_row_id = match ids::project_id_by_uuid(db, project_id).await? {
            Some(id) => id,
            None => return Ok(Vec::new()),
        };

        let records = board::Entity::find()
            .filter(board::Column::ProjectId.eq(project_row_id))
            .order_by_asc(board::Column::Id)
            .all(db)
            .await?;

        let mut boards = Vec::with_capacity(records.len());
        for model in records {
            boards.push(Self::from_model(db, model).await?);
        }
        Ok(boards)
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
        data: &CreateBoard,
        board_id: Uuid,
    ) -> Result<Self, BoardError> {
        let project_row_id = ids::project_id_by_uuid(db, project_id)
            .await?
            .ok_or(BoardError::ProjectNotFound)?;

        let now = Utc::now();
        let active = board::ActiveModel {
            uuid: Set(board_id),
            project_id: Set(project_row_id),
            name: Set(data.name.clone()),
            color: Set(data.color.clone()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let model = active.insert(db).await?;
        Self::from_model(db, model).await.map_err(BoardError::from)
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        data: &UpdateBoard,
    ) -> Result<Self, BoardError> {
        let record = board::Entity::find()
            .filter(board::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(BoardError::BoardNotFound)?;

        let mut active: board::ActiveModel = record.into();
        if let Some(name) = data.name.clone() {
            active.name = Set(name);
        }
        if data.color.is_some() {
            active.color = Set(data.color.clone());
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(db).await?;
        Self::from_model(db, updated).await.map_err(BoardError::from)
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let result = board::Entity::delete_many()
            .filter(board::Column::Uuid.eq(id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}
