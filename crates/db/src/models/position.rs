use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::entities::position;
use crate::models::Page;

const PAGE_SIZE: u64 = 10;

#[derive(Debug, Error)]
pub enum PositionError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Position not found")]
    PositionNotFound,
    #[error("A position with this name already exists")]
    DuplicateName,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Position {
    pub id: Uuid,
    pub name: String,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, TS)]
pub struct CreatePosition {
    pub name: String,
}

#[derive(Debug, Deserialize, TS)]
pub struct UpdatePosition {
    pub name: Option<String>,
}

impl CreatePosition {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Position name must not be empty".to_string());
        }
        Ok(())
    }
}

impl Position {
    fn from_model(model: position::Model) -> Self {
        Self {
            id: model.uuid,
            name: model.name,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = position::Entity::find()
            .filter(position::Column::Uuid.eq(id))
            .one(db)
            .await?;
        Ok(record.map(Self::from_model))
    }

    pub async fn find_page<C: ConnectionTrait>(db: &C, page: u64) -> Result<Page<Self>, DbErr> {
        let paginator = position::Entity::find()
            .order_by_asc(position::Column::Name)
            .paginate(db, PAGE_SIZE);
        let totals = paginator.num_items_and_pages().await?;
        let page_index = page.saturating_sub(1);
        let records = paginator.fetch_page(page_index).await?;
        Ok(Page {
            items: records.into_iter().map(Self::from_model).collect(),
            page: page_index + 1,
            per_page: PAGE_SIZE,
            total_items: totals.number_of_items,
            total_pages: totals.number_of_pages,
        })
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreatePosition,
    ) -> Result<Self, PositionError> {
        let now = Utc::now();
        let active = position::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            name: Set(data.name.clone()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let model = active.insert(db).await.map_err(map_unique_violation)?;
        Ok(Self::from_model(model))
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        data: &UpdatePosition,
    ) -> Result<Self, PositionError> {
        let record = position::Entity::find()
            .filter(position::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(PositionError::PositionNotFound)?;

        let mut active: position::ActiveModel = record.into();
        if let Some(name) = data.name.clone() {
            active.name = Set(name);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(db).await.map_err(map_unique_violation)?;
        Ok(Self::from_model(updated))
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let result = position::Entity::delete_many()
            .filter(position::Column::Uuid.eq(id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}

fn map_unique_violation(err: DbErr) -> PositionError {
    if matches!(err.sql_err(), Some(sea_orm::SqlErr::UniqueConstraintViolation(_))) {
        PositionError::DuplicateName
    } else {
        PositionError::Database(err)
    }
}
