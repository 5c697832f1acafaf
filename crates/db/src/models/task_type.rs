use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::entities::task_type;
use crate::models::Page;

const PAGE_SIZE: u64 = 10;

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct TaskType {
    pub id: Uuid,
    pub name: String,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, TS)]
pub struct CreateTaskType {
    pub name: String,
}

#[derive(Debug, Deserialize, TS)]
pub struct UpdateTaskType {
    pub name: Option<String>,
}

impl CreateTaskType {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Task type name must not be empty".to_string());
        }
        Ok(())
    }
}

impl TaskType {
    fn from_model(model: task_type::Model) -> Self {
        Self {
            id: model.uuid,
            name: model.name,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = task_type::Entity::find()
            .filter(task_type::Column::Uuid.eq(id))
            .one(db)
            .await?;
        Ok(record.map(Self::from_model))
    }

    pub async fn find_page<C: ConnectionTrait>(db: &C, page: u64) -> Result<Page<Self>, DbErr> {
        let paginator = task_type::Entity::find()
            .order_by_asc(task_type::Column::Id)
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
        data: &CreateTaskType,
    ) -> Result<Self, DbErr> {
        let now = Utc::now();
        let active = task_type::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            name: Set(data.name.clone()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let model = active.insert(db).await?;
        Ok(Self::from_model(model))
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        data: &UpdateTaskType,
    ) -> Result<Self, DbErr> {
        let record = task_type::Entity::find()
            .filter(task_type::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Task type not found".to_string()))?;

        let mut active: task_type::ActiveModel = record.into();
        if let Some(name) = data.name.clone() {
            active.name = Set(name);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(db).await?;
        Ok(Self::from_model(updated))
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let result = task_type::Entity::delete_many()
            .filter(task_type::Column::Uuid.eq(id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}
