use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::entities::{attachment, task_attachment};
use crate::models::ids;

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Attachment {
    pub id: Uuid,
    pub name: String,
    pub file_path: String,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, TS)]
pub struct CreateAttachment {
    pub name: String,
    pub file_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct TaskAttachment {
    pub id: Uuid,
    pub task_id: Uuid,
    pub attachment_id: Uuid,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
}

impl Attachment {
    fn from_model(model: attachment::Model) -> Self {
        Self {
            id: model.uuid,
            name: model.name,
            file_path: model.file_path,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateAttachment,
    ) -> Result<Self, DbErr> {
        let now = Utc::now();
        let active = attachment::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            name: Set(data.name.clone()),
            file_path: Set(data.file_path.clone()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let model = active.insert(db).await?;
        Ok(Self::from_model(model))
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = attachment::Entity::find()
            .filter(attachment::Column::Uuid.eq(id))
            .one(db)
            .await?;
        Ok(record.map(Self::from_model))
    }

    pub async fn find_by_task_id<C: ConnectionTrait>(
        db: &C,
        task_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let task_row_id = match ids::task_id_by_uuid(db, task_id).await? {
            Some(id) => id,
            None => return Ok(Vec::new()),
        };

        let links = task_attachment::Entity::find()
            .filter(task_attachment::Column::TaskId.eq(task_row_id))
            .order_by_asc(task_attachment::Column::CreatedAt)
            .all(db)
            .await?;

        let mut attachments = Vec::with_capacity(links.len());
        for link in links {
            if let Some(model) = attachment::Entity::find_by_id(link.attachment_id)
                .one(db)
                .await?
            {
                attachments.push(Self::from_model(model));
            }
        }
        Ok(attachments)
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<(), DbErr> {
        attachment::Entity::delete_many()
            .filter(attachment::Column::Uuid.eq(id))
            .exec(db)
            .await?;
        Ok(())
    }

    /// Attachments no longer linked to any task.
    pub async fn find_orphaned<C: ConnectionTrait>(db: &C) -> Result<Vec<Self>, DbErr> {
        let linked_ids: Vec<i64> = task_attachment::Entity::find()
            .select_only()
            .column(task_attachment::Column::AttachmentId)
            .into_tuple()
            .all(db)
            .await?;

        let records = if linked_ids.is_empty() {
            attachment::Entity::find().all(db).await?
        } else {
            attachment::Entity::find()
                .filter(attachment::Column::Id.is_not_in(linked_ids))
                .all(db)
                .await?
        };

        Ok(records.into_iter().map(Self::from_model).collect())
    }
}

impl TaskAttachment {
    /// Link attachments to a task, skipping duplicates.
    pub async fn associate_many_dedup<C: ConnectionTrait>(
        db: &C,
        task_id: Uuid,
        attachment_ids: &[Uuid],
    ) -> Result<(), DbErr> {
        let task_row_id = ids::task_id_by_uuid(db, task_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Task not found".to_string()))?;

        let mut inserts = Vec::new();
        for &attachment_id in attachment_ids {
            let attachment_row_id = ids::attachment_id_by_uuid(db, attachment_id)
                .await?
                .ok_or(DbErr::RecordNotFound("Attachment not found".to_string()))?;
            inserts.push(task_attachment::ActiveModel {
                uuid: Set(Uuid::new_v4()),
                task_id: Set(task_row_id),
                attachment_id: Set(attachment_row_id),
                created_at: Set(Utc::now()),
                ..Default::default()
            });
        }

        if !inserts.is_empty() {
            task_attachment::Entity::insert_many(inserts)
                .on_conflict(
                    sea_orm::sea_query::OnConflict::columns([
                        task_attachment::Column::TaskId,
                        task_attachment::Column::AttachmentId,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec_without_returning(db)
                .await?;
        }

        Ok(())
    }

    pub async fn delete_by_task_id<C: ConnectionTrait>(db: &C, task_id: Uuid) -> Result<(), DbErr> {
        let task_row_id = match ids::task_id_by_uuid(db, task_id).await? {
            Some(id) => id,
            None => return Ok(()),
        };

        task_attachment::Entity::delete_many()
            .filter(task_attachment::Column::TaskId.eq(task_row_id))
            .exec(db)
            .await?;
        Ok(())
    }
}
