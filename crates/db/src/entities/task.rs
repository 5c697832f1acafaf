use sea_orm::entity::prelude::*;

use crate::types::TaskPriority;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tasks")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub uuid: Uuid,
    pub board_id: i64,
    pub task_type_id: i64,
    pub name: String,
    pub description: String,
    pub deadline: Date,
    pub is_completed: bool,
    pub priority: TaskPriority,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
