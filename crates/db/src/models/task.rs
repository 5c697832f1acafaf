use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::entities::{task, task_assignee};
use crate::models::{Page, attachment::Attachment, ids, worker::Worker};
pub use crate::types::TaskPriority;

const PAGE_SIZE: u64 = 10;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Task not found")]
    TaskNotFound,
    #[error("Board not found")]
    BoardNotFound,
    #[error("Task type not found")]
    TaskTypeNotFound,
    #[error("Worker not found")]
    WorkerNotFound,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Task {
    pub id: Uuid,
    pub board_id: Uuid,
    pub task_type_id: Uuid,
    pub name: String,
    pub description: String,
    pub deadline: NaiveDate,
    pub is_completed: bool,
    pub priority: TaskPriority,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct TaskWithDetails {
    #[serde(flatten)]
    #[ts(flatten)]
    pub task: Task,
    pub assignees: Vec<Worker>,
    pub attachments: Vec<Attachment>,
}

impl std::ops::Deref for TaskWithDetails {
    type Target = Task;
    fn deref(&self) -> &Self::Target {
        &self.task
    }
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateTask {
    pub name: String,
    pub description: String,
    pub deadline: NaiveDate,
    #[serde(default)]
    pub is_completed: bool,
    pub priority: Option<TaskPriority>,
    pub task_type_id: Uuid,
    #[serde(default)]
    pub assignee_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, TS)]
pub struct UpdateTask {
    pub name: Option<String>,
    pub description: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub is_completed: Option<bool>,
    pub priority: Option<TaskPriority>,
    pub task_type_id: Option<Uuid>,
    pub assignee_ids: Option<Vec<Uuid>>,
}

impl CreateTask {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Task name must not be empty".to_string());
        }
        if self.deadline < Utc::now().date_naive() {
            return Err("Deadline cannot be in the past".to_string());
        }
        Ok(())
    }
}

impl UpdateTask {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err("Task name must not be empty".to_string());
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

impl Task {
    async fn from_model<C: ConnectionTrait>(db: &C, model: task::Model) -> Result<Self, DbErr> {
        let board_id = ids::board_uuid_by_id(db, model.board_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Board not found".to_string()))?;
        let task_type_id = ids::task_type_uuid_by_id(db, model.task_type_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Task type not found".to_string()))?;
        Ok(Self {
            id: model.uuid,
            board_id,
            task_type_id,
            name: model.name,
            description: model.description,
            deadline: model.deadline,
            is_completed: model.is_completed,
            priority: model.priority,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }

    pub async fn count<C: ConnectionTrait>(db: &C) -> Result<i64, DbErr> {
        let count = task::Entity::find().count(db).await?;
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?;
        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    pub async fn find_page<C: ConnectionTrait>(db: &C, page: u64) -> Result<Page<Self>, DbErr> {
        let paginator = task::Entity::find()
            .order_by_desc(task::Column::Id)
            .paginate(db, PAGE_SIZE);
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

    pub async fn find_by_board_id<C: ConnectionTrait>(
        db: &C,
        board_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let board_row_id = match ids::board_id_by_uuid(db, board_id).await? {
            Some(id) => id,
            None => return Ok(Vec::new()),
        };

        let records = task::Entity::find()
            .filter(task::Column::BoardId.eq(board_row_id))
            .order_by_asc(task::Column::Id)
            .all(db)
            .await?;

        let mut tasks = Vec::with_capacity(records.len());
        for model in records {
            tasks.push(Self::from_model(db, model).await?);
        }
        Ok(tasks)
    }

    /// Tasks assigned to a worker, each paired with its project's uuid so the
    /// caller can group them the way the worker detail page does.
    pub async fn find_by_assignee<C: ConnectionTrait>(
        db: &C,
        worker_id: Uuid,
    ) -> Result<Vec<(Uuid, Self)>, DbErr> {
        let worker_row_id = match ids::worker_id_by_uuid(db, worker_id).await? {
            Some(id) => id,
            None => return Ok(Vec::new()),
        };

        let links = task_assignee::Entity::find()
            .filter(task_assignee::Column::WorkerId.eq(worker_row_id))
            .order_by_asc(task_assignee::Column::Id)
            .all(db)
            .await?;

        let mut tasks = Vec::with_capacity(links.len());
        for link in links {
            let Some(model) = task::Entity::find_by_id(link.task_id).one(db).await? else {
                continue;
            };
            let task = Self::from_model(db, model).await?;
            let Some(board) = super::board::Board::find_by_id(db, task.board_id).await? else {
                continue;
            };
            tasks.push((board.project_id, task));
        }
        Ok(tasks)
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        board_id: Uuid,
        data: &CreateTask,
        task_id: Uuid,
    ) -> Result<Self, TaskError> {
        let board_row_id = ids::board_id_by_uuid(db, board_id)
            .await?
            .ok_or(TaskError::BoardNotFound)?;
        let task_type_row_id = ids::task_type_id_by_uuid(db, data.task_type_id)
            .await?
            .ok_or(TaskError::TaskTypeNotFound)?;

        let now = Utc::now();
        let active = task::ActiveModel {
            uuid: Set(task_id),
            board_id: Set(board_row_id),
            task_type_id: Set(task_type_row_id),
            name: Set(data.name.clone()),
            description: Set(data.description.clone()),
            deadline: Set(data.deadline),
            is_completed: Set(data.is_completed),
            priority: Set(data.priority.unwrap_or_default()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active.insert(db).await?;
        let task = Self::from_model(db, model).await?;
        Self::set_assignees(db, task.id, &data.assignee_ids).await?;
        Ok(task)
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        data: &UpdateTask,
    ) -> Result<Self, TaskError> {
        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(TaskError::TaskNotFound)?;

        let mut active: task::ActiveModel = record.into();
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
        if let Some(priority) = data.priority {
            active.priority = Set(priority);
        }
        if let Some(task_type_id) = data.task_type_id {
            let task_type_row_id = ids::task_type_id_by_uuid(db, task_type_id)
                .await?
                .ok_or(TaskError::TaskTypeNotFound)?;
            active.task_type_id = Set(task_type_row_id);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(db).await?;
        let task = Self::from_model(db, updated).await?;

        if let Some(assignee_ids) = &data.assignee_ids {
            Self::set_assignees(db, task.id, assignee_ids).await?;
        }
        Ok(task)
    }

    pub async fn change_board<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        board_id: Uuid,
    ) -> Result<Self, TaskError> {
        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(TaskError::TaskNotFound)?;
        let board_row_id = ids::board_id_by_uuid(db, board_id)
            .await?
            .ok_or(TaskError::BoardNotFound)?;

        let mut active: task::ActiveModel = record.into();
        active.board_id = Set(board_row_id);
        active.updated_at = Set(Utc::now());
        let updated = active.update(db).await?;
        Self::from_model(db, updated).await.map_err(TaskError::from)
    }

    /// Replace the assignee set wholesale.
    pub async fn set_assignees<C: ConnectionTrait>(
        db: &C,
        task_id: Uuid,
        worker_ids: &[Uuid],
    ) -> Result<(), TaskError> {
        let task_row_id = ids::task_id_by_uuid(db, task_id)
            .await?
            .ok_or(TaskError::TaskNotFound)?;

        task_assignee::Entity::delete_many()
            .filter(task_assignee::Column::TaskId.eq(task_row_id))
            .exec(db)
            .await?;

        let mut inserts = Vec::new();
        for &worker_id in worker_ids {
            let worker_row_id = ids::worker_id_by_uuid(db, worker_id)
                .await?
                .ok_or(TaskError::WorkerNotFound)?;
            inserts.push(task_assignee::ActiveModel {
                uuid: Set(Uuid::new_v4()),
                task_id: Set(task_row_id),
                worker_id: Set(worker_row_id),
                created_at: Set(Utc::now()),
                ..Default::default()
            });
        }

        if !inserts.is_empty() {
            task_assignee::Entity::insert_many(inserts)
                .on_conflict(
                    sea_orm::sea_query::OnConflict::columns([
                        task_assignee::Column::TaskId,
                        task_assignee::Column::WorkerId,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec_without_returning(db)
                .await?;
        }
        Ok(())
    }

    pub async fn assignees<C: ConnectionTrait>(
        db: &C,
        task_id: Uuid,
    ) -> Result<Vec<Worker>, DbErr> {
        let task_row_id = match ids::task_id_by_uuid(db, task_id).await? {
            Some(id) => id,
            None => return Ok(Vec::new()),
        };

        let links = task_assignee::Entity::find()
            .filter(task_assignee::Column::TaskId.eq(task_row_id))
            .order_by_asc(task_assignee::Column::Id)
            .all(db)
            .await?;

        let mut assignees = Vec::with_capacity(links.len());
        for link in links {
            if let Some(worker_id) = ids::worker_uuid_by_id(db, link.worker_id).await? {
                if let Some(worker) = Worker::find_by_id(db, worker_id).await? {
                    assignees.push(worker);
                }
            }
        }
        Ok(assignees)
    }

    pub async fn with_details<C: ConnectionTrait>(
        self,
        db: &C,
    ) -> Result<TaskWithDetails, DbErr> {
        let assignees = Self::assignees(db, self.id).await?;
        let attachments = Attachment::find_by_task_id(db, self.id).await?;
        Ok(TaskWithDetails {
            task: self,
            assignees,
            attachments,
        })
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let result = task::Entity::delete_many()
            .filter(task::Column::Uuid.eq(id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use crate::models::{
        board::{Board, CreateBoard},
        project::{CreateProject, Project},
        task_type::{CreateTaskType, TaskType},
        worker::{CreateWorker, Worker},
    };

    use super::*;

    struct Fixture {
        db: sea_orm::DatabaseConnection,
        worker: Worker,
        board: Board,
        task_type: TaskType,
    }

    async fn setup() -> Fixture {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();

        let worker = Worker::create(
            &db,
            &CreateWorker {
                username: "worker1".to_string(),
                email: "worker1@example.com".to_string(),
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

        let project = Project::create(
            &db,
            &CreateProject {
                name: "Test Project".to_string(),
                description: "desc".to_string(),
                deadline: Utc::now().date_naive(),
            },
            worker.id,
            None,
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let board = Board::create(
            &db,
            project.id,
            &CreateBoard {
                name: "Test Board".to_string(),
                color: Some("#FFFFFF".to_string()),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let task_type = TaskType::create(
            &db,
            &CreateTaskType {
                name: "Bug".to_string(),
            },
        )
        .await
        .unwrap();

        Fixture {
            db,
            worker,
            board,
            task_type,
        }
    }

    fn create_data(fixture: &Fixture, name: &str) -> CreateTask {
        CreateTask {
            name: name.to_string(),
            description: "desc".to_string(),
            deadline: Utc::now().date_naive(),
            is_completed: false,
            priority: None,
            task_type_id: fixture.task_type.id,
            assignee_ids: vec![fixture.worker.id],
        }
    }

    #[tokio::test]
    async fn create_assign_and_resolve_roundtrip() {
        let fixture = setup().await;
        let data = create_data(&fixture, "Test Task");

        let task = Task::create(&fixture.db, fixture.board.id, &data, Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(task.board_id, fixture.board.id);
        assert_eq!(task.task_type_id, fixture.task_type.id);
        assert_eq!(task.priority, TaskPriority::High);

        let assignees = Task::assignees(&fixture.db, task.id).await.unwrap();
        assert_eq!(assignees.len(), 1);
        assert_eq!(assignees[0].id, fixture.worker.id);

        let by_assignee = Task::find_by_assignee(&fixture.db, fixture.worker.id)
            .await
            .unwrap();
        assert_eq!(by_assignee.len(), 1);
        assert_eq!(by_assignee[0].1.id, task.id);
    }

    #[tokio::test]
    async fn past_deadline_fails_validation() {
        let fixture = setup().await;
        let mut data = create_data(&fixture, "Late Task");
        data.deadline = Utc::now().date_naive() - chrono::Duration::days(1);
        assert!(data.validate().is_err());

        data.deadline = Utc::now().date_naive() + chrono::Duration::days(1);
        assert!(data.validate().is_ok());
    }

    #[tokio::test]
    async fn change_board_moves_the_task() {
        let fixture = setup().await;
        let task = Task::create(
            &fixture.db,
            fixture.board.id,
            &create_data(&fixture, "Movable"),
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let project_id = fixture.board.project_id;
        let other_board = Board::create(
            &fixture.db,
            project_id,
            &CreateBoard {
                name: "Done".to_string(),
                color: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let moved = Task::change_board(&fixture.db, task.id, other_board.id)
            .await
            .unwrap();
        assert_eq!(moved.board_id, other_board.id);

        let on_old = Task::find_by_board_id(&fixture.db, fixture.board.id)
            .await
            .unwrap();
        assert!(on_old.is_empty());
    }
}
