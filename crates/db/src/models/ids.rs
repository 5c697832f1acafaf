use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QuerySelect};
use uuid::Uuid;

use crate::entities::{attachment, board, position, project, task, task_type, team, worker};

pub async fn position_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    position::Entity::find()
        .select_only()
        .column(position::Column::Id)
        .filter(position::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn position_uuid_by_id<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<Uuid>, DbErr> {
    position::Entity::find()
        .select_only()
        .column(position::Column::Uuid)
        .filter(position::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

pub async fn task_type_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    task_type::Entity::find()
        .select_only()
        .column(task_type::Column::Id)
        .filter(task_type::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn task_type_uuid_by_id<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<Uuid>, DbErr> {
    task_type::Entity::find()
        .select_only()
        .column(task_type::Column::Uuid)
        .filter(task_type::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

pub async fn worker_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    worker::Entity::find()
        .select_only()
        .column(worker::Column::Id)
        .filter(worker::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn worker_uuid_by_id<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<Uuid>, DbErr> {
    worker::Entity::find()
        .select_only()
        .column(worker::Column::Uuid)
        .filter(worker::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

pub async fn team_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    team::Entity::find()
        .select_only()
        .column(team::Column::Id)
        .filter(team::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn team_uuid_by_id<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<Uuid>, DbErr> {
    team::Entity::find()
        .select_only()
        .column(team::Column::Uuid)
        .filter(team::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

pub async fn project_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    project::Entity::find()
        .select_only()
        .column(project::Column::Id)
        .filter(project::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn project_uuid_by_id<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<Uuid>, DbErr> {
    project::Entity::find()
        .select_only()
        .column(project::Column::Uuid)
        .filter(project::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

pub async fn board_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    board::Entity::find()
        .select_only()
        .column(board::Column::Id)
        .filter(board::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn board_uuid_by_id<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<Uuid>, DbErr> {
    board::Entity::find()
        .select_only()
        .column(board::Column::Uuid)
        .filter(board::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

pub async fn task_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    task::Entity::find()
        .select_only()
        .column(task::Column::Id)
        .filter(task::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn task_uuid_by_id<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<Uuid>, DbErr> {
    task::Entity::find()
        .select_only()
        .column(task::Column::Uuid)
        .filter(task::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

pub async fn attachment_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    attachment::Entity::find()
        .select_only()
        .column(attachment::Column::Id)
        .filter(attachment::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn attachment_uuid_by_id<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<Uuid>, DbErr> {
    attachment::Entity::find()
        .select_only()
        .column(attachment::Column::Uuid)
        .filter(attachment::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use crate::models::{
        project::{CreateProject, Project},
        worker::{CreateWorker, Worker},
    };

    use super::*;

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    #[tokio::test]
    async fn ids_roundtrip_and_uuid_resolution() {
        let db = setup_db().await;

        let worker = Worker::create(
            &db,
            &CreateWorker {
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
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

        let worker_row_id = worker_id_by_uuid(&db, worker.id)
            .await
            .unwrap()
            .expect("worker row id");
        assert_eq!(
            worker_uuid_by_id(&db, worker_row_id).await.unwrap(),
            Some(worker.id)
        );

        let project_id = Uuid::new_v4();
        let project = Project::create(
            &db,
            &CreateProject {
                name: "Test project".to_string(),
                description: "A project".to_string(),
                deadline: chrono::Utc::now().date_naive(),
            },
            worker.id,
            None,
            project_id,
        )
        .await
        .unwrap();
        assert_eq!(project.id, project_id);
        assert_eq!(project.owner_id, worker.id);

        let project_row_id = project_id_by_uuid(&db, project_id)
            .await
            .unwrap()
            .expect("project row id");
        assert_eq!(
            project_uuid_by_id(&db, project_row_id).await.unwrap(),
            Some(project_id)
        );
    }
}
