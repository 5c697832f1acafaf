use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DatabaseBackend;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Positions::Table)
                    .col(pk_id_col(manager, Positions::Id))
                    .col(uuid_col(Positions::Uuid))
                    .col(ColumnDef::new(Positions::Name).string().not_null())
                    .col(timestamp_col(Positions::CreatedAt))
                    .col(timestamp_col(Positions::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_positions_uuid")
                    .table(Positions::Table)
                    .col(Positions::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_positions_name")
                    .table(Positions::Table)
                    .col(Positions::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(TaskTypes::Table)
                    .col(pk_id_col(manager, TaskTypes::Id))
                    .col(uuid_col(TaskTypes::Uuid))
                    .col(ColumnDef::new(TaskTypes::Name).string().not_null())
                    .col(timestamp_col(TaskTypes::CreatedAt))
                    .col(timestamp_col(TaskTypes::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_task_types_uuid")
                    .table(TaskTypes::Table)
                    .col(TaskTypes::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Workers::Table)
                    .col(pk_id_col(manager, Workers::Id))
                    .col(uuid_col(Workers::Uuid))
                    .col(ColumnDef::new(Workers::Username).string().not_null())
                    .col(ColumnDef::new(Workers::Email).string().not_null())
                    .col(ColumnDef::new(Workers::PasswordHash).string().not_null())
                    .col(ColumnDef::new(Workers::FirstName).string())
                    .col(ColumnDef::new(Workers::LastName).string())
                    .col(fk_id_nullable_col(manager, Workers::PositionId))
                    .col(ColumnDef::new(Workers::AvatarPath).string())
                    .col(timestamp_col(Workers::CreatedAt))
                    .col(timestamp_col(Workers::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_workers_position_id")
                            .from(Workers::Table, Workers::PositionId)
                            .to(Positions::Table, Positions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_workers_uuid")
                    .table(Workers::Table)
                    .col(Workers::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_workers_username")
                    .table(Workers::Table)
                    .col(Workers::Username)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Teams::Table)
                    .col(pk_id_col(manager, Teams::Id))
                    .col(uuid_col(Teams::Uuid))
                    .col(ColumnDef::new(Teams::Name).string().not_null())
                    .col(timestamp_col(Teams::CreatedAt))
                    .col(timestamp_col(Teams::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_teams_uuid")
                    .table(Teams::Table)
                    .col(Teams::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(TeamMembers::Table)
                    .col(pk_id_col(manager, TeamMembers::Id))
                    .col(uuid_col(TeamMembers::Uuid))
                    .col(fk_id_col(manager, TeamMembers::TeamId))
                    .col(fk_id_col(manager, TeamMembers::WorkerId))
                    .col(timestamp_col(TeamMembers::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_team_members_team_id")
                            .from(TeamMembers::Table, TeamMembers::TeamId)
                            .to(Teams::Table, Teams::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_team_members_worker_id")
                            .from(TeamMembers::Table, TeamMembers::WorkerId)
                            .to(Workers::Table, Workers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_team_members_uuid")
                    .table(TeamMembers::Table)
                    .col(TeamMembers::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_team_members_team_worker")
                    .table(TeamMembers::Table)
                    .col(TeamMembers::TeamId)
                    .col(TeamMembers::WorkerId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Projects::Table)
                    .col(pk_id_col(manager, Projects::Id))
                    .col(uuid_col(Projects::Uuid))
                    .col(ColumnDef::new(Projects::Name).string().not_null())
                    .col(ColumnDef::new(Projects::Description).text().not_null())
                    .col(ColumnDef::new(Projects::Deadline).date().not_null())
                    .col(
                        ColumnDef::new(Projects::IsCompleted)
                            .boolean()
                            .not_null()
                            .default(Expr::val(false)),
                    )
                    .col(fk_id_nullable_col(manager, Projects::TeamId))
                    .col(fk_id_col(manager, Projects::OwnerId))
                    .col(timestamp_col(Projects::CreatedAt))
                    .col(timestamp_col(Projects::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_projects_team_id")
                            .from(Projects::Table, Projects::TeamId)
                            .to(Teams::Table, Teams::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_projects_owner_id")
                            .from(Projects::Table, Projects::OwnerId)
                            .to(Workers::Table, Workers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_projects_uuid")
                    .table(Projects::Table)
                    .col(Projects::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_projects_name")
                    .table(Projects::Table)
                    .col(Projects::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Boards::Table)
                    .col(pk_id_col(manager, Boards::Id))
                    .col(uuid_col(Boards::Uuid))
                    .col(fk_id_col(manager, Boards::ProjectId))
                    .col(ColumnDef::new(Boards::Name).string().not_null())
                    .col(ColumnDef::new(Boards::Color).string_len(7))
                    .col(timestamp_col(Boards::CreatedAt))
                    .col(timestamp_col(Boards::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_boards_project_id")
                            .from(Boards::Table, Boards::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_boards_uuid")
                    .table(Boards::Table)
                    .col(Boards::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Tasks::Table)
                    .col(pk_id_col(manager, Tasks::Id))
                    .col(uuid_col(Tasks::Uuid))
                    .col(fk_id_col(manager, Tasks::BoardId))
                    .col(fk_id_col(manager, Tasks::TaskTypeId))
                    .col(ColumnDef::new(Tasks::Name).string().not_null())
                    .col(ColumnDef::new(Tasks::Description).text().not_null())
                    .col(ColumnDef::new(Tasks::Deadline).date().not_null())
                    .col(
                        ColumnDef::new(Tasks::IsCompleted)
                            .boolean()
                            .not_null()
                            .default(Expr::val(false)),
                    )
                    .col(
                        ColumnDef::new(Tasks::Priority)
                            .string_len(32)
                            .not_null()
                            .default(Expr::val("high")),
                    )
                    .col(timestamp_col(Tasks::CreatedAt))
                    .col(timestamp_col(Tasks::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tasks_board_id")
                            .from(Tasks::Table, Tasks::BoardId)
                            .to(Boards::Table, Boards::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tasks_task_type_id")
                            .from(Tasks::Table, Tasks::TaskTypeId)
                            .to(TaskTypes::Table, TaskTypes::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_tasks_uuid")
                    .table(Tasks::Table)
                    .col(Tasks::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_tasks_board_id")
                    .table(Tasks::Table)
                    .col(Tasks::BoardId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(TaskAssignees::Table)
                    .col(pk_id_col(manager, TaskAssignees::Id))
                    .col(uuid_col(TaskAssignees::Uuid))
                    .col(fk_id_col(manager, TaskAssignees::TaskId))
                    .col(fk_id_col(manager, TaskAssignees::WorkerId))
                    .col(timestamp_col(TaskAssignees::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_task_assignees_task_id")
                            .from(TaskAssignees::Table, TaskAssignees::TaskId)
                            .to(Tasks::Table, Tasks::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_task_assignees_worker_id")
                            .from(TaskAssignees::Table, TaskAssignees::WorkerId)
                            .to(Workers::Table, Workers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_task_assignees_uuid")
                    .table(TaskAssignees::Table)
                    .col(TaskAssignees::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_task_assignees_task_worker")
                    .table(TaskAssignees::Table)
                    .col(TaskAssignees::TaskId)
                    .col(TaskAssignees::WorkerId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Attachments::Table)
                    .col(pk_id_col(manager, Attachments::Id))
                    .col(uuid_col(Attachments::Uuid))
                    .col(ColumnDef::new(Attachments::Name).string().not_null())
                    .col(ColumnDef::new(Attachments::FilePath).string().not_null())
                    .col(timestamp_col(Attachments::CreatedAt))
                    .col(timestamp_col(Attachments::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_attachments_uuid")
                    .table(Attachments::Table)
                    .col(Attachments::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(TaskAttachments::Table)
                    .col(pk_id_col(manager, TaskAttachments::Id))
                    .col(uuid_col(TaskAttachments::Uuid))
                    .col(fk_id_col(manager, TaskAttachments::TaskId))
                    .col(fk_id_col(manager, TaskAttachments::AttachmentId))
                    .col(timestamp_col(TaskAttachments::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_task_attachments_task_id")
                            .from(TaskAttachments::Table, TaskAttachments::TaskId)
                            .to(Tasks::Table, Tasks::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_task_attachments_attachment_id")
                            .from(TaskAttachments::Table, TaskAttachments::AttachmentId)
                            .to(Attachments::Table, Attachments::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_task_attachments_uuid")
                    .table(TaskAttachments::Table)
                    .col(TaskAttachments::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_task_attachments_task_attachment")
                    .table(TaskAttachments::Table)
                    .col(TaskAttachments::TaskId)
                    .col(TaskAttachments::AttachmentId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Sessions::Table)
                    .col(pk_id_col(manager, Sessions::Id))
                    .col(uuid_col(Sessions::Uuid))
                    .col(fk_id_col(manager, Sessions::WorkerId))
                    .col(ColumnDef::new(Sessions::Token).string().not_null())
                    .col(
                        ColumnDef::new(Sessions::ExpiresAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(timestamp_col(Sessions::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sessions_worker_id")
                            .from(Sessions::Table, Sessions::WorkerId)
                            .to(Workers::Table, Workers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_sessions_uuid")
                    .table(Sessions::Table)
                    .col(Sessions::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_sessions_token")
                    .table(Sessions::Table)
                    .col(Sessions::Token)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Sessions::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(TaskAttachments::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(Attachments::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(TaskAssignees::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Tasks::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Boards::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Projects::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(TeamMembers::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Teams::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Workers::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TaskTypes::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Positions::Table).if_exists().to_owned())
            .await?;
        Ok(())
    }
}

fn pk_id_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.not_null().auto_increment().primary_key().to_owned()
}

fn fk_id_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.not_null().to_owned()
}

fn fk_id_nullable_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.to_owned()
}

fn uuid_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col).uuid().not_null().to_owned()
}

fn timestamp_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp()
        .not_null()
        .default(Expr::current_timestamp())
        .to_owned()
}

#[derive(Iden)]
enum Positions {
    Table,
    Id,
    Uuid,
    Name,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum TaskTypes {
    Table,
    Id,
    Uuid,
    Name,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Workers {
    Table,
    Id,
    Uuid,
    Username,
    Email,
    PasswordHash,
    FirstName,
    LastName,
    PositionId,
    AvatarPath,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Teams {
    Table,
    Id,
    Uuid,
    Name,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum TeamMembers {
    Table,
    Id,
    Uuid,
    TeamId,
    WorkerId,
    CreatedAt,
}

#[derive(Iden)]
enum Projects {
    Table,
    Id,
    Uuid,
    Name,
    Description,
    Deadline,
    IsCompleted,
    TeamId,
    OwnerId,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Boards {
    Table,
    Id,
    Uuid,
    ProjectId,
    Name,
    Color,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Tasks {
    Table,
    Id,
    Uuid,
    BoardId,
    TaskTypeId,
    Name,
    Description,
    Deadline,
    IsCompleted,
    Priority,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum TaskAssignees {
    Table,
    Id,
    Uuid,
    TaskId,
    WorkerId,
    CreatedAt,
}

#[derive(Iden)]
enum Attachments {
    Table,
    Id,
    Uuid,
    Name,
    FilePath,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum TaskAttachments {
    Table,
    Id,
    Uuid,
    TaskId,
    AttachmentId,
    CreatedAt,
}

#[derive(Iden)]
enum Sessions {
    Table,
    Id,
    Uuid,
    WorkerId,
    Token,
    ExpiresAt,
    CreatedAt,
}
