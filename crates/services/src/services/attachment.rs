use std::path::{Path, PathBuf};

use chrono::Utc;
use db::{
    DbErr, DbPool,
    models::attachment::{Attachment, CreateAttachment, TaskAttachment},
};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Attachment not found")]
    NotFound,
    #[error("File too large: {0} bytes (max {1})")]
    TooLarge(u64, u64),
}

/// A file received from a multipart upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub data: Vec<u8>,
}

#[derive(Clone)]
pub struct AttachmentService {
    attachments_dir: PathBuf,
    avatars_dir: PathBuf,
    max_upload_size_bytes: u64,
}

impl AttachmentService {
    pub fn new(max_upload_size_bytes: u64) -> Result<Self, AttachmentError> {
        Self::with_dirs(
            utils::assets::attachments_dir(),
            utils::assets::avatars_dir(),
            max_upload_size_bytes,
        )
    }

    pub fn with_dirs(
        attachments_dir: PathBuf,
        avatars_dir: PathBuf,
        max_upload_size_bytes: u64,
    ) -> Result<Self, AttachmentError> {
        std::fs::create_dir_all(&attachments_dir)?;
        std::fs::create_dir_all(&avatars_dir)?;
        Ok(Self {
            attachments_dir,
            avatars_dir,
            max_upload_size_bytes,
        })
    }

    pub fn max_upload_size_bytes(&self) -> u64 {
        self.max_upload_size_bytes
    }

    /// Turn uploads into attachments linked to the task, one at a time. The
    /// task row already exists; on any failure the backing files of every
    /// attachment created so far are removed before the error propagates.
    pub async fn attach_uploads(
        &self,
        pool: &DbPool,
        task_id: Uuid,
        files: Vec<UploadedFile>,
    ) -> Result<Vec<Attachment>, AttachmentError> {
        let mut created: Vec<Attachment> = Vec::new();
        for file in files {
            match self.store_task_file(pool, task_id, file).await {
                Ok(attachment) => created.push(attachment),
                Err(err) => {
                    tracing::warn!(
                        task_id = %task_id,
                        error = %err,
                        "Attachment creation failed, removing files stored so far"
                    );
                    self.remove_backing_files(&created).await;
                    return Err(err);
                }
            }
        }
        Ok(created)
    }

    async fn store_task_file(
        &self,
        pool: &DbPool,
        task_id: Uuid,
        file: UploadedFile,
    ) -> Result<Attachment, AttachmentError> {
        let size = file.data.len() as u64;
        if size > self.max_upload_size_bytes {
            return Err(AttachmentError::TooLarge(size, self.max_upload_size_bytes));
        }

        let path = self.attachments_dir.join(disk_file_name(&file.file_name));
        tokio::fs::write(&path, &file.data).await?;

        let name = format!("{}:{}", task_id, Utc::now().format("%Y-%m-%d-%H-%M-%S"));
        let attachment = match Attachment::create(
            pool,
            &CreateAttachment {
                name,
                file_path: path.to_string_lossy().into_owned(),
            },
        )
        .await
        {
            Ok(attachment) => attachment,
            Err(err) => {
                let _ = tokio::fs::remove_file(&path).await;
                return Err(err.into());
            }
        };

        if let Err(err) = TaskAttachment::associate_many_dedup(pool, task_id, &[attachment.id]).await
        {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(err.into());
        }

        Ok(attachment)
    }

    /// Best-effort removal of the stored files; failures are logged, not
    /// propagated.
    pub async fn remove_backing_files(&self, attachments: &[Attachment]) {
        for attachment in attachments {
            if let Err(err) = tokio::fs::remove_file(&attachment.file_path).await {
                if err.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(
                        attachment_id = %attachment.id,
                        path = %attachment.file_path,
                        error = %err,
                        "Failed to remove attachment file"
                    );
                }
            }
        }
    }

    /// Remove a task's attachments: backing files first, then the rows (link
    /// rows go with them via the foreign keys).
    pub async fn delete_task_attachments(
        &self,
        pool: &DbPool,
        task_id: Uuid,
    ) -> Result<(), AttachmentError> {
        let attachments = Attachment::find_by_task_id(pool, task_id).await?;
        self.remove_backing_files(&attachments).await;
        for attachment in &attachments {
            Attachment::delete(pool, attachment.id).await?;
        }
        Ok(())
    }

    /// Sweep attachments that lost all their task links, removing files and
    /// rows. Runs at startup.
    pub async fn delete_orphaned(&self, pool: &DbPool) -> Result<u64, AttachmentError> {
        let orphans = Attachment::find_orphaned(pool).await?;
        let count = orphans.len() as u64;
        self.remove_backing_files(&orphans).await;
        for attachment in &orphans {
            Attachment::delete(pool, attachment.id).await?;
        }
        Ok(count)
    }

    /// Store an avatar image and return its path.
    pub async fn store_avatar(&self, file: UploadedFile) -> Result<String, AttachmentError> {
        let size = file.data.len() as u64;
        if size > self.max_upload_size_bytes {
            return Err(AttachmentError::TooLarge(size, self.max_upload_size_bytes));
        }

        let path = self.avatars_dir.join(disk_file_name(&file.file_name));
        tokio::fs::write(&path, &file.data).await?;
        Ok(path.to_string_lossy().into_owned())
    }
}

fn disk_file_name(original: &str) -> String {
    let sanitized: String = Path::new(original)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}_{}", Uuid::new_v4(), sanitized)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use db::models::{
        board::{Board, CreateBoard},
        project::{CreateProject, Project},
        task::{CreateTask, Task},
        task_type::{CreateTaskType, TaskType},
        worker::{CreateWorker, Worker},
    };
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use super::*;

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    fn service(temp: &tempfile::TempDir, max: u64) -> AttachmentService {
        AttachmentService::with_dirs(
            temp.path().join("attachments"),
            temp.path().join("avatars"),
            max,
        )
        .unwrap()
    }

    async fn create_task(db: &DbPool) -> Task {
        let worker = Worker::create(
            db,
            &CreateWorker {
                username: "uploader".to_string(),
                email: "uploader@example.com".to_string(),
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
            db,
            &CreateProject {
                name: "Uploads".to_string(),
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
            db,
            project.id,
            &CreateBoard {
                name: "Inbox".to_string(),
                color: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let task_type = TaskType::create(
            db,
            &CreateTaskType {
                name: "Chore".to_string(),
            },
        )
        .await
        .unwrap();
        Task::create(
            db,
            board.id,
            &CreateTask {
                name: "With files".to_string(),
                description: "desc".to_string(),
                deadline: Utc::now().date_naive(),
                is_completed: false,
                priority: None,
                task_type_id: task_type.id,
                assignee_ids: vec![],
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap()
    }

    fn upload(name: &str, bytes: usize) -> UploadedFile {
        UploadedFile {
            file_name: name.to_string(),
            data: vec![b'a'; bytes],
        }
    }

    #[tokio::test]
    async fn uploads_become_named_linked_attachments() {
        let db = setup_db().await;
        let temp = tempfile::tempdir().unwrap();
        let service = service(&temp, 1024);
        let task = create_task(&db).await;

        let created = service
            .attach_uploads(&db, task.id, vec![upload("notes.txt", 10), upload("report.pdf", 20)])
            .await
            .unwrap();

        assert_eq!(created.len(), 2);
        for attachment in &created {
            assert!(attachment.name.starts_with(&format!("{}:", task.id)));
            assert!(std::path::Path::new(&attachment.file_path).exists());
        }

        let linked = Attachment::find_by_task_id(&db, task.id).await.unwrap();
        assert_eq!(linked.len(), 2);
    }

    #[tokio::test]
    async fn partial_failure_removes_files_stored_so_far() {
        let db = setup_db().await;
        let temp = tempfile::tempdir().unwrap();
        let service = service(&temp, 64);
        let task = create_task(&db).await;

        let err = service
            .attach_uploads(
                &db,
                task.id,
                vec![upload("small.txt", 10), upload("huge.bin", 1000)],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AttachmentError::TooLarge(_, _)));

        // The first file made it to disk before the failure; it must be gone.
        let leftovers: Vec<_> = std::fs::read_dir(temp.path().join("attachments"))
            .unwrap()
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn deleting_task_attachments_removes_rows_and_files() {
        let db = setup_db().await;
        let temp = tempfile::tempdir().unwrap();
        let service = service(&temp, 1024);
        let task = create_task(&db).await;

        service
            .attach_uploads(&db, task.id, vec![upload("a.txt", 5)])
            .await
            .unwrap();

        service.delete_task_attachments(&db, task.id).await.unwrap();
        assert!(Attachment::find_by_task_id(&db, task.id)
            .await
            .unwrap()
            .is_empty());
        let leftovers: Vec<_> = std::fs::read_dir(temp.path().join("attachments"))
            .unwrap()
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn orphan_sweep_removes_unlinked_attachments() {
        let db = setup_db().await;
        let temp = tempfile::tempdir().unwrap();
        let service = service(&temp, 1024);

        let orphan_path = temp.path().join("attachments").join("orphan.bin");
        tokio::fs::write(&orphan_path, b"data").await.unwrap();
        Attachment::create(
            &db,
            &db::models::attachment::CreateAttachment {
                name: "orphan".to_string(),
                file_path: orphan_path.to_string_lossy().into_owned(),
            },
        )
        .await
        .unwrap();

        let removed = service.delete_orphaned(&db).await.unwrap();
        assert_eq!(removed, 1);
        assert!(!orphan_path.exists());
    }
}
