use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use db::{
    DbErr, DbPool,
    models::{
        session::{Session, SessionError},
        worker::Worker,
    },
};
use rand::RngCore;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Password hashing failed: {0}")]
    Hash(String),
}

impl From<SessionError> for AuthError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Database(db_err) => AuthError::Database(db_err),
            SessionError::WorkerNotFound => AuthError::InvalidCredentials,
        }
    }
}

#[derive(Clone, Default)]
pub struct AuthService;

impl AuthService {
    pub fn new() -> Self {
        Self
    }

    pub fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|err| AuthError::Hash(err.to_string()))?;
        Ok(hash.to_string())
    }

    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(hash).map_err(|err| AuthError::Hash(err.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    pub fn generate_session_token(&self) -> String {
        let mut bytes = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Verify credentials and mint a session.
    pub async fn login(
        &self,
        pool: &DbPool,
        username: &str,
        password: &str,
        session_ttl_hours: i64,
    ) -> Result<(Worker, Session), AuthError> {
        let Some((worker, stored_hash)) = Worker::find_by_username_with_hash(pool, username).await?
        else {
            return Err(AuthError::InvalidCredentials);
        };

        if !self.verify_password(password, &stored_hash)? {
            tracing::debug!(username, "Login failed: password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.generate_session_token();
        let expires_at = Utc::now() + Duration::hours(session_ttl_hours.max(1));
        let session = Session::create(pool, worker.id, &token, expires_at).await?;
        Ok((worker, session))
    }

    pub async fn logout(&self, pool: &DbPool, token: &str) -> Result<(), AuthError> {
        Session::delete_by_token(pool, token).await?;
        Ok(())
    }

    /// Resolve a presented token to its worker, if the session is still live.
    pub async fn authenticate(
        &self,
        pool: &DbPool,
        token: &str,
    ) -> Result<Option<Worker>, AuthError> {
        let Some(session) = Session::find_valid_by_token(pool, token, Utc::now()).await? else {
            return Ok(None);
        };
        Ok(Worker::find_by_id(pool, session.worker_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use db::models::worker::CreateWorker;
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;
    use uuid::Uuid;

    use super::*;

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    async fn register(db: &DbPool, auth: &AuthService, username: &str, password: &str) -> Worker {
        let hash = auth.hash_password(password).unwrap();
        Worker::create(
            db,
            &CreateWorker {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                password: password.to_string(),
                first_name: None,
                last_name: None,
                position_id: None,
            },
            hash,
            Uuid::new_v4(),
        )
        .await
        .unwrap()
    }

    #[test]
    fn hash_and_verify_roundtrip() {
        let auth = AuthService::new();
        let hash = auth.hash_password("123QWEasd!").unwrap();
        assert!(auth.verify_password("123QWEasd!", &hash).unwrap());
        assert!(!auth.verify_password("wrong", &hash).unwrap());
    }

    #[tokio::test]
    async fn login_issues_a_usable_session() {
        let db = setup_db().await;
        let auth = AuthService::new();
        let worker = register(&db, &auth, "hank", "123QWEasd!").await;

        let (logged_in, session) = auth.login(&db, "hank", "123QWEasd!", 24).await.unwrap();
        assert_eq!(logged_in.id, worker.id);

        let authenticated = auth
            .authenticate(&db, &session.token)
            .await
            .unwrap()
            .expect("session resolves");
        assert_eq!(authenticated.id, worker.id);

        auth.logout(&db, &session.token).await.unwrap();
        assert!(auth.authenticate(&db, &session.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn login_with_wrong_password_fails() {
        let db = setup_db().await;
        let auth = AuthService::new();
        register(&db, &auth, "iris", "123QWEasd!").await;

        let err = auth.login(&db, "iris", "nope", 24).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        let err = auth.login(&db, "missing", "nope", 24).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }
}
