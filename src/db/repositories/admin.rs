use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tokio::task;

use super::public_id;
use crate::config::SecurityConfig;
use crate::db::now_timestamp;
use crate::entities::{admins, prelude::*};

const ADMIN_PREFIX: &str = "ADM";

/// Fields needed to register a new admin row.
#[derive(Debug, Clone)]
pub struct NewAdmin {
    pub username: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub status: String,
}

pub struct AdminRepository {
    conn: DatabaseConnection,
}

impl AdminRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<admins::Model>> {
        Admins::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query admin by ID")
    }

    pub async fn find_by_public_id(&self, public_id: &str) -> Result<Option<admins::Model>> {
        Admins::find()
            .filter(admins::Column::PublicId.eq(public_id))
            .one(&self.conn)
            .await
            .context("Failed to query admin by public ID")
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<admins::Model>> {
        Admins::find()
            .filter(admins::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query admin by username")
    }

    /// Resolves a login identifier: exact username first, then email
    /// compared in lowercase.
    pub async fn find_by_identifier(&self, identifier: &str) -> Result<Option<admins::Model>> {
        if let Some(admin) = self.find_by_username(identifier).await? {
            return Ok(Some(admin));
        }

        Admins::find()
            .filter(admins::Column::Email.eq(identifier.to_lowercase()))
            .one(&self.conn)
            .await
            .context("Failed to query admin by email")
    }

    pub async fn exists(&self, username: &str, email: &str) -> Result<bool> {
        let found = Admins::find()
            .filter(
                Condition::any()
                    .add(admins::Column::Username.eq(username))
                    .add(admins::Column::Email.eq(email.to_lowercase())),
            )
            .one(&self.conn)
            .await
            .context("Failed to check for existing admin")?;

        Ok(found.is_some())
    }

    pub async fn create(&self, admin: NewAdmin) -> Result<admins::Model> {
        let txn = self.conn.begin().await?;
        let public_id = public_id::allocate(&txn, ADMIN_PREFIX).await?;
        let now = now_timestamp();

        let model = admins::ActiveModel {
            public_id: Set(public_id),
            username: Set(admin.username),
            name: Set(admin.name),
            email: Set(admin.email.to_lowercase()),
            password_hash: Set(admin.password_hash),
            management_pin_hash: Set(None),
            two_factor_secret: Set(None),
            status: Set(admin.status),
            failed_login_attempts: Set(0),
            locked_until: Set(None),
            last_login_at: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert admin")?;

        txn.commit().await?;
        Ok(model)
    }

    pub async fn list_by_status(&self, status: &str) -> Result<Vec<admins::Model>> {
        Admins::find()
            .filter(admins::Column::Status.eq(status))
            .order_by_desc(admins::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("Failed to list admins by status")
    }

    pub async fn list_all(&self) -> Result<Vec<admins::Model>> {
        Admins::find()
            .order_by_asc(admins::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list admins")
    }

    pub async fn set_status(&self, id: i32, status: &str) -> Result<()> {
        self.update_columns(
            id,
            [(admins::Column::Status, Expr::value(status.to_string()))],
        )
        .await
    }

    pub async fn set_password_hash(&self, id: i32, password_hash: String) -> Result<()> {
        self.update_columns(id, [(admins::Column::PasswordHash, Expr::value(password_hash))])
            .await
    }

    pub async fn set_pin_hash(&self, id: i32, pin_hash: String) -> Result<()> {
        self.update_columns(
            id,
            [(admins::Column::ManagementPinHash, Expr::value(pin_hash))],
        )
        .await
    }

    pub async fn touch_last_login(&self, id: i32) -> Result<()> {
        self.update_columns(
            id,
            [(admins::Column::LastLoginAt, Expr::value(now_timestamp()))],
        )
        .await
    }

    /// Adds one to the failure counter in place so concurrent failures are
    /// never lost, optionally setting a lock deadline in the same statement.
    pub async fn increment_failures(&self, id: i32, locked_until: Option<String>) -> Result<()> {
        let mut update = Admins::update_many()
            .col_expr(
                admins::Column::FailedLoginAttempts,
                Expr::col(admins::Column::FailedLoginAttempts).add(1),
            )
            .col_expr(admins::Column::UpdatedAt, Expr::value(now_timestamp()));

        if let Some(until) = locked_until {
            update = update.col_expr(admins::Column::LockedUntil, Expr::value(until));
        }

        update
            .filter(admins::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("Failed to increment failed login attempts")?;

        Ok(())
    }

    pub async fn lock_until(&self, id: i32, until: String) -> Result<()> {
        self.update_columns(id, [(admins::Column::LockedUntil, Expr::value(until))])
            .await
    }

    pub async fn reset_failures(&self, id: i32) -> Result<()> {
        self.update_columns(
            id,
            [
                (admins::Column::FailedLoginAttempts, Expr::value(0_i32)),
                (admins::Column::LockedUntil, Expr::value(Option::<String>::None)),
            ],
        )
        .await
    }

    async fn update_columns<const N: usize>(
        &self,
        id: i32,
        columns: [(admins::Column, sea_orm::sea_query::SimpleExpr); N],
    ) -> Result<()> {
        let mut update = Admins::update_many()
            .col_expr(admins::Column::UpdatedAt, Expr::value(now_timestamp()));

        for (column, value) in columns {
            update = update.col_expr(column, value);
        }

        update
            .filter(admins::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("Failed to update admin")?;

        Ok(())
    }
}

/// Hash a password or PIN using Argon2id with optional custom params.
/// If config is None, uses the library default params.
pub fn hash_password(password: &str, config: Option<&SecurityConfig>) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let argon2 = if let Some(cfg) = config {
        let params = Params::new(
            cfg.argon2_memory_cost_kib,
            cfg.argon2_time_cost,
            cfg.argon2_parallelism,
            None, // output length (use default)
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    } else {
        Argon2::default()
    };

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Hashes on the blocking pool, Argon2 would otherwise stall the runtime.
pub async fn hash_password_blocking(password: &str, config: &SecurityConfig) -> Result<String> {
    let password = password.to_string();
    let config = config.clone();
    task::spawn_blocking(move || hash_password(&password, Some(&config)))
        .await
        .context("Password hashing task panicked")?
}

/// Verifies `secret` against a PHC hash string. The parameters embedded in
/// the hash are used, so rows hashed with older settings still verify.
pub async fn verify_password(secret: &str, hash: &str) -> Result<bool> {
    let secret = secret.to_string();
    let hash = hash.to_string();

    task::spawn_blocking(move || {
        let parsed_hash = PasswordHash::new(&hash)
            .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

        Ok::<bool, anyhow::Error>(
            Argon2::default()
                .verify_password(secret.as_bytes(), &parsed_hash)
                .is_ok(),
        )
    })
    .await
    .context("Password verification task panicked")?
}

/// Generate a random 64 character hex token.
#[must_use]
pub fn generate_token() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; crate::constants::tokens::TOKEN_BYTES] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

/// Generate a zero-padded six digit verification code.
#[must_use]
pub fn generate_code() -> String {
    use rand::Rng;

    let code: u32 = rand::rng().random_range(0..1_000_000);
    format!("{code:06}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Store;

    fn fast_config() -> SecurityConfig {
        SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            ..SecurityConfig::default()
        }
    }

    #[tokio::test]
    async fn hash_and_verify() {
        let hash = hash_password_blocking("hunter22", &fast_config()).await.unwrap();
        assert!(verify_password("hunter22", &hash).await.unwrap());
        assert!(!verify_password("hunter23", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn malformed_hash_is_an_error() {
        assert!(verify_password("x", "not-a-hash").await.is_err());
    }

    #[test]
    fn tokens_and_codes_have_expected_shape() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_token());

        let code = generate_code();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn identifier_falls_back_to_lowercased_email() {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let repo = store.admin_repo();

        let by_email = repo
            .find_by_identifier("Admin@EduFlow.local")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.username, "admin");
        assert!(repo.find_by_identifier("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failure_counter_and_reset() {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let repo = store.admin_repo();
        let admin = repo.find_by_username("admin").await.unwrap().unwrap();

        repo.increment_failures(admin.id, None).await.unwrap();
        repo.increment_failures(admin.id, Some("2999-01-01T00:00:00.000Z".to_string()))
            .await
            .unwrap();

        let updated = repo.find_by_id(admin.id).await.unwrap().unwrap();
        assert_eq!(updated.failed_login_attempts, 2);
        assert_eq!(updated.locked_until.as_deref(), Some("2999-01-01T00:00:00.000Z"));

        repo.reset_failures(admin.id).await.unwrap();
        let reset = repo.find_by_id(admin.id).await.unwrap().unwrap();
        assert_eq!(reset.failed_login_attempts, 0);
        assert!(reset.locked_until.is_none());
    }

    #[tokio::test]
    async fn create_assigns_next_admin_public_id() {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let repo = store.admin_repo();

        let created = repo
            .create(NewAdmin {
                username: "clerk".to_string(),
                name: "Clerk".to_string(),
                email: "Clerk@Example.com".to_string(),
                password_hash: "x".to_string(),
                status: "pending".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(created.public_id, "ADM-2");
        assert_eq!(created.email, "clerk@example.com");
        assert!(repo.exists("other", "clerk@example.com").await.unwrap());
        assert_eq!(repo.list_by_status("pending").await.unwrap().len(), 1);
    }
}
