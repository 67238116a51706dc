use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait, PaginatorTrait,
    Statement,
};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::entities::prelude::*;

pub mod migrator;
pub mod repositories;

pub use repositories::admin::AdminRepository;
pub use repositories::audit::AuditRepository;
pub use repositories::class::ClassRepository;
pub use repositories::course::CourseRepository;
pub use repositories::invoice::InvoiceRepository;
pub use repositories::login_attempt::LoginAttemptRepository;
pub use repositories::permission::PermissionRepository;
pub use repositories::professor::ProfessorRepository;
pub use repositories::report::ReportRepository;
pub use repositories::salary::SalaryRepository;
pub use repositories::settings::SettingsRepository;
pub use repositories::student::StudentRepository;
pub use repositories::token::TokenRepository;

/// Timestamps are stored as RFC 3339 UTC strings with fixed millisecond
/// precision so that lexical order matches chronological order.
#[must_use]
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[must_use]
pub fn now_timestamp() -> String {
    timestamp(Utc::now())
}

/// Parses a stored timestamp, tolerating rows written by other tools.
#[must_use]
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Whether a repository error bottoms out in a UNIQUE constraint failure.
#[must_use]
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<sea_orm::DbErr>())
        .any(|db_err| {
            matches!(
                db_err.sql_err(),
                Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
            )
        })
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct DashboardCounts {
    pub courses: u64,
    pub classes: u64,
    pub students: u64,
    pub professors: u64,
}

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        // Every pooled connection to `:memory:` would open its own empty database.
        let in_memory = db_url.contains(":memory:");

        if !in_memory {
            let path_str = db_url
                .trim_start_matches("sqlite://")
                .trim_start_matches("sqlite:");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let (max_connections, min_connections) = if in_memory {
            (1, 1)
        } else {
            (max_connections, min_connections)
        };

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .sqlx_logging(false);

        if !in_memory {
            opt.idle_timeout(Duration::from_secs(300))
                .max_lifetime(Duration::from_secs(600));
        }

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    #[must_use]
    pub fn admin_repo(&self) -> AdminRepository {
        AdminRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn login_attempt_repo(&self) -> LoginAttemptRepository {
        LoginAttemptRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn permission_repo(&self) -> PermissionRepository {
        PermissionRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn audit_repo(&self) -> AuditRepository {
        AuditRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn token_repo(&self) -> TokenRepository {
        TokenRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn settings_repo(&self) -> SettingsRepository {
        SettingsRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn course_repo(&self) -> CourseRepository {
        CourseRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn class_repo(&self) -> ClassRepository {
        ClassRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn student_repo(&self) -> StudentRepository {
        StudentRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn professor_repo(&self) -> ProfessorRepository {
        ProfessorRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn invoice_repo(&self) -> InvoiceRepository {
        InvoiceRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn salary_repo(&self) -> SalaryRepository {
        SalaryRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn report_repo(&self) -> ReportRepository {
        ReportRepository::new(self.conn.clone())
    }

    pub async fn dashboard_counts(&self) -> Result<DashboardCounts> {
        Ok(DashboardCounts {
            courses: Courses::find().count(&self.conn).await?,
            classes: Classes::find().count(&self.conn).await?,
            students: Students::find().count(&self.conn).await?,
            professors: Professors::find().count(&self.conn).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_sort_lexically() {
        let earlier = Utc::now();
        let later = earlier + chrono::Duration::milliseconds(1500);
        assert!(timestamp(earlier) < timestamp(later));
        assert!(timestamp(earlier).ends_with('Z'));
    }

    #[test]
    fn parse_timestamp_round_trip() {
        let now = Utc::now();
        let parsed = parse_timestamp(&timestamp(now)).unwrap();
        assert_eq!(parsed.timestamp_millis(), now.timestamp_millis());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[tokio::test]
    async fn in_memory_store_runs_migrations_and_seeds_admin() {
        let store = Store::new("sqlite::memory:").await.unwrap();
        store.ping().await.unwrap();

        let admin = store
            .admin_repo()
            .find_by_username("admin")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(admin.public_id, "ADM-1");
        assert_eq!(admin.status, "active");

        let counts = store.dashboard_counts().await.unwrap();
        assert_eq!(counts.courses, 0);
    }

    #[tokio::test]
    async fn duplicate_usernames_are_unique_violations() {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let err = store
            .admin_repo()
            .create(repositories::admin::NewAdmin {
                username: "admin".to_string(),
                name: "Second".to_string(),
                email: "second@eduflow.local".to_string(),
                password_hash: "x".to_string(),
                status: "pending".to_string(),
            })
            .await
            .unwrap_err();

        assert!(is_unique_violation(&err));
        assert!(!is_unique_violation(&anyhow::anyhow!("plain failure")));
    }
}
