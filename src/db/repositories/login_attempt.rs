use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};

use crate::db::{now_timestamp, timestamp};
use crate::entities::{login_attempts, prelude::*};

pub struct LoginAttemptRepository {
    conn: DatabaseConnection,
}

impl LoginAttemptRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn record(&self, identifier: &str, ip_address: &str, success: bool) -> Result<()> {
        login_attempts::ActiveModel {
            identifier: Set(identifier.to_string()),
            ip_address: Set(ip_address.to_string()),
            success: Set(success),
            attempted_at: Set(now_timestamp()),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to record login attempt")?;

        Ok(())
    }

    /// Failed attempts for this identifier and address made after `since`.
    pub async fn count_failures_since(
        &self,
        identifier: &str,
        ip_address: &str,
        since: DateTime<Utc>,
    ) -> Result<u64> {
        LoginAttempts::find()
            .filter(login_attempts::Column::Identifier.eq(identifier))
            .filter(login_attempts::Column::IpAddress.eq(ip_address))
            .filter(login_attempts::Column::Success.eq(false))
            .filter(login_attempts::Column::AttemptedAt.gt(timestamp(since)))
            .count(&self.conn)
            .await
            .context("Failed to count login attempts")
    }
}
