use chrono::{Duration, Utc};
use tracing::warn;

use crate::config::SecurityConfig;
use crate::db::{Store, parse_timestamp, timestamp};
use crate::entities::admins;

/// Identifiers are throttled case-insensitively so `Admin@x` and `admin@x`
/// share one bucket.
fn throttle_key(identifier: &str) -> String {
    identifier.trim().to_lowercase()
}

/// Failed-login throttling per (identifier, address) and lockout per admin.
#[derive(Clone)]
pub struct LoginGuard {
    store: Store,
    config: SecurityConfig,
}

impl LoginGuard {
    #[must_use]
    pub const fn new(store: Store, config: SecurityConfig) -> Self {
        Self { store, config }
    }

    /// `true` when another attempt is allowed.
    ///
    /// Store errors let the attempt through: an unavailable counter must not
    /// lock every admin out.
    pub async fn check_rate_limit(&self, identifier: &str, ip_address: &str) -> bool {
        if !self.config.rate_limit_enabled {
            return true;
        }

        let window = i64::try_from(self.config.rate_limit_window_seconds).unwrap_or(i64::MAX);
        let since = Utc::now() - Duration::seconds(window);

        match self
            .store
            .login_attempt_repo()
            .count_failures_since(&throttle_key(identifier), ip_address, since)
            .await
        {
            Ok(failures) => failures < self.config.rate_limit_max_attempts,
            Err(e) => {
                warn!(error = %e, identifier, "Rate limit check failed, allowing attempt");
                true
            }
        }
    }

    pub async fn record_attempt(&self, identifier: &str, ip_address: &str, success: bool) {
        if let Err(e) = self
            .store
            .login_attempt_repo()
            .record(&throttle_key(identifier), ip_address, success)
            .await
        {
            warn!(error = %e, identifier, "Failed to record login attempt");
        }
    }

    #[must_use]
    pub fn is_locked(&self, admin: &admins::Model) -> bool {
        if !self.config.account_lock_enabled {
            return false;
        }

        admin
            .locked_until
            .as_deref()
            .and_then(parse_timestamp)
            .is_some_and(|until| Utc::now() < until)
    }

    /// Clears the failure streak of a lock that has run out, so the admin
    /// gets the full number of attempts again. Returns the admin as stored
    /// afterwards.
    pub async fn release_expired_lock(&self, admin: admins::Model) -> anyhow::Result<admins::Model> {
        let expired = admin
            .locked_until
            .as_deref()
            .and_then(parse_timestamp)
            .is_some_and(|until| Utc::now() >= until);

        if !expired {
            return Ok(admin);
        }

        self.reset_failures(admin.id).await?;
        Ok(admins::Model {
            failed_login_attempts: 0,
            locked_until: None,
            ..admin
        })
    }

    pub async fn lock(&self, admin_id: i32, minutes: i64) -> anyhow::Result<()> {
        if !self.config.account_lock_enabled {
            return Ok(());
        }

        let until = timestamp(Utc::now() + Duration::minutes(minutes));
        self.store.admin_repo().lock_until(admin_id, until).await
    }

    /// Counts a wrong password against the admin, locking the account once
    /// the configured number of consecutive failures is reached.
    ///
    /// Returns whether this failure locked the account.
    pub async fn increment_failures(&self, admin: &admins::Model) -> anyhow::Result<bool> {
        let locks = self.config.account_lock_enabled
            && admin.failed_login_attempts + 1 >= self.config.account_lock_attempts;

        let locked_until = locks.then(|| {
            timestamp(Utc::now() + Duration::minutes(self.config.account_lock_minutes))
        });

        self.store
            .admin_repo()
            .increment_failures(admin.id, locked_until)
            .await?;

        if locks {
            metrics::counter!("account_lockouts_total").increment(1);
            warn!(admin = %admin.public_id, "Account locked after repeated failed logins");
        }

        Ok(locks)
    }

    pub async fn reset_failures(&self, admin_id: i32) -> anyhow::Result<()> {
        self.store.admin_repo().reset_failures(admin_id).await
    }
}
