//! Step-up re-authentication for privileged mutations.
//!
//! Every verification writes exactly one PIN audit row. The secret is
//! checked against the admin's management PIN when one is set, otherwise
//! against the login password.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::SecurityConfig;
use crate::constants::metadata::{METHOD_LOGIN_PASSWORD, METHOD_MANAGEMENT_PIN, METHOD_MISSING};
use crate::db::Store;
use crate::db::repositories::admin::verify_password;
use crate::db::repositories::audit::PinAuditRecord;
use crate::domain::ActionKey;
use crate::services::audit::AuditService;
use crate::services::permission_service::PermissionService;

const SETTINGS_UNLOCK_ACTION: &str = "settings.unlock";
const SETTINGS_ENTITY: &str = "settings";

#[derive(Debug, Error)]
pub enum StepUpError {
    #[error("Management PIN required")]
    MissingPin,

    #[error("Invalid management PIN")]
    InvalidPin,

    #[error("Settings are locked")]
    SettingsLocked,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for StepUpError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<crate::services::permission_service::PermissionError> for StepUpError {
    fn from(err: crate::services::permission_service::PermissionError) -> Self {
        Self::Internal(err.to_string())
    }
}

/// PINs are stored and compared verbatim, like passwords. A candidate must
/// be long enough and not entirely whitespace.
#[must_use]
pub fn pin_meets_policy(pin: &str, min_length: usize) -> bool {
    pin.chars().count() >= min_length && !pin.chars().all(char::is_whitespace)
}

#[derive(Clone)]
pub struct StepUpAuthorizer {
    store: Store,
    audit: AuditService,
    permissions: Arc<dyn PermissionService>,
    config: SecurityConfig,
}

impl StepUpAuthorizer {
    #[must_use]
    pub fn new(
        store: Store,
        permissions: Arc<dyn PermissionService>,
        config: SecurityConfig,
    ) -> Self {
        Self {
            audit: AuditService::new(store.clone()),
            store,
            permissions,
            config,
        }
    }

    /// Checks `secret` for `admin_id`. Unknown admins fail without an audit
    /// row since there is no one to attribute it to.
    pub async fn verify(
        &self,
        admin_id: i32,
        secret: &str,
        action_key: &str,
        entity_type: Option<&str>,
        entity_public_id: Option<&str>,
    ) -> Result<bool, StepUpError> {
        let Some(admin) = self.store.admin_repo().find_by_id(admin_id).await? else {
            return Ok(false);
        };

        let (hash, method) = match admin.management_pin_hash.as_deref() {
            Some(pin_hash) if !pin_hash.is_empty() => (pin_hash, METHOD_MANAGEMENT_PIN),
            _ => (admin.password_hash.as_str(), METHOD_LOGIN_PASSWORD),
        };

        let success = match verify_password(secret, hash).await {
            Ok(matched) => matched,
            Err(e) => {
                warn!(error = %e, admin = %admin.public_id, method, "Stored secret hash is unreadable");
                false
            }
        };

        metrics::counter!(
            "step_up_verifications_total",
            "method" => method,
            "outcome" => if success { "success" } else { "failure" }
        )
        .increment(1);
        debug!(admin = %admin.public_id, action_key, method, success, "Step-up verification");

        self.audit
            .record_pin_verification(PinAuditRecord {
                admin_id: admin.id,
                action_key: action_key.to_string(),
                entity_type: entity_type.map(str::to_string),
                entity_public_id: entity_public_id.map(str::to_string),
                success,
                method,
            })
            .await;

        Ok(success)
    }

    /// Enforces the permission matrix for `key`.
    ///
    /// # Errors
    ///
    /// [`StepUpError::MissingPin`] when a PIN is required and none was sent,
    /// [`StepUpError::InvalidPin`] when it does not verify.
    pub async fn require_pin(
        &self,
        admin_id: i32,
        pin: Option<&str>,
        key: ActionKey,
        entity_public_id: Option<&str>,
    ) -> Result<(), StepUpError> {
        if !self.permissions.is_pin_required(key).await? {
            return Ok(());
        }

        let action_key = key.to_string();
        let entity_type = key.entity.as_str();

        let Some(pin) = pin.filter(|p| !p.is_empty()) else {
            metrics::counter!(
                "step_up_verifications_total",
                "method" => METHOD_MISSING,
                "outcome" => "failure"
            )
            .increment(1);

            self.audit
                .record_pin_verification(PinAuditRecord {
                    admin_id,
                    action_key,
                    entity_type: Some(entity_type.to_string()),
                    entity_public_id: entity_public_id.map(str::to_string),
                    success: false,
                    method: METHOD_MISSING,
                })
                .await;
            return Err(StepUpError::MissingPin);
        };

        if self
            .verify(admin_id, pin, &action_key, Some(entity_type), entity_public_id)
            .await?
        {
            Ok(())
        } else {
            Err(StepUpError::InvalidPin)
        }
    }

    /// Gate for the settings screens.
    ///
    /// Without a PIN the call passes only while `unlocked_until` is in the
    /// future. A verified PIN returns the new session deadline, or `None`
    /// when unlocks are not remembered.
    pub async fn unlock_settings(
        &self,
        admin_id: i32,
        pin: Option<&str>,
        unlocked_until: Option<DateTime<Utc>>,
    ) -> Result<Option<DateTime<Utc>>, StepUpError> {
        let Some(pin) = pin.filter(|p| !p.is_empty()) else {
            return match unlocked_until {
                Some(until) if self.config.settings_unlock_ttl_minutes > 0 && Utc::now() < until => {
                    Ok(Some(until))
                }
                _ => Err(StepUpError::SettingsLocked),
            };
        };

        if !self
            .verify(
                admin_id,
                pin,
                SETTINGS_UNLOCK_ACTION,
                Some(SETTINGS_ENTITY),
                None,
            )
            .await?
        {
            return Err(StepUpError::InvalidPin);
        }

        let ttl = self.config.settings_unlock_ttl_minutes;
        Ok((ttl > 0).then(|| Utc::now() + Duration::minutes(ttl)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::admin::hash_password;
    use crate::domain::{ActionKind, EntityKind};
    use crate::entities::pin_audit_logs;
    use crate::services::mailer::LogMailer;
    use crate::services::permission_service_impl::SeaOrmPermissionService;

    fn fast_config() -> SecurityConfig {
        SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            ..SecurityConfig::default()
        }
    }

    async fn setup(config: SecurityConfig) -> (Store, Arc<SeaOrmPermissionService>, StepUpAuthorizer, i32) {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let permissions = Arc::new(SeaOrmPermissionService::new(
            store.clone(),
            Arc::new(LogMailer),
            config.clone(),
        ));
        let authorizer = StepUpAuthorizer::new(store.clone(), permissions.clone(), config);
        let id = store
            .admin_repo()
            .find_by_username("admin")
            .await
            .unwrap()
            .unwrap()
            .id;
        (store, permissions, authorizer, id)
    }

    async fn audit_rows(store: &Store) -> Vec<pin_audit_logs::Model> {
        store.audit_repo().recent_pin_audit(None, 100).await.unwrap()
    }

    fn method(row: &pin_audit_logs::Model) -> &str {
        row.metadata
            .as_ref()
            .and_then(|m| m.get("method"))
            .and_then(|m| m.as_str())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn falls_back_to_login_password() {
        let (store, _, authorizer, id) = setup(fast_config()).await;

        assert!(authorizer.verify(id, "password", "course.delete", Some("course"), Some("C-1")).await.unwrap());

        let rows = audit_rows(&store).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, "success");
        assert_eq!(method(&rows[0]), "login_password");
        assert_eq!(rows[0].entity_public_id.as_deref(), Some("C-1"));
    }

    #[tokio::test]
    async fn pin_takes_precedence_over_password() {
        let (store, _, authorizer, id) = setup(fast_config()).await;
        let pin_hash = hash_password("2468", Some(&fast_config())).unwrap();
        store.admin_repo().set_pin_hash(id, pin_hash).await.unwrap();

        assert!(!authorizer.verify(id, "password", "course.delete", None, None).await.unwrap());
        assert!(authorizer.verify(id, "2468", "course.delete", None, None).await.unwrap());

        let rows = audit_rows(&store).await;
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| method(r) == "management_pin"));
        assert_eq!(rows.iter().filter(|r| r.status == "failure").count(), 1);
    }

    #[tokio::test]
    async fn unknown_admin_fails_without_audit() {
        let (store, _, authorizer, _) = setup(fast_config()).await;

        assert!(!authorizer.verify(9999, "password", "course.delete", None, None).await.unwrap());
        assert!(audit_rows(&store).await.is_empty());
    }

    #[tokio::test]
    async fn require_pin_passes_when_not_required() {
        let (store, _, authorizer, id) = setup(fast_config()).await;
        let key = ActionKey::new(EntityKind::Course, ActionKind::Delete);

        authorizer.require_pin(id, None, key, Some("C-1")).await.unwrap();
        assert!(audit_rows(&store).await.is_empty());
    }

    #[tokio::test]
    async fn missing_pin_is_audited_once() {
        let (store, permissions, authorizer, id) = setup(fast_config()).await;
        let key = ActionKey::new(EntityKind::Course, ActionKind::Delete);
        permissions.set_permission(key, true, None).await.unwrap();

        let err = authorizer.require_pin(id, Some(""), key, Some("C-1")).await.unwrap_err();
        assert!(matches!(err, StepUpError::MissingPin));

        let rows = audit_rows(&store).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, "failure");
        assert_eq!(method(&rows[0]), "missing");
        assert_eq!(rows[0].action_key, "course.delete");
    }

    #[tokio::test]
    async fn wrong_pin_is_rejected() {
        let (_, permissions, authorizer, id) = setup(fast_config()).await;
        let key = ActionKey::new(EntityKind::Invoice, ActionKind::Update);
        permissions.set_permission(key, true, None).await.unwrap();

        let err = authorizer.require_pin(id, Some("nope"), key, None).await.unwrap_err();
        assert!(matches!(err, StepUpError::InvalidPin));
        authorizer.require_pin(id, Some("password"), key, None).await.unwrap();
    }

    #[tokio::test]
    async fn settings_need_a_pin_every_time_without_ttl() {
        let (store, _, authorizer, id) = setup(fast_config()).await;

        let until = authorizer.unlock_settings(id, Some("password"), None).await.unwrap();
        assert!(until.is_none());

        let stale = Some(Utc::now() + Duration::minutes(10));
        assert!(matches!(
            authorizer.unlock_settings(id, None, stale).await,
            Err(StepUpError::SettingsLocked)
        ));

        let rows = audit_rows(&store).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].action_key, "settings.unlock");
        assert_eq!(rows[0].entity_type.as_deref(), Some("settings"));
    }

    #[tokio::test]
    async fn settings_unlock_is_remembered_with_ttl() {
        let (_, _, authorizer, id) = setup(SecurityConfig {
            settings_unlock_ttl_minutes: 10,
            ..fast_config()
        })
        .await;

        let until = authorizer
            .unlock_settings(id, Some("password"), None)
            .await
            .unwrap()
            .unwrap();
        assert!(until > Utc::now());

        assert_eq!(
            authorizer.unlock_settings(id, None, Some(until)).await.unwrap(),
            Some(until)
        );
        assert!(matches!(
            authorizer
                .unlock_settings(id, None, Some(Utc::now() - Duration::seconds(1)))
                .await,
            Err(StepUpError::SettingsLocked)
        ));
    }
}
