use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::config::SecurityConfig;
use crate::db::Store;
use crate::db::repositories::admin::hash_password_blocking;
use crate::db::repositories::settings::GroupedSettings;
use crate::services::audit::AuditService;
use crate::services::permission_service::{PermissionError, PermissionService};
use crate::services::step_up::pin_meets_policy;

pub const SECURITY_GROUP: &str = "security";
const MANAGEMENT_PIN_KEY: &str = "management_pin";
const PIN_REQUIREMENTS_KEY: &str = "pin_requirements";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Missing required fields")]
    MissingFields(Vec<String>),

    #[error("Unknown security setting: {0}")]
    InvalidKey(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("PIN must be at least {0} characters")]
    WeakPin(usize),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for SettingsError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for SettingsError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<PermissionError> for SettingsError {
    fn from(err: PermissionError) -> Self {
        match err {
            PermissionError::Database(e) => Self::Database(e),
            other => Self::Internal(other.to_string()),
        }
    }
}

/// Grouped key/value settings plus the two security keys that map onto
/// the admin's PIN and the permission matrix.
///
/// Callers must have passed the settings unlock before writing to the
/// `security` group.
pub struct SettingsService {
    store: Store,
    audit: AuditService,
    permissions: Arc<dyn PermissionService>,
    config: SecurityConfig,
}

impl SettingsService {
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

    pub async fn grouped(&self) -> Result<GroupedSettings, SettingsError> {
        Ok(self.store.settings_repo().grouped().await?)
    }

    #[must_use]
    pub fn is_security_group(group: &str) -> bool {
        group.trim() == SECURITY_GROUP
    }

    pub async fn update(
        &self,
        admin_id: i32,
        group: &str,
        key: &str,
        value: serde_json::Value,
    ) -> Result<GroupedSettings, SettingsError> {
        let group = group.trim();
        let key = key.trim();

        let mut missing = Vec::new();
        if group.is_empty() {
            missing.push("group".to_string());
        }
        if key.is_empty() {
            missing.push("key".to_string());
        }
        if !missing.is_empty() {
            return Err(SettingsError::MissingFields(missing));
        }

        if Self::is_security_group(group) {
            self.update_security(admin_id, key, value).await?;
        } else {
            let stored = match value {
                serde_json::Value::Null => None,
                serde_json::Value::String(s) => Some(s),
                other => Some(other.to_string()),
            };
            self.store.settings_repo().upsert(group, key, stored).await?;

            self.audit
                .record_activity(
                    Some(admin_id),
                    "settings.update",
                    &format!("Updated setting {group}.{key}"),
                    Some(serde_json::json!({ "group": group, "key": key })),
                )
                .await;
        }

        self.grouped().await
    }

    async fn update_security(
        &self,
        admin_id: i32,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), SettingsError> {
        match key {
            MANAGEMENT_PIN_KEY => {
                let pin = value.as_str().unwrap_or_default();
                if !pin_meets_policy(pin, self.config.pin_min_length) {
                    return Err(SettingsError::WeakPin(self.config.pin_min_length));
                }

                let hash = hash_password_blocking(pin, &self.config).await?;
                self.store.admin_repo().set_pin_hash(admin_id, hash).await?;

                self.audit
                    .record_activity(
                        Some(admin_id),
                        "settings.pin_change",
                        "Changed management PIN from settings",
                        None,
                    )
                    .await;
            }
            PIN_REQUIREMENTS_KEY => {
                let requirements: BTreeMap<String, bool> = serde_json::from_value(value)
                    .map_err(|e| SettingsError::InvalidValue(e.to_string()))?;

                let written = self
                    .permissions
                    .bulk_set(&requirements, Some(admin_id))
                    .await?;

                self.audit
                    .record_activity(
                        Some(admin_id),
                        "settings.update",
                        "Updated PIN requirements",
                        Some(serde_json::json!({ "key": key, "count": written })),
                    )
                    .await;
            }
            other => return Err(SettingsError::InvalidKey(other.to_string())),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ActionKey, ActionKind, EntityKind};
    use crate::services::mailer::LogMailer;
    use crate::services::permission_service_impl::SeaOrmPermissionService;
    use crate::services::step_up::StepUpAuthorizer;
    use serde_json::json;

    async fn setup() -> (Store, Arc<SeaOrmPermissionService>, SettingsService, i32) {
        let config = SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            ..SecurityConfig::default()
        };
        let store = Store::new("sqlite::memory:").await.unwrap();
        let permissions = Arc::new(SeaOrmPermissionService::new(
            store.clone(),
            Arc::new(LogMailer),
            config.clone(),
        ));
        let service = SettingsService::new(store.clone(), permissions.clone(), config);
        let id = store
            .admin_repo()
            .find_by_username("admin")
            .await
            .unwrap()
            .unwrap()
            .id;
        (store, permissions, service, id)
    }

    #[tokio::test]
    async fn plain_groups_are_upserted() {
        let (_, _, service, id) = setup().await;

        service
            .update(id, "business", "name", json!("EduFlow Academy"))
            .await
            .unwrap();
        let grouped = service
            .update(id, "business", "capacity", json!(40))
            .await
            .unwrap();

        assert_eq!(
            grouped["business"]["name"].as_deref(),
            Some("EduFlow Academy")
        );
        assert_eq!(grouped["business"]["capacity"].as_deref(), Some("40"));
    }

    #[tokio::test]
    async fn security_keys() {
        let (store, permissions, service, id) = setup().await;

        assert!(matches!(
            service.update(id, "security", "something", json!("x")).await,
            Err(SettingsError::InvalidKey(_))
        ));
        assert!(matches!(
            service.update(id, "security", "management_pin", json!("12")).await,
            Err(SettingsError::WeakPin(4))
        ));

        service
            .update(id, "security", "management_pin", json!("9876"))
            .await
            .unwrap();
        let admin = store.admin_repo().find_by_id(id).await.unwrap().unwrap();
        assert!(admin.management_pin_hash.is_some());

        service
            .update(
                id,
                "security",
                "pin_requirements",
                json!({ "student.delete": true, "nonsense": true }),
            )
            .await
            .unwrap();
        assert!(
            permissions
                .is_pin_required(ActionKey::new(EntityKind::Student, ActionKind::Delete))
                .await
                .unwrap()
        );

        assert!(matches!(
            service
                .update(id, "security", "pin_requirements", json!("all"))
                .await,
            Err(SettingsError::InvalidValue(_))
        ));
    }

    #[tokio::test]
    async fn management_pin_is_stored_as_typed() {
        let (store, permissions, service, id) = setup().await;
        let step_up = StepUpAuthorizer::new(
            store,
            permissions,
            SecurityConfig {
                argon2_memory_cost_kib: 1024,
                argon2_time_cost: 1,
                ..SecurityConfig::default()
            },
        );

        assert!(matches!(
            service.update(id, "security", "management_pin", json!("    ")).await,
            Err(SettingsError::WeakPin(4))
        ));

        service
            .update(id, "security", "management_pin", json!(" 1234"))
            .await
            .unwrap();

        assert!(step_up.verify(id, " 1234", "settings.unlock", None, None).await.unwrap());
        assert!(!step_up.verify(id, "1234", "settings.unlock", None, None).await.unwrap());
    }
}
