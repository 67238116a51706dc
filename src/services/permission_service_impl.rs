//! `SeaORM` implementation of the `PermissionService` trait.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::config::SecurityConfig;
use crate::constants::tokens::{PERMISSION_ACCESS_TTL_MINUTES, PERMISSION_GRANT_MINUTES};
use crate::db::Store;
use crate::db::repositories::admin::hash_password_blocking;
use crate::domain::{ActionKey, ActionKind, EntityKind};
use crate::services::audit::AuditService;
use crate::services::mailer::{Mailer, permission_access_message};
use crate::services::permission_service::{
    AccessRequest, PermissionError, PermissionService, ensure_access,
};
use crate::services::step_up::pin_meets_policy;

pub struct SeaOrmPermissionService {
    store: Store,
    audit: AuditService,
    mailer: Arc<dyn Mailer>,
    config: SecurityConfig,
}

impl SeaOrmPermissionService {
    #[must_use]
    pub fn new(store: Store, mailer: Arc<dyn Mailer>, config: SecurityConfig) -> Self {
        Self {
            audit: AuditService::new(store.clone()),
            store,
            mailer,
            config,
        }
    }
}

/// Keeps only entries naming a known entity and action. Everything else
/// is dropped without error.
fn known_entries(requirements: &BTreeMap<String, bool>) -> Vec<(ActionKey, bool)> {
    requirements
        .iter()
        .filter_map(|(key, requires_pin)| {
            key.trim()
                .parse::<ActionKey>()
                .ok()
                .map(|key| (key, *requires_pin))
        })
        .collect()
}

#[async_trait]
impl PermissionService for SeaOrmPermissionService {
    async fn is_pin_required(&self, key: ActionKey) -> Result<bool, PermissionError> {
        let stored = self
            .store
            .permission_repo()
            .get(key.entity.as_str(), key.action.as_str())
            .await?;
        Ok(stored.unwrap_or(false))
    }

    async fn set_permission(
        &self,
        key: ActionKey,
        requires_pin: bool,
        updated_by: Option<i32>,
    ) -> Result<(), PermissionError> {
        self.store
            .permission_repo()
            .upsert(key.entity.as_str(), key.action.as_str(), requires_pin, updated_by)
            .await?;
        Ok(())
    }

    async fn bulk_set(
        &self,
        requirements: &BTreeMap<String, bool>,
        updated_by: Option<i32>,
    ) -> Result<usize, PermissionError> {
        let entries = known_entries(requirements);
        if entries.is_empty() {
            return Ok(0);
        }

        self.store
            .permission_repo()
            .upsert_many(&entries, updated_by)
            .await?;
        Ok(entries.len())
    }

    async fn list(&self) -> Result<BTreeMap<String, bool>, PermissionError> {
        let mut matrix: BTreeMap<String, bool> = EntityKind::ALL
            .iter()
            .flat_map(|entity| {
                ActionKind::ALL
                    .iter()
                    .map(move |action| (ActionKey::new(*entity, *action).to_string(), false))
            })
            .collect();

        for (key, requires_pin) in self.store.permission_repo().list().await? {
            if let Some(slot) = matrix.get_mut(&key) {
                *slot = requires_pin;
            }
        }
        Ok(matrix)
    }

    async fn request_access(
        &self,
        admin_id: i32,
        username: &str,
    ) -> Result<AccessRequest, PermissionError> {
        let admin = self
            .store
            .admin_repo()
            .find_by_id(admin_id)
            .await?
            .ok_or(PermissionError::NotFound)?;

        if admin.username != username.trim() {
            return Err(PermissionError::InvalidUsername);
        }

        let grant = self
            .store
            .token_repo()
            .issue_access_token(
                admin.id,
                &admin.email,
                Duration::minutes(PERMISSION_ACCESS_TTL_MINUTES),
            )
            .await?;

        self.mailer
            .send(permission_access_message(&admin.email, &grant.code))
            .await?;

        self.audit
            .record_activity(
                Some(admin.id),
                "permissions.access_requested",
                "Requested access to PIN permissions",
                None,
            )
            .await;

        info!(admin = %admin.public_id, "Permission access code issued");

        Ok(AccessRequest {
            email: admin.email,
            expires_at: grant.expires_at,
            code: self.config.expose_verification_codes.then_some(grant.code),
        })
    }

    async fn verify_access(
        &self,
        admin_id: i32,
        code: &str,
    ) -> Result<DateTime<Utc>, PermissionError> {
        let code = code.trim();
        if code.is_empty()
            || !self
                .store
                .token_repo()
                .consume_access_token(admin_id, code)
                .await?
        {
            return Err(PermissionError::InvalidToken);
        }

        self.audit
            .record_activity(
                Some(admin_id),
                "permissions.access_granted",
                "Verified access to PIN permissions",
                None,
            )
            .await;

        Ok(Utc::now() + Duration::minutes(PERMISSION_GRANT_MINUTES))
    }

    async fn update_permissions(
        &self,
        admin_id: i32,
        grant_expires: Option<DateTime<Utc>>,
        requirements: &BTreeMap<String, bool>,
    ) -> Result<BTreeMap<String, bool>, PermissionError> {
        ensure_access(grant_expires)?;

        let written = self.bulk_set(requirements, Some(admin_id)).await?;

        self.audit
            .record_activity(
                Some(admin_id),
                "permissions.updated",
                "Updated PIN permissions",
                Some(serde_json::json!({ "count": written })),
            )
            .await;

        self.list().await
    }

    async fn change_pin(
        &self,
        admin_id: i32,
        grant_expires: Option<DateTime<Utc>>,
        new_pin: &str,
    ) -> Result<(), PermissionError> {
        ensure_access(grant_expires)?;

        if !pin_meets_policy(new_pin, self.config.pin_min_length) {
            return Err(PermissionError::WeakPin(self.config.pin_min_length));
        }

        let hash = hash_password_blocking(new_pin, &self.config).await?;
        self.store.admin_repo().set_pin_hash(admin_id, hash).await?;

        self.audit
            .record_activity(
                Some(admin_id),
                "permissions.pin_changed",
                "Changed management PIN",
                None,
            )
            .await;

        Ok(())
    }
}
