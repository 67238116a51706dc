use tracing::warn;

use crate::db::Store;
use crate::db::repositories::audit::PinAuditRecord;
use crate::entities::{activity_logs, pin_audit_logs};

/// Writes to the activity and PIN audit logs.
///
/// Writes never fail the caller: a lost audit row is logged and counted,
/// the operation that produced it still completes.
#[derive(Clone)]
pub struct AuditService {
    store: Store,
}

impl AuditService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn record_activity(
        &self,
        admin_id: Option<i32>,
        action_key: &str,
        description: &str,
        context: Option<serde_json::Value>,
    ) {
        if let Err(e) = self
            .store
            .audit_repo()
            .insert_activity(admin_id, action_key, description, context)
            .await
        {
            metrics::counter!("audit_write_failures_total", "log" => "activity").increment(1);
            warn!(error = %e, action_key, "Failed to record activity");
        }
    }

    pub async fn record_pin_verification(&self, record: PinAuditRecord) {
        let action_key = record.action_key.clone();
        if let Err(e) = self.store.audit_repo().insert_pin_audit(record).await {
            metrics::counter!("audit_write_failures_total", "log" => "pin").increment(1);
            warn!(error = %e, action_key, "Failed to record PIN verification");
        }
    }

    pub async fn recent_activity(
        &self,
        admin_id: Option<i32>,
        limit: u64,
    ) -> anyhow::Result<Vec<activity_logs::Model>> {
        self.store.audit_repo().recent_activity(admin_id, limit).await
    }

    pub async fn recent_pin_audit(
        &self,
        admin_id: Option<i32>,
        limit: u64,
    ) -> anyhow::Result<Vec<pin_audit_logs::Model>> {
        self.store.audit_repo().recent_pin_audit(admin_id, limit).await
    }
}
