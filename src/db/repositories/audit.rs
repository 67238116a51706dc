use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::db::now_timestamp;
use crate::entities::{activity_logs, pin_audit_logs, prelude::*};

/// One step-up verification outcome, ready to persist.
#[derive(Debug, Clone)]
pub struct PinAuditRecord {
    pub admin_id: i32,
    pub action_key: String,
    pub entity_type: Option<String>,
    pub entity_public_id: Option<String>,
    pub success: bool,
    pub method: &'static str,
}

/// Append-only access to the activity and PIN audit tables.
pub struct AuditRepository {
    conn: DatabaseConnection,
}

impl AuditRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn insert_activity(
        &self,
        admin_id: Option<i32>,
        action_key: &str,
        description: &str,
        context: Option<serde_json::Value>,
    ) -> Result<()> {
        activity_logs::ActiveModel {
            admin_id: Set(admin_id),
            action_key: Set(action_key.to_string()),
            description: Set(description.to_string()),
            context: Set(context),
            created_at: Set(now_timestamp()),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert activity log")?;

        Ok(())
    }

    pub async fn insert_pin_audit(&self, record: PinAuditRecord) -> Result<()> {
        pin_audit_logs::ActiveModel {
            admin_id: Set(record.admin_id),
            action_key: Set(record.action_key),
            entity_type: Set(record.entity_type),
            entity_public_id: Set(record.entity_public_id),
            status: Set(if record.success { "success" } else { "failure" }.to_string()),
            metadata: Set(Some(serde_json::json!({ "method": record.method }))),
            created_at: Set(now_timestamp()),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert pin audit log")?;

        Ok(())
    }

    pub async fn recent_activity(
        &self,
        admin_id: Option<i32>,
        limit: u64,
    ) -> Result<Vec<activity_logs::Model>> {
        let mut query = ActivityLogs::find()
            .order_by_desc(activity_logs::Column::CreatedAt)
            .order_by_desc(activity_logs::Column::Id);

        if let Some(admin_id) = admin_id {
            query = query.filter(activity_logs::Column::AdminId.eq(admin_id));
        }

        query
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to query activity logs")
    }

    pub async fn recent_pin_audit(
        &self,
        admin_id: Option<i32>,
        limit: u64,
    ) -> Result<Vec<pin_audit_logs::Model>> {
        let mut query = PinAuditLogs::find()
            .order_by_desc(pin_audit_logs::Column::CreatedAt)
            .order_by_desc(pin_audit_logs::Column::Id);

        if let Some(admin_id) = admin_id {
            query = query.filter(pin_audit_logs::Column::AdminId.eq(admin_id));
        }

        query
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to query pin audit logs")
    }
}
