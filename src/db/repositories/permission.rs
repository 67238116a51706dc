use anyhow::{Context, Result};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use std::collections::BTreeMap;

use crate::db::now_timestamp;
use crate::domain::ActionKey;
use crate::entities::{pin_permissions, prelude::*};

pub struct PermissionRepository {
    conn: DatabaseConnection,
}

impl PermissionRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// `None` when the pair has never been configured.
    pub async fn get(&self, entity_type: &str, action_type: &str) -> Result<Option<bool>> {
        let row = PinPermissions::find()
            .filter(pin_permissions::Column::EntityType.eq(entity_type))
            .filter(pin_permissions::Column::ActionType.eq(action_type))
            .one(&self.conn)
            .await
            .context("Failed to query pin permission")?;

        Ok(row.map(|r| r.requires_pin))
    }

    pub async fn upsert(
        &self,
        entity_type: &str,
        action_type: &str,
        requires_pin: bool,
        updated_by: Option<i32>,
    ) -> Result<()> {
        upsert_on(&self.conn, entity_type, action_type, requires_pin, updated_by).await
    }

    /// Writes every entry or none of them.
    pub async fn upsert_many(
        &self,
        entries: &[(ActionKey, bool)],
        updated_by: Option<i32>,
    ) -> Result<()> {
        let txn = self.conn.begin().await?;

        for (key, requires_pin) in entries {
            upsert_on(
                &txn,
                key.entity.as_str(),
                key.action.as_str(),
                *requires_pin,
                updated_by,
            )
            .await?;
        }

        txn.commit().await?;
        Ok(())
    }

    /// All configured pairs keyed as `entity.action`.
    pub async fn list(&self) -> Result<BTreeMap<String, bool>> {
        let rows = PinPermissions::find()
            .order_by_asc(pin_permissions::Column::EntityType)
            .order_by_asc(pin_permissions::Column::ActionType)
            .all(&self.conn)
            .await
            .context("Failed to list pin permissions")?;

        Ok(rows
            .into_iter()
            .map(|r| (format!("{}.{}", r.entity_type, r.action_type), r.requires_pin))
            .collect())
    }
}

async fn upsert_on<C>(
    db: &C,
    entity_type: &str,
    action_type: &str,
    requires_pin: bool,
    updated_by: Option<i32>,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let row = pin_permissions::ActiveModel {
        entity_type: Set(entity_type.to_string()),
        action_type: Set(action_type.to_string()),
        requires_pin: Set(requires_pin),
        updated_by: Set(updated_by),
        updated_at: Set(now_timestamp()),
        ..Default::default()
    };

    PinPermissions::insert(row)
        .on_conflict(
            OnConflict::columns([
                pin_permissions::Column::EntityType,
                pin_permissions::Column::ActionType,
            ])
            .update_columns([
                pin_permissions::Column::RequiresPin,
                pin_permissions::Column::UpdatedBy,
                pin_permissions::Column::UpdatedAt,
            ])
            .to_owned(),
        )
        .exec_without_returning(db)
        .await
        .context("Failed to upsert pin permission")?;

    Ok(())
}
