use anyhow::{Context, Result};
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder, Set};
use std::collections::BTreeMap;

use crate::db::now_timestamp;
use crate::entities::{prelude::*, settings};

/// Settings grouped as `group -> key -> value`.
pub type GroupedSettings = BTreeMap<String, BTreeMap<String, Option<String>>>;

pub struct SettingsRepository {
    conn: DatabaseConnection,
}

impl SettingsRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn grouped(&self) -> Result<GroupedSettings> {
        let rows = Settings::find()
            .order_by_asc(settings::Column::SettingsGroup)
            .order_by_asc(settings::Column::SettingKey)
            .all(&self.conn)
            .await
            .context("Failed to load settings")?;

        let mut grouped = GroupedSettings::new();
        for row in rows {
            grouped
                .entry(row.settings_group)
                .or_default()
                .insert(row.setting_key, row.setting_value);
        }
        Ok(grouped)
    }

    pub async fn upsert(&self, group: &str, key: &str, value: Option<String>) -> Result<()> {
        let row = settings::ActiveModel {
            settings_group: Set(group.to_string()),
            setting_key: Set(key.to_string()),
            setting_value: Set(value),
            updated_at: Set(now_timestamp()),
            ..Default::default()
        };

        Settings::insert(row)
            .on_conflict(
                OnConflict::columns([settings::Column::SettingsGroup, settings::Column::SettingKey])
                    .update_columns([settings::Column::SettingValue, settings::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await
            .context("Failed to upsert setting")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Store;

    #[tokio::test]
    async fn upsert_overwrites_and_groups() {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let repo = store.settings_repo();

        repo.upsert("business", "name", Some("Old".to_string()))
            .await
            .unwrap();
        repo.upsert("business", "name", Some("EduFlow Academy".to_string()))
            .await
            .unwrap();
        repo.upsert("app", "currency", Some("DZD".to_string()))
            .await
            .unwrap();

        let grouped = repo.grouped().await.unwrap();
        assert_eq!(grouped.len(), 2);
        assert_eq!(
            grouped["business"]["name"].as_deref(),
            Some("EduFlow Academy")
        );
    }
}
