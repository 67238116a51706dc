use crate::entities::prelude::*;
use crate::entities::{
    activity_logs, admins, login_attempts, password_reset_tokens, permission_access_tokens,
    pin_audit_logs, pin_permissions, public_id_counters, settings,
};
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Hash the bootstrap password using Argon2id
fn hash_default_password() -> Result<String, DbErr> {
    use argon2::{
        Argon2,
        password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
    };

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(b"password", &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DbErr::Custom(format!("Failed to hash default password: {e}")))
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        manager
            .create_table(schema.create_table_from_entity(Admins).if_not_exists().to_owned())
            .await?;
        manager
            .create_table(
                schema
                    .create_table_from_entity(LoginAttempts)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                schema
                    .create_table_from_entity(PinPermissions)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                schema
                    .create_table_from_entity(PinAuditLogs)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                schema
                    .create_table_from_entity(ActivityLogs)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                schema
                    .create_table_from_entity(PasswordResetTokens)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                schema
                    .create_table_from_entity(PermissionAccessTokens)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                schema
                    .create_table_from_entity(PublicIdCounters)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(schema.create_table_from_entity(Settings).if_not_exists().to_owned())
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_pin_permissions_entity_action")
                    .table(PinPermissions)
                    .col(pin_permissions::Column::EntityType)
                    .col(pin_permissions::Column::ActionType)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_settings_group_key")
                    .table(Settings)
                    .col(settings::Column::SettingsGroup)
                    .col(settings::Column::SettingKey)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Windowed failure counting scans by identifier, address and time
        manager
            .create_index(
                Index::create()
                    .name("idx_login_attempts_lookup")
                    .table(LoginAttempts)
                    .col(login_attempts::Column::Identifier)
                    .col(login_attempts::Column::IpAddress)
                    .col(login_attempts::Column::AttemptedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_activity_logs_created_at")
                    .table(ActivityLogs)
                    .col(activity_logs::Column::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_pin_audit_logs_created_at")
                    .table(PinAuditLogs)
                    .col(pin_audit_logs::Column::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_password_reset_tokens_admin")
                    .table(PasswordResetTokens)
                    .col(password_reset_tokens::Column::AdminId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_permission_access_tokens_admin")
                    .table(PermissionAccessTokens)
                    .col(permission_access_tokens::Column::AdminId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Seed the bootstrap admin and its public ID counter
        let now = crate::db::now_timestamp();
        let password_hash = hash_default_password()?;

        let insert = Query::insert()
            .into_table(Admins)
            .columns([
                admins::Column::PublicId,
                admins::Column::Username,
                admins::Column::Name,
                admins::Column::Email,
                admins::Column::PasswordHash,
                admins::Column::Status,
                admins::Column::FailedLoginAttempts,
                admins::Column::CreatedAt,
                admins::Column::UpdatedAt,
            ])
            .values_panic([
                "ADM-1".into(),
                "admin".into(),
                "Administrator".into(),
                "admin@eduflow.local".into(),
                password_hash.into(),
                "active".into(),
                0_i32.into(),
                now.clone().into(),
                now.into(),
            ])
            .to_owned();

        manager.exec_stmt(insert).await?;

        let counter = Query::insert()
            .into_table(PublicIdCounters)
            .columns([
                public_id_counters::Column::Prefix,
                public_id_counters::Column::LastValue,
            ])
            .values_panic(["ADM".into(), 1_i64.into()])
            .to_owned();

        manager.exec_stmt(counter).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Settings).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PublicIdCounters).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PermissionAccessTokens).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PasswordResetTokens).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ActivityLogs).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PinAuditLogs).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PinPermissions).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LoginAttempts).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Admins).to_owned())
            .await?;

        Ok(())
    }
}
