use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use sea_orm::sea_query::Expr;

use super::admin::{generate_code, generate_token};
use crate::db::{now_timestamp, timestamp};
use crate::entities::{password_reset_tokens, permission_access_tokens, prelude::*};

/// A freshly issued permission access token and its mailed code.
#[derive(Debug, Clone)]
pub struct AccessGrant {
    pub token: String,
    pub code: String,
    pub expires_at: String,
}

/// Single-use tokens. Consumption is one conditional UPDATE, so a token can
/// be redeemed at most once even under concurrent requests.
pub struct TokenRepository {
    conn: DatabaseConnection,
}

impl TokenRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Drops the admin's outstanding reset tokens and issues a new one.
    pub async fn issue_reset_token(
        &self,
        admin_id: i32,
        ip_address: Option<String>,
        user_agent: Option<String>,
        ttl: Duration,
    ) -> Result<String> {
        PasswordResetTokens::delete_many()
            .filter(password_reset_tokens::Column::AdminId.eq(admin_id))
            .filter(password_reset_tokens::Column::UsedAt.is_null())
            .exec(&self.conn)
            .await
            .context("Failed to clear old reset tokens")?;

        let token = generate_token();

        password_reset_tokens::ActiveModel {
            token: Set(token.clone()),
            admin_id: Set(admin_id),
            ip_address: Set(ip_address),
            user_agent: Set(user_agent),
            expires_at: Set(timestamp(Utc::now() + ttl)),
            used_at: Set(None),
            created_at: Set(now_timestamp()),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert reset token")?;

        Ok(token)
    }

    /// Marks the token used and returns its admin, or `None` when the token
    /// is unknown, expired or already used.
    pub async fn consume_reset_token(&self, token: &str) -> Result<Option<i32>> {
        let now = now_timestamp();

        let result = PasswordResetTokens::update_many()
            .col_expr(password_reset_tokens::Column::UsedAt, Expr::value(now.clone()))
            .filter(password_reset_tokens::Column::Token.eq(token))
            .filter(password_reset_tokens::Column::UsedAt.is_null())
            .filter(password_reset_tokens::Column::ExpiresAt.gt(now))
            .exec(&self.conn)
            .await
            .context("Failed to consume reset token")?;

        if result.rows_affected == 0 {
            return Ok(None);
        }

        let row = PasswordResetTokens::find()
            .filter(password_reset_tokens::Column::Token.eq(token))
            .one(&self.conn)
            .await
            .context("Failed to load consumed reset token")?;

        Ok(row.map(|r| r.admin_id))
    }

    pub async fn issue_access_token(
        &self,
        admin_id: i32,
        email: &str,
        ttl: Duration,
    ) -> Result<AccessGrant> {
        PermissionAccessTokens::delete_many()
            .filter(permission_access_tokens::Column::AdminId.eq(admin_id))
            .filter(permission_access_tokens::Column::UsedAt.is_null())
            .exec(&self.conn)
            .await
            .context("Failed to clear old access tokens")?;

        let grant = AccessGrant {
            token: generate_token(),
            code: generate_code(),
            expires_at: timestamp(Utc::now() + ttl),
        };

        permission_access_tokens::ActiveModel {
            token: Set(grant.token.clone()),
            code: Set(grant.code.clone()),
            admin_id: Set(admin_id),
            email_sent_to: Set(email.to_string()),
            expires_at: Set(grant.expires_at.clone()),
            used_at: Set(None),
            created_at: Set(now_timestamp()),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert access token")?;

        Ok(grant)
    }

    /// Redeems an access token by its code or full token. Only tokens issued
    /// to `admin_id` match.
    pub async fn consume_access_token(&self, admin_id: i32, code_or_token: &str) -> Result<bool> {
        let now = now_timestamp();

        let result = PermissionAccessTokens::update_many()
            .col_expr(permission_access_tokens::Column::UsedAt, Expr::value(now.clone()))
            .filter(permission_access_tokens::Column::AdminId.eq(admin_id))
            .filter(
                Condition::any()
                    .add(permission_access_tokens::Column::Code.eq(code_or_token))
                    .add(permission_access_tokens::Column::Token.eq(code_or_token)),
            )
            .filter(permission_access_tokens::Column::UsedAt.is_null())
            .filter(permission_access_tokens::Column::ExpiresAt.gt(now))
            .exec(&self.conn)
            .await
            .context("Failed to consume access token")?;

        Ok(result.rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Store;

    async fn admin_id(store: &Store) -> i32 {
        store
            .admin_repo()
            .find_by_username("admin")
            .await
            .unwrap()
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn reset_token_is_single_use() {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let repo = store.token_repo();
        let id = admin_id(&store).await;

        let token = repo
            .issue_reset_token(id, None, None, Duration::minutes(60))
            .await
            .unwrap();

        assert_eq!(repo.consume_reset_token(&token).await.unwrap(), Some(id));
        assert_eq!(repo.consume_reset_token(&token).await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_reset_token_is_rejected() {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let repo = store.token_repo();
        let id = admin_id(&store).await;

        let token = repo
            .issue_reset_token(id, None, None, Duration::minutes(-1))
            .await
            .unwrap();

        assert_eq!(repo.consume_reset_token(&token).await.unwrap(), None);
    }

    #[tokio::test]
    async fn reissuing_invalidates_previous_reset_token() {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let repo = store.token_repo();
        let id = admin_id(&store).await;

        let first = repo
            .issue_reset_token(id, None, None, Duration::minutes(60))
            .await
            .unwrap();
        let second = repo
            .issue_reset_token(id, None, None, Duration::minutes(60))
            .await
            .unwrap();

        assert_eq!(repo.consume_reset_token(&first).await.unwrap(), None);
        assert_eq!(repo.consume_reset_token(&second).await.unwrap(), Some(id));
    }

    #[tokio::test]
    async fn access_code_only_redeems_for_owner() {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let repo = store.token_repo();
        let id = admin_id(&store).await;

        let grant = repo
            .issue_access_token(id, "admin@eduflow.local", Duration::minutes(15))
            .await
            .unwrap();

        assert!(!repo.consume_access_token(id + 1, &grant.code).await.unwrap());
        assert!(repo.consume_access_token(id, &grant.code).await.unwrap());
        assert!(!repo.consume_access_token(id, &grant.token).await.unwrap());
    }
}
