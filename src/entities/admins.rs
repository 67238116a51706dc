use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "admins")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub public_id: String,

    #[sea_orm(unique)]
    pub username: String,

    pub name: String,

    #[sea_orm(unique)]
    pub email: String,

    /// Argon2id password hash
    pub password_hash: String,

    /// Argon2id hash of the management PIN. Step-up falls back to the
    /// password hash while this is empty.
    pub management_pin_hash: Option<String>,

    pub two_factor_secret: Option<String>,

    /// "active", "pending" or "rejected"
    pub status: String,

    pub failed_login_attempts: i32,

    pub locked_until: Option<String>,

    pub last_login_at: Option<String>,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
