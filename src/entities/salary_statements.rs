use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "salary_statements")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub public_id: String,
    pub professor_id: i32,
    pub class_id: Option<i32>,
    pub pay_month: String,
    pub base_amount: f64,
    pub advances: f64,
    pub paid_amount: f64,
    /// base_amount - advances - paid_amount
    pub balance: f64,
    pub status: String,
    pub notes: Option<String>,
    pub confirmed_at: Option<String>,
    pub confirmed_by: Option<i32>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
