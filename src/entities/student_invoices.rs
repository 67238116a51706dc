use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "student_invoices")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub public_id: String,
    pub class_id: i32,
    pub student_id: i32,
    pub plan_month: String,
    pub due_amount: f64,
    pub paid_amount: f64,
    /// "due", "partial" or "paid"
    pub status: String,
    pub tax: String,
    pub notes: Option<String>,
    pub confirmed_at: Option<String>,
    pub confirmed_by: Option<i32>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
