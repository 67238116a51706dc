use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "classes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub public_id: String,
    pub course_id: i32,
    pub name: String,
    pub level: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Weekly slots as a JSON array.
    pub schedule: Option<Json>,
    pub monthly_price: f64,
    pub professor_class_pay: f64,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
