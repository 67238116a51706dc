use sea_orm_migration::prelude::*;

mod m20260301_auth_schema;
mod m20260302_registry_schema;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_auth_schema::Migration),
            Box::new(m20260302_registry_schema::Migration),
        ]
    }
}
