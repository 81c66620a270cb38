//! SeaORM database migrations.

pub use sea_orm_migration::prelude::*;

mod m20261019_000001_create_masters;
mod m20261019_000002_create_inspections;
mod m20261019_000003_create_inspection_items;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261019_000001_create_masters::Migration),
            Box::new(m20261019_000002_create_inspections::Migration),
            Box::new(m20261019_000003_create_inspection_items::Migration),
        ]
    }
}
