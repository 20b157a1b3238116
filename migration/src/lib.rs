pub use sea_orm_migration::prelude::*;

mod m20250801_000001_create_serveries;
mod m20250801_000002_create_users;
mod m20250801_000003_create_orders;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250801_000001_create_serveries::Migration),
            Box::new(m20250801_000002_create_users::Migration),
            Box::new(m20250801_000003_create_orders::Migration),
        ]
    }
}
