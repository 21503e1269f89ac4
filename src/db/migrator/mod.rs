use sea_orm_migration::prelude::*;

mod m20240101_initial;
mod m20260128_add_grouping_patterns;
mod m20260201_add_job_leases;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_initial::Migration),
            Box::new(m20260128_add_grouping_patterns::Migration),
            Box::new(m20260201_add_job_leases::Migration),
        ]
    }
}
