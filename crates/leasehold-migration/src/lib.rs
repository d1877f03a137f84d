//! Leasehold schema migrations
//!
//! Run with `Migrator::up(&db, None)` or through the `leasehold migrate` command.

pub use sea_orm_migration::prelude::*;

mod m20251025_000000_create_locks_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20251025_000000_create_locks_table::Migration)]
    }
}
