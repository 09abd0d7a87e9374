use sea_orm_migration::prelude::*;

pub use sea_orm_migration::MigratorTrait;

mod m20250301_000001_create_members_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20250301_000001_create_members_table::Migration)]
    }
}

/// Common table and column identifiers
#[derive(Iden)]
pub enum Members {
    Table,
    Id,
    Email,
    DisplayName,
    ProfileImage,
    CreatedAt,
    UpdatedAt,
}
