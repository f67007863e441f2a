use sea_orm_migration::{MigrationTrait, MigratorTrait, async_trait::async_trait};

mod m001_create_access_log;
mod m002_create_sync_watermark;

pub(crate) struct Migrator;

#[async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m001_create_access_log::Migration),
            Box::new(m002_create_sync_watermark::Migration),
        ]
    }
}
