use sea_orm_migration::prelude::*;

mod m20240101_create_auth_tables;
mod m20240102_add_user_profiles;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_create_auth_tables::Migration),
            Box::new(m20240102_add_user_profiles::Migration),
        ]
    }
}
