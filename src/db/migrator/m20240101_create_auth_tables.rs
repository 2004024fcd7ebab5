use crate::entities::prelude::*;
use crate::entities::{auth_user_log, auth_users};
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        // Parents first so the association and log tables can reference them.
        manager
            .create_table(
                schema
                    .create_table_from_entity(AuthUsers)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(AuthGroups)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(AuthUserGroups)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(AuthUserLog)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        for (name, column) in [
            ("idx_auth_users_login", auth_users::Column::Login),
            ("idx_auth_users_username", auth_users::Column::Username),
            ("idx_auth_users_email", auth_users::Column::Email),
        ] {
            manager
                .create_index(
                    Index::create()
                        .name(name)
                        .table(AuthUsers)
                        .col(column)
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;
        }

        manager
            .create_index(
                Index::create()
                    .name("idx_auth_user_log_user_id")
                    .table(AuthUserLog)
                    .col(auth_user_log::Column::UserId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_auth_user_log_time")
                    .table(AuthUserLog)
                    .col(auth_user_log::Column::Time)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AuthUserLog).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AuthUserGroups).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AuthGroups).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AuthUsers).to_owned())
            .await
    }
}
