mod groups;
mod history;
mod init;
mod profile;
mod users;

pub use groups::{
    cmd_add_to_group, cmd_create_group, cmd_delete_group, cmd_list_groups, cmd_remove_from_group,
};
pub use history::cmd_history;
pub use init::cmd_init;
pub use profile::cmd_profile;
pub use users::{cmd_check_password, cmd_create_user, cmd_delete_user, cmd_list_users, cmd_set_status};

use crate::config::Config;
use crate::db::Store;
use crate::domain::events::EventBus;
use crate::services::SeaOrmAuthService;

async fn open_service(config: &Config) -> anyhow::Result<SeaOrmAuthService> {
    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;
    let events = EventBus::new(config.general.event_bus_buffer_size);
    Ok(SeaOrmAuthService::new(store, config, events))
}
