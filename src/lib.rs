pub mod cli;
pub mod config;
pub mod constants;
pub mod db;
pub mod domain;
pub mod entities;
pub mod forms;
pub mod i18n;
pub mod password;
pub mod request;
pub mod services;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
pub use config::Config;

pub async fn run() -> anyhow::Result<()> {
    let config = Config::load()?;
    config.validate()?;

    init_tracing(&config);

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Init => cli::cmd_init(&config).await,

        Commands::Users { page, page_size } => cli::cmd_list_users(&config, page, page_size).await,

        Commands::Groups => cli::cmd_list_groups(&config).await,

        Commands::CreateUser {
            username,
            login,
            email,
            password,
            group,
            groups,
            status,
        } => {
            cli::cmd_create_user(
                &config, &username, &login, &email, password, group, groups, status,
            )
            .await
        }

        Commands::CreateGroup { name, description } => {
            cli::cmd_create_group(&config, &name, &description).await
        }

        Commands::DeleteGroup { id } => cli::cmd_delete_group(&config, id).await,

        Commands::AddToGroup { user_id, group_id } => {
            cli::cmd_add_to_group(&config, user_id, group_id).await
        }

        Commands::RemoveFromGroup { user_id, group_id } => {
            cli::cmd_remove_from_group(&config, user_id, group_id).await
        }

        Commands::DeleteUser { id } => cli::cmd_delete_user(&config, id).await,

        Commands::CheckPassword { username, password } => {
            cli::cmd_check_password(&config, &username, password).await
        }

        Commands::SetStatus { id, status } => cli::cmd_set_status(&config, id, status).await,

        Commands::History { id, limit } => cli::cmd_history(&config, id, limit).await,

        Commands::Profile { id } => cli::cmd_profile(&config, id).await,
    }
}

fn init_tracing(config: &Config) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    if config.observability.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
