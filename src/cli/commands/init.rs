use crate::config::Config;
use crate::db::Store;

pub async fn cmd_init(config: &Config) -> anyhow::Result<()> {
    Config::create_default_if_missing()?;

    let store = Store::initialize(config).await?;
    let groups = store.list_groups().await?;

    println!("✓ Database ready at {}", config.general.database_path);
    println!("Groups ({}):", groups.len());
    for group in groups {
        if group.description.is_empty() {
            println!("  • {}", group.name);
        } else {
            println!("  • {} - {}", group.name, group.description);
        }
    }

    Ok(())
}
