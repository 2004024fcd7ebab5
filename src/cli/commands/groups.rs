use super::open_service;
use crate::config::Config;
use crate::domain::{GroupId, UserId};
use crate::services::{AuthService, NewGroup};

pub async fn cmd_list_groups(config: &Config) -> anyhow::Result<()> {
    let service = open_service(config).await?;
    let groups = service.list_groups().await?;

    if groups.is_empty() {
        println!("No groups.");
        println!();
        println!("Create the default groups with: apex init");
        return Ok(());
    }

    println!("Groups ({} total)", groups.len());
    println!("{:-<60}", "");

    for group in groups {
        let members = service.group_members(GroupId::new(group.id)).await?;
        println!("• {} ({} members)", group.name, members.len());
        if !group.description.is_empty() {
            println!("  {}", group.description);
        }
    }

    Ok(())
}

pub async fn cmd_create_group(config: &Config, name: &str, description: &str) -> anyhow::Result<()> {
    let service = open_service(config).await?;
    let group = service
        .create_group(
            NewGroup {
                name: name.to_string(),
                description: description.to_string(),
            },
            None,
        )
        .await?;

    println!("✓ Created group '{}' (ID: {})", group.name, group.id);
    Ok(())
}

pub async fn cmd_delete_group(config: &Config, id: i32) -> anyhow::Result<()> {
    let service = open_service(config).await?;
    let group = service.delete_group(GroupId::new(id), None).await?;

    println!("✓ Deleted group '{}' (ID: {})", group.name, group.id);
    Ok(())
}

pub async fn cmd_add_to_group(config: &Config, user_id: i32, group_id: i32) -> anyhow::Result<()> {
    let service = open_service(config).await?;
    service
        .add_to_group(UserId::new(user_id), GroupId::new(group_id))
        .await?;

    println!("✓ Added user {user_id} to group {group_id}");
    Ok(())
}

pub async fn cmd_remove_from_group(
    config: &Config,
    user_id: i32,
    group_id: i32,
) -> anyhow::Result<()> {
    let service = open_service(config).await?;
    let removed = service
        .remove_from_group(UserId::new(user_id), GroupId::new(group_id))
        .await?;

    if removed {
        println!("✓ Removed user {user_id} from group {group_id}");
    } else {
        println!("User {user_id} is not in group {group_id}");
    }
    Ok(())
}
