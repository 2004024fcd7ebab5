use super::open_service;
use crate::config::Config;
use crate::domain::UserId;
use crate::services::AuthService;

pub async fn cmd_profile(config: &Config, id: i32) -> anyhow::Result<()> {
    let service = open_service(config).await?;

    let Some(profile) = service.get_profile(UserId::new(id)).await? else {
        println!("Profiles are disabled. Set auth.profiles_enabled = true in config.toml.");
        return Ok(());
    };

    println!("Profile of user {}", profile.user_id);
    println!("{:-<60}", "");
    println!(
        "Display name: {}",
        profile.display_name.as_deref().unwrap_or("-")
    );
    println!("Created: {}", profile.created_at);
    println!("Updated: {}", profile.updated_at);
    if let Some(data) = &profile.data {
        println!("Data:");
        println!("{}", serde_json::to_string_pretty(data)?);
    }

    Ok(())
}
