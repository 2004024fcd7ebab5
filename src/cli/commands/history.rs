use super::open_service;
use crate::config::Config;
use crate::domain::UserId;
use crate::entities::auth_user_log::LogEvent;
use crate::services::AuthService;

pub async fn cmd_history(config: &Config, id: i32, limit: u64) -> anyhow::Result<()> {
    let service = open_service(config).await?;
    let user = service
        .get_by_id(UserId::new(id))
        .await?
        .ok_or_else(|| anyhow::anyhow!("User {id} not found"))?;

    let events = service.store().get_last_events(id, limit).await?;
    if events.is_empty() {
        println!("No history for '{user}'.");
        return Ok(());
    }

    println!("History of '{}' (last {}):", user, events.len());
    println!("{:-<70}", "");

    for entry in events {
        let event = match entry.event {
            LogEvent::Login => "Login",
            LogEvent::Register => "Register",
            LogEvent::Password => "Password change",
            LogEvent::Forgot => "Password reset",
        };
        let origin = if entry.external_user {
            " (external)"
        } else {
            ""
        };
        println!("• {}{}", event, origin);
        println!("  {} | {}", entry.time, entry.ip_addr);
    }

    Ok(())
}
