use std::sync::Arc;

use dialoguer::Password;

use super::open_service;
use crate::cli::StatusArg;
use crate::config::Config;
use crate::domain::UserId;
use crate::request::{MemoryFlash, RequestContext};
use crate::services::{AuthService, CredentialLookup, NewUser, UserSummary};

pub async fn cmd_list_users(config: &Config, page: u64, page_size: u64) -> anyhow::Result<()> {
    let service = open_service(config).await?;
    let total = service.store().count_users().await?;
    let users = service.list_users(page, page_size).await?;

    if users.is_empty() {
        println!("No users.");
        println!();
        println!("Add one with: apex create-user <username>");
        return Ok(());
    }

    println!("Users ({} total, page {})", total, page.max(1));
    println!("{:-<70}", "");

    for user in users {
        let id = UserId::new(user.id);
        let summary = UserSummary {
            groups: service
                .groups(id)
                .await?
                .into_iter()
                .map(|g| g.name)
                .collect(),
            last_login: service.last_login(id).await?.map(|entry| entry.time),
            user,
        };

        let marker = if summary.user.is_active() { "•" } else { "✗" };
        println!("{} {} (ID: {})", marker, summary.user, summary.user.id);
        if !summary.user.email.is_empty() {
            println!("  Email: {}", summary.user.email);
        }
        println!(
            "  Groups: {} | Last login: {}",
            if summary.groups.is_empty() {
                "-".to_string()
            } else {
                summary.groups.join(", ")
            },
            summary.last_login.as_deref().unwrap_or("never")
        );
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub async fn cmd_create_user(
    config: &Config,
    username: &str,
    login: &str,
    email: &str,
    password: Option<String>,
    group: Option<String>,
    groups: Option<String>,
    status: Option<StatusArg>,
) -> anyhow::Result<()> {
    let password = match password {
        Some(password) => Some(password),
        None => Some(
            Password::new()
                .with_prompt("Password (leave empty for none)")
                .with_confirmation("Password (again)", "Error: Passwords do not match")
                .allow_empty_password(true)
                .interact()?,
        )
        .filter(|p| !p.is_empty()),
    };

    let service = open_service(config).await?;
    let flash = Arc::new(MemoryFlash::new());
    let ctx = RequestContext::new(None, flash.clone());

    let user = service
        .create_user(
            NewUser {
                login: login.to_string(),
                username: username.to_string(),
                password,
                email: email.to_string(),
                status: status.map(Into::into),
                group,
                groups,
            },
            Some(&ctx),
        )
        .await?;

    for message in flash.take() {
        println!("⚠ {}", message.message);
    }

    let groups = service.groups(UserId::new(user.id)).await?;
    println!("✓ Created user '{}' (ID: {})", user, user.id);
    println!(
        "  Groups: {}",
        groups
            .iter()
            .map(|g| g.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    Ok(())
}

pub async fn cmd_delete_user(config: &Config, id: i32) -> anyhow::Result<()> {
    let service = open_service(config).await?;
    let user = service.delete_user(UserId::new(id), None).await?;
    println!("✓ Deleted user '{}' (ID: {})", user, user.id);
    Ok(())
}

pub async fn cmd_check_password(
    config: &Config,
    username: &str,
    password: Option<String>,
) -> anyhow::Result<()> {
    let password = match password {
        Some(password) => password,
        None => Password::new()
            .with_prompt("Password")
            .allow_empty_password(true)
            .interact()?,
    };

    let service = open_service(config).await?;
    if service
        .check_password(CredentialLookup::Username(username), &password)
        .await?
    {
        println!("✓ Password matches");
    } else {
        println!("✗ Password does not match (or unknown user)");
    }

    Ok(())
}

pub async fn cmd_set_status(config: &Config, id: i32, status: StatusArg) -> anyhow::Result<()> {
    let service = open_service(config).await?;
    let user = service.set_status(UserId::new(id), status.into()).await?;
    println!("✓ User '{}' is now {:?}", user, user.status);
    Ok(())
}
