//! CLI module - Command-line interface for Apex
//!
//! Administrative commands over the auth store, parsed with clap.

mod commands;

use clap::{Parser, Subcommand, ValueEnum};

use crate::entities::auth_users::UserStatus;

/// Apex - user and group store
/// Manage users, groups, passwords and the login history
#[derive(Parser)]
#[command(name = "apex")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the config file and database, then add the default groups
    Init,

    /// List users with their groups and last login
    #[command(alias = "ls")]
    Users {
        /// Page number, starting at 1
        #[arg(long, default_value = "1")]
        page: u64,
        /// Users per page
        #[arg(long, default_value = "50")]
        page_size: u64,
    },

    /// List groups and their member counts
    Groups,

    /// Create a user
    #[command(alias = "add-user")]
    CreateUser {
        /// Username
        username: String,
        /// Login name, if different from the username
        #[arg(long, default_value = "")]
        login: String,
        #[arg(long, default_value = "")]
        email: String,
        /// Password; prompted for when omitted
        #[arg(long)]
        password: Option<String>,
        /// Extra group to join
        #[arg(long)]
        group: Option<String>,
        /// Comma separated extra groups
        #[arg(long)]
        groups: Option<String>,
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
    },

    /// Create a group
    #[command(alias = "add-group")]
    CreateGroup {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },

    /// Delete a group and its memberships
    DeleteGroup {
        /// Group ID
        id: i32,
    },

    /// Add a user to a group
    AddToGroup {
        /// User ID
        user_id: i32,
        /// Group ID
        group_id: i32,
    },

    /// Remove a user from a group
    RemoveFromGroup {
        /// User ID
        user_id: i32,
        /// Group ID
        group_id: i32,
    },

    /// Delete a user with its memberships, history and profile
    #[command(alias = "rm")]
    DeleteUser {
        /// User ID
        id: i32,
    },

    /// Check a password against the stored hash
    CheckPassword {
        username: String,
        /// Password; prompted for when omitted
        password: Option<String>,
    },

    /// Change the status of a user
    SetStatus {
        /// User ID
        id: i32,
        #[arg(value_enum)]
        status: StatusArg,
    },

    /// Show the recent events of a user
    #[command(alias = "h")]
    History {
        /// User ID
        id: i32,
        /// Number of entries to show
        #[arg(default_value = "10")]
        limit: u64,
    },

    /// Show the profile of a user
    Profile {
        /// User ID
        id: i32,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusArg {
    Active,
    Inactive,
    Disabled,
}

impl From<StatusArg> for UserStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Active => Self::Active,
            StatusArg::Inactive => Self::Inactive,
            StatusArg::Disabled => Self::Disabled,
        }
    }
}

pub use commands::*;
