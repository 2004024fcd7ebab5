//! Domain service for users, groups and login events.
//!
//! Carries the helper operations embedding applications call directly:
//! creating users and groups, deleting users, profile lookup, password
//! checks and the login/password-change flows that write the event log.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::{Group, Profile, User, UserLogEntry};
use crate::domain::{GroupId, Origin, UserId};
use crate::entities::auth_user_log::LogEvent;
use crate::entities::auth_users::UserStatus;
use crate::request::RequestContext;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User is not active")]
    Inactive,

    #[error("User not found")]
    UserNotFound,

    #[error("Group not found: {0}")]
    GroupNotFound(String),

    #[error("Group already exists: {0}")]
    DuplicateGroup(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Can't create user: {0}")]
    CreateUser(String),

    #[error("Can't create group: {0}")]
    CreateGroup(String),

    #[error("Can't delete user: {0}")]
    DeleteUser(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

/// Input for [`AuthService::create_user`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewUser {
    pub login: String,
    pub username: String,
    /// Plaintext; hashed before it reaches the database.
    pub password: Option<String>,
    pub email: String,
    pub status: Option<UserStatus>,
    /// Single extra group. Ignored when it does not exist.
    pub group: Option<String>,
    /// Comma separated extra groups. Unknown names are ignored.
    pub groups: Option<String>,
}

impl NewUser {
    #[must_use]
    pub fn with_username(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Some(password.into()),
            ..Self::default()
        }
    }
}

/// Input for [`AuthService::create_group`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewGroup {
    pub name: String,
    pub description: String,
}

impl NewGroup {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
        }
    }
}

/// Which column identifies the user whose password is checked.
#[derive(Debug, Clone, Copy)]
pub enum CredentialLookup<'a> {
    Id(UserId),
    Username(&'a str),
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates a user, hashing its password and linking its groups.
    ///
    /// Groups are collected from the configured default user group, the
    /// `users` group, `NewUser::group` and `NewUser::groups`, without
    /// duplicates. A group that cannot be linked is logged and flashed to
    /// the request; the user is still created.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::GroupNotFound`] if the configured default user
    /// group is missing and [`AuthError::CreateUser`] if a group lookup or
    /// the insert fails.
    async fn create_user(
        &self,
        new_user: NewUser,
        ctx: Option<&RequestContext>,
    ) -> Result<User, AuthError>;

    /// # Errors
    ///
    /// Returns [`AuthError::DuplicateGroup`] when the name is taken.
    async fn create_group(
        &self,
        new_group: NewGroup,
        ctx: Option<&RequestContext>,
    ) -> Result<Group, AuthError>;

    /// Removes the group and its memberships. Returns the deleted group.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::GroupNotFound`] when no group has this id.
    async fn delete_group(
        &self,
        group_id: GroupId,
        ctx: Option<&RequestContext>,
    ) -> Result<Group, AuthError>;

    async fn get_group(&self, group_id: GroupId) -> Result<Option<Group>, AuthError>;

    async fn group_members(&self, group_id: GroupId) -> Result<Vec<User>, AuthError>;

    /// # Errors
    ///
    /// Returns [`AuthError::UserNotFound`] or [`AuthError::GroupNotFound`]
    /// when either side is missing.
    async fn add_to_group(&self, user_id: UserId, group_id: GroupId) -> Result<(), AuthError>;

    /// False when the user was not a member.
    async fn remove_from_group(
        &self,
        user_id: UserId,
        group_id: GroupId,
    ) -> Result<bool, AuthError>;

    /// Publishes `UserDeleted`, then removes the user, its memberships,
    /// log rows and profile. Returns the deleted user.
    async fn delete_user(
        &self,
        user_id: UserId,
        ctx: Option<&RequestContext>,
    ) -> Result<User, AuthError>;

    /// Profile of the user, created on first access. `None` when profiles
    /// are disabled in the config.
    async fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>, AuthError>;

    /// False when the user does not exist or the password does not match.
    async fn check_password(
        &self,
        lookup: CredentialLookup<'_>,
        password: &str,
    ) -> Result<bool, AuthError>;

    /// Verifies credentials of an active user and records a login event.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] if login fails and
    /// [`AuthError::Inactive`] if the account is not active.
    async fn login(
        &self,
        username: &str,
        password: &str,
        ctx: &RequestContext,
    ) -> Result<User, AuthError>;

    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] if current password is incorrect or new password invalid.
    async fn change_password(
        &self,
        user_id: UserId,
        current_password: &str,
        new_password: &str,
        ctx: &RequestContext,
    ) -> Result<(), AuthError>;

    async fn set_status(&self, user_id: UserId, status: UserStatus) -> Result<User, AuthError>;

    async fn record_event(
        &self,
        user_id: UserId,
        event: LogEvent,
        ctx: &RequestContext,
        origin: Origin,
    ) -> Result<UserLogEntry, AuthError>;

    async fn get_by_id(&self, user_id: UserId) -> Result<Option<User>, AuthError>;

    async fn get_by_login(&self, login: &str) -> Result<Option<User>, AuthError>;

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, AuthError>;

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;

    async fn groups(&self, user_id: UserId) -> Result<Vec<Group>, AuthError>;

    async fn in_group(&self, user_id: UserId, group_name: &str) -> Result<bool, AuthError>;

    async fn last_logins(&self, user_id: UserId, limit: u64)
    -> Result<Vec<UserLogEntry>, AuthError>;

    async fn last_login(&self, user_id: UserId) -> Result<Option<UserLogEntry>, AuthError>;

    async fn list_users(&self, page: u64, page_size: u64) -> Result<Vec<User>, AuthError>;

    async fn list_groups(&self) -> Result<Vec<Group>, AuthError>;
}

/// Summary used by the CLI and JSON consumers.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub user: User,
    pub groups: Vec<String>,
    pub last_login: Option<String>,
}
