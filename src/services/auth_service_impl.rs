//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::config::{AuthConfig, Config};
use crate::constants::groups::USERS;
use crate::constants::limits::{
    GROUP_DESCRIPTION_LEN, GROUP_NAME_LEN, IP_ADDR_LEN, LOGIN_LEN, MIN_PASSWORD_LEN,
};
use crate::constants::security::UNKNOWN_IP;
use crate::db::{Group, NewUserRecord, Profile, Store, User, UserLogEntry, is_unique_violation};
use crate::domain::events::{AuthEvent, EventBus};
use crate::domain::{GroupId, Origin, UserId};
use crate::entities::auth_user_log::LogEvent;
use crate::entities::auth_users::UserStatus;
use crate::i18n::interpolate;
use crate::password::PasswordManager;
use crate::request::RequestContext;
use crate::services::auth_service::{
    AuthError, AuthService, CredentialLookup, NewGroup, NewUser,
};

pub struct SeaOrmAuthService {
    store: Store,
    auth: AuthConfig,
    passwords: PasswordManager,
    rehash_on_login: bool,
    events: EventBus,
}

impl SeaOrmAuthService {
    #[must_use]
    pub fn new(store: Store, config: &Config, events: EventBus) -> Self {
        Self {
            store,
            auth: config.auth.clone(),
            passwords: PasswordManager::from_config(&config.security),
            rehash_on_login: config.security.rehash_on_login,
            events,
        }
    }

    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Groups a new user joins, in order and without duplicates.
    async fn collect_groups(&self, new_user: &NewUser) -> Result<Vec<Group>, AuthError> {
        let mut groups = Vec::new();

        if let Some(name) = self.auth.default_user_group.as_deref() {
            let group = self
                .store
                .get_group_by_name(name)
                .await
                .map_err(create_user_error)?
                .ok_or_else(|| AuthError::GroupNotFound(name.to_string()))?;
            push_unique(&mut groups, group);
        }

        if let Some(group) = self
            .store
            .get_group_by_name(USERS)
            .await
            .map_err(create_user_error)?
        {
            push_unique(&mut groups, group);
        }

        if let Some(name) = new_user.group.as_deref() {
            if let Some(group) = self
                .store
                .get_group_by_name(name.trim())
                .await
                .map_err(create_user_error)?
            {
                push_unique(&mut groups, group);
            }
        }

        if let Some(names) = new_user.groups.as_deref() {
            let names: Vec<String> = names
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect();

            let found = self
                .store
                .find_groups_by_names(&names)
                .await
                .map_err(create_user_error)?;
            for group in found {
                push_unique(&mut groups, group);
            }
        }

        Ok(groups)
    }

    async fn require_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.store
            .get_user_by_id(user_id.value())
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    async fn require_group(&self, group_id: GroupId) -> Result<Group, AuthError> {
        self.store
            .get_group_by_id(group_id.value())
            .await?
            .ok_or_else(|| AuthError::GroupNotFound(group_id.to_string()))
    }

    async fn rehash_if_needed(&self, user: &User, stored: &str, password: &str) {
        if !self.rehash_on_login || !self.passwords.needs_rehash(stored) {
            return;
        }

        let result = match self.passwords.hash_blocking(password).await {
            Ok(hash) => self.store.update_user_password(user.id, hash).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => info!(user_id = user.id, "Password hash upgraded"),
            Err(e) => warn!(user_id = user.id, "Failed to upgrade password hash: {e:#}"),
        }
    }
}

fn create_user_error(err: anyhow::Error) -> AuthError {
    AuthError::CreateUser(format!("{err:#}"))
}

fn push_unique(groups: &mut Vec<Group>, group: Group) {
    if !groups.iter().any(|existing| existing.id == group.id) {
        groups.push(group);
    }
}

fn validate_user_fields(new_user: &NewUser) -> Result<(), AuthError> {
    for (field, value) in [
        ("login", &new_user.login),
        ("username", &new_user.username),
        ("email", &new_user.email),
    ] {
        if value.chars().count() > LOGIN_LEN {
            return Err(AuthError::Validation(format!(
                "{field} must be {LOGIN_LEN} characters or less"
            )));
        }
    }

    Ok(())
}

fn validate_group_fields(new_group: &NewGroup) -> Result<(), AuthError> {
    let name = new_group.name.trim();
    if name.is_empty() {
        return Err(AuthError::Validation("Group name cannot be empty".to_string()));
    }

    if name.chars().count() > GROUP_NAME_LEN {
        return Err(AuthError::Validation(format!(
            "Group name must be {GROUP_NAME_LEN} characters or less"
        )));
    }

    if new_group.description.chars().count() > GROUP_DESCRIPTION_LEN {
        return Err(AuthError::Validation(format!(
            "Group description must be {GROUP_DESCRIPTION_LEN} characters or less"
        )));
    }

    Ok(())
}

fn client_ip(ctx: &RequestContext) -> &str {
    ctx.ip_addr.as_deref().unwrap_or(UNKNOWN_IP)
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn create_user(
        &self,
        new_user: NewUser,
        ctx: Option<&RequestContext>,
    ) -> Result<User, AuthError> {
        let ctx = RequestContext::resolve(ctx);

        let groups = self.collect_groups(&new_user).await?;
        validate_user_fields(&new_user)?;

        let password_hash = match new_user.password.as_deref() {
            Some(password) if !password.is_empty() => self
                .passwords
                .hash_blocking(password)
                .await
                .map_err(create_user_error)?,
            _ => String::new(),
        };

        let record = NewUserRecord {
            login: new_user.login,
            username: new_user.username,
            password_hash,
            email: new_user.email,
            status: new_user.status.unwrap_or(UserStatus::Active),
        };

        let created = self
            .store
            .create_user_with_groups(record, groups)
            .await
            .map_err(create_user_error)?;

        let tr = ctx.translator();
        for (group, reason) in &created.failed {
            let message = interpolate(
                &tr.gettext("Can't add user: ${user} to group: ${group} (${error})"),
                &[
                    ("user", created.user.display_name()),
                    ("group", group.name.as_str()),
                    ("error", reason.as_str()),
                ],
            );
            error!(target: "apex::add_user_to_group", "{message}");
            ctx.flash(&message, "error");
        }

        info!(
            user_id = created.user.id,
            groups = created.linked.len(),
            "Created user {}",
            created.user
        );

        self.events.publish(AuthEvent::UserCreated {
            user: created.user.clone(),
            ip_addr: ctx.ip_addr.clone(),
        });

        Ok(created.user)
    }

    async fn create_group(
        &self,
        new_group: NewGroup,
        ctx: Option<&RequestContext>,
    ) -> Result<Group, AuthError> {
        let ctx = RequestContext::resolve(ctx);
        validate_group_fields(&new_group)?;

        let name = new_group.name.trim();
        let group = match self.store.create_group(name, &new_group.description).await {
            Ok(group) => group,
            Err(e) if is_unique_violation(&e) => {
                return Err(AuthError::DuplicateGroup(name.to_string()));
            }
            Err(e) => return Err(AuthError::CreateGroup(format!("{e:#}"))),
        };

        info!(group_id = group.id, "Created group {}", group.name);

        self.events.publish(AuthEvent::GroupCreated {
            group: group.clone(),
            ip_addr: ctx.ip_addr.clone(),
        });

        Ok(group)
    }

    async fn delete_group(
        &self,
        group_id: GroupId,
        ctx: Option<&RequestContext>,
    ) -> Result<Group, AuthError> {
        let ctx = RequestContext::resolve(ctx);
        let group = self.require_group(group_id).await?;

        if !self.store.delete_group(group.id).await? {
            return Err(AuthError::GroupNotFound(group_id.to_string()));
        }

        info!(group_id = group.id, "Deleted group {}", group.name);

        self.events.publish(AuthEvent::GroupDeleted {
            group: group.clone(),
            ip_addr: ctx.ip_addr.clone(),
        });

        Ok(group)
    }

    async fn get_group(&self, group_id: GroupId) -> Result<Option<Group>, AuthError> {
        Ok(self.store.get_group_by_id(group_id.value()).await?)
    }

    async fn group_members(&self, group_id: GroupId) -> Result<Vec<User>, AuthError> {
        Ok(self.store.get_group_members(group_id.value()).await?)
    }

    async fn add_to_group(&self, user_id: UserId, group_id: GroupId) -> Result<(), AuthError> {
        let user = self.require_user(user_id).await?;
        let group = self.require_group(group_id).await?;
        Ok(self.store.add_user_to_group(user.id, group.id).await?)
    }

    async fn remove_from_group(
        &self,
        user_id: UserId,
        group_id: GroupId,
    ) -> Result<bool, AuthError> {
        Ok(self
            .store
            .remove_user_from_group(user_id.value(), group_id.value())
            .await?)
    }

    async fn delete_user(
        &self,
        user_id: UserId,
        ctx: Option<&RequestContext>,
    ) -> Result<User, AuthError> {
        let ctx = RequestContext::resolve(ctx);
        let user = self.require_user(user_id).await?;

        // Subscribers still see the user's rows while handling the event.
        self.events.publish(AuthEvent::UserDeleted {
            user: user.clone(),
            ip_addr: ctx.ip_addr.clone(),
        });

        let deleted = self
            .store
            .delete_user(user.id)
            .await
            .map_err(|e| AuthError::DeleteUser(format!("{e:#}")))?;

        if !deleted {
            return Err(AuthError::DeleteUser(format!(
                "user {} was removed concurrently",
                user.id
            )));
        }

        info!(user_id = user.id, "Deleted user {}", user);
        Ok(user)
    }

    async fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>, AuthError> {
        if !self.auth.profiles_enabled {
            return Ok(None);
        }

        self.require_user(user_id).await?;
        let profile = self.store.get_or_create_profile(user_id.value()).await?;
        Ok(Some(profile))
    }

    async fn check_password(
        &self,
        lookup: CredentialLookup<'_>,
        password: &str,
    ) -> Result<bool, AuthError> {
        let found = match lookup {
            CredentialLookup::Id(id) => self.store.get_user_with_password_by_id(id.value()).await?,
            CredentialLookup::Username(username) => {
                self.store
                    .get_user_with_password_by_username(username)
                    .await?
            }
        };

        let Some((_, stored)) = found else {
            return Ok(false);
        };

        Ok(self.passwords.verify_blocking(password, &stored).await?)
    }

    async fn login(
        &self,
        username: &str,
        password: &str,
        ctx: &RequestContext,
    ) -> Result<User, AuthError> {
        let (user, stored) = self
            .store
            .get_user_with_password_by_username(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.passwords.verify_blocking(password, &stored).await? {
            warn!(username, ip = client_ip(ctx), "Failed login attempt");
            return Err(AuthError::InvalidCredentials);
        }

        if !user.is_active() {
            return Err(AuthError::Inactive);
        }

        self.store
            .record_user_event(user.id, LogEvent::Login, client_ip(ctx), Origin::Internal)
            .await?;

        self.rehash_if_needed(&user, &stored, password).await;

        info!(user_id = user.id, ip = client_ip(ctx), "User logged in");
        Ok(user)
    }

    async fn change_password(
        &self,
        user_id: UserId,
        current_password: &str,
        new_password: &str,
        ctx: &RequestContext,
    ) -> Result<(), AuthError> {
        if new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation(format!(
                "New password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        if current_password == new_password {
            return Err(AuthError::Validation(
                "New password must be different from current password".to_string(),
            ));
        }

        let (user, stored) = self
            .store
            .get_user_with_password_by_id(user_id.value())
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !self
            .passwords
            .verify_blocking(current_password, &stored)
            .await?
        {
            return Err(AuthError::Validation(
                "Current password is incorrect".to_string(),
            ));
        }

        let hash = self.passwords.hash_blocking(new_password).await?;
        self.store.update_user_password(user.id, hash).await?;

        self.store
            .record_user_event(user.id, LogEvent::Password, client_ip(ctx), Origin::Internal)
            .await?;

        info!(user_id = user.id, "Password changed");
        Ok(())
    }

    async fn set_status(&self, user_id: UserId, status: UserStatus) -> Result<User, AuthError> {
        self.require_user(user_id).await?;
        Ok(self.store.set_user_status(user_id.value(), status).await?)
    }

    async fn record_event(
        &self,
        user_id: UserId,
        event: LogEvent,
        ctx: &RequestContext,
        origin: Origin,
    ) -> Result<UserLogEntry, AuthError> {
        self.require_user(user_id).await?;

        let ip = client_ip(ctx);
        if ip.len() > IP_ADDR_LEN {
            return Err(AuthError::Validation(format!("Invalid IP address: {ip}")));
        }

        Ok(self
            .store
            .record_user_event(user_id.value(), event, ip, origin)
            .await?)
    }

    async fn get_by_id(&self, user_id: UserId) -> Result<Option<User>, AuthError> {
        Ok(self.store.get_user_by_id(user_id.value()).await?)
    }

    async fn get_by_login(&self, login: &str) -> Result<Option<User>, AuthError> {
        Ok(self.store.get_user_by_login(login).await?)
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, AuthError> {
        Ok(self.store.get_user_by_username(username).await?)
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        Ok(self.store.get_user_by_email(email).await?)
    }

    async fn groups(&self, user_id: UserId) -> Result<Vec<Group>, AuthError> {
        Ok(self.store.get_user_groups(user_id.value()).await?)
    }

    async fn in_group(&self, user_id: UserId, group_name: &str) -> Result<bool, AuthError> {
        Ok(self.store.user_in_group(user_id.value(), group_name).await?)
    }

    async fn last_logins(
        &self,
        user_id: UserId,
        limit: u64,
    ) -> Result<Vec<UserLogEntry>, AuthError> {
        Ok(self.store.get_last_logins(user_id.value(), limit).await?)
    }

    async fn last_login(&self, user_id: UserId) -> Result<Option<UserLogEntry>, AuthError> {
        Ok(self.store.get_last_login(user_id.value()).await?)
    }

    async fn list_users(&self, page: u64, page_size: u64) -> Result<Vec<User>, AuthError> {
        Ok(self.store.list_users(page, page_size).await?)
    }

    async fn list_groups(&self) -> Result<Vec<Group>, AuthError> {
        Ok(self.store.list_groups().await?)
    }
}
