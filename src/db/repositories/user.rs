use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;

use crate::db::repositories::group::Group;
use crate::entities::auth_users::UserStatus;
use crate::entities::{
    auth_groups, auth_user_groups, auth_user_log, auth_user_profiles, auth_users, prelude::*,
};

/// User data returned from repository (without the password hash)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i32,
    pub login: String,
    pub username: String,
    pub email: String,
    pub status: UserStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    /// Username, falling back to login and then email.
    #[must_use]
    pub fn display_name(&self) -> &str {
        [&self.username, &self.login, &self.email]
            .into_iter()
            .find(|s| !s.is_empty())
            .map_or("", String::as_str)
    }
}

impl std::fmt::Display for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

impl From<auth_users::Model> for User {
    fn from(model: auth_users::Model) -> Self {
        Self {
            id: model.id,
            login: model.login,
            username: model.username,
            email: model.email,
            status: model.active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Row to insert. `password_hash` must already be hashed (or empty).
#[derive(Debug, Clone)]
pub struct NewUserRecord {
    pub login: String,
    pub username: String,
    pub password_hash: String,
    pub email: String,
    pub status: UserStatus,
}

/// Outcome of inserting a user together with its group memberships.
#[derive(Debug)]
pub struct CreatedUser {
    pub user: User,
    pub linked: Vec<Group>,
    pub failed: Vec<(Group, String)>,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<User>> {
        let user = AuthUsers::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        Ok(user.map(User::from))
    }

    pub async fn get_by_login(&self, login: &str) -> Result<Option<User>> {
        self.find_one(auth_users::Column::Login, login).await
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        self.find_one(auth_users::Column::Username, username).await
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_one(auth_users::Column::Email, email).await
    }

    async fn find_one(&self, column: auth_users::Column, value: &str) -> Result<Option<User>> {
        let user = AuthUsers::find()
            .filter(column.eq(value))
            .order_by_asc(auth_users::Column::Id)
            .one(&self.conn)
            .await
            .with_context(|| format!("Failed to query user by {column:?}"))?;

        Ok(user.map(User::from))
    }

    /// Get user by ID with password hash (for verification)
    pub async fn get_with_password_by_id(&self, id: i32) -> Result<Option<(User, String)>> {
        let user = AuthUsers::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        Ok(user.map(split_password))
    }

    /// Get user by username with password hash (for verification)
    pub async fn get_with_password_by_username(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>> {
        let user = AuthUsers::find()
            .filter(auth_users::Column::Username.eq(username))
            .order_by_asc(auth_users::Column::Id)
            .one(&self.conn)
            .await
            .context("Failed to query user by username")?;

        Ok(user.map(split_password))
    }

    /// Insert a user and link it to `groups`.
    ///
    /// Runs in one transaction. Each membership is written inside its own
    /// savepoint so a failing link is rolled back alone and reported in
    /// [`CreatedUser::failed`] instead of aborting the whole insert.
    pub async fn create_with_groups(
        &self,
        record: NewUserRecord,
        groups: Vec<Group>,
    ) -> Result<CreatedUser> {
        let txn = self
            .conn
            .begin()
            .await
            .context("Failed to start transaction")?;

        let now = now();
        let model = auth_users::ActiveModel {
            login: Set(record.login),
            username: Set(record.username),
            password: Set(record.password_hash),
            email: Set(record.email),
            active: Set(record.status),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert user")?;

        let mut linked = Vec::with_capacity(groups.len());
        let mut failed = Vec::new();

        for group in groups {
            let savepoint = txn.begin().await.context("Failed to open savepoint")?;

            let membership = auth_user_groups::ActiveModel {
                user_id: Set(model.id),
                group_id: Set(group.id),
            };

            match AuthUserGroups::insert(membership)
                .exec_without_returning(&savepoint)
                .await
            {
                Ok(_) => {
                    savepoint.commit().await?;
                    linked.push(group);
                }
                Err(e) => {
                    savepoint.rollback().await?;
                    failed.push((group, e.to_string()));
                }
            }
        }

        txn.commit().await.context("Failed to commit user")?;

        Ok(CreatedUser {
            user: User::from(model),
            linked,
            failed,
        })
    }

    pub async fn update_password(&self, id: i32, password_hash: String) -> Result<()> {
        let user = AuthUsers::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user for password update")?
            .ok_or_else(|| anyhow::anyhow!("User not found: {id}"))?;

        let mut active: auth_users::ActiveModel = user.into();
        active.password = Set(password_hash);
        active.updated_at = Set(now());
        active.update(&self.conn).await?;

        Ok(())
    }

    pub async fn set_status(&self, id: i32, status: UserStatus) -> Result<User> {
        let user = AuthUsers::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user for status update")?
            .ok_or_else(|| anyhow::anyhow!("User not found: {id}"))?;

        let mut active: auth_users::ActiveModel = user.into();
        active.active = Set(status);
        active.updated_at = Set(now());
        let updated = active.update(&self.conn).await?;

        Ok(User::from(updated))
    }

    /// Page numbers start at 1.
    pub async fn list(&self, page: u64, page_size: u64) -> Result<Vec<User>> {
        let users = AuthUsers::find()
            .order_by_asc(auth_users::Column::Id)
            .paginate(&self.conn, page_size.max(1))
            .fetch_page(page.saturating_sub(1))
            .await
            .context("Failed to list users")?;

        Ok(users.into_iter().map(User::from).collect())
    }

    pub async fn count(&self) -> Result<u64> {
        AuthUsers::find()
            .count(&self.conn)
            .await
            .context("Failed to count users")
    }

    /// Groups of a user, ordered by name.
    pub async fn groups_for(&self, user_id: i32) -> Result<Vec<Group>> {
        let groups = AuthGroups::find()
            .inner_join(AuthUserGroups)
            .filter(auth_user_groups::Column::UserId.eq(user_id))
            .order_by_asc(auth_groups::Column::Name)
            .all(&self.conn)
            .await
            .context("Failed to query user groups")?;

        Ok(groups.into_iter().map(Group::from).collect())
    }

    pub async fn in_group(&self, user_id: i32, group_name: &str) -> Result<bool> {
        let count = AuthGroups::find()
            .inner_join(AuthUserGroups)
            .filter(auth_user_groups::Column::UserId.eq(user_id))
            .filter(auth_groups::Column::Name.eq(group_name))
            .count(&self.conn)
            .await
            .context("Failed to query group membership")?;

        Ok(count > 0)
    }

    /// Delete a user with its memberships, log rows and profile.
    ///
    /// The foreign keys cascade as well; dependents are removed explicitly
    /// so backends without enforced foreign keys end up in the same state.
    pub async fn delete(&self, id: i32) -> Result<bool> {
        let txn = self
            .conn
            .begin()
            .await
            .context("Failed to start transaction")?;

        AuthUserGroups::delete_many()
            .filter(auth_user_groups::Column::UserId.eq(id))
            .exec(&txn)
            .await
            .context("Failed to delete user memberships")?;

        AuthUserLog::delete_many()
            .filter(auth_user_log::Column::UserId.eq(id))
            .exec(&txn)
            .await
            .context("Failed to delete user log")?;

        AuthUserProfiles::delete_many()
            .filter(auth_user_profiles::Column::UserId.eq(id))
            .exec(&txn)
            .await
            .context("Failed to delete user profile")?;

        let result = AuthUsers::delete_by_id(id)
            .exec(&txn)
            .await
            .context("Failed to delete user")?;

        txn.commit().await.context("Failed to commit user deletion")?;

        Ok(result.rows_affected > 0)
    }
}

fn split_password(model: auth_users::Model) -> (User, String) {
    let password_hash = model.password.clone();
    (User::from(model), password_hash)
}

pub(crate) fn now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}
