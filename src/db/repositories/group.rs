use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Serialize;

use crate::db::repositories::user::User;
use crate::entities::{auth_groups, auth_user_groups, auth_users, prelude::*};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    pub id: i32,
    pub name: String,
    pub description: String,
}

impl std::fmt::Display for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<auth_groups::Model> for Group {
    fn from(model: auth_groups::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
        }
    }
}

pub struct GroupRepository {
    conn: DatabaseConnection,
}

impl GroupRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Fails with a unique violation when the name is taken.
    pub async fn insert(&self, name: &str, description: &str) -> Result<Group> {
        let model = auth_groups::ActiveModel {
            name: Set(name.to_string()),
            description: Set(description.to_string()),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .with_context(|| format!("Failed to insert group {name}"))?;

        Ok(Group::from(model))
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<Group>> {
        let group = AuthGroups::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query group by ID")?;

        Ok(group.map(Group::from))
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Option<Group>> {
        let group = AuthGroups::find()
            .filter(auth_groups::Column::Name.eq(name))
            .one(&self.conn)
            .await
            .context("Failed to query group by name")?;

        Ok(group.map(Group::from))
    }

    /// Existing groups among `names`, ordered by name. Unknown names are skipped.
    pub async fn find_by_names(&self, names: &[String]) -> Result<Vec<Group>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let groups = AuthGroups::find()
            .filter(auth_groups::Column::Name.is_in(names.iter().cloned()))
            .order_by_asc(auth_groups::Column::Name)
            .all(&self.conn)
            .await
            .context("Failed to query groups by name")?;

        Ok(groups.into_iter().map(Group::from).collect())
    }

    pub async fn list(&self) -> Result<Vec<Group>> {
        let groups = AuthGroups::find()
            .order_by_asc(auth_groups::Column::Name)
            .all(&self.conn)
            .await
            .context("Failed to list groups")?;

        Ok(groups.into_iter().map(Group::from).collect())
    }

    pub async fn members(&self, group_id: i32) -> Result<Vec<User>> {
        let users = AuthUsers::find()
            .inner_join(AuthUserGroups)
            .filter(auth_user_groups::Column::GroupId.eq(group_id))
            .order_by_asc(auth_users::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to query group members")?;

        Ok(users.into_iter().map(User::from).collect())
    }

    pub async fn add_member(&self, user_id: i32, group_id: i32) -> Result<()> {
        let membership = auth_user_groups::ActiveModel {
            user_id: Set(user_id),
            group_id: Set(group_id),
        };

        AuthUserGroups::insert(membership)
            .exec_without_returning(&self.conn)
            .await
            .with_context(|| format!("Failed to add user {user_id} to group {group_id}"))?;

        Ok(())
    }

    pub async fn remove_member(&self, user_id: i32, group_id: i32) -> Result<bool> {
        let result = AuthUserGroups::delete_many()
            .filter(auth_user_groups::Column::UserId.eq(user_id))
            .filter(auth_user_groups::Column::GroupId.eq(group_id))
            .exec(&self.conn)
            .await
            .context("Failed to remove group member")?;

        Ok(result.rows_affected > 0)
    }

    /// Deletes the group and its memberships.
    pub async fn delete(&self, id: i32) -> Result<bool> {
        let txn = self
            .conn
            .begin()
            .await
            .context("Failed to start transaction")?;

        AuthUserGroups::delete_many()
            .filter(auth_user_groups::Column::GroupId.eq(id))
            .exec(&txn)
            .await
            .context("Failed to delete group memberships")?;

        let result = AuthGroups::delete_by_id(id)
            .exec(&txn)
            .await
            .context("Failed to delete group")?;

        txn.commit().await.context("Failed to commit group deletion")?;

        Ok(result.rows_affected > 0)
    }
}
