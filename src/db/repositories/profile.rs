use anyhow::{Context, Result};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use serde::Serialize;

use crate::db::is_db_unique_violation;
use crate::db::repositories::user::now;
use crate::entities::{auth_user_profiles, prelude::*};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub user_id: i32,
    pub display_name: Option<String>,
    pub data: Option<serde_json::Value>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<auth_user_profiles::Model> for Profile {
    fn from(model: auth_user_profiles::Model) -> Self {
        Self {
            user_id: model.user_id,
            display_name: model.display_name,
            // Rows are only written through `update`, which stores valid JSON.
            data: model.data.and_then(|raw| serde_json::from_str(&raw).ok()),
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

pub struct ProfileRepository {
    conn: DatabaseConnection,
}

impl ProfileRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, user_id: i32) -> Result<Option<Profile>> {
        let profile = AuthUserProfiles::find_by_id(user_id)
            .one(&self.conn)
            .await
            .context("Failed to query profile")?;

        Ok(profile.map(Profile::from))
    }

    pub async fn get_or_create(&self, user_id: i32) -> Result<Profile> {
        if let Some(profile) = self.get(user_id).await? {
            return Ok(profile);
        }

        let now = now();
        let inserted = auth_user_profiles::ActiveModel {
            user_id: Set(user_id),
            display_name: Set(None),
            data: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        }
        .insert(&self.conn)
        .await;

        match inserted {
            Ok(model) => Ok(Profile::from(model)),
            // Another caller created it between the lookup and the insert.
            Err(e) if is_db_unique_violation(&e) => self
                .get(user_id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("Profile for user {user_id} vanished")),
            Err(e) => Err(e).context("Failed to create profile"),
        }
    }

    pub async fn update(
        &self,
        user_id: i32,
        display_name: Option<String>,
        data: Option<serde_json::Value>,
    ) -> Result<Profile> {
        let current = self.get_or_create(user_id).await?;

        let model = auth_user_profiles::ActiveModel {
            user_id: Set(user_id),
            display_name: Set(display_name),
            data: Set(data.map(|value| value.to_string())),
            created_at: Set(current.created_at),
            updated_at: Set(now()),
        }
        .update(&self.conn)
        .await
        .context("Failed to update profile")?;

        Ok(Profile::from(model))
    }
}
