use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::constants::limits::IP_ADDR_LEN;
use crate::db::repositories::user::now;
use crate::domain::Origin;
use crate::entities::auth_user_log::{self, LogEvent};
use crate::entities::prelude::*;

pub use crate::entities::auth_user_log::Model as UserLogEntry;

pub struct UserLogRepository {
    conn: DatabaseConnection,
}

impl UserLogRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn record(
        &self,
        user_id: i32,
        event: LogEvent,
        ip_addr: &str,
        origin: Origin,
    ) -> Result<UserLogEntry> {
        if ip_addr.len() > IP_ADDR_LEN {
            anyhow::bail!("IP address longer than {IP_ADDR_LEN} characters: {ip_addr}");
        }

        let (internal_user, external_user) = origin.flags();

        auth_user_log::ActiveModel {
            user_id: Set(user_id),
            time: Set(now()),
            ip_addr: Set(ip_addr.to_string()),
            internal_user: Set(internal_user),
            external_user: Set(external_user),
            event: Set(event),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .with_context(|| format!("Failed to record {event:?} event for user {user_id}"))
    }

    /// Newest first.
    pub async fn last_events(&self, user_id: i32, limit: u64) -> Result<Vec<UserLogEntry>> {
        AuthUserLog::find()
            .filter(auth_user_log::Column::UserId.eq(user_id))
            .order_by_desc(auth_user_log::Column::Time)
            .order_by_desc(auth_user_log::Column::Id)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to query user events")
    }

    /// Every event of a user in insertion order.
    pub async fn login_log(&self, user_id: i32) -> Result<Vec<UserLogEntry>> {
        AuthUserLog::find()
            .filter(auth_user_log::Column::UserId.eq(user_id))
            .order_by_asc(auth_user_log::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to query user log")
    }

    /// Login events only, newest first.
    pub async fn last_logins(&self, user_id: i32, limit: u64) -> Result<Vec<UserLogEntry>> {
        AuthUserLog::find()
            .filter(auth_user_log::Column::UserId.eq(user_id))
            .filter(auth_user_log::Column::Event.eq(LogEvent::Login))
            .order_by_desc(auth_user_log::Column::Time)
            .order_by_desc(auth_user_log::Column::Id)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to query user logins")
    }

    pub async fn last_login(&self, user_id: i32) -> Result<Option<UserLogEntry>> {
        Ok(self.last_logins(user_id, 1).await?.into_iter().next())
    }

    pub async fn prune(&self, older_than_days: i64) -> Result<u64> {
        // Timestamps share one RFC 3339 format, so string order is time order.
        let cutoff = (chrono::Utc::now() - chrono::Duration::days(older_than_days))
            .to_rfc3339_opts(chrono::SecondsFormat::Micros, true);

        let result = AuthUserLog::delete_many()
            .filter(auth_user_log::Column::Time.lt(cutoff))
            .exec(&self.conn)
            .await
            .context("Failed to prune user log")?;

        Ok(result.rows_affected)
    }
}
