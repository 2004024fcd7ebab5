use anyhow::Result;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, SqlErr, Statement,
};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::{AuthConfig, Config};
use crate::constants::groups::DEFAULTS;
use crate::entities::auth_users::UserStatus;
use crate::entities::auth_user_log::LogEvent;
use crate::domain::Origin;

pub mod migrator;
pub mod repositories;

pub use repositories::group::Group;
pub use repositories::profile::Profile;
pub use repositories::user::{CreatedUser, NewUserRecord, User};
pub use repositories::user_log::UserLogEntry;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let in_memory = db_url.contains(":memory:");

        if !in_memory {
            let path_str = db_url.trim_start_matches("sqlite://").trim_start_matches("sqlite:");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let opt = connect_options(db_url, max_connections, min_connections);
        let (min_connections, max_connections) =
            (opt.get_min_connections().unwrap_or(0), opt.get_max_connections().unwrap_or(0));

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    /// Connects, applies migrations and creates the default groups.
    pub async fn initialize(config: &Config) -> Result<Self> {
        let store = Self::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let created = store.populate(&config.auth).await?;
        info!("Auth store initialized ({} default groups created)", created);

        Ok(store)
    }

    /// Inserts the default groups, skipping ones that already exist.
    pub async fn populate(&self, auth: &AuthConfig) -> Result<usize> {
        let mut created = 0;

        for (name, description) in default_groups(auth) {
            match self.group_repo().insert(&name, &description).await {
                Ok(_) => created += 1,
                Err(e) if is_unique_violation(&e) => {
                    debug!(group = %name, "Default group already exists");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(created)
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    #[must_use]
    pub fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn group_repo(&self) -> repositories::group::GroupRepository {
        repositories::group::GroupRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn user_log_repo(&self) -> repositories::user_log::UserLogRepository {
        repositories::user_log::UserLogRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn profile_repo(&self) -> repositories::profile::ProfileRepository {
        repositories::profile::ProfileRepository::new(self.conn.clone())
    }

    // ========== User Repository Methods ==========

    pub async fn get_user_by_id(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_login(&self, login: &str) -> Result<Option<User>> {
        self.user_repo().get_by_login(login).await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn get_user_with_password_by_id(&self, id: i32) -> Result<Option<(User, String)>> {
        self.user_repo().get_with_password_by_id(id).await
    }

    pub async fn get_user_with_password_by_username(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>> {
        self.user_repo()
            .get_with_password_by_username(username)
            .await
    }

    pub async fn create_user_with_groups(
        &self,
        record: NewUserRecord,
        groups: Vec<Group>,
    ) -> Result<CreatedUser> {
        self.user_repo().create_with_groups(record, groups).await
    }

    pub async fn update_user_password(&self, id: i32, password_hash: String) -> Result<()> {
        self.user_repo().update_password(id, password_hash).await
    }

    pub async fn set_user_status(&self, id: i32, status: UserStatus) -> Result<User> {
        self.user_repo().set_status(id, status).await
    }

    pub async fn list_users(&self, page: u64, page_size: u64) -> Result<Vec<User>> {
        self.user_repo().list(page, page_size).await
    }

    pub async fn count_users(&self) -> Result<u64> {
        self.user_repo().count().await
    }

    pub async fn get_user_groups(&self, user_id: i32) -> Result<Vec<Group>> {
        self.user_repo().groups_for(user_id).await
    }

    pub async fn user_in_group(&self, user_id: i32, group_name: &str) -> Result<bool> {
        self.user_repo().in_group(user_id, group_name).await
    }

    pub async fn delete_user(&self, id: i32) -> Result<bool> {
        self.user_repo().delete(id).await
    }

    // ========== Group Repository Methods ==========

    pub async fn create_group(&self, name: &str, description: &str) -> Result<Group> {
        self.group_repo().insert(name, description).await
    }

    pub async fn get_group_by_name(&self, name: &str) -> Result<Option<Group>> {
        self.group_repo().get_by_name(name).await
    }

    pub async fn get_group_by_id(&self, id: i32) -> Result<Option<Group>> {
        self.group_repo().get_by_id(id).await
    }

    pub async fn find_groups_by_names(&self, names: &[String]) -> Result<Vec<Group>> {
        self.group_repo().find_by_names(names).await
    }

    pub async fn list_groups(&self) -> Result<Vec<Group>> {
        self.group_repo().list().await
    }

    pub async fn get_group_members(&self, group_id: i32) -> Result<Vec<User>> {
        self.group_repo().members(group_id).await
    }

    pub async fn add_user_to_group(&self, user_id: i32, group_id: i32) -> Result<()> {
        self.group_repo().add_member(user_id, group_id).await
    }

    pub async fn remove_user_from_group(&self, user_id: i32, group_id: i32) -> Result<bool> {
        self.group_repo().remove_member(user_id, group_id).await
    }

    pub async fn delete_group(&self, id: i32) -> Result<bool> {
        self.group_repo().delete(id).await
    }

    // ========== User Log Repository Methods ==========

    pub async fn record_user_event(
        &self,
        user_id: i32,
        event: LogEvent,
        ip_addr: &str,
        origin: Origin,
    ) -> Result<UserLogEntry> {
        self.user_log_repo()
            .record(user_id, event, ip_addr, origin)
            .await
    }

    pub async fn get_last_events(&self, user_id: i32, limit: u64) -> Result<Vec<UserLogEntry>> {
        self.user_log_repo().last_events(user_id, limit).await
    }

    pub async fn get_login_log(&self, user_id: i32) -> Result<Vec<UserLogEntry>> {
        self.user_log_repo().login_log(user_id).await
    }

    pub async fn get_last_logins(&self, user_id: i32, limit: u64) -> Result<Vec<UserLogEntry>> {
        self.user_log_repo().last_logins(user_id, limit).await
    }

    pub async fn get_last_login(&self, user_id: i32) -> Result<Option<UserLogEntry>> {
        self.user_log_repo().last_login(user_id).await
    }

    pub async fn prune_user_log(&self, older_than_days: i64) -> Result<u64> {
        self.user_log_repo().prune(older_than_days).await
    }

    // ========== Profile Repository Methods ==========

    pub async fn get_profile(&self, user_id: i32) -> Result<Option<Profile>> {
        self.profile_repo().get(user_id).await
    }

    pub async fn get_or_create_profile(&self, user_id: i32) -> Result<Profile> {
        self.profile_repo().get_or_create(user_id).await
    }

    pub async fn update_profile(
        &self,
        user_id: i32,
        display_name: Option<String>,
        data: Option<serde_json::Value>,
    ) -> Result<Profile> {
        self.profile_repo()
            .update(user_id, display_name, data)
            .await
    }
}

/// Groups created by `populate`: the configured comma separated list
/// (without descriptions), or `users` and `admin`.
#[must_use]
pub fn default_groups(auth: &AuthConfig) -> Vec<(String, String)> {
    match &auth.default_groups {
        Some(names) => names
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| (name.to_string(), String::new()))
            .collect(),
        None => DEFAULTS
            .iter()
            .map(|(name, description)| ((*name).to_string(), (*description).to_string()))
            .collect(),
    }
}

#[must_use]
pub fn is_db_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// True when the error chain contains a unique constraint violation.
#[must_use]
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<DbErr>())
        .any(is_db_unique_violation)
}

/// Lifetime given to the single in-memory connection. The pool only reaps
/// connections when a timeout is set, and sea-orm always forwards one, so
/// both are pushed out far enough that the database is never dropped.
const IN_MEMORY_CONNECTION_LIFETIME: Duration = Duration::from_secs(60 * 60 * 24 * 365);

fn connect_options(db_url: &str, max_connections: u32, min_connections: u32) -> ConnectOptions {
    let in_memory = db_url.contains(":memory:");

    // Every pooled connection to an in-memory database is a separate database.
    let (max_connections, min_connections, idle_timeout, max_lifetime) = if in_memory {
        (1, 1, IN_MEMORY_CONNECTION_LIFETIME, IN_MEMORY_CONNECTION_LIFETIME)
    } else {
        (
            max_connections,
            min_connections,
            Duration::from_secs(300),
            Duration::from_secs(600),
        )
    };

    let mut opt = ConnectOptions::new(db_url.to_string());
    opt.max_connections(max_connections)
        .min_connections(min_connections)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(idle_timeout)
        .max_lifetime(max_lifetime)
        .sqlx_logging(false);
    opt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_groups_without_config() {
        let groups = default_groups(&AuthConfig::default());
        assert_eq!(
            groups,
            vec![
                ("users".to_string(), "User Group".to_string()),
                ("admin".to_string(), "Admin Group".to_string()),
            ]
        );
    }

    #[test]
    fn default_groups_from_config_are_trimmed() {
        let auth = AuthConfig {
            default_groups: Some(" staff, editors ,,admin".to_string()),
            ..AuthConfig::default()
        };
        let names: Vec<String> = default_groups(&auth).into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["staff", "editors", "admin"]);
        assert!(default_groups(&auth).iter().all(|(_, d)| d.is_empty()));
    }

    #[test]
    fn in_memory_pool_keeps_its_only_connection() {
        let opt = connect_options("sqlite::memory:", 8, 2);
        assert_eq!(opt.get_max_connections(), Some(1));
        assert_eq!(opt.get_min_connections(), Some(1));
        assert_eq!(opt.get_idle_timeout(), Some(IN_MEMORY_CONNECTION_LIFETIME));
        assert_eq!(opt.get_max_lifetime(), Some(IN_MEMORY_CONNECTION_LIFETIME));
    }

    #[test]
    fn file_pool_recycles_connections() {
        let opt = connect_options("sqlite:/tmp/apex.db?mode=rwc", 8, 2);
        assert_eq!(opt.get_max_connections(), Some(8));
        assert_eq!(opt.get_min_connections(), Some(2));
        assert_eq!(opt.get_idle_timeout(), Some(Duration::from_secs(300)));
        assert_eq!(opt.get_max_lifetime(), Some(Duration::from_secs(600)));
    }

    #[tokio::test]
    async fn in_memory_store_survives_idle_time() {
        let store = Store::new("sqlite::memory:").await.unwrap();
        store.populate(&AuthConfig::default()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.list_groups().await.unwrap().len(), 2);
    }

    #[test]
    fn plain_errors_are_not_unique_violations() {
        assert!(!is_unique_violation(&anyhow::anyhow!("boom")));
    }
}
