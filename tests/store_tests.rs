//! Repository-level tests through the `Store` facade.

use apex::config::{AuthConfig, Config};
use apex::db::{NewUserRecord, Store};
use apex::domain::Origin;
use apex::entities::auth_user_log::LogEvent;
use apex::entities::auth_users::UserStatus;
use sea_orm::ConnectionTrait;

async fn temp_store() -> Store {
    let db_path =
        std::env::temp_dir().join(format!("apex-store-test-{}.db", uuid::Uuid::new_v4()));
    Store::new(&format!("sqlite:{}", db_path.display()))
        .await
        .expect("failed to open store")
}

fn record(username: &str) -> NewUserRecord {
    NewUserRecord {
        login: String::new(),
        username: username.to_string(),
        password_hash: String::new(),
        email: format!("{username}@example.com"),
        status: UserStatus::Active,
    }
}

#[tokio::test]
async fn populate_is_idempotent() {
    let store = temp_store().await;
    let auth = AuthConfig::default();

    assert_eq!(store.populate(&auth).await.unwrap(), 2);
    assert_eq!(store.populate(&auth).await.unwrap(), 0);

    let names: Vec<String> = store
        .list_groups()
        .await
        .unwrap()
        .into_iter()
        .map(|g| g.name)
        .collect();
    assert_eq!(names, vec!["admin", "users"]);

    let users = store.get_group_by_name("users").await.unwrap().unwrap();
    assert_eq!(users.description, "User Group");
}

#[tokio::test]
async fn populate_uses_configured_groups() {
    let store = temp_store().await;
    let auth = AuthConfig {
        default_groups: Some("staff, admin".to_string()),
        ..AuthConfig::default()
    };

    store.create_group("admin", "Existing").await.unwrap();
    assert_eq!(store.populate(&auth).await.unwrap(), 1);

    let staff = store.get_group_by_name("staff").await.unwrap().unwrap();
    assert!(staff.description.is_empty());
    let admin = store.get_group_by_name("admin").await.unwrap().unwrap();
    assert_eq!(admin.description, "Existing");
}

#[tokio::test]
async fn initialize_with_in_memory_database() {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();

    let store = Store::initialize(&config).await.unwrap();
    store.ping().await.unwrap();
    assert_eq!(store.list_groups().await.unwrap().len(), 2);
}

#[tokio::test]
async fn memberships_can_be_changed() {
    let store = temp_store().await;
    let staff = store.create_group("staff", "").await.unwrap();
    let ops = store.create_group("ops", "").await.unwrap();

    let created = store
        .create_user_with_groups(record("nina"), vec![staff.clone(), ops.clone()])
        .await
        .unwrap();
    assert_eq!(created.linked.len(), 2);
    assert!(created.failed.is_empty());
    let user = created.user;

    assert!(store.user_in_group(user.id, "ops").await.unwrap());
    assert!(store.remove_user_from_group(user.id, ops.id).await.unwrap());
    assert!(!store.remove_user_from_group(user.id, ops.id).await.unwrap());
    assert!(!store.user_in_group(user.id, "ops").await.unwrap());

    store.add_user_to_group(user.id, ops.id).await.unwrap();
    let members = store.get_group_members(ops.id).await.unwrap();
    assert_eq!(members, vec![user.clone()]);

    assert!(store.delete_group(ops.id).await.unwrap());
    let groups = store.get_user_groups(user.id).await.unwrap();
    assert_eq!(groups, vec![staff]);
}

#[tokio::test]
async fn failed_group_delete_keeps_memberships() {
    let store = temp_store().await;
    let ops = store.create_group("ops", "").await.unwrap();
    let created = store
        .create_user_with_groups(record("pia"), vec![ops.clone()])
        .await
        .unwrap();

    store
        .conn
        .execute_unprepared(
            "CREATE TRIGGER lock_ops BEFORE DELETE ON auth_groups \
             WHEN OLD.name = 'ops' BEGIN SELECT RAISE(ABORT, 'group is locked'); END",
        )
        .await
        .unwrap();

    assert!(store.delete_group(ops.id).await.is_err());
    assert!(store.get_group_by_id(ops.id).await.unwrap().is_some());
    assert_eq!(
        store.get_group_members(ops.id).await.unwrap(),
        vec![created.user]
    );
}

#[tokio::test]
async fn duplicate_links_are_reported_not_fatal() {
    let store = temp_store().await;
    let staff = store.create_group("staff", "").await.unwrap();

    let created = store
        .create_user_with_groups(record("omar"), vec![staff.clone(), staff.clone()])
        .await
        .unwrap();

    assert_eq!(created.linked, vec![staff.clone()]);
    assert_eq!(created.failed.len(), 1);
    assert_eq!(created.failed[0].0, staff);
    assert!(store.get_user_by_id(created.user.id).await.unwrap().is_some());
}

#[tokio::test]
async fn unique_group_names_are_detected() {
    let store = temp_store().await;
    store.create_group("staff", "").await.unwrap();

    let err = store.create_group("staff", "again").await.unwrap_err();
    assert!(apex::db::is_unique_violation(&err));
}

#[tokio::test]
async fn user_log_ordering_and_prune() {
    let store = temp_store().await;
    let user = store
        .create_user_with_groups(record("pia"), Vec::new())
        .await
        .unwrap()
        .user;

    for event in [LogEvent::Register, LogEvent::Login, LogEvent::Password, LogEvent::Login] {
        store
            .record_user_event(user.id, event, "10.0.0.1", Origin::Internal)
            .await
            .unwrap();
    }

    let log = store.get_login_log(user.id).await.unwrap();
    assert_eq!(log.len(), 4);
    assert_eq!(log[0].event, LogEvent::Register);

    let recent = store.get_last_events(user.id, 2).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].id, log[3].id);

    assert_eq!(store.get_last_logins(user.id, 10).await.unwrap().len(), 2);

    assert!(
        store
            .record_user_event(user.id, LogEvent::Login, &"1".repeat(40), Origin::Internal)
            .await
            .is_err()
    );

    assert_eq!(store.prune_user_log(1).await.unwrap(), 0);
    assert_eq!(store.prune_user_log(-1).await.unwrap(), 4);
}

#[tokio::test]
async fn status_and_password_updates() {
    let store = temp_store().await;
    let user = store
        .create_user_with_groups(record("quinn"), Vec::new())
        .await
        .unwrap()
        .user;

    let disabled = store
        .set_user_status(user.id, UserStatus::Disabled)
        .await
        .unwrap();
    assert_eq!(disabled.status, UserStatus::Disabled);
    assert!(!disabled.is_active());

    store
        .update_user_password(user.id, "$2b$04$placeholder".to_string())
        .await
        .unwrap();
    let (_, stored) = store
        .get_user_with_password_by_username("quinn")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, "$2b$04$placeholder");

    assert!(store.update_user_password(9999, String::new()).await.is_err());
    assert!(store.delete_user(user.id).await.unwrap());
    assert!(!store.delete_user(user.id).await.unwrap());
}
