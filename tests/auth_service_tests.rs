//! End-to-end tests for the auth helpers against a temporary sqlite file.

use std::sync::Arc;

use apex::config::Config;
use apex::db::Store;
use apex::domain::events::{AuthEvent, EventBus};
use apex::domain::{GroupId, UserId};
use apex::entities::auth_user_log::LogEvent;
use apex::entities::auth_users::UserStatus;
use apex::request::{MemoryFlash, RequestContext};
use apex::services::{AuthError, AuthService, CredentialLookup, NewGroup, NewUser, SeaOrmAuthService};
use sea_orm::ConnectionTrait;

fn test_config() -> Config {
    let db_path =
        std::env::temp_dir().join(format!("apex-auth-test-{}.db", uuid::Uuid::new_v4()));

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}", db_path.display());
    config.security.bcrypt_cost = 4;
    config
}

async fn spawn_service(config: Config) -> SeaOrmAuthService {
    let store = Store::initialize(&config)
        .await
        .expect("failed to initialize store");
    SeaOrmAuthService::new(store, &config, EventBus::new(16))
}

fn web_ctx(ip: &str) -> (RequestContext, Arc<MemoryFlash>) {
    let flash = Arc::new(MemoryFlash::new());
    (RequestContext::new(Some(ip.to_string()), flash.clone()), flash)
}

async fn group_names(service: &SeaOrmAuthService, user_id: i32) -> Vec<String> {
    service
        .groups(UserId::new(user_id))
        .await
        .unwrap()
        .into_iter()
        .map(|g| g.name)
        .collect()
}

#[tokio::test]
async fn create_user_joins_users_group_and_deduplicates() {
    let service = spawn_service(test_config()).await;
    service
        .create_group(NewGroup::named("editors"), None)
        .await
        .unwrap();

    let user = service
        .create_user(
            NewUser {
                username: "alice".to_string(),
                password: Some("correct horse".to_string()),
                group: Some("users".to_string()),
                groups: Some("editors, users ,missing,editors".to_string()),
                ..NewUser::default()
            },
            None,
        )
        .await
        .unwrap();

    assert!(user.is_active());
    assert_eq!(group_names(&service, user.id).await, vec!["editors", "users"]);
    assert!(service.in_group(UserId::new(user.id), "editors").await.unwrap());
    assert!(!service.in_group(UserId::new(user.id), "admin").await.unwrap());
}

#[tokio::test]
async fn create_user_stores_a_hash() {
    let service = spawn_service(test_config()).await;
    let user = service
        .create_user(NewUser::with_username("bob", "s3cret-password"), None)
        .await
        .unwrap();

    let (_, stored) = service
        .store()
        .get_user_with_password_by_id(user.id)
        .await
        .unwrap()
        .unwrap();
    assert_ne!(stored, "s3cret-password");
    assert!(stored.starts_with("$2"));

    assert!(
        service
            .check_password(CredentialLookup::Username("bob"), "s3cret-password")
            .await
            .unwrap()
    );
    assert!(
        !service
            .check_password(CredentialLookup::Id(UserId::new(user.id)), "wrong")
            .await
            .unwrap()
    );
    assert!(
        !service
            .check_password(CredentialLookup::Username("nobody"), "s3cret-password")
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn user_without_password_never_verifies() {
    let service = spawn_service(test_config()).await;
    let user = service
        .create_user(
            NewUser {
                login: "ext-login".to_string(),
                ..NewUser::default()
            },
            None,
        )
        .await
        .unwrap();

    assert_eq!(user.display_name(), "ext-login");
    assert!(
        !service
            .check_password(CredentialLookup::Id(UserId::new(user.id)), "")
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn missing_default_user_group_is_an_error() {
    let mut config = test_config();
    config.auth.default_user_group = Some("members".to_string());
    let service = spawn_service(config).await;

    let err = service
        .create_user(NewUser::with_username("carol", "password123"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::GroupNotFound(ref name) if name == "members"));
    assert_eq!(service.store().count_users().await.unwrap(), 0);

    service
        .create_group(NewGroup::named("members"), None)
        .await
        .unwrap();
    let user = service
        .create_user(NewUser::with_username("carol", "password123"), None)
        .await
        .unwrap();
    assert_eq!(group_names(&service, user.id).await, vec!["members", "users"]);
}

#[tokio::test]
async fn duplicate_group_is_rejected() {
    let service = spawn_service(test_config()).await;

    let err = service
        .create_group(NewGroup::named("admin"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::DuplicateGroup(ref name) if name == "admin"));

    let err = service
        .create_group(NewGroup::named("   "), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Validation(_)));
}

#[tokio::test]
async fn create_and_delete_publish_events() {
    let service = spawn_service(test_config()).await;
    let mut events = service.events().subscribe();
    let (ctx, _) = web_ctx("192.0.2.10");

    let group = service
        .create_group(
            NewGroup {
                name: "staff".to_string(),
                description: "Staff members".to_string(),
            },
            Some(&ctx),
        )
        .await
        .unwrap();
    let user = service
        .create_user(NewUser::with_username("dave", "password123"), Some(&ctx))
        .await
        .unwrap();
    service
        .delete_user(UserId::new(user.id), Some(&ctx))
        .await
        .unwrap();

    match events.recv().await.unwrap() {
        AuthEvent::GroupCreated { group: g, ip_addr } => {
            assert_eq!(g, group);
            assert_eq!(ip_addr.as_deref(), Some("192.0.2.10"));
        }
        other => panic!("unexpected event {}", other.name()),
    }
    assert!(matches!(
        events.recv().await.unwrap(),
        AuthEvent::UserCreated { user: ref u, .. } if u.id == user.id
    ));
    assert!(matches!(
        events.recv().await.unwrap(),
        AuthEvent::UserDeleted { user: ref u, .. } if u.id == user.id
    ));
}

#[tokio::test]
async fn delete_user_removes_dependents() {
    let mut config = test_config();
    config.auth.profiles_enabled = true;
    let service = spawn_service(config).await;
    let (ctx, _) = web_ctx("198.51.100.7");

    let user = service
        .create_user(NewUser::with_username("erin", "password123"), None)
        .await
        .unwrap();
    let id = UserId::new(user.id);
    service.login("erin", "password123", &ctx).await.unwrap();
    service.get_profile(id).await.unwrap().unwrap();

    service.delete_user(id, None).await.unwrap();

    let store = service.store();
    assert!(store.get_user_by_id(user.id).await.unwrap().is_none());
    assert!(store.get_login_log(user.id).await.unwrap().is_empty());
    assert!(store.get_profile(user.id).await.unwrap().is_none());
    let users_group = store.get_group_by_name("users").await.unwrap().unwrap();
    assert!(store.get_group_members(users_group.id).await.unwrap().is_empty());

    let err = service.delete_user(id, None).await.unwrap_err();
    assert!(matches!(err, AuthError::UserNotFound));
}

#[tokio::test]
async fn profiles_follow_config() {
    let disabled = spawn_service(test_config()).await;
    let user = disabled
        .create_user(NewUser::with_username("frank", "password123"), None)
        .await
        .unwrap();
    assert!(disabled.get_profile(UserId::new(user.id)).await.unwrap().is_none());

    let mut config = test_config();
    config.auth.profiles_enabled = true;
    let enabled = spawn_service(config).await;
    let user = enabled
        .create_user(NewUser::with_username("frank", "password123"), None)
        .await
        .unwrap();
    let id = UserId::new(user.id);

    let first = enabled.get_profile(id).await.unwrap().unwrap();
    assert_eq!(first.user_id, user.id);
    assert!(first.display_name.is_none());

    enabled
        .store()
        .update_profile(
            user.id,
            Some("Frank".to_string()),
            Some(serde_json::json!({"theme": "dark"})),
        )
        .await
        .unwrap();
    let again = enabled.get_profile(id).await.unwrap().unwrap();
    assert_eq!(again.display_name.as_deref(), Some("Frank"));
    assert_eq!(again.data, Some(serde_json::json!({"theme": "dark"})));

    let err = enabled.get_profile(UserId::new(9999)).await.unwrap_err();
    assert!(matches!(err, AuthError::UserNotFound));
}

#[tokio::test]
async fn login_records_events() {
    let service = spawn_service(test_config()).await;
    let user = service
        .create_user(NewUser::with_username("grace", "password123"), None)
        .await
        .unwrap();
    let id = UserId::new(user.id);

    let (ctx, _) = web_ctx("2001:db8::1");
    service.login("grace", "password123", &ctx).await.unwrap();
    service
        .login("grace", "password123", &RequestContext::detached())
        .await
        .unwrap();

    let err = service.login("grace", "nope", &ctx).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));
    let err = service.login("nobody", "password123", &ctx).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));

    let logins = service.last_logins(id, 10).await.unwrap();
    assert_eq!(logins.len(), 2);
    assert!(logins.iter().all(|e| e.event == LogEvent::Login));
    assert!(logins.iter().all(|e| e.internal_user && !e.external_user));

    let last = service.last_login(id).await.unwrap().unwrap();
    assert_eq!(last.ip_addr, "0.0.0.0");
    assert_eq!(logins[0].id, last.id);
}

#[tokio::test]
async fn inactive_users_cannot_log_in() {
    let service = spawn_service(test_config()).await;
    let user = service
        .create_user(
            NewUser {
                status: Some(UserStatus::Inactive),
                ..NewUser::with_username("heidi", "password123")
            },
            None,
        )
        .await
        .unwrap();
    assert!(!user.is_active());

    let ctx = RequestContext::detached();
    let err = service.login("heidi", "password123", &ctx).await.unwrap_err();
    assert!(matches!(err, AuthError::Inactive));

    let user = service
        .set_status(UserId::new(user.id), UserStatus::Active)
        .await
        .unwrap();
    assert!(user.is_active());
    service.login("heidi", "password123", &ctx).await.unwrap();
}

#[tokio::test]
async fn change_password_records_event() {
    let service = spawn_service(test_config()).await;
    let user = service
        .create_user(NewUser::with_username("ivan", "password123"), None)
        .await
        .unwrap();
    let id = UserId::new(user.id);
    let (ctx, _) = web_ctx("203.0.113.5");

    let err = service
        .change_password(id, "password123", "short", &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Validation(_)));

    let err = service
        .change_password(id, "wrong-password", "new-password-1", &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Validation(_)));

    service
        .change_password(id, "password123", "new-password-1", &ctx)
        .await
        .unwrap();
    service.login("ivan", "new-password-1", &ctx).await.unwrap();

    let events = service.store().get_last_events(user.id, 10).await.unwrap();
    let kinds: Vec<LogEvent> = events.iter().map(|e| e.event).collect();
    assert!(kinds.contains(&LogEvent::Password));
    assert!(kinds.contains(&LogEvent::Login));
}

#[tokio::test]
async fn record_event_rejects_oversized_ip() {
    let service = spawn_service(test_config()).await;
    let user = service
        .create_user(NewUser::with_username("judy", "password123"), None)
        .await
        .unwrap();
    let id = UserId::new(user.id);

    let (ctx, _) = web_ctx(&"9".repeat(40));
    let err = service
        .record_event(id, LogEvent::Forgot, &ctx, apex::domain::Origin::External)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Validation(_)));

    let (ctx, _) = web_ctx("10.1.2.3");
    let entry = service
        .record_event(id, LogEvent::Register, &ctx, apex::domain::Origin::External)
        .await
        .unwrap();
    assert_eq!(entry.event, LogEvent::Register);
    assert!(entry.external_user);
    assert!(!entry.internal_user);
}

#[tokio::test]
async fn lookups_by_each_column() {
    let service = spawn_service(test_config()).await;
    let user = service
        .create_user(
            NewUser {
                login: "kim-login".to_string(),
                username: "kim".to_string(),
                email: "kim@example.com".to_string(),
                password: Some("password123".to_string()),
                ..NewUser::default()
            },
            None,
        )
        .await
        .unwrap();

    let by_login = service.get_by_login("kim-login").await.unwrap().unwrap();
    let by_name = service.get_by_username("kim").await.unwrap().unwrap();
    let by_email = service.get_by_email("kim@example.com").await.unwrap().unwrap();
    let by_id = service.get_by_id(UserId::new(user.id)).await.unwrap().unwrap();

    assert_eq!(by_login, user);
    assert_eq!(by_name, user);
    assert_eq!(by_email, user);
    assert_eq!(by_id, user);
    assert!(service.get_by_email("other@example.com").await.unwrap().is_none());

    let page = service.list_users(1, 10).await.unwrap();
    assert_eq!(page, vec![user]);
    assert!(service.list_users(2, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn clean_create_flashes_nothing_with_or_without_context() {
    let service = spawn_service(test_config()).await;
    let (ctx, flash) = web_ctx("127.0.0.1");

    service
        .create_user(NewUser::with_username("leo", "password123"), Some(&ctx))
        .await
        .unwrap();
    assert!(flash.take().is_empty());

    // No context at all still creates the user.
    service
        .create_user(NewUser::with_username("mia", "password123"), None)
        .await
        .unwrap();
    assert_eq!(service.store().count_users().await.unwrap(), 2);
}

#[tokio::test]
async fn failed_group_link_is_flashed_and_user_kept() {
    let service = spawn_service(test_config()).await;
    let staff = service
        .create_group(NewGroup::named("staff"), None)
        .await
        .unwrap();

    service
        .store()
        .conn
        .execute_unprepared(&format!(
            "CREATE TRIGGER refuse_staff BEFORE INSERT ON auth_user_groups \
             WHEN NEW.group_id = {} BEGIN SELECT RAISE(ABORT, 'link refused'); END",
            staff.id
        ))
        .await
        .unwrap();

    let (ctx, flash) = web_ctx("198.51.100.7");
    let user = service
        .create_user(
            NewUser {
                groups: Some("staff".to_string()),
                ..NewUser::with_username("carl", "password123")
            },
            Some(&ctx),
        )
        .await
        .unwrap();

    assert!(service.get_by_id(UserId::new(user.id)).await.unwrap().is_some());
    assert_eq!(group_names(&service, user.id).await, vec!["users"]);

    let messages = flash.take();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].queue, "error");
    assert!(messages[0].message.contains("Can't add user: carl to group: staff"));
    assert!(messages[0].message.contains("link refused"));
}

#[tokio::test]
async fn group_lookup_failure_is_a_create_error() {
    let service = spawn_service(test_config()).await;
    service
        .store()
        .conn
        .execute_unprepared("ALTER TABLE auth_groups RENAME TO auth_groups_gone")
        .await
        .unwrap();

    let err = service
        .create_user(NewUser::with_username("gus", "password123"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::CreateUser(_)), "got {err:?}");
}

#[tokio::test]
async fn groups_are_managed_by_id() {
    let service = spawn_service(test_config()).await;
    let mut events = service.events().subscribe();
    let ops = service
        .create_group(NewGroup::named("ops"), None)
        .await
        .unwrap();
    let ops_id = GroupId::new(ops.id);
    let user = service
        .create_user(NewUser::with_username("ivy", "password123"), None)
        .await
        .unwrap();
    let user_id = UserId::new(user.id);

    service.add_to_group(user_id, ops_id).await.unwrap();
    assert_eq!(service.group_members(ops_id).await.unwrap(), vec![user.clone()]);
    assert!(service.remove_from_group(user_id, ops_id).await.unwrap());
    assert!(!service.remove_from_group(user_id, ops_id).await.unwrap());

    let missing = GroupId::new(ops.id + 100);
    assert!(matches!(
        service.add_to_group(user_id, missing).await,
        Err(AuthError::GroupNotFound(_))
    ));
    assert!(matches!(
        service.add_to_group(UserId::new(user.id + 100), ops_id).await,
        Err(AuthError::UserNotFound)
    ));

    service.add_to_group(user_id, ops_id).await.unwrap();
    let deleted = service.delete_group(ops_id, None).await.unwrap();
    assert_eq!(deleted, ops);
    assert!(service.get_group(ops_id).await.unwrap().is_none());
    assert_eq!(group_names(&service, user.id).await, vec!["users"]);
    assert!(matches!(
        service.delete_group(ops_id, None).await,
        Err(AuthError::GroupNotFound(_))
    ));

    let mut saw_delete = false;
    while let Ok(event) = events.try_recv() {
        if let AuthEvent::GroupDeleted { group, .. } = event {
            assert_eq!(group.id, ops.id);
            saw_delete = true;
        }
    }
    assert!(saw_delete);
}
