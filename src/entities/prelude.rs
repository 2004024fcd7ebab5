pub use super::auth_groups::Entity as AuthGroups;
pub use super::auth_user_groups::Entity as AuthUserGroups;
pub use super::auth_user_log::Entity as AuthUserLog;
pub use super::auth_user_profiles::Entity as AuthUserProfiles;
pub use super::auth_users::Entity as AuthUsers;
