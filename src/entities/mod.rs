pub mod prelude;

pub mod auth_groups;
pub mod auth_user_groups;
pub mod auth_user_log;
pub mod auth_user_profiles;
pub mod auth_users;
