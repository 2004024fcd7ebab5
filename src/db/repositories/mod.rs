pub mod group;
pub mod profile;
pub mod user;
pub mod user_log;
