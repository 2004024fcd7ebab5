use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Account state, stored as a single character.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(1))")]
pub enum UserStatus {
    #[sea_orm(string_value = "Y")]
    Active,
    #[sea_orm(string_value = "N")]
    Inactive,
    #[sea_orm(string_value = "D")]
    Disabled,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "auth_users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// External login identifier, e.g. a provider-issued id.
    pub login: String,

    pub username: String,

    /// bcrypt or argon2 hash. Empty when the account has no password.
    pub password: String,

    pub email: String,

    pub active: UserStatus,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::auth_user_groups::Entity")]
    Memberships,
    #[sea_orm(has_many = "super::auth_user_log::Entity")]
    Log,
    #[sea_orm(has_one = "super::auth_user_profiles::Entity")]
    Profile,
}

impl Related<super::auth_user_groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Memberships.def()
    }
}

impl Related<super::auth_user_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Log.def()
    }
}

impl Related<super::auth_user_profiles::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Profile.def()
    }
}

impl Related<super::auth_groups::Entity> for Entity {
    fn to() -> RelationDef {
        super::auth_user_groups::Relation::Group.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::auth_user_groups::Relation::User.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
