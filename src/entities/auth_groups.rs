use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "auth_groups")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub name: String,

    pub description: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::auth_user_groups::Entity")]
    Memberships,
}

impl Related<super::auth_user_groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Memberships.def()
    }
}

impl Related<super::auth_users::Entity> for Entity {
    fn to() -> RelationDef {
        super::auth_user_groups::Relation::User.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::auth_user_groups::Relation::Group.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
