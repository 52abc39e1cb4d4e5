//! 用户实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub username: String,
    pub email: String,
    pub role: String,
    pub status: String,
    pub profile_name: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::classes::Entity")]
    Classes,
    #[sea_orm(has_many = "super::class_users::Entity")]
    ClassUsers,
}

impl Related<super::classes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Classes.def()
    }
}

impl Related<super::class_users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ClassUsers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// 从数据库模型转换为业务模型
impl Model {
    pub fn into_user(self) -> crate::errors::Result<crate::models::users::entities::User> {
        use crate::errors::DoubleMarkingError;
        use crate::models::users::entities::{User, UserRole, UserStatus};

        let role = self.role.parse::<UserRole>().map_err(|e| {
            DoubleMarkingError::database_operation(format!("用户 {} 角色无效: {e}", self.id))
        })?;
        let status = self.status.parse::<UserStatus>().map_err(|e| {
            DoubleMarkingError::database_operation(format!("用户 {} 状态无效: {e}", self.id))
        })?;

        Ok(User {
            id: self.id,
            username: self.username,
            email: self.email,
            role,
            status,
            profile_name: self.profile_name,
            created_at: super::from_timestamp(self.created_at),
            updated_at: super::from_timestamp(self.updated_at),
        })
    }
}
