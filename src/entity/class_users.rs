//! 班级用户关联实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "class_users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub class_id: i64,
    pub user_id: i64,
    pub role: String,
    pub updated_at: i64,
    pub joined_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::classes::Entity",
        from = "Column::ClassId",
        to = "super::classes::Column::Id"
    )]
    Class,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    User,
}

impl Related<super::classes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Class.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// 从数据库模型转换为业务模型
impl Model {
    pub fn into_class_user(
        self,
    ) -> crate::errors::Result<crate::models::class_users::entities::ClassUser> {
        use crate::errors::DoubleMarkingError;
        use crate::models::class_users::entities::{ClassUser, ClassUserRole};

        let role = self.role.parse::<ClassUserRole>().map_err(|e| {
            DoubleMarkingError::database_operation(format!(
                "班级 {} 成员 {} 角色无效: {e}",
                self.class_id, self.user_id
            ))
        })?;

        Ok(ClassUser {
            id: self.id,
            class_id: self.class_id,
            user_id: self.user_id,
            role,
            updated_at: super::from_timestamp(self.updated_at),
            joined_at: super::from_timestamp(self.joined_at),
        })
    }
}
