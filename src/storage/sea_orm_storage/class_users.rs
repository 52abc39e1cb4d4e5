use super::SeaOrmStorage;
use crate::entity::class_users::{Column, Entity as ClassUsers};
use crate::errors::{DoubleMarkingError, Result};
use crate::models::class_users::entities::ClassUser;
use sea_orm::{ColumnTrait, Condition, EntityTrait, QueryFilter};

impl SeaOrmStorage {
    /// 获取用户在班级中的信息
    pub async fn get_class_user_by_user_id_and_class_id_impl(
        &self,
        user_id: i64,
        class_id: i64,
    ) -> Result<Option<ClassUser>> {
        let result = ClassUsers::find()
            .filter(
                Condition::all()
                    .add(Column::UserId.eq(user_id))
                    .add(Column::ClassId.eq(class_id)),
            )
            .one(&self.db)
            .await
            .map_err(|e| DoubleMarkingError::database_operation(format!("查询班级用户失败: {e}")))?;

        result.map(|m| m.into_class_user()).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::models::class_users::entities::ClassUserRole;

    #[tokio::test]
    async fn test_class_membership_lookup() {
        let storage = seeded_storage().await;

        let marker = storage
            .get_class_user_by_user_id_and_class_id_impl(MARKER_A, CLASS_ID)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(marker.role, ClassUserRole::Marker);

        let outsider = storage
            .get_class_user_by_user_id_and_class_id_impl(OUTSIDER, CLASS_ID)
            .await
            .unwrap();
        assert!(outsider.is_none());
    }
}
