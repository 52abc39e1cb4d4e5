//! 隐私数据导出与删除

use super::SeaOrmStorage;
use crate::entity::marking_allocations::{ActiveModel, Column, Entity as MarkingAllocations};
use crate::errors::{DoubleMarkingError, Result};
use crate::models::{
    allocations::entities::{Allocation, SETTINGS_SUBJECT_ID},
    privacy::responses::PrivacyDeleteResponse,
};
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};

impl SeaOrmStorage {
    /// 用户作为学生、评分人或复核人出现的全部记录
    pub async fn export_user_allocations_impl(&self, user_id: i64) -> Result<Vec<Allocation>> {
        let result = MarkingAllocations::find()
            .filter(Column::SubjectId.ne(SETTINGS_SUBJECT_ID))
            .filter(
                Condition::any()
                    .add(Column::SubjectId.eq(user_id))
                    .add(Column::Marker1Id.eq(user_id))
                    .add(Column::Marker2Id.eq(user_id))
                    .add(Column::RatifierId.eq(user_id)),
            )
            .order_by_asc(Column::AssignmentId)
            .order_by_asc(Column::SubjectId)
            .all(&self.db)
            .await
            .map_err(|e| DoubleMarkingError::database_operation(format!("导出用户数据失败: {e}")))?;

        result.into_iter().map(|m| m.into_allocation()).collect()
    }

    /// 删除用户作为学生的记录，并清空其作为评分人写下的评语
    pub async fn delete_user_marking_data_impl(
        &self,
        user_id: i64,
    ) -> Result<PrivacyDeleteResponse> {
        let now = chrono::Utc::now().timestamp();
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| DoubleMarkingError::database_operation(format!("开启事务失败: {e}")))?;

        let deleted = MarkingAllocations::delete_many()
            .filter(Column::SubjectId.eq(user_id))
            .filter(Column::SubjectId.ne(SETTINGS_SUBJECT_ID))
            .exec(&txn)
            .await
            .map_err(|e| DoubleMarkingError::database_operation(format!("删除分配记录失败: {e}")))?;

        let cleared1 = MarkingAllocations::update_many()
            .set(ActiveModel {
                marker1_feedback: Set(Some(String::new())),
                updated_at: Set(now),
                ..Default::default()
            })
            .filter(Column::Marker1Id.eq(user_id))
            .exec(&txn)
            .await
            .map_err(|e| DoubleMarkingError::database_operation(format!("清空评语失败: {e}")))?;

        let cleared2 = MarkingAllocations::update_many()
            .set(ActiveModel {
                marker2_feedback: Set(Some(String::new())),
                updated_at: Set(now),
                ..Default::default()
            })
            .filter(Column::Marker2Id.eq(user_id))
            .exec(&txn)
            .await
            .map_err(|e| DoubleMarkingError::database_operation(format!("清空评语失败: {e}")))?;

        txn.commit()
            .await
            .map_err(|e| DoubleMarkingError::database_operation(format!("提交事务失败: {e}")))?;

        Ok(PrivacyDeleteResponse {
            deleted_allocations: deleted.rows_affected,
            cleared_feedback: cleared1.rows_affected + cleared2.rows_affected,
        })
    }

    /// 删除作业的全部分配记录
    pub async fn delete_assignment_allocations_impl(&self, assignment_id: i64) -> Result<u64> {
        let result = MarkingAllocations::delete_many()
            .filter(Column::AssignmentId.eq(assignment_id))
            .exec(&self.db)
            .await
            .map_err(|e| DoubleMarkingError::database_operation(format!("删除分配记录失败: {e}")))?;

        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::models::allocations::entities::{BlindSetting, MarkerSlot};
    use crate::storage::MarkerGradeWrite;

    #[tokio::test]
    async fn test_export_and_delete_user_data() {
        let storage = seeded_storage().await;
        let alloc = storage
            .upsert_allocation_impl(ASSIGNMENT_ID, STUDENT, MARKER_A, MARKER_B)
            .await
            .unwrap();
        storage
            .upsert_allocation_impl(ASSIGNMENT_ID, OUTSIDER, MARKER_A, TEACHER)
            .await
            .unwrap();
        storage
            .record_marker_grade_impl(MarkerGradeWrite {
                allocation_id: alloc.id,
                slot: MarkerSlot::Marker1,
                marker_id: MARKER_A,
                grade: 70.0,
                feedback: Some("solid argument".to_string()),
                graded_at: chrono::Utc::now(),
            })
            .await
            .unwrap();

        let exported = storage.export_user_allocations_impl(MARKER_A).await.unwrap();
        assert_eq!(exported.len(), 2);
        let exported = storage.export_user_allocations_impl(STUDENT).await.unwrap();
        assert_eq!(exported.len(), 1);

        let summary = storage.delete_user_marking_data_impl(MARKER_A).await.unwrap();
        assert_eq!(summary.deleted_allocations, 0);
        assert_eq!(summary.cleared_feedback, 2);
        let alloc = storage
            .get_allocation_impl(ASSIGNMENT_ID, STUDENT)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(alloc.marker1_feedback.as_deref(), Some(""));
        assert_eq!(alloc.marker1_grade, Some(70.0));

        let summary = storage.delete_user_marking_data_impl(STUDENT).await.unwrap();
        assert_eq!(summary.deleted_allocations, 1);
        assert!(storage
            .get_allocation_impl(ASSIGNMENT_ID, STUDENT)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_delete_assignment_allocations() {
        let storage = seeded_storage().await;
        storage
            .upsert_assignment_settings_impl(ASSIGNMENT_ID, BlindSetting::Blind, true)
            .await
            .unwrap();
        storage
            .upsert_allocation_impl(ASSIGNMENT_ID, STUDENT, MARKER_A, MARKER_B)
            .await
            .unwrap();
        storage
            .upsert_allocation_impl(UNGRADED_ASSIGNMENT_ID, STUDENT, MARKER_A, MARKER_B)
            .await
            .unwrap();

        let deleted = storage
            .delete_assignment_allocations_impl(ASSIGNMENT_ID)
            .await
            .unwrap();
        assert_eq!(deleted, 2);
        assert!(storage
            .get_allocation_impl(UNGRADED_ASSIGNMENT_ID, STUDENT)
            .await
            .unwrap()
            .is_some());
    }
}
