//! 双评分配存储操作
//!
//! 所有写操作都以 `version` 为条件并在成功后自增，
//! 两个评分位的字段互不相交，复核写入要求 `final_grade` 仍为空。

use super::SeaOrmStorage;
use crate::entity::marking_allocations::{ActiveModel, Column, Entity as MarkingAllocations};
use crate::errors::{DoubleMarkingError, Result};
use crate::models::{
    PaginationInfo,
    allocations::{
        entities::{Allocation, BlindSetting, MarkerSlot, SETTINGS_SUBJECT_ID},
        requests::AllocationListQuery,
        responses::RatificationResult,
    },
};
use crate::storage::MarkerGradeWrite;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DbErr, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, SqlErr,
};

// 唯一索引冲突视为并发创建
fn map_insert_error(e: DbErr, what: &str) -> DoubleMarkingError {
    if let Some(SqlErr::UniqueConstraintViolation(_)) = e.sql_err() {
        DoubleMarkingError::conflict(format!("{what}已存在"))
    } else {
        DoubleMarkingError::database_operation(format!("创建{what}失败: {e}"))
    }
}

impl SeaOrmStorage {
    async fn get_allocation_by_id_impl(&self, id: i64) -> Result<Allocation> {
        MarkingAllocations::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| DoubleMarkingError::database_operation(format!("查询分配记录失败: {e}")))?
            .ok_or_else(|| DoubleMarkingError::not_found(format!("分配记录 {id} 不存在")))?
            .into_allocation()
    }

    /// 获取某个学生的分配记录
    pub async fn get_allocation_impl(
        &self,
        assignment_id: i64,
        subject_id: i64,
    ) -> Result<Option<Allocation>> {
        let result = MarkingAllocations::find()
            .filter(
                Condition::all()
                    .add(Column::AssignmentId.eq(assignment_id))
                    .add(Column::SubjectId.eq(subject_id)),
            )
            .one(&self.db)
            .await
            .map_err(|e| DoubleMarkingError::database_operation(format!("查询分配记录失败: {e}")))?;

        result.map(|m| m.into_allocation()).transpose()
    }

    /// 获取作业级设置行
    pub async fn get_assignment_settings_impl(
        &self,
        assignment_id: i64,
    ) -> Result<Option<Allocation>> {
        self.get_allocation_impl(assignment_id, SETTINGS_SUBJECT_ID)
            .await
    }

    /// 写入作业级设置行
    pub async fn upsert_assignment_settings_impl(
        &self,
        assignment_id: i64,
        blind_setting: BlindSetting,
        marks_hidden: bool,
    ) -> Result<Allocation> {
        let now = chrono::Utc::now().timestamp();

        match self.get_assignment_settings_impl(assignment_id).await? {
            Some(existing) => {
                MarkingAllocations::update_many()
                    .set(ActiveModel {
                        blind_setting: Set(blind_setting.as_i32()),
                        marks_hidden: Set(marks_hidden),
                        updated_at: Set(now),
                        ..Default::default()
                    })
                    .col_expr(Column::Version, Expr::cust("version + 1"))
                    .filter(Column::Id.eq(existing.id))
                    .exec(&self.db)
                    .await
                    .map_err(|e| {
                        DoubleMarkingError::database_operation(format!("更新双评设置失败: {e}"))
                    })?;

                self.get_allocation_by_id_impl(existing.id).await
            }
            None => {
                let model = ActiveModel {
                    assignment_id: Set(assignment_id),
                    subject_id: Set(SETTINGS_SUBJECT_ID),
                    blind_setting: Set(blind_setting.as_i32()),
                    marks_hidden: Set(marks_hidden),
                    version: Set(0),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .insert(&self.db)
                .await
                .map_err(|e| map_insert_error(e, "双评设置"))?;

                model.into_allocation()
            }
        }
    }

    /// 分页列出学生分配记录
    pub async fn list_allocations_impl(
        &self,
        assignment_id: i64,
        query: AllocationListQuery,
    ) -> Result<(Vec<Allocation>, PaginationInfo)> {
        let page = query.page.unwrap_or(1).max(1) as u64;
        let size = query.size.unwrap_or(20).clamp(1, 100) as u64;

        let mut select = MarkingAllocations::find()
            .filter(Column::AssignmentId.eq(assignment_id))
            .filter(Column::SubjectId.gt(SETTINGS_SUBJECT_ID));

        // 评分人筛选
        if let Some(marker_id) = query.marker_id {
            select = select.filter(
                Condition::any()
                    .add(Column::Marker1Id.eq(marker_id))
                    .add(Column::Marker2Id.eq(marker_id)),
            );
        }

        let select = select.order_by_asc(Column::SubjectId);

        // 分页查询
        let paginator = select.paginate(&self.db, size);
        let total = paginator
            .num_items()
            .await
            .map_err(|e| DoubleMarkingError::database_operation(format!("查询分配总数失败: {e}")))?;

        let pages = paginator
            .num_pages()
            .await
            .map_err(|e| DoubleMarkingError::database_operation(format!("查询分配页数失败: {e}")))?;

        let items = paginator
            .fetch_page(page - 1)
            .await
            .map_err(|e| DoubleMarkingError::database_operation(format!("查询分配列表失败: {e}")))?;

        Ok((
            items
                .into_iter()
                .map(|m| m.into_allocation())
                .collect::<Result<Vec<_>>>()?,
            PaginationInfo {
                page: page as i64,
                page_size: size as i64,
                total: total as i64,
                total_pages: pages as i64,
            },
        ))
    }

    /// 创建或更新分配
    ///
    /// 更换某个评分位的人选时，该评分位已有的成绩与评语一并清空。
    pub async fn upsert_allocation_impl(
        &self,
        assignment_id: i64,
        subject_id: i64,
        marker1_id: i64,
        marker2_id: i64,
    ) -> Result<Allocation> {
        let now = chrono::Utc::now().timestamp();

        let Some(existing) = self.get_allocation_impl(assignment_id, subject_id).await? else {
            let model = ActiveModel {
                assignment_id: Set(assignment_id),
                subject_id: Set(subject_id),
                marker1_id: Set(Some(marker1_id)),
                marker2_id: Set(Some(marker2_id)),
                blind_setting: Set(BlindSetting::None.as_i32()),
                marks_hidden: Set(false),
                version: Set(0),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(&self.db)
            .await
            .map_err(|e| map_insert_error(e, "分配记录"))?;

            return model.into_allocation();
        };

        if existing.is_ratified() {
            return Err(DoubleMarkingError::conflict(format!(
                "学生 {subject_id} 的成绩已复核，不能重新分配"
            )));
        }

        let mut patch = ActiveModel {
            marker1_id: Set(Some(marker1_id)),
            marker2_id: Set(Some(marker2_id)),
            updated_at: Set(now),
            ..Default::default()
        };
        if existing.marker1_id != Some(marker1_id) {
            patch.marker1_grade = Set(None);
            patch.marker1_graded_at = Set(None);
            patch.marker1_feedback = Set(None);
        }
        if existing.marker2_id != Some(marker2_id) {
            patch.marker2_grade = Set(None);
            patch.marker2_graded_at = Set(None);
            patch.marker2_feedback = Set(None);
        }

        let result = MarkingAllocations::update_many()
            .set(patch)
            .col_expr(Column::Version, Expr::cust("version + 1"))
            .filter(Column::Id.eq(existing.id))
            .filter(Column::Version.eq(existing.version))
            .filter(Column::FinalGrade.is_null())
            .exec(&self.db)
            .await
            .map_err(|e| DoubleMarkingError::database_operation(format!("更新分配记录失败: {e}")))?;

        if result.rows_affected == 0 {
            return Err(DoubleMarkingError::conflict(format!(
                "学生 {subject_id} 的分配记录已被修改，请刷新后重试"
            )));
        }

        self.get_allocation_by_id_impl(existing.id).await
    }

    /// 写入评分人成绩，只触及该评分位的字段
    pub async fn record_marker_grade_impl(&self, write: MarkerGradeWrite) -> Result<Allocation> {
        let now = chrono::Utc::now().timestamp();
        let graded_at = write.graded_at.timestamp();

        let mut patch = ActiveModel {
            updated_at: Set(now),
            ..Default::default()
        };
        let marker_column = match write.slot {
            MarkerSlot::Marker1 => {
                patch.marker1_grade = Set(Some(write.grade));
                patch.marker1_graded_at = Set(Some(graded_at));
                patch.marker1_feedback = Set(write.feedback);
                Column::Marker1Id
            }
            MarkerSlot::Marker2 => {
                patch.marker2_grade = Set(Some(write.grade));
                patch.marker2_graded_at = Set(Some(graded_at));
                patch.marker2_feedback = Set(write.feedback);
                Column::Marker2Id
            }
        };

        let result = MarkingAllocations::update_many()
            .set(patch)
            .col_expr(Column::Version, Expr::cust("version + 1"))
            .filter(Column::Id.eq(write.allocation_id))
            .filter(marker_column.eq(write.marker_id))
            .filter(Column::FinalGrade.is_null())
            .exec(&self.db)
            .await
            .map_err(|e| DoubleMarkingError::database_operation(format!("保存评分失败: {e}")))?;

        if result.rows_affected == 0 {
            return Err(DoubleMarkingError::conflict(format!(
                "分配记录 {} 已复核或评分人已变更",
                write.allocation_id
            )));
        }

        self.get_allocation_by_id_impl(write.allocation_id).await
    }

    /// 以读取时的版本号为条件写入复核结果
    pub async fn save_ratification_impl(
        &self,
        result: &RatificationResult,
        expected_version: i64,
    ) -> Result<Allocation> {
        let now = chrono::Utc::now().timestamp();

        let update = MarkingAllocations::update_many()
            .set(ActiveModel {
                final_grade: Set(Some(result.final_grade)),
                ratifier_id: Set(Some(result.ratifier_id)),
                ratification_comment: Set(Some(result.comment.clone())),
                ratified_at: Set(Some(result.ratified_at.timestamp())),
                updated_at: Set(now),
                ..Default::default()
            })
            .col_expr(Column::Version, Expr::cust("version + 1"))
            .filter(Column::Id.eq(result.allocation_id))
            .filter(Column::Version.eq(expected_version))
            .filter(Column::FinalGrade.is_null())
            .exec(&self.db)
            .await
            .map_err(|e| DoubleMarkingError::database_operation(format!("保存复核结果失败: {e}")))?;

        if update.rows_affected == 0 {
            return Err(DoubleMarkingError::conflict(format!(
                "分配记录 {} 已被修改或已复核，请刷新后重试",
                result.allocation_id
            )));
        }

        self.get_allocation_by_id_impl(result.allocation_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::models::allocations::entities::{GradingPhase, RatificationChoice};

    fn grade_write(alloc: &Allocation, slot: MarkerSlot, marker_id: i64, grade: f64) -> MarkerGradeWrite {
        MarkerGradeWrite {
            allocation_id: alloc.id,
            slot,
            marker_id,
            grade,
            feedback: Some(format!("{slot} feedback")),
            graded_at: chrono::Utc::now(),
        }
    }

    fn ratification(alloc: &Allocation, final_grade: f64) -> RatificationResult {
        RatificationResult {
            allocation_id: alloc.id,
            assignment_id: alloc.assignment_id,
            subject_id: alloc.subject_id,
            choice: RatificationChoice::Custom,
            final_grade,
            ratifier_id: TEACHER,
            comment: "agreed".to_string(),
            ratified_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_settings_row_upsert() {
        let storage = seeded_storage().await;
        assert!(storage
            .get_assignment_settings_impl(ASSIGNMENT_ID)
            .await
            .unwrap()
            .is_none());

        let created = storage
            .upsert_assignment_settings_impl(ASSIGNMENT_ID, BlindSetting::Blind, true)
            .await
            .unwrap();
        assert!(created.is_settings_row());

        let updated = storage
            .upsert_assignment_settings_impl(ASSIGNMENT_ID, BlindSetting::DoubleBlind, false)
            .await
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.blind_setting, BlindSetting::DoubleBlind);
        assert!(!updated.marks_hidden);
        assert_eq!(updated.version, created.version + 1);
    }

    #[tokio::test]
    async fn test_grading_lifecycle() {
        let storage = seeded_storage().await;
        let alloc = storage
            .upsert_allocation_impl(ASSIGNMENT_ID, STUDENT, MARKER_A, MARKER_B)
            .await
            .unwrap();
        assert_eq!(alloc.phase(), GradingPhase::AwaitingMarker1);

        let alloc = storage
            .record_marker_grade_impl(grade_write(&alloc, MarkerSlot::Marker2, MARKER_B, 80.0))
            .await
            .unwrap();
        assert_eq!(alloc.marker2_grade, Some(80.0));
        assert_eq!(alloc.marker1_grade, None);

        let alloc = storage
            .record_marker_grade_impl(grade_write(&alloc, MarkerSlot::Marker1, MARKER_A, 70.0))
            .await
            .unwrap();
        assert_eq!(alloc.phase(), GradingPhase::BothGraded);
        assert_eq!(alloc.marker2_grade, Some(80.0));
        assert_eq!(alloc.marker1_feedback.as_deref(), Some("marker1 feedback"));

        let ratified = storage
            .save_ratification_impl(&ratification(&alloc, 75.0), alloc.version)
            .await
            .unwrap();
        assert_eq!(ratified.phase(), GradingPhase::Ratified);
        assert_eq!(ratified.final_grade, Some(75.0));
        assert_eq!(ratified.ratifier_id, Some(TEACHER));
        assert_eq!(ratified.ratification_comment.as_deref(), Some("agreed"));
    }

    #[tokio::test]
    async fn test_unknown_stored_blind_setting_is_an_error() {
        let storage = seeded_storage().await;
        storage
            .upsert_assignment_settings_impl(ASSIGNMENT_ID, BlindSetting::Blind, true)
            .await
            .unwrap();
        MarkingAllocations::update_many()
            .col_expr(Column::BlindSetting, Expr::value(7))
            .filter(Column::AssignmentId.eq(ASSIGNMENT_ID))
            .exec(&storage.db)
            .await
            .unwrap();

        // 不能悄悄变成不盲评
        let err = storage
            .get_assignment_settings_impl(ASSIGNMENT_ID)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "E005");
    }

    #[tokio::test]
    async fn test_stale_version_is_rejected() {
        let storage = seeded_storage().await;
        let alloc = storage
            .upsert_allocation_impl(ASSIGNMENT_ID, STUDENT, MARKER_A, MARKER_B)
            .await
            .unwrap();
        let stale = alloc.clone();

        // 读取之后又有评分写入
        storage
            .record_marker_grade_impl(grade_write(&alloc, MarkerSlot::Marker1, MARKER_A, 70.0))
            .await
            .unwrap();

        let err = storage
            .save_ratification_impl(&ratification(&stale, 60.0), stale.version)
            .await
            .unwrap_err();
        assert!(matches!(err, DoubleMarkingError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_ratified_allocation_is_frozen() {
        let storage = seeded_storage().await;
        let alloc = storage
            .upsert_allocation_impl(ASSIGNMENT_ID, STUDENT, MARKER_A, MARKER_B)
            .await
            .unwrap();
        let alloc = storage
            .save_ratification_impl(&ratification(&alloc, 50.0), alloc.version)
            .await
            .unwrap();

        let err = storage
            .record_marker_grade_impl(grade_write(&alloc, MarkerSlot::Marker1, MARKER_A, 70.0))
            .await
            .unwrap_err();
        assert!(matches!(err, DoubleMarkingError::Conflict(_)));

        let err = storage
            .upsert_allocation_impl(ASSIGNMENT_ID, STUDENT, MARKER_B, MARKER_A)
            .await
            .unwrap_err();
        assert!(matches!(err, DoubleMarkingError::Conflict(_)));

        let err = storage
            .save_ratification_impl(&ratification(&alloc, 90.0), alloc.version)
            .await
            .unwrap_err();
        assert!(matches!(err, DoubleMarkingError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_grade_from_wrong_marker_is_rejected() {
        let storage = seeded_storage().await;
        let alloc = storage
            .upsert_allocation_impl(ASSIGNMENT_ID, STUDENT, MARKER_A, MARKER_B)
            .await
            .unwrap();

        let err = storage
            .record_marker_grade_impl(grade_write(&alloc, MarkerSlot::Marker1, MARKER_B, 70.0))
            .await
            .unwrap_err();
        assert!(matches!(err, DoubleMarkingError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_reallocation_clears_replaced_slot() {
        let storage = seeded_storage().await;
        let alloc = storage
            .upsert_allocation_impl(ASSIGNMENT_ID, STUDENT, MARKER_A, MARKER_B)
            .await
            .unwrap();
        let alloc = storage
            .record_marker_grade_impl(grade_write(&alloc, MarkerSlot::Marker1, MARKER_A, 70.0))
            .await
            .unwrap();
        storage
            .record_marker_grade_impl(grade_write(&alloc, MarkerSlot::Marker2, MARKER_B, 65.0))
            .await
            .unwrap();

        let alloc = storage
            .upsert_allocation_impl(ASSIGNMENT_ID, STUDENT, MARKER_A, TEACHER)
            .await
            .unwrap();
        assert_eq!(alloc.marker1_grade, Some(70.0));
        assert_eq!(alloc.marker2_id, Some(TEACHER));
        assert_eq!(alloc.marker2_grade, None);
        assert_eq!(alloc.marker2_feedback, None);
    }

    #[tokio::test]
    async fn test_list_skips_settings_row() {
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
            .upsert_allocation_impl(ASSIGNMENT_ID, OUTSIDER, TEACHER, MARKER_B)
            .await
            .unwrap();

        let (items, pagination) = storage
            .list_allocations_impl(
                ASSIGNMENT_ID,
                AllocationListQuery {
                    page: None,
                    size: None,
                    marker_id: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(pagination.total, 2);
        assert!(items.iter().all(|a| !a.is_settings_row()));

        let (items, _) = storage
            .list_allocations_impl(
                ASSIGNMENT_ID,
                AllocationListQuery {
                    page: Some(1),
                    size: Some(10),
                    marker_id: Some(MARKER_A),
                },
            )
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].subject_id, STUDENT);
    }
}
