//! 成绩簿存储操作

use super::SeaOrmStorage;
use crate::entity::grades::{ActiveModel, Column, Entity as Grades};
use crate::errors::{DoubleMarkingError, Result};
use crate::models::grades::entities::GradebookEntry;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};

impl SeaOrmStorage {
    /// 写入或覆盖学生在作业上的正式成绩
    pub async fn upsert_gradebook_grade_impl(
        &self,
        assignment_id: i64,
        student_id: i64,
        grader_id: i64,
        score: f64,
        comment: Option<String>,
    ) -> Result<GradebookEntry> {
        let now = chrono::Utc::now().timestamp();

        let existing = Grades::find()
            .filter(Column::AssignmentId.eq(assignment_id))
            .filter(Column::StudentId.eq(student_id))
            .one(&self.db)
            .await
            .map_err(|e| DoubleMarkingError::database_operation(format!("查询成绩失败: {e}")))?;

        let result = match existing {
            Some(model) => {
                let mut model: ActiveModel = model.into();
                model.grader_id = Set(grader_id);
                model.score = Set(score);
                model.comment = Set(comment);
                model.updated_at = Set(now);
                model.update(&self.db).await.map_err(|e| {
                    DoubleMarkingError::gradebook_sync(format!("更新成绩簿失败: {e}"))
                })?
            }
            None => ActiveModel {
                assignment_id: Set(assignment_id),
                student_id: Set(student_id),
                grader_id: Set(grader_id),
                score: Set(score),
                comment: Set(comment),
                graded_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(&self.db)
            .await
            .map_err(|e| DoubleMarkingError::gradebook_sync(format!("写入成绩簿失败: {e}")))?,
        };

        Ok(result.into_gradebook_entry())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;

    #[tokio::test]
    async fn test_gradebook_upsert_overwrites() {
        let storage = seeded_storage().await;

        let first = storage
            .upsert_gradebook_grade_impl(ASSIGNMENT_ID, STUDENT, TEACHER, 70.0, None)
            .await
            .unwrap();
        let second = storage
            .upsert_gradebook_grade_impl(
                ASSIGNMENT_ID,
                STUDENT,
                ADMIN,
                82.5,
                Some("ratified".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.score, 82.5);
        assert_eq!(second.grader_id, ADMIN);
        assert_eq!(second.comment.as_deref(), Some("ratified"));
    }
}
