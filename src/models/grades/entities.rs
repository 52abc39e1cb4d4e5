use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// 成绩簿中的一条正式成绩
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/grade.ts")]
pub struct GradebookEntry {
    pub id: i64,
    pub assignment_id: i64,
    pub student_id: i64,
    // 写入成绩的用户（复核人）
    pub grader_id: i64,
    pub score: f64,
    pub comment: Option<String>,
    pub graded_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}
