use serde::Serialize;
use ts_rs::TS;

use super::entities::{GradingPhase, RatificationChoice};

/// 面向当前查看者裁剪后的分配视图
///
/// 所有可选字段在被裁剪或无法计算时直接省略，从不以 0 代替。
#[derive(Debug, Clone, PartialEq, Default, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/marking.ts")]
pub struct AllocationView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignment_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker1_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker2_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker1_grade: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker1_graded_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker1_feedback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker2_grade: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker2_graded_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker2_feedback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_grade: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratifier_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratification_comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade_difference: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold_exceeded: Option<bool>,
    // 只对可查看全部成绩的查看者给出
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<GradingPhase>,
    pub is_marker1: bool,
    pub is_marker2: bool,
    pub is_ratifier: bool,
    pub can_view_markers: bool,
    pub can_view_grades: bool,
    pub can_ratify: bool,
}

/// 一次复核定分的完整记录
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/marking.ts")]
pub struct RatificationResult {
    pub allocation_id: i64,
    pub assignment_id: i64,
    pub subject_id: i64,
    pub choice: RatificationChoice,
    pub final_grade: f64,
    pub ratifier_id: i64,
    pub comment: String,
    pub ratified_at: chrono::DateTime<chrono::Utc>,
}

/// 复核接口响应
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/marking.ts")]
pub struct RatificationResponse {
    pub result: RatificationResult,
    // 成绩簿是否同步成功；复核本身已保存
    pub gradebook_synced: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gradebook_error: Option<String>,
}
