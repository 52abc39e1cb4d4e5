use serde::Serialize;
use ts_rs::TS;

/// 用户在某条分配记录中的身份
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "../frontend/src/types/generated/privacy.ts")]
pub enum PrivacyRole {
    Subject,
    Marker1,
    Marker2,
    Ratifier,
}

/// 导出的一条分配记录
///
/// 评语只导出给写下它的评分人。
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/privacy.ts")]
pub struct PrivacyAllocationExport {
    pub assignment_id: i64,
    pub subject_id: i64,
    pub roles: Vec<PrivacyRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker1_grade: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker2_grade: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_grade: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratification_comment: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/privacy.ts")]
pub struct PrivacyExportResponse {
    pub user_id: i64,
    pub items: Vec<PrivacyAllocationExport>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/privacy.ts")]
pub struct PrivacyDeleteResponse {
    // 删除的分配记录数
    pub deleted_allocations: u64,
    // 被清空评语的记录数
    pub cleared_feedback: u64,
}
