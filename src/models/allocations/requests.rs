use serde::Deserialize;
use ts_rs::TS;

use super::entities::BlindSetting;
use crate::models::common::pagination::PaginationQuery;

/// 更新作业级双评设置请求
///
/// `blind_setting` 可以是 0/1/2，也可以是 "none"/"blind"/"double_blind"；
/// 响应中总是输出名称形式。
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/marking.ts")]
pub struct UpdateMarkingSettingsRequest {
    pub blind_setting: BlindSetting,
    pub marks_hidden: bool,
}

/// 分配评分人请求
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/marking.ts")]
pub struct AllocateMarkersRequest {
    pub marker1_id: i64,
    pub marker2_id: i64,
}

/// 评分人提交成绩请求
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/marking.ts")]
pub struct SubmitMarkerGradeRequest {
    pub grade: f64,
    pub feedback: Option<String>,
}

/// 复核定分请求
///
/// `choice` 保持为原始字符串，未知取值由复核逻辑报告为 InvalidChoice，
/// 而不是在反序列化阶段被吞掉。
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/marking.ts")]
pub struct RatifyRequest {
    pub choice: String,
    // 仅在 choice = custom 时使用
    pub final_grade: Option<f64>,
    #[serde(default)]
    pub comment: String,
}

/// 分配列表查询参数（HTTP 请求）
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/marking.ts")]
pub struct AllocationListParams {
    #[serde(flatten)]
    #[ts(flatten)]
    pub pagination: PaginationQuery,
    /// 只列出该用户担任评分人的记录
    pub marker_id: Option<i64>,
}

// 用于存储层的内部查询参数
#[derive(Debug, Clone)]
pub struct AllocationListQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub marker_id: Option<i64>,
}

/// 单个学生分配记录的路径参数
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AllocationPath {
    pub assignment_id: i64,
    pub subject_id: i64,
}
