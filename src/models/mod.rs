pub mod allocations;
pub mod assignments;
pub mod class_users;
pub mod common;
pub mod grades;
pub mod privacy;
pub mod users;

pub use common::pagination::{PaginatedResponse, PaginationInfo, PaginationQuery};
pub use common::response::ApiResponse;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// 业务错误码
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/api.ts")]
pub enum ErrorCode {
    Success = 0,

    // 通用错误
    BadRequest = 1000,
    Unauthorized = 1001,
    Forbidden = 1003,
    NotFound = 1004,
    InternalServerError = 1005,
    RateLimitExceeded = 1029,

    // 用户相关
    UserNotFound = 2004,

    // 作业相关
    AssignmentNotFound = 3004,

    // 双评分配相关
    AllocationNotFound = 4004,
    AllocationInvalid = 4000,
    MarkerNotEligible = 4001,
    AllocationConflict = 4009,

    // 评分与复核相关
    GradeInvalid = 5000,
    UnresolvedMarkerGrade = 5001,
    InvalidRatificationChoice = 5002,
    AlreadyRatified = 5009,
    GradebookSyncFailed = 5010,
}
