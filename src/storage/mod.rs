use std::sync::Arc;

use crate::models::{
    PaginationInfo,
    allocations::{
        entities::{Allocation, BlindSetting, MarkerSlot},
        requests::AllocationListQuery,
        responses::RatificationResult,
    },
    assignments::entities::Assignment,
    class_users::entities::ClassUser,
    grades::entities::GradebookEntry,
    privacy::responses::PrivacyDeleteResponse,
    users::entities::User,
};

use crate::errors::Result;

pub mod sea_orm_storage;

/// 评分人提交的一次成绩
#[derive(Debug, Clone)]
pub struct MarkerGradeWrite {
    pub allocation_id: i64,
    pub slot: MarkerSlot,
    pub marker_id: i64,
    pub grade: f64,
    pub feedback: Option<String>,
    pub graded_at: chrono::DateTime<chrono::Utc>,
}

#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    /// 用户
    // 通过ID获取用户信息
    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>>;

    /// 班级成员
    // 获取用户在班级中的成员信息
    async fn get_class_user_by_user_id_and_class_id(
        &self,
        user_id: i64,
        class_id: i64,
    ) -> Result<Option<ClassUser>>;

    /// 作业
    async fn get_assignment_by_id(&self, assignment_id: i64) -> Result<Option<Assignment>>;

    /// 双评分配
    // 获取某个学生的分配记录
    async fn get_allocation(&self, assignment_id: i64, subject_id: i64)
    -> Result<Option<Allocation>>;
    // 获取作业级设置行
    async fn get_assignment_settings(&self, assignment_id: i64) -> Result<Option<Allocation>>;
    // 写入作业级设置行
    async fn upsert_assignment_settings(
        &self,
        assignment_id: i64,
        blind_setting: BlindSetting,
        marks_hidden: bool,
    ) -> Result<Allocation>;
    // 分页列出作业下的学生分配记录（不含设置行）
    async fn list_allocations(
        &self,
        assignment_id: i64,
        query: AllocationListQuery,
    ) -> Result<(Vec<Allocation>, PaginationInfo)>;
    // 创建或更新分配；已复核的记录返回 Conflict
    async fn upsert_allocation(
        &self,
        assignment_id: i64,
        subject_id: i64,
        marker1_id: i64,
        marker2_id: i64,
    ) -> Result<Allocation>;
    // 只写入对应评分位的字段
    async fn record_marker_grade(&self, write: MarkerGradeWrite) -> Result<Allocation>;
    // 以版本号为条件写入复核结果
    async fn save_ratification(
        &self,
        result: &RatificationResult,
        expected_version: i64,
    ) -> Result<Allocation>;

    /// 成绩簿
    async fn upsert_gradebook_grade(
        &self,
        assignment_id: i64,
        student_id: i64,
        grader_id: i64,
        score: f64,
        comment: Option<String>,
    ) -> Result<GradebookEntry>;

    /// 隐私数据
    // 用户作为学生、评分人或复核人出现的全部记录
    async fn export_user_allocations(&self, user_id: i64) -> Result<Vec<Allocation>>;
    // 删除用户作为学生的记录，并清空其写下的评语
    async fn delete_user_marking_data(&self, user_id: i64) -> Result<PrivacyDeleteResponse>;
    // 删除作业的全部分配记录（含设置行）
    async fn delete_assignment_allocations(&self, assignment_id: i64) -> Result<u64>;
}

pub async fn create_storage() -> Result<Arc<dyn Storage>> {
    let storage = sea_orm_storage::SeaOrmStorage::new_async().await?;
    Ok(Arc::new(storage))
}
