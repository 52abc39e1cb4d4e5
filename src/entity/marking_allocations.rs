//! 双评分配实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "marking_allocations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub assignment_id: i64,
    pub subject_id: i64,
    pub marker1_id: Option<i64>,
    pub marker2_id: Option<i64>,
    pub ratifier_id: Option<i64>,
    pub marker1_grade: Option<f64>,
    pub marker2_grade: Option<f64>,
    pub marker1_graded_at: Option<i64>,
    pub marker2_graded_at: Option<i64>,
    #[sea_orm(column_type = "Text", nullable)]
    pub marker1_feedback: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub marker2_feedback: Option<String>,
    pub final_grade: Option<f64>,
    #[sea_orm(column_type = "Text", nullable)]
    pub ratification_comment: Option<String>,
    pub ratified_at: Option<i64>,
    pub blind_setting: i32,
    pub marks_hidden: bool,
    pub version: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::assignments::Entity",
        from = "Column::AssignmentId",
        to = "super::assignments::Column::Id"
    )]
    Assignment,
}

impl Related<super::assignments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assignment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// 从数据库模型转换为业务模型
impl Model {
    ///
    /// 库中的盲评设置无法识别时报错，不回退为不盲评。
    pub fn into_allocation(
        self,
    ) -> crate::errors::Result<crate::models::allocations::entities::Allocation> {
        use crate::errors::DoubleMarkingError;
        use crate::models::allocations::entities::{Allocation, BlindSetting};

        let blind_setting = BlindSetting::try_from(self.blind_setting).map_err(|_| {
            DoubleMarkingError::database_operation(format!(
                "分配记录 {} 的盲评设置无效: {}",
                self.id, self.blind_setting
            ))
        })?;

        Ok(Allocation {
            id: self.id,
            assignment_id: self.assignment_id,
            subject_id: self.subject_id,
            marker1_id: self.marker1_id,
            marker2_id: self.marker2_id,
            ratifier_id: self.ratifier_id,
            marker1_grade: self.marker1_grade,
            marker2_grade: self.marker2_grade,
            marker1_graded_at: self.marker1_graded_at.map(super::from_timestamp),
            marker2_graded_at: self.marker2_graded_at.map(super::from_timestamp),
            marker1_feedback: self.marker1_feedback,
            marker2_feedback: self.marker2_feedback,
            final_grade: self.final_grade,
            ratification_comment: self.ratification_comment,
            ratified_at: self.ratified_at.map(super::from_timestamp),
            blind_setting,
            marks_hidden: self.marks_hidden,
            version: self.version,
            created_at: super::from_timestamp(self.created_at),
            updated_at: super::from_timestamp(self.updated_at),
        })
    }
}
