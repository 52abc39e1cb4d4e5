//! 成绩簿实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "grades")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub assignment_id: i64,
    pub student_id: i64,
    pub grader_id: i64,
    pub score: f64,
    #[sea_orm(column_type = "Text", nullable)]
    pub comment: Option<String>,
    pub graded_at: i64,
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

impl Model {
    pub fn into_gradebook_entry(self) -> crate::models::grades::entities::GradebookEntry {
        use crate::models::grades::entities::GradebookEntry;

        GradebookEntry {
            id: self.id,
            assignment_id: self.assignment_id,
            student_id: self.student_id,
            grader_id: self.grader_id,
            score: self.score,
            comment: self.comment,
            graded_at: super::from_timestamp(self.graded_at),
            updated_at: super::from_timestamp(self.updated_at),
        }
    }
}
