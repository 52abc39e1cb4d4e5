use sea_orm_migration::prelude::*;

use crate::m20250123_000001_create_tables::Assignments;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 双评分配表
        // subject_id = 0 的行保存作业级设置，其余行对应一个学生
        manager
            .create_table(
                Table::create()
                    .table(MarkingAllocations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MarkingAllocations::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MarkingAllocations::AssignmentId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MarkingAllocations::SubjectId)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(MarkingAllocations::Marker1Id)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(MarkingAllocations::Marker2Id)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(MarkingAllocations::RatifierId)
                            .big_integer()
                            .null(),
                    )
                    .col(ColumnDef::new(MarkingAllocations::Marker1Grade).double().null())
                    .col(ColumnDef::new(MarkingAllocations::Marker2Grade).double().null())
                    .col(
                        ColumnDef::new(MarkingAllocations::Marker1GradedAt)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(MarkingAllocations::Marker2GradedAt)
                            .big_integer()
                            .null(),
                    )
                    .col(ColumnDef::new(MarkingAllocations::Marker1Feedback).text().null())
                    .col(ColumnDef::new(MarkingAllocations::Marker2Feedback).text().null())
                    .col(ColumnDef::new(MarkingAllocations::FinalGrade).double().null())
                    .col(
                        ColumnDef::new(MarkingAllocations::RatificationComment)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(MarkingAllocations::RatifiedAt)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(MarkingAllocations::BlindSetting)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(MarkingAllocations::MarksHidden)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(MarkingAllocations::Version)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(MarkingAllocations::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MarkingAllocations::UpdatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(MarkingAllocations::Table, MarkingAllocations::AssignmentId)
                            .to(Assignments::Table, Assignments::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // (assignment_id, subject_id) 唯一
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_marking_allocations_assignment_subject")
                    .table(MarkingAllocations::Table)
                    .col(MarkingAllocations::AssignmentId)
                    .col(MarkingAllocations::SubjectId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_marking_allocations_marker1")
                    .table(MarkingAllocations::Table)
                    .col(MarkingAllocations::Marker1Id)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_marking_allocations_marker2")
                    .table(MarkingAllocations::Table)
                    .col(MarkingAllocations::Marker2Id)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MarkingAllocations::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum MarkingAllocations {
    #[sea_orm(iden = "marking_allocations")]
    Table,
    Id,
    AssignmentId,
    SubjectId,
    Marker1Id,
    Marker2Id,
    RatifierId,
    Marker1Grade,
    Marker2Grade,
    Marker1GradedAt,
    Marker2GradedAt,
    Marker1Feedback,
    Marker2Feedback,
    FinalGrade,
    RatificationComment,
    RatifiedAt,
    BlindSetting,
    MarksHidden,
    Version,
    CreatedAt,
    UpdatedAt,
}
