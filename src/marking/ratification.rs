//! 复核定分

use chrono::{DateTime, Utc};

use crate::errors::{DoubleMarkingError, Result};
use crate::models::allocations::entities::{Allocation, MarkerSlot, RatificationChoice};
use crate::models::allocations::responses::RatificationResult;

use super::capabilities::{Capability, Viewer};

/// 根据定分方式计算最终成绩
///
/// 顺序：先校验复核能力，再拒绝已复核的记录，最后解析并计算。
/// 缺失的评分人成绩从不按 0 处理。
pub fn resolve_ratification(
    allocation: &Allocation,
    choice: &str,
    supplied_grade: Option<f64>,
    comment: &str,
    viewer: &Viewer,
    at: DateTime<Utc>,
) -> Result<RatificationResult> {
    if !viewer.can(Capability::Ratify) {
        return Err(DoubleMarkingError::authorization_denied(format!(
            "用户 {} 没有复核权限",
            viewer.id
        )));
    }

    if allocation.is_settings_row() {
        return Err(DoubleMarkingError::validation("作业级设置行不能复核"));
    }

    if allocation.is_ratified() {
        return Err(DoubleMarkingError::conflict(format!(
            "学生 {} 的成绩已复核",
            allocation.subject_id
        )));
    }

    let choice: RatificationChoice = choice.parse()?;
    let final_grade = match choice {
        RatificationChoice::Marker1 => marker_grade(allocation, MarkerSlot::Marker1)?,
        RatificationChoice::Marker2 => marker_grade(allocation, MarkerSlot::Marker2)?,
        RatificationChoice::Average => {
            let g1 = marker_grade(allocation, MarkerSlot::Marker1)?;
            let g2 = marker_grade(allocation, MarkerSlot::Marker2)?;
            (g1 + g2) / 2.0
        }
        RatificationChoice::Custom => match supplied_grade {
            Some(grade) if grade.is_finite() => grade,
            Some(grade) => {
                return Err(DoubleMarkingError::validation(format!(
                    "无效的自定义成绩: {grade}"
                )));
            }
            None => return Err(DoubleMarkingError::validation("自定义定分需要提供成绩")),
        },
    };

    Ok(RatificationResult {
        allocation_id: allocation.id,
        assignment_id: allocation.assignment_id,
        subject_id: allocation.subject_id,
        choice,
        final_grade,
        ratifier_id: viewer.id,
        comment: comment.to_string(),
        ratified_at: at,
    })
}

fn marker_grade(allocation: &Allocation, slot: MarkerSlot) -> Result<f64> {
    allocation.grade_of(slot).ok_or_else(|| {
        DoubleMarkingError::unresolved_marker_grade(format!("{slot} 尚未评分"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marking::capabilities::CapabilitySet;
    use crate::models::allocations::entities::BlindSetting;

    fn allocation(g1: Option<f64>, g2: Option<f64>) -> Allocation {
        let now = Utc::now();
        Allocation {
            id: 7,
            assignment_id: 1,
            subject_id: 10,
            marker1_id: Some(2),
            marker2_id: Some(3),
            ratifier_id: None,
            marker1_grade: g1,
            marker2_grade: g2,
            marker1_graded_at: None,
            marker2_graded_at: None,
            marker1_feedback: None,
            marker2_feedback: None,
            final_grade: None,
            ratification_comment: None,
            ratified_at: None,
            blind_setting: BlindSetting::None,
            marks_hidden: true,
            version: 3,
            created_at: now,
            updated_at: now,
        }
    }

    fn ratifier() -> Viewer {
        Viewer::new(
            5,
            CapabilitySet {
                ratify: true,
                ..CapabilitySet::default()
            },
        )
    }

    fn ratify(alloc: &Allocation, choice: &str, supplied: Option<f64>) -> Result<f64> {
        resolve_ratification(alloc, choice, supplied, "", &ratifier(), Utc::now())
            .map(|r| r.final_grade)
    }

    #[test]
    fn test_choices_on_both_grades() {
        let alloc = allocation(Some(70.0), Some(80.0));
        assert_eq!(ratify(&alloc, "AVERAGE", None).unwrap(), 75.0);
        assert_eq!(ratify(&alloc, "MARKER1", None).unwrap(), 70.0);
        assert_eq!(ratify(&alloc, "MARKER2", None).unwrap(), 80.0);
        assert_eq!(ratify(&alloc, "CUSTOM", Some(75.5)).unwrap(), 75.5);
    }

    #[test]
    fn test_supplied_grade_ignored_for_marker_choices() {
        let alloc = allocation(Some(70.0), Some(80.0));
        assert_eq!(ratify(&alloc, "marker1", Some(1.0)).unwrap(), 70.0);
    }

    #[test]
    fn test_average_keeps_full_precision() {
        let alloc = allocation(Some(70.0), Some(71.0));
        assert_eq!(ratify(&alloc, "average", None).unwrap(), 70.5);
    }

    #[test]
    fn test_custom_ignores_marker_grades() {
        let alloc = allocation(None, None);
        assert_eq!(ratify(&alloc, "custom", Some(42.25)).unwrap(), 42.25);
    }

    #[test]
    fn test_custom_requires_grade() {
        let alloc = allocation(Some(70.0), Some(80.0));
        let err = ratify(&alloc, "custom", None).unwrap_err();
        assert!(matches!(err, DoubleMarkingError::Validation(_)));
        let err = ratify(&alloc, "custom", Some(f64::INFINITY)).unwrap_err();
        assert!(matches!(err, DoubleMarkingError::Validation(_)));
    }

    #[test]
    fn test_unresolved_marker_grade() {
        let alloc = allocation(None, Some(80.0));
        let err = ratify(&alloc, "MARKER1", None).unwrap_err();
        assert!(matches!(err, DoubleMarkingError::UnresolvedMarkerGrade(_)));

        let err = ratify(&alloc, "AVERAGE", None).unwrap_err();
        assert!(matches!(err, DoubleMarkingError::UnresolvedMarkerGrade(_)));

        let alloc = allocation(Some(70.0), None);
        let err = ratify(&alloc, "MARKER2", Some(50.0)).unwrap_err();
        assert!(matches!(err, DoubleMarkingError::UnresolvedMarkerGrade(_)));
    }

    #[test]
    fn test_invalid_choice() {
        let alloc = allocation(Some(70.0), Some(80.0));
        let err = ratify(&alloc, "invalid_choice", None).unwrap_err();
        assert!(matches!(err, DoubleMarkingError::InvalidChoice(_)));
    }

    #[test]
    fn test_authorization_checked_first() {
        let alloc = allocation(None, None);
        let marker = Viewer::new(
            2,
            CapabilitySet {
                mark_first: true,
                ..CapabilitySet::default()
            },
        );
        let err = resolve_ratification(&alloc, "invalid_choice", None, "", &marker, Utc::now())
            .unwrap_err();
        assert!(matches!(err, DoubleMarkingError::AuthorizationDenied(_)));
    }

    #[test]
    fn test_ratified_is_terminal() {
        let mut alloc = allocation(Some(70.0), Some(80.0));
        alloc.final_grade = Some(75.0);
        let err = ratify(&alloc, "MARKER1", None).unwrap_err();
        assert!(matches!(err, DoubleMarkingError::Conflict(_)));
    }

    #[test]
    fn test_result_records_event() {
        let alloc = allocation(Some(60.0), Some(90.0));
        let at = Utc::now();
        let result =
            resolve_ratification(&alloc, " Average ", None, "split the difference", &ratifier(), at)
                .unwrap();
        assert_eq!(result.choice, RatificationChoice::Average);
        assert_eq!(result.final_grade, 75.0);
        assert_eq!(result.ratifier_id, 5);
        assert_eq!(result.comment, "split the difference");
        assert_eq!(result.ratified_at, at);
        assert_eq!(result.allocation_id, 7);
        assert_eq!(result.subject_id, 10);
    }
}
