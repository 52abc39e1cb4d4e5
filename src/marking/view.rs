//! 分配记录的可见性裁剪
//!
//! 纯函数：输入分配记录、作业设置与查看者，输出裁剪后的视图。
//! 三轮裁剪依次为身份、成绩、分差，每一轮只会移除字段。

use crate::models::allocations::entities::{Allocation, MarkingSettings};
use crate::models::allocations::responses::AllocationView;

use super::capabilities::Viewer;

/// 两个评分人成绩之差的绝对值，任一缺失时不可计算
pub fn grade_difference(marker1_grade: Option<f64>, marker2_grade: Option<f64>) -> Option<f64> {
    match (marker1_grade, marker2_grade) {
        (Some(g1), Some(g2)) => Some((g1 - g2).abs()),
        _ => None,
    }
}

/// 分差是否严格超过阈值
pub fn threshold_exceeded(difference: Option<f64>, threshold: f64) -> Option<bool> {
    difference.map(|diff| diff > threshold)
}

/// 为查看者生成分配视图
pub fn resolve_view(
    allocation: Option<&Allocation>,
    settings: &MarkingSettings,
    viewer: &Viewer,
) -> AllocationView {
    let caps = &viewer.capabilities;

    let mut view = AllocationView {
        can_view_markers: caps.view_markers || caps.view_all,
        can_view_grades: caps.view_all_grades || caps.view_all,
        can_ratify: caps.ratify,
        ..AllocationView::default()
    };

    // 尚未分配：只返回能力标记
    let Some(alloc) = allocation else {
        return view;
    };

    view.is_marker1 = alloc.marker1_id == Some(viewer.id);
    view.is_marker2 = alloc.marker2_id == Some(viewer.id);
    view.is_ratifier = alloc.ratifier_id.is_some() && alloc.ratifier_id == Some(viewer.id);

    view.assignment_id = Some(alloc.assignment_id);
    view.subject_id = Some(alloc.subject_id);
    view.marker1_id = alloc.marker1_id;
    view.marker2_id = alloc.marker2_id;
    view.marker1_grade = alloc.marker1_grade;
    view.marker1_graded_at = alloc.marker1_graded_at;
    view.marker1_feedback = alloc.marker1_feedback.clone();
    view.marker2_grade = alloc.marker2_grade;
    view.marker2_graded_at = alloc.marker2_graded_at;
    view.marker2_feedback = alloc.marker2_feedback.clone();
    view.final_grade = alloc.final_grade;
    view.ratifier_id = alloc.ratifier_id;
    view.ratification_comment = alloc.ratification_comment.clone();
    view.grade_difference = grade_difference(alloc.marker1_grade, alloc.marker2_grade);
    view.threshold_exceeded =
        threshold_exceeded(view.grade_difference, settings.grade_difference_threshold);
    // 阶段会暴露另一评分人是否已评分
    view.phase = view.can_view_grades.then(|| alloc.phase());

    redact_identities(&mut view, settings);
    redact_grades(&mut view, settings);
    redact_difference(&mut view, viewer);

    view
}

fn redact_identities(view: &mut AllocationView, settings: &MarkingSettings) {
    if settings.blind_setting.hides_markers()
        && !view.can_view_markers
        && !view.is_marker1
        && !view.is_marker2
    {
        view.marker1_id = None;
        view.marker2_id = None;
    }
}

fn redact_grades(view: &mut AllocationView, settings: &MarkingSettings) {
    if !settings.marks_hidden || view.can_view_grades {
        return;
    }

    let hide_marker1 = !view.is_marker1;
    let hide_marker2 = view.is_marker1 || !view.is_marker2;

    if hide_marker1 {
        view.marker1_grade = None;
        view.marker1_graded_at = None;
        view.marker1_feedback = None;
    }
    if hide_marker2 {
        view.marker2_grade = None;
        view.marker2_graded_at = None;
        view.marker2_feedback = None;
    }
}

fn redact_difference(view: &mut AllocationView, viewer: &Viewer) {
    let caps = &viewer.capabilities;
    if !caps.view_differences && !caps.view_all {
        view.grade_difference = None;
        view.threshold_exceeded = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marking::capabilities::CapabilitySet;
    use crate::models::allocations::entities::{BlindSetting, GradingPhase};

    const MARKER1: i64 = 2;
    const MARKER2: i64 = 3;
    const OTHER: i64 = 99;

    fn allocation(g1: Option<f64>, g2: Option<f64>) -> Allocation {
        let now = chrono::Utc::now();
        Allocation {
            id: 7,
            assignment_id: 1,
            subject_id: 10,
            marker1_id: Some(MARKER1),
            marker2_id: Some(MARKER2),
            ratifier_id: None,
            marker1_grade: g1,
            marker2_grade: g2,
            marker1_graded_at: g1.map(|_| now),
            marker2_graded_at: g2.map(|_| now),
            marker1_feedback: g1.map(|_| "m1 notes".to_string()),
            marker2_feedback: g2.map(|_| "m2 notes".to_string()),
            final_grade: None,
            ratification_comment: None,
            ratified_at: None,
            blind_setting: BlindSetting::None,
            marks_hidden: false,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn settings(blind_setting: BlindSetting, marks_hidden: bool) -> MarkingSettings {
        MarkingSettings {
            blind_setting,
            marks_hidden,
            grade_difference_threshold: 10.0,
        }
    }

    fn viewer(id: i64, capabilities: CapabilitySet) -> Viewer {
        Viewer::new(id, capabilities)
    }

    fn differences_only() -> CapabilitySet {
        CapabilitySet {
            view_differences: true,
            ..CapabilitySet::default()
        }
    }

    // 视图中存在的可裁剪字段
    fn present_fields(view: &AllocationView) -> Vec<&'static str> {
        let mut fields = Vec::new();
        let checks = [
            ("marker1_id", view.marker1_id.is_some()),
            ("marker2_id", view.marker2_id.is_some()),
            ("marker1_grade", view.marker1_grade.is_some()),
            ("marker1_graded_at", view.marker1_graded_at.is_some()),
            ("marker1_feedback", view.marker1_feedback.is_some()),
            ("marker2_grade", view.marker2_grade.is_some()),
            ("marker2_graded_at", view.marker2_graded_at.is_some()),
            ("marker2_feedback", view.marker2_feedback.is_some()),
            ("grade_difference", view.grade_difference.is_some()),
            ("threshold_exceeded", view.threshold_exceeded.is_some()),
            ("phase", view.phase.is_some()),
        ];
        for (name, present) in checks {
            if present {
                fields.push(name);
            }
        }
        fields
    }

    // 四个可见性能力的全部组合
    fn visibility_sets() -> Vec<CapabilitySet> {
        (0u8..16)
            .map(|bits| CapabilitySet {
                view_markers: bits & 1 != 0,
                view_all_grades: bits & 2 != 0,
                view_differences: bits & 4 != 0,
                view_all: bits & 8 != 0,
                ..CapabilitySet::default()
            })
            .collect()
    }

    fn is_subset(smaller: &CapabilitySet, larger: &CapabilitySet) -> bool {
        (!smaller.view_markers || larger.view_markers)
            && (!smaller.view_all_grades || larger.view_all_grades)
            && (!smaller.view_differences || larger.view_differences)
            && (!smaller.view_all || larger.view_all)
    }

    #[test]
    fn test_grade_difference_within_threshold() {
        let alloc = allocation(Some(70.0), Some(75.0));
        let view = resolve_view(
            Some(&alloc),
            &settings(BlindSetting::None, false),
            &viewer(OTHER, differences_only()),
        );
        assert_eq!(view.grade_difference, Some(5.0));
        assert_eq!(view.threshold_exceeded, Some(false));
    }

    #[test]
    fn test_grade_difference_exceeds_threshold() {
        let alloc = allocation(Some(60.0), Some(85.0));
        let view = resolve_view(
            Some(&alloc),
            &settings(BlindSetting::None, false),
            &viewer(OTHER, differences_only()),
        );
        assert_eq!(view.grade_difference, Some(25.0));
        assert_eq!(view.threshold_exceeded, Some(true));
    }

    #[test]
    fn test_threshold_is_strict() {
        assert_eq!(threshold_exceeded(Some(10.0), 10.0), Some(false));
        assert_eq!(threshold_exceeded(Some(10.01), 10.0), Some(true));
    }

    #[test]
    fn test_difference_not_computable_with_one_grade() {
        let alloc = allocation(Some(60.0), None);
        let view = resolve_view(
            Some(&alloc),
            &settings(BlindSetting::None, false),
            &viewer(OTHER, CapabilitySet::all()),
        );
        assert_eq!(view.grade_difference, None);
        assert_eq!(view.threshold_exceeded, None);
        assert_eq!(grade_difference(None, Some(3.0)), None);
    }

    #[test]
    fn test_difference_hidden_without_capability() {
        let alloc = allocation(Some(60.0), Some(85.0));
        let view = resolve_view(
            Some(&alloc),
            &settings(BlindSetting::None, false),
            &viewer(OTHER, CapabilitySet::default()),
        );
        assert_eq!(view.grade_difference, None);
        assert_eq!(view.threshold_exceeded, None);
        // 成绩未隐藏时仍可见
        assert_eq!(view.marker1_grade, Some(60.0));
    }

    #[test]
    fn test_blind_marking_scenario() {
        let alloc = allocation(Some(70.0), Some(80.0));
        let blind = settings(BlindSetting::Blind, true);

        let marker1_view = resolve_view(Some(&alloc), &blind, &viewer(MARKER1, CapabilitySet::default()));
        assert!(marker1_view.is_marker1);
        assert_eq!(marker1_view.marker1_grade, Some(70.0));
        assert!(marker1_view.marker1_graded_at.is_some());
        assert_eq!(marker1_view.marker1_feedback.as_deref(), Some("m1 notes"));
        assert_eq!(marker1_view.marker2_grade, None);
        assert_eq!(marker1_view.marker2_graded_at, None);
        assert_eq!(marker1_view.marker2_feedback, None);
        // 评分人自己总能看到双方身份
        assert_eq!(marker1_view.marker2_id, Some(MARKER2));

        let marker2_view = resolve_view(Some(&alloc), &blind, &viewer(MARKER2, CapabilitySet::default()));
        assert_eq!(marker2_view.marker2_grade, Some(80.0));
        assert_eq!(marker2_view.marker1_grade, None);

        let super_view = resolve_view(
            Some(&alloc),
            &blind,
            &viewer(OTHER, CapabilitySet { view_all: true, ..CapabilitySet::default() }),
        );
        assert_eq!(super_view.marker1_grade, Some(70.0));
        assert_eq!(super_view.marker2_grade, Some(80.0));
        assert_eq!(super_view.marker1_id, Some(MARKER1));
        assert_eq!(super_view.grade_difference, Some(10.0));
    }

    #[test]
    fn test_outsider_sees_nothing_under_blind_hidden() {
        let alloc = allocation(Some(70.0), Some(80.0));
        let view = resolve_view(
            Some(&alloc),
            &settings(BlindSetting::DoubleBlind, true),
            &viewer(OTHER, CapabilitySet::default()),
        );
        assert!(present_fields(&view).is_empty());
        assert_eq!(view.subject_id, Some(10));
    }

    #[test]
    fn test_view_markers_reveals_identities_only() {
        let alloc = allocation(Some(70.0), Some(80.0));
        let view = resolve_view(
            Some(&alloc),
            &settings(BlindSetting::Blind, true),
            &viewer(OTHER, CapabilitySet { view_markers: true, ..CapabilitySet::default() }),
        );
        assert_eq!(view.marker1_id, Some(MARKER1));
        assert_eq!(view.marker2_id, Some(MARKER2));
        assert_eq!(view.marker1_grade, None);
        assert!(view.can_view_markers);
        assert!(!view.can_view_grades);
    }

    #[test]
    fn test_view_all_grades_reveals_grades() {
        let alloc = allocation(Some(70.0), Some(80.0));
        let view = resolve_view(
            Some(&alloc),
            &settings(BlindSetting::None, true),
            &viewer(OTHER, CapabilitySet { view_all_grades: true, ..CapabilitySet::default() }),
        );
        assert_eq!(view.marker1_grade, Some(70.0));
        assert_eq!(view.marker2_grade, Some(80.0));
        assert_eq!(view.grade_difference, None);
    }

    #[test]
    fn test_phase_only_for_grade_viewers() {
        let alloc = allocation(Some(60.0), None);
        let hidden = settings(BlindSetting::Blind, true);

        let teacher = resolve_view(Some(&alloc), &hidden, &viewer(OTHER, CapabilitySet::all()));
        assert_eq!(teacher.phase, Some(GradingPhase::AwaitingMarker2));

        // 第二评分人不应得知第一评分人已经评分
        let marker2 = resolve_view(Some(&alloc), &hidden, &viewer(MARKER2, CapabilitySet::default()));
        assert_eq!(marker2.phase, None);

        let open = settings(BlindSetting::None, false);
        let marker2 = resolve_view(Some(&alloc), &open, &viewer(MARKER2, CapabilitySet::default()));
        assert_eq!(marker2.phase, None);
    }

    #[test]
    fn test_missing_allocation_is_not_an_error() {
        let view = resolve_view(
            None,
            &settings(BlindSetting::Blind, true),
            &viewer(OTHER, CapabilitySet::all()),
        );
        assert_eq!(view.subject_id, None);
        assert!(view.can_ratify);
        assert!(view.can_view_markers);
        assert!(!view.is_marker1);
    }

    #[test]
    fn test_ratifier_flag() {
        let mut alloc = allocation(Some(70.0), Some(80.0));
        alloc.ratifier_id = Some(OTHER);
        alloc.final_grade = Some(75.0);
        let view = resolve_view(
            Some(&alloc),
            &settings(BlindSetting::None, false),
            &viewer(OTHER, CapabilitySet::default()),
        );
        assert!(view.is_ratifier);
        assert!(!view.can_ratify);
        assert_eq!(view.final_grade, Some(75.0));
    }

    #[test]
    fn test_resolve_view_is_idempotent() {
        let alloc = allocation(Some(55.0), Some(90.0));
        let s = settings(BlindSetting::Blind, true);
        let v = viewer(MARKER2, differences_only());
        assert_eq!(resolve_view(Some(&alloc), &s, &v), resolve_view(Some(&alloc), &s, &v));
    }

    #[test]
    fn test_redaction_is_monotonic() {
        let alloc = allocation(Some(62.0), Some(88.0));
        let sets = visibility_sets();

        for blind in [BlindSetting::None, BlindSetting::Blind, BlindSetting::DoubleBlind] {
            for hidden in [false, true] {
                let s = settings(blind, hidden);
                for id in [MARKER1, MARKER2, OTHER] {
                    for smaller in &sets {
                        for larger in sets.iter().filter(|l| is_subset(smaller, l)) {
                            let small_view = resolve_view(Some(&alloc), &s, &viewer(id, *smaller));
                            let large_view = resolve_view(Some(&alloc), &s, &viewer(id, *larger));
                            let large_fields = present_fields(&large_view);
                            for field in present_fields(&small_view) {
                                assert!(
                                    large_fields.contains(&field),
                                    "{field} visible with {smaller:?} but not with {larger:?}"
                                );
                            }
                        }
                    }
                }
            }
        }
    }
}
