use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::{info, warn};

use super::MarkingService;
use crate::marking::{Capability, grade_difference, resolve_view, threshold_exceeded};
use crate::models::allocations::entities::MarkerSlot;
use crate::models::allocations::requests::SubmitMarkerGradeRequest;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::{effective_settings, error_response, marking_context};
use crate::storage::MarkerGradeWrite;
use crate::utils::validate::{validate_feedback, validate_grade};

pub async fn submit_grade(
    service: &MarkingService,
    request: &HttpRequest,
    subject_id: i64,
    req: SubmitMarkerGradeRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;
    let (viewer, assignment) = match marking_context(request) {
        Ok(ctx) => ctx,
        Err(resp) => return Ok(resp),
    };

    let allocation = match storage.get_allocation(assignment.id, subject_id).await {
        Ok(Some(allocation)) => allocation,
        Ok(None) => {
            return Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
                ErrorCode::AllocationNotFound,
                "Allocation not found",
            )));
        }
        Err(e) => return Ok(error_response(&e)),
    };

    // 只能写自己被分配的评分位
    let Some(slot) = allocation.slot_of(viewer.id) else {
        return Ok(HttpResponse::Forbidden().json(ApiResponse::error_empty(
            ErrorCode::Forbidden,
            "You are not an allocated marker for this student",
        )));
    };
    let required = match slot {
        MarkerSlot::Marker1 => Capability::MarkFirst,
        MarkerSlot::Marker2 => Capability::MarkSecond,
    };
    if !viewer.can(required) {
        return Ok(HttpResponse::Forbidden().json(ApiResponse::error_empty(
            ErrorCode::Forbidden,
            format!("Missing {required} capability"),
        )));
    }

    if allocation.is_ratified() {
        return Ok(HttpResponse::Conflict().json(ApiResponse::error_empty(
            ErrorCode::AlreadyRatified,
            "Grades are locked once ratified",
        )));
    }

    // 不计分的作业只限制下界
    let max_score = if assignment.is_graded() {
        assignment.max_score
    } else {
        f64::INFINITY
    };
    if let Err(msg) = validate_grade(req.grade, max_score) {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(ErrorCode::GradeInvalid, msg)));
    }
    if let Some(feedback) = &req.feedback
        && let Err(msg) = validate_feedback(feedback)
    {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(ErrorCode::BadRequest, msg)));
    }

    let updated = match storage
        .record_marker_grade(MarkerGradeWrite {
            allocation_id: allocation.id,
            slot,
            marker_id: viewer.id,
            grade: req.grade,
            feedback: req.feedback,
            graded_at: chrono::Utc::now(),
        })
        .await
    {
        Ok(updated) => updated,
        Err(e) => return Ok(error_response(&e)),
    };

    info!(
        "Marker {} recorded {} grade {} for subject {} on assignment {}",
        viewer.id, slot, req.grade, subject_id, assignment.id
    );

    let settings = match effective_settings(&storage, assignment.id).await {
        Ok(settings) => settings,
        Err(e) => return Ok(error_response(&e)),
    };

    let difference = grade_difference(updated.marker1_grade, updated.marker2_grade);
    if threshold_exceeded(difference, settings.grade_difference_threshold) == Some(true) {
        warn!(
            "Grade discrepancy on assignment {} subject {}: difference {:.2} exceeds threshold {:.2}, ratification required",
            assignment.id,
            subject_id,
            difference.unwrap_or_default(),
            settings.grade_difference_threshold
        );
    }

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        resolve_view(Some(&updated), &settings, &viewer),
        "Grade recorded successfully",
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marking::{CapabilitySet, Viewer};
    use crate::models::allocations::entities::RatificationChoice;
    use crate::models::allocations::responses::RatificationResult;
    use crate::models::class_users::entities::ClassUserRole;
    use crate::models::users::entities::UserRole;
    use crate::services::test_support::{json_body, marking_request};
    use crate::storage::Storage;
    use crate::storage::sea_orm_storage::test_support::*;
    use actix_web::http::StatusCode;
    use std::sync::Arc;

    fn marker(id: i64) -> Viewer {
        Viewer::new(
            id,
            CapabilitySet::for_roles(&UserRole::User, Some(&ClassUserRole::Marker)),
        )
    }

    fn grade(grade: f64) -> SubmitMarkerGradeRequest {
        SubmitMarkerGradeRequest {
            grade,
            feedback: Some("clear argument".to_string()),
        }
    }

    async fn allocated_storage() -> Arc<dyn Storage> {
        let storage: Arc<dyn Storage> = Arc::new(seeded_storage().await);
        storage
            .upsert_allocation(ASSIGNMENT_ID, STUDENT, MARKER_A, MARKER_B)
            .await
            .unwrap();
        storage
    }

    async fn submit(storage: &Arc<dyn Storage>, viewer: Viewer, req: SubmitMarkerGradeRequest) -> HttpResponse {
        let request = marking_request(storage, viewer, ASSIGNMENT_ID).await;
        MarkingService::new_lazy()
            .submit_grade(&request, STUDENT, req)
            .await
            .unwrap()
    }

    #[actix_web::test]
    async fn test_marker_records_own_slot() {
        let storage = allocated_storage().await;

        let resp = submit(&storage, marker(MARKER_B), grade(82.0)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["data"]["marker2_grade"], 82.0);
        assert_eq!(body["data"]["is_marker2"], true);

        let stored = storage
            .get_allocation(ASSIGNMENT_ID, STUDENT)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.marker2_grade, Some(82.0));
        assert_eq!(stored.marker1_grade, None);
    }

    #[actix_web::test]
    async fn test_unallocated_marker_is_forbidden_before_validation() {
        let storage = allocated_storage().await;
        let teacher = Viewer::new(TEACHER, CapabilitySet::all());

        let resp = submit(&storage, teacher, grade(70.0)).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        // 越界成绩也先得到 403 而不是 400
        let resp = submit(&storage, teacher, grade(500.0)).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn test_slot_capability_is_required() {
        let storage = allocated_storage().await;
        // 第一评分位需要 mark_first
        let second_only = Viewer::new(
            MARKER_A,
            CapabilitySet {
                view_assignment: true,
                mark_second: true,
                ..CapabilitySet::default()
            },
        );

        let resp = submit(&storage, second_only, grade(70.0)).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let stored = storage
            .get_allocation(ASSIGNMENT_ID, STUDENT)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.marker1_grade, None);
    }

    #[actix_web::test]
    async fn test_grade_out_of_range() {
        let storage = allocated_storage().await;

        let resp = submit(&storage, marker(MARKER_A), grade(100.5)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = json_body(resp).await;
        assert_eq!(body["code"], ErrorCode::GradeInvalid as i32);

        let resp = submit(&storage, marker(MARKER_A), grade(-1.0)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_missing_allocation() {
        let storage: Arc<dyn Storage> = Arc::new(seeded_storage().await);
        let resp = submit(&storage, marker(MARKER_A), grade(70.0)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_ratified_allocation_refuses_grades() {
        let storage = allocated_storage().await;
        for (id, g) in [(MARKER_A, 60.0), (MARKER_B, 70.0)] {
            assert_eq!(submit(&storage, marker(id), grade(g)).await.status(), StatusCode::OK);
        }

        let alloc = storage
            .get_allocation(ASSIGNMENT_ID, STUDENT)
            .await
            .unwrap()
            .unwrap();
        let result = RatificationResult {
            allocation_id: alloc.id,
            assignment_id: ASSIGNMENT_ID,
            subject_id: STUDENT,
            choice: RatificationChoice::Average,
            final_grade: 65.0,
            ratifier_id: TEACHER,
            comment: String::new(),
            ratified_at: chrono::Utc::now(),
        };
        storage.save_ratification(&result, alloc.version).await.unwrap();

        let resp = submit(&storage, marker(MARKER_A), grade(90.0)).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body = json_body(resp).await;
        assert_eq!(body["code"], ErrorCode::AlreadyRatified as i32);

        let stored = storage
            .get_allocation(ASSIGNMENT_ID, STUDENT)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.marker1_grade, Some(60.0));
    }
}
