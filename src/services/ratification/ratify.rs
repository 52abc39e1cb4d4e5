use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::{error, info};

use super::RatificationService;
use super::gradebook::sync_gradebook;
use crate::errors::DoubleMarkingError;
use crate::marking::resolve_ratification;
use crate::models::allocations::requests::RatifyRequest;
use crate::models::allocations::responses::RatificationResponse;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::{error_response, marking_context};
use crate::utils::validate::{validate_comment, validate_grade};

pub async fn ratify(
    service: &RatificationService,
    request: &HttpRequest,
    subject_id: i64,
    req: RatifyRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;
    let (viewer, assignment) = match marking_context(request) {
        Ok(ctx) => ctx,
        Err(resp) => return Ok(resp),
    };

    if let Err(msg) = validate_comment(&req.comment) {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(ErrorCode::BadRequest, msg)));
    }

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

    let result = match resolve_ratification(
        &allocation,
        &req.choice,
        req.final_grade,
        &req.comment,
        &viewer,
        chrono::Utc::now(),
    ) {
        Ok(result) => result,
        Err(DoubleMarkingError::Conflict(msg)) if allocation.is_ratified() => {
            return Ok(HttpResponse::Conflict()
                .json(ApiResponse::error_empty(ErrorCode::AlreadyRatified, msg)));
        }
        Err(e) => return Ok(error_response(&e)),
    };

    if assignment.is_graded()
        && let Err(msg) = validate_grade(result.final_grade, assignment.max_score)
    {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(ErrorCode::GradeInvalid, msg)));
    }

    // 版本号不匹配说明期间有其他写入
    if let Err(e) = storage.save_ratification(&result, allocation.version).await {
        return Ok(error_response(&e));
    }

    info!(
        "User {} ratified subject {} on assignment {}: {} -> {}",
        viewer.id, subject_id, assignment.id, result.choice, result.final_grade
    );

    let (gradebook_synced, gradebook_error, message) =
        match sync_gradebook(&storage, &assignment, &result).await {
            Ok(true) => (true, None, "Ratification saved and gradebook updated"),
            Ok(false) => (false, None, "Ratification saved"),
            Err(e) => {
                error!(
                    "Gradebook sync failed for subject {} on assignment {}: {}",
                    subject_id, assignment.id, e
                );
                (
                    false,
                    Some(e.message().to_string()),
                    "Ratification saved but gradebook sync failed",
                )
            }
        };

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        RatificationResponse {
            result,
            gradebook_synced,
            gradebook_error,
        },
        message,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Result;
    use crate::marking::{CapabilitySet, Viewer};
    use crate::models::PaginationInfo;
    use crate::models::allocations::entities::{Allocation, BlindSetting, MarkerSlot};
    use crate::models::allocations::requests::AllocationListQuery;
    use crate::models::allocations::responses::RatificationResult;
    use crate::models::assignments::entities::Assignment;
    use crate::models::class_users::entities::ClassUser;
    use crate::models::grades::entities::GradebookEntry;
    use crate::models::privacy::responses::PrivacyDeleteResponse;
    use crate::models::users::entities::User;
    use crate::services::test_support::{json_body, marking_request};
    use crate::storage::sea_orm_storage::SeaOrmStorage;
    use crate::storage::sea_orm_storage::test_support::*;
    use crate::storage::{MarkerGradeWrite, Storage};
    use actix_web::http::StatusCode;
    use std::sync::Arc;

    /// 成绩簿写入总是失败的存储
    struct GradebookDown(SeaOrmStorage);

    #[async_trait::async_trait]
    impl Storage for GradebookDown {
        async fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
            self.0.get_user_by_id(id).await
        }

        async fn get_class_user_by_user_id_and_class_id(
            &self,
            user_id: i64,
            class_id: i64,
        ) -> Result<Option<ClassUser>> {
            self.0
                .get_class_user_by_user_id_and_class_id(user_id, class_id)
                .await
        }

        async fn get_assignment_by_id(&self, assignment_id: i64) -> Result<Option<Assignment>> {
            self.0.get_assignment_by_id(assignment_id).await
        }

        async fn get_allocation(
            &self,
            assignment_id: i64,
            subject_id: i64,
        ) -> Result<Option<Allocation>> {
            self.0.get_allocation(assignment_id, subject_id).await
        }

        async fn get_assignment_settings(&self, assignment_id: i64) -> Result<Option<Allocation>> {
            self.0.get_assignment_settings(assignment_id).await
        }

        async fn upsert_assignment_settings(
            &self,
            assignment_id: i64,
            blind_setting: BlindSetting,
            marks_hidden: bool,
        ) -> Result<Allocation> {
            self.0
                .upsert_assignment_settings(assignment_id, blind_setting, marks_hidden)
                .await
        }

        async fn list_allocations(
            &self,
            assignment_id: i64,
            query: AllocationListQuery,
        ) -> Result<(Vec<Allocation>, PaginationInfo)> {
            self.0.list_allocations(assignment_id, query).await
        }

        async fn upsert_allocation(
            &self,
            assignment_id: i64,
            subject_id: i64,
            marker1_id: i64,
            marker2_id: i64,
        ) -> Result<Allocation> {
            self.0
                .upsert_allocation(assignment_id, subject_id, marker1_id, marker2_id)
                .await
        }

        async fn record_marker_grade(&self, write: MarkerGradeWrite) -> Result<Allocation> {
            self.0.record_marker_grade(write).await
        }

        async fn save_ratification(
            &self,
            result: &RatificationResult,
            expected_version: i64,
        ) -> Result<Allocation> {
            self.0.save_ratification(result, expected_version).await
        }

        async fn upsert_gradebook_grade(
            &self,
            _assignment_id: i64,
            _student_id: i64,
            _grader_id: i64,
            _score: f64,
            _comment: Option<String>,
        ) -> Result<GradebookEntry> {
            Err(DoubleMarkingError::gradebook_sync("gradebook unavailable"))
        }

        async fn export_user_allocations(&self, user_id: i64) -> Result<Vec<Allocation>> {
            self.0.export_user_allocations(user_id).await
        }

        async fn delete_user_marking_data(&self, user_id: i64) -> Result<PrivacyDeleteResponse> {
            self.0.delete_user_marking_data(user_id).await
        }

        async fn delete_assignment_allocations(&self, assignment_id: i64) -> Result<u64> {
            self.0.delete_assignment_allocations(assignment_id).await
        }
    }

    fn ratifier() -> Viewer {
        Viewer::new(TEACHER, CapabilitySet::all())
    }

    fn ratify_request(choice: &str, final_grade: Option<f64>) -> RatifyRequest {
        RatifyRequest {
            choice: choice.to_string(),
            final_grade,
            comment: "moderated".to_string(),
        }
    }

    // 两位评分人都已评分的记录
    async fn graded(storage: Arc<dyn Storage>, assignment_id: i64) -> Arc<dyn Storage> {
        let alloc = storage
            .upsert_allocation(assignment_id, STUDENT, MARKER_A, MARKER_B)
            .await
            .unwrap();
        for (slot, marker_id, grade) in [
            (MarkerSlot::Marker1, MARKER_A, 60.0),
            (MarkerSlot::Marker2, MARKER_B, 80.0),
        ] {
            storage
                .record_marker_grade(MarkerGradeWrite {
                    allocation_id: alloc.id,
                    slot,
                    marker_id,
                    grade,
                    feedback: None,
                    graded_at: chrono::Utc::now(),
                })
                .await
                .unwrap();
        }
        storage
    }

    async fn ratify_as(
        storage: &Arc<dyn Storage>,
        viewer: Viewer,
        assignment_id: i64,
        req: RatifyRequest,
    ) -> HttpResponse {
        let request = marking_request(storage, viewer, assignment_id).await;
        RatificationService::new_lazy()
            .ratify(&request, STUDENT, req)
            .await
            .unwrap()
    }

    async fn final_grade(storage: &Arc<dyn Storage>, assignment_id: i64) -> Option<f64> {
        storage
            .get_allocation(assignment_id, STUDENT)
            .await
            .unwrap()
            .unwrap()
            .final_grade
    }

    #[actix_web::test]
    async fn test_average_is_saved_and_synced() {
        let storage = graded(Arc::new(seeded_storage().await), ASSIGNMENT_ID).await;

        let resp = ratify_as(&storage, ratifier(), ASSIGNMENT_ID, ratify_request("average", None)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["data"]["result"]["final_grade"], 70.0);
        assert_eq!(body["data"]["gradebook_synced"], true);
        assert!(body["data"].get("gradebook_error").is_none());
        assert_eq!(final_grade(&storage, ASSIGNMENT_ID).await, Some(70.0));
    }

    #[actix_web::test]
    async fn test_gradebook_failure_keeps_ratification() {
        let storage: Arc<dyn Storage> = Arc::new(GradebookDown(seeded_storage().await));
        let storage = graded(storage, ASSIGNMENT_ID).await;

        let resp = ratify_as(&storage, ratifier(), ASSIGNMENT_ID, ratify_request("marker2", None)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["data"]["gradebook_synced"], false);
        assert!(
            body["data"]["gradebook_error"]
                .as_str()
                .is_some_and(|msg| msg.contains("gradebook unavailable"))
        );
        assert_eq!(final_grade(&storage, ASSIGNMENT_ID).await, Some(80.0));
    }

    #[actix_web::test]
    async fn test_ungraded_assignment_skips_sync() {
        let storage: Arc<dyn Storage> = Arc::new(GradebookDown(seeded_storage().await));
        let storage = graded(storage, UNGRADED_ASSIGNMENT_ID).await;

        // 不计分作业不写成绩簿，也就不会触发同步失败
        let resp = ratify_as(
            &storage,
            ratifier(),
            UNGRADED_ASSIGNMENT_ID,
            ratify_request("custom", Some(250.0)),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["data"]["gradebook_synced"], false);
        assert!(body["data"].get("gradebook_error").is_none());
    }

    #[actix_web::test]
    async fn test_second_ratification_conflicts() {
        let storage = graded(Arc::new(seeded_storage().await), ASSIGNMENT_ID).await;

        let first = ratify_as(&storage, ratifier(), ASSIGNMENT_ID, ratify_request("marker1", None)).await;
        assert_eq!(first.status(), StatusCode::OK);

        let second = ratify_as(&storage, ratifier(), ASSIGNMENT_ID, ratify_request("marker2", None)).await;
        assert_eq!(second.status(), StatusCode::CONFLICT);
        let body = json_body(second).await;
        assert_eq!(body["code"], ErrorCode::AlreadyRatified as i32);
        assert_eq!(final_grade(&storage, ASSIGNMENT_ID).await, Some(60.0));
    }

    #[actix_web::test]
    async fn test_custom_grade_above_max_is_rejected() {
        let storage = graded(Arc::new(seeded_storage().await), ASSIGNMENT_ID).await;

        let resp = ratify_as(
            &storage,
            ratifier(),
            ASSIGNMENT_ID,
            ratify_request("custom", Some(101.0)),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = json_body(resp).await;
        assert_eq!(body["code"], ErrorCode::GradeInvalid as i32);
        assert_eq!(final_grade(&storage, ASSIGNMENT_ID).await, None);
    }

    #[actix_web::test]
    async fn test_marker_cannot_ratify() {
        let storage = graded(Arc::new(seeded_storage().await), ASSIGNMENT_ID).await;
        let marker = Viewer::new(
            MARKER_A,
            CapabilitySet {
                view_assignment: true,
                mark_first: true,
                mark_second: true,
                ..CapabilitySet::default()
            },
        );

        let resp = ratify_as(&storage, marker, ASSIGNMENT_ID, ratify_request("marker1", None)).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(final_grade(&storage, ASSIGNMENT_ID).await, None);
    }

    #[actix_web::test]
    async fn test_unknown_choice_and_missing_grade() {
        let storage: Arc<dyn Storage> = Arc::new(seeded_storage().await);
        storage
            .upsert_allocation(ASSIGNMENT_ID, STUDENT, MARKER_A, MARKER_B)
            .await
            .unwrap();

        let resp = ratify_as(&storage, ratifier(), ASSIGNMENT_ID, ratify_request("median", None)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = json_body(resp).await;
        assert_eq!(body["code"], ErrorCode::InvalidRatificationChoice as i32);

        // 评分人尚未评分时不能按其成绩定分
        let resp = ratify_as(&storage, ratifier(), ASSIGNMENT_ID, ratify_request("average", None)).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
