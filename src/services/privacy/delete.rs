use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::warn;

use super::PrivacyService;
use crate::models::ApiResponse;
use crate::services::error_response;

pub async fn delete_user(
    service: &PrivacyService,
    request: &HttpRequest,
    user_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;

    match storage.delete_user_marking_data(user_id).await {
        Ok(summary) => {
            warn!(
                "Deleted marking data of user {}: {} allocations removed, {} feedback cleared",
                user_id, summary.deleted_allocations, summary.cleared_feedback
            );
            Ok(HttpResponse::Ok().json(ApiResponse::success(
                summary,
                "User marking data deleted successfully",
            )))
        }
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn delete_assignment(
    service: &PrivacyService,
    request: &HttpRequest,
    assignment_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;

    match storage.delete_assignment_allocations(assignment_id).await {
        Ok(deleted) => {
            warn!(
                "Deleted {} allocation rows of assignment {}",
                deleted, assignment_id
            );
            Ok(HttpResponse::Ok().json(ApiResponse::success(
                crate::models::privacy::responses::PrivacyDeleteResponse {
                    deleted_allocations: deleted,
                    cleared_feedback: 0,
                },
                "Assignment marking data deleted successfully",
            )))
        }
        Err(e) => Ok(error_response(&e)),
    }
}
