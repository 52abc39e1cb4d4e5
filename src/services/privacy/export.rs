use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::info;

use super::PrivacyService;
use crate::models::allocations::entities::Allocation;
use crate::models::privacy::responses::{
    PrivacyAllocationExport, PrivacyExportResponse, PrivacyRole,
};
use crate::models::{ApiResponse, ErrorCode};
use crate::services::error_response;

/// 评语只随写下它的评分人导出
pub(crate) fn export_item(user_id: i64, alloc: &Allocation) -> PrivacyAllocationExport {
    let mut roles = Vec::new();
    if alloc.subject_id == user_id {
        roles.push(PrivacyRole::Subject);
    }
    if alloc.marker1_id == Some(user_id) {
        roles.push(PrivacyRole::Marker1);
    }
    if alloc.marker2_id == Some(user_id) {
        roles.push(PrivacyRole::Marker2);
    }
    if alloc.ratifier_id == Some(user_id) {
        roles.push(PrivacyRole::Ratifier);
    }

    let is_subject_or_ratifier =
        roles.contains(&PrivacyRole::Subject) || roles.contains(&PrivacyRole::Ratifier);
    let is_marker1 = roles.contains(&PrivacyRole::Marker1);
    let is_marker2 = roles.contains(&PrivacyRole::Marker2);

    let feedback = if is_marker1 {
        alloc.marker1_feedback.clone()
    } else if is_marker2 {
        alloc.marker2_feedback.clone()
    } else {
        None
    };

    PrivacyAllocationExport {
        assignment_id: alloc.assignment_id,
        subject_id: alloc.subject_id,
        marker1_grade: alloc.marker1_grade.filter(|_| is_subject_or_ratifier || is_marker1),
        marker2_grade: alloc.marker2_grade.filter(|_| is_subject_or_ratifier || is_marker2),
        feedback,
        final_grade: alloc.final_grade,
        ratification_comment: alloc.ratification_comment.clone(),
        created_at: alloc.created_at,
        updated_at: alloc.updated_at,
        roles,
    }
}

pub async fn export_user(
    service: &PrivacyService,
    request: &HttpRequest,
    user_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;

    match storage.get_user_by_id(user_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
                ErrorCode::UserNotFound,
                "User not found",
            )));
        }
        Err(e) => return Ok(error_response(&e)),
    }

    match storage.export_user_allocations(user_id).await {
        Ok(allocations) => {
            let items: Vec<_> = allocations
                .iter()
                .map(|alloc| export_item(user_id, alloc))
                .collect();
            info!("Exported {} allocation records for user {}", items.len(), user_id);
            Ok(HttpResponse::Ok().json(ApiResponse::success(
                PrivacyExportResponse { user_id, items },
                "User marking data exported successfully",
            )))
        }
        Err(e) => Ok(error_response(&e)),
    }
}
