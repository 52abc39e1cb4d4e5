use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::AllocationService;
use crate::marking::{Capability, Viewer, resolve_view};
use crate::models::{ApiResponse, ErrorCode};
use crate::services::{effective_settings, error_response, marking_context};

// 仅有查看能力的成员只能看自己的记录
fn may_view_subject(viewer: &Viewer, subject_id: i64) -> bool {
    viewer.id == subject_id
        || [
            Capability::MarkFirst,
            Capability::MarkSecond,
            Capability::Ratify,
            Capability::Allocate,
            Capability::ViewMarkers,
            Capability::ViewAllGrades,
            Capability::ViewAll,
        ]
        .into_iter()
        .any(|cap| viewer.can(cap))
}

/// 尚未分配时返回只含能力标记的视图
pub async fn get_allocation_view(
    service: &AllocationService,
    request: &HttpRequest,
    subject_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;
    let (viewer, assignment) = match marking_context(request) {
        Ok(ctx) => ctx,
        Err(resp) => return Ok(resp),
    };

    if !may_view_subject(&viewer, subject_id) {
        return Ok(HttpResponse::Forbidden().json(ApiResponse::error_empty(
            ErrorCode::Forbidden,
            "You may only view your own allocation",
        )));
    }

    let settings = match effective_settings(&storage, assignment.id).await {
        Ok(settings) => settings,
        Err(e) => return Ok(error_response(&e)),
    };

    let allocation = match storage.get_allocation(assignment.id, subject_id).await {
        Ok(allocation) => allocation,
        Err(e) => return Ok(error_response(&e)),
    };

    let view = resolve_view(allocation.as_ref(), &settings, &viewer);
    Ok(HttpResponse::Ok().json(ApiResponse::success(
        view,
        "Allocation retrieved successfully",
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marking::CapabilitySet;
    use crate::models::class_users::entities::ClassUserRole;
    use crate::models::users::entities::UserRole;

    #[test]
    fn test_student_sees_only_self() {
        let caps = CapabilitySet::for_roles(&UserRole::User, Some(&ClassUserRole::Student));
        let student = Viewer::new(10, caps);
        assert!(may_view_subject(&student, 10));
        assert!(!may_view_subject(&student, 11));
    }

    #[test]
    fn test_markers_and_teachers_see_others() {
        let marker = Viewer::new(
            2,
            CapabilitySet::for_roles(&UserRole::User, Some(&ClassUserRole::Marker)),
        );
        assert!(may_view_subject(&marker, 10));
        let teacher = Viewer::new(1, CapabilitySet::all());
        assert!(may_view_subject(&teacher, 10));
    }
}
