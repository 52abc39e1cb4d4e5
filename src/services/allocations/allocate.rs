use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;
use tracing::info;

use super::AllocationService;
use crate::errors::{DoubleMarkingError, Result};
use crate::marking::{Capability, CapabilityOracle, StorageCapabilityOracle, resolve_view};
use crate::models::allocations::requests::AllocateMarkersRequest;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::{effective_settings, error_response, marking_context};
use crate::storage::Storage;
use crate::utils::validate::validate_allocation;

/// 评分人必须存在且在该作业上具备对应评分位的能力
async fn check_marker(
    storage: &Arc<dyn Storage>,
    oracle: &StorageCapabilityOracle,
    assignment_id: i64,
    marker_id: i64,
    capability: Capability,
) -> Result<()> {
    if storage.get_user_by_id(marker_id).await?.is_none() {
        return Err(DoubleMarkingError::not_found(format!(
            "评分人 {marker_id} 不存在"
        )));
    }
    if !oracle
        .has_capability(capability, assignment_id, marker_id)
        .await?
    {
        return Err(DoubleMarkingError::validation(format!(
            "用户 {marker_id} 在该作业上没有 {capability} 权限"
        )));
    }
    Ok(())
}

pub async fn allocate_markers(
    service: &AllocationService,
    request: &HttpRequest,
    subject_id: i64,
    req: AllocateMarkersRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;
    let (viewer, assignment) = match marking_context(request) {
        Ok(ctx) => ctx,
        Err(resp) => return Ok(resp),
    };

    let validation = validate_allocation(subject_id, req.marker1_id, req.marker2_id);
    if !validation.is_valid {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(
            ErrorCode::AllocationInvalid,
            validation.error_message(),
        )));
    }

    let oracle = StorageCapabilityOracle::new(storage.clone());
    for (marker_id, capability) in [
        (req.marker1_id, Capability::MarkFirst),
        (req.marker2_id, Capability::MarkSecond),
    ] {
        match check_marker(&storage, &oracle, assignment.id, marker_id, capability).await {
            Ok(()) => {}
            Err(DoubleMarkingError::NotFound(msg)) => {
                return Ok(HttpResponse::NotFound()
                    .json(ApiResponse::error_empty(ErrorCode::UserNotFound, msg)));
            }
            Err(DoubleMarkingError::Validation(msg)) => {
                return Ok(HttpResponse::UnprocessableEntity()
                    .json(ApiResponse::error_empty(ErrorCode::MarkerNotEligible, msg)));
            }
            Err(e) => return Ok(error_response(&e)),
        }
    }

    let allocation = match storage
        .upsert_allocation(assignment.id, subject_id, req.marker1_id, req.marker2_id)
        .await
    {
        Ok(allocation) => allocation,
        Err(e) => return Ok(error_response(&e)),
    };

    info!(
        "User {} allocated markers {}/{} to subject {} on assignment {}",
        viewer.id, req.marker1_id, req.marker2_id, subject_id, assignment.id
    );

    let settings = match effective_settings(&storage, assignment.id).await {
        Ok(settings) => settings,
        Err(e) => return Ok(error_response(&e)),
    };
    Ok(HttpResponse::Ok().json(ApiResponse::success(
        resolve_view(Some(&allocation), &settings, &viewer),
        "Markers allocated successfully",
    )))
}
