use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::info;

use super::AllocationService;
use crate::models::ApiResponse;
use crate::models::allocations::entities::MarkingSettings;
use crate::models::allocations::requests::UpdateMarkingSettingsRequest;
use crate::services::{effective_settings, error_response, marking_context};

pub async fn get_settings(
    service: &AllocationService,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;
    let (_, assignment) = match marking_context(request) {
        Ok(ctx) => ctx,
        Err(resp) => return Ok(resp),
    };

    match effective_settings(&storage, assignment.id).await {
        Ok(settings) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            settings,
            "Marking settings retrieved successfully",
        ))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn update_settings(
    service: &AllocationService,
    request: &HttpRequest,
    req: UpdateMarkingSettingsRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;
    let (viewer, assignment) = match marking_context(request) {
        Ok(ctx) => ctx,
        Err(resp) => return Ok(resp),
    };

    let row = match storage
        .upsert_assignment_settings(assignment.id, req.blind_setting, req.marks_hidden)
        .await
    {
        Ok(row) => row,
        Err(e) => return Ok(error_response(&e)),
    };

    info!(
        "User {} set marking settings of assignment {}: blind={}, marks_hidden={}",
        viewer.id, assignment.id, row.blind_setting, row.marks_hidden
    );

    let settings = match MarkingSettings::from_defaults(&crate::config::AppConfig::get().marking) {
        Ok(defaults) => defaults.with_assignment_row(Some(&row)),
        Err(e) => return Ok(error_response(&e)),
    };
    Ok(HttpResponse::Ok().json(ApiResponse::success(
        settings,
        "Marking settings updated successfully",
    )))
}
