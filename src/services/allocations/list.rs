use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::AllocationService;
use crate::marking::resolve_view;
use crate::models::{ApiResponse, PaginatedResponse};
use crate::models::allocations::requests::{AllocationListParams, AllocationListQuery};
use crate::services::{effective_settings, error_response, marking_context};

pub async fn list_allocations(
    service: &AllocationService,
    request: &HttpRequest,
    params: AllocationListParams,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;
    let (viewer, assignment) = match marking_context(request) {
        Ok(ctx) => ctx,
        Err(resp) => return Ok(resp),
    };

    let settings = match effective_settings(&storage, assignment.id).await {
        Ok(settings) => settings,
        Err(e) => return Ok(error_response(&e)),
    };

    let query = AllocationListQuery {
        page: Some(params.pagination.page),
        size: Some(params.pagination.size),
        marker_id: params.marker_id,
    };

    match storage.list_allocations(assignment.id, query).await {
        Ok((allocations, pagination)) => {
            // 每条记录都按同一查看者裁剪
            let items = allocations
                .iter()
                .map(|alloc| resolve_view(Some(alloc), &settings, &viewer))
                .collect();
            Ok(HttpResponse::Ok().json(ApiResponse::success(
                PaginatedResponse { items, pagination },
                "Allocations retrieved successfully",
            )))
        }
        Err(e) => Ok(error_response(&e)),
    }
}
