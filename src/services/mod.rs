pub mod allocations;
pub mod marking;
pub mod privacy;
pub mod ratification;

pub use allocations::AllocationService;
pub use marking::MarkingService;
pub use privacy::PrivacyService;
pub use ratification::RatificationService;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, error::ErrorInternalServerError};
use std::sync::Arc;
use tracing::error;

use crate::config::AppConfig;
use crate::errors::{DoubleMarkingError, Result};
use crate::marking::Viewer;
use crate::middlewares::RequireCapability;
use crate::models::allocations::entities::MarkingSettings;
use crate::models::assignments::entities::Assignment;
use crate::models::{ApiResponse, ErrorCode};
use crate::storage::Storage;

/// 从 app_data 取存储
pub(crate) fn storage_from_request(request: &HttpRequest) -> ActixResult<Arc<dyn Storage>> {
    request
        .app_data::<actix_web::web::Data<Arc<dyn Storage>>>()
        .map(|data| data.get_ref().clone())
        .ok_or_else(|| ErrorInternalServerError("Storage not found in app data"))
}

/// 取 RequireCapability 解析出的查看者与作业
pub(crate) fn marking_context(request: &HttpRequest) -> std::result::Result<(Viewer, Assignment), HttpResponse> {
    match (
        RequireCapability::extract_viewer(request),
        RequireCapability::extract_assignment(request),
    ) {
        (Some(viewer), Some(assignment)) => Ok((viewer, assignment)),
        _ => {
            error!("Marking context missing for {}", request.path());
            Err(HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                ErrorCode::InternalServerError,
                "Marking context not resolved",
            )))
        }
    }
}

/// 作业的有效双评设置：设置行覆盖系统默认值
pub(crate) async fn effective_settings(
    storage: &Arc<dyn Storage>,
    assignment_id: i64,
) -> Result<MarkingSettings> {
    let row = storage.get_assignment_settings(assignment_id).await?;
    Ok(MarkingSettings::from_defaults(&AppConfig::get().marking)?.with_assignment_row(row.as_ref()))
}

/// 将领域错误映射为 HTTP 响应
pub(crate) fn error_response(err: &DoubleMarkingError) -> HttpResponse {
    let body = |code: ErrorCode| ApiResponse::error_empty(code, err.message());
    match err {
        DoubleMarkingError::Validation(_) => HttpResponse::BadRequest().json(body(ErrorCode::BadRequest)),
        DoubleMarkingError::InvalidChoice(_) => {
            HttpResponse::BadRequest().json(body(ErrorCode::InvalidRatificationChoice))
        }
        DoubleMarkingError::Authentication(_) => {
            HttpResponse::Unauthorized().json(body(ErrorCode::Unauthorized))
        }
        DoubleMarkingError::AuthorizationDenied(_) => {
            HttpResponse::Forbidden().json(body(ErrorCode::Forbidden))
        }
        DoubleMarkingError::NotFound(_) => HttpResponse::NotFound().json(body(ErrorCode::NotFound)),
        DoubleMarkingError::Conflict(_) => {
            HttpResponse::Conflict().json(body(ErrorCode::AllocationConflict))
        }
        DoubleMarkingError::UnresolvedMarkerGrade(_) => {
            HttpResponse::UnprocessableEntity().json(body(ErrorCode::UnresolvedMarkerGrade))
        }
        DoubleMarkingError::GradebookSync(_) => {
            error!("{}", err);
            HttpResponse::InternalServerError().json(body(ErrorCode::GradebookSyncFailed))
        }
        _ => {
            error!("{}", err);
            HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                ErrorCode::InternalServerError,
                err.format_simple(),
            ))
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! 服务层测试夹具：构造已经过 RequireCapability 的请求

    use super::*;
    use actix_web::{HttpMessage, test, web};

    pub async fn marking_request(
        storage: &Arc<dyn Storage>,
        viewer: Viewer,
        assignment_id: i64,
    ) -> HttpRequest {
        let assignment = storage
            .get_assignment_by_id(assignment_id)
            .await
            .unwrap()
            .unwrap();
        let req = test::TestRequest::default()
            .app_data(web::Data::new(storage.clone()))
            .to_http_request();
        req.extensions_mut().insert(viewer);
        req.extensions_mut().insert(assignment);
        req
    }

    pub async fn json_body(resp: HttpResponse) -> serde_json::Value {
        let bytes = actix_web::body::to_bytes(resp.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
}
