//! 请求参数解析失败时的统一响应

use actix_web::{
    HttpRequest, HttpResponse,
    error::{InternalError, JsonPayloadError, PathError, QueryPayloadError},
};
use tracing::debug;

use crate::models::{ApiResponse, ErrorCode};

fn bad_request(req: &HttpRequest, kind: &str, detail: String) -> actix_web::Error {
    debug!("Invalid {} for {}: {}", kind, req.path(), detail);
    let response = HttpResponse::BadRequest().json(ApiResponse::<()>::error_empty(
        ErrorCode::BadRequest,
        format!("Invalid {kind}: {detail}"),
    ));
    InternalError::from_response(detail, response).into()
}

pub fn json_error_handler(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    bad_request(req, "JSON body", err.to_string())
}

pub fn query_error_handler(err: QueryPayloadError, req: &HttpRequest) -> actix_web::Error {
    bad_request(req, "query parameters", err.to_string())
}

pub fn path_error_handler(err: PathError, req: &HttpRequest) -> actix_web::Error {
    bad_request(req, "path parameters", err.to_string())
}
