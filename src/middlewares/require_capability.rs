/*!
 * 作业级能力中间件
 *
 * 必须在 RequireJWT 之后使用。路径中需要包含 `{assignment_id}`。
 * 中间件加载作业、解析当前用户在该作业上的能力，并把 `Viewer` 与
 * `Assignment` 放入请求扩展；可选地要求至少具备其中一项能力。
 *
 * ## 使用方法
 *
 * ```rust,ignore
 * use actix_web::web;
 * use crate::marking::Capability;
 * use crate::middlewares::{RequireCapability, RequireJWT};
 *
 * web::scope("/api/v1/assignments/{assignment_id}")
 *     .wrap(RequireCapability::new())
 *     .wrap(RequireJWT)
 *     .service(
 *         web::resource("/ratify")
 *             .wrap(RequireCapability::any(&[Capability::Ratify]))
 *             .route(web::post().to(ratify)),
 *     )
 * ```
 */

use actix_service::{Service, Transform};
use actix_web::{
    Error, HttpMessage,
    body::EitherBody,
    dev::{ServiceRequest, ServiceResponse},
    http::StatusCode,
    web,
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::{rc::Rc, sync::Arc};
use tracing::{debug, error, info};

use crate::{
    marking::{Capability, StorageCapabilityOracle, Viewer},
    models::{ErrorCode, assignments::entities::Assignment},
    storage::Storage,
};

use super::{RequireJWT, create_error_response};

#[derive(Clone, Default)]
pub struct RequireCapability {
    // 为空表示只解析能力，不做拦截
    any_of: Vec<Capability>,
}

impl RequireCapability {
    /// 只解析能力
    pub fn new() -> Self {
        Self::default()
    }

    /// 需要任一能力
    pub fn any(capabilities: &[Capability]) -> Self {
        Self {
            any_of: capabilities.to_vec(),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequireCapability
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RequireCapabilityMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequireCapabilityMiddleware {
            service: Rc::new(service),
            any_of: self.any_of.clone(),
        }))
    }
}

pub struct RequireCapabilityMiddleware<S> {
    service: Rc<S>,
    any_of: Vec<Capability>,
}

impl<S, B> Service<ServiceRequest> for RequireCapabilityMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();
        let any_of = self.any_of.clone();

        Box::pin(async move {
            // 外层已解析过时直接复用
            let existing = req.extensions().get::<Viewer>().copied();
            let viewer = match existing {
                Some(viewer) => viewer,
                None => match resolve_viewer(&req).await {
                    Ok(viewer) => viewer,
                    Err((status, code, message)) => {
                        return Ok(req.into_response(
                            create_error_response(status, code, &message).map_into_right_body(),
                        ));
                    }
                },
            };

            if !any_of.is_empty() && !any_of.iter().any(|cap| viewer.can(*cap)) {
                info!(
                    "Capability check failed for user {} on {}: requires any of {:?}",
                    viewer.id,
                    req.path(),
                    any_of
                );
                return Ok(req.into_response(
                    create_error_response(
                        StatusCode::FORBIDDEN,
                        ErrorCode::Forbidden,
                        "Missing required capability for this assignment",
                    )
                    .map_into_right_body(),
                ));
            }

            let res = srv.call(req).await?.map_into_left_body();
            Ok(res)
        })
    }
}

type Rejection = (StatusCode, ErrorCode, String);

// 加载作业并解析能力，成功后写入请求扩展
async fn resolve_viewer(req: &ServiceRequest) -> Result<Viewer, Rejection> {
    let user = RequireJWT::extract_user_claims(req.request()).ok_or_else(|| {
        (
            StatusCode::UNAUTHORIZED,
            ErrorCode::Unauthorized,
            "Unauthorized: missing user claims".to_string(),
        )
    })?;

    let assignment_id = req
        .match_info()
        .get("assignment_id")
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                ErrorCode::BadRequest,
                "Missing or invalid assignment_id".to_string(),
            )
        })?;

    let storage = req
        .app_data::<web::Data<Arc<dyn Storage>>>()
        .map(|data| data.get_ref().clone())
        .ok_or_else(|| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::InternalServerError,
                "Storage not configured".to_string(),
            )
        })?;

    let internal = |e: crate::errors::DoubleMarkingError| {
        error!("Capability resolution failed: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::InternalServerError,
            "Failed to resolve capabilities".to_string(),
        )
    };

    let assignment: Assignment = storage
        .get_assignment_by_id(assignment_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                ErrorCode::AssignmentNotFound,
                format!("Assignment {assignment_id} not found"),
            )
        })?;

    let capabilities = StorageCapabilityOracle::new(storage)
        .capabilities_in(&user, &assignment)
        .await
        .map_err(internal)?;

    let viewer = Viewer::new(user.id, capabilities);
    debug!(
        "Resolved capabilities for user {} on assignment {}: {:?}",
        user.id, assignment_id, capabilities
    );

    let mut extensions = req.extensions_mut();
    extensions.insert(viewer);
    extensions.insert(assignment);
    Ok(viewer)
}

// 辅助函数：从请求中提取解析结果
impl RequireCapability {
    /// 此函数应该在应用了 RequireCapability 中间件的路由处理程序中使用
    pub fn extract_viewer(req: &actix_web::HttpRequest) -> Option<Viewer> {
        req.extensions().get::<Viewer>().copied()
    }

    pub fn extract_assignment(req: &actix_web::HttpRequest) -> Option<Assignment> {
        req.extensions().get::<Assignment>().cloned()
    }
}
