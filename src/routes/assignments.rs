use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::marking::Capability;
use crate::middlewares;
use crate::models::allocations::requests::{
    AllocateMarkersRequest, AllocationListParams, AllocationPath, RatifyRequest,
    SubmitMarkerGradeRequest, UpdateMarkingSettingsRequest,
};
use crate::models::{ApiResponse, ErrorCode};
use crate::services::{AllocationService, MarkingService, RatificationService};

// 懒加载的全局服务实例
static ALLOCATION_SERVICE: Lazy<AllocationService> = Lazy::new(AllocationService::new_lazy);
static MARKING_SERVICE: Lazy<MarkingService> = Lazy::new(MarkingService::new_lazy);
static RATIFICATION_SERVICE: Lazy<RatificationService> =
    Lazy::new(RatificationService::new_lazy);

// subject_id = 0 保留给作业级设置行
fn subject_id(path: &AllocationPath) -> Result<i64, HttpResponse> {
    if path.subject_id > 0 {
        Ok(path.subject_id)
    } else {
        Err(HttpResponse::BadRequest().json(ApiResponse::error_empty(
            ErrorCode::BadRequest,
            "subject_id must be positive",
        )))
    }
}

// HTTP处理程序
pub async fn get_settings(req: HttpRequest) -> ActixResult<HttpResponse> {
    ALLOCATION_SERVICE.get_settings(&req).await
}

pub async fn update_settings(
    req: HttpRequest,
    body: web::Json<UpdateMarkingSettingsRequest>,
) -> ActixResult<HttpResponse> {
    ALLOCATION_SERVICE
        .update_settings(&req, body.into_inner())
        .await
}

pub async fn list_allocations(
    req: HttpRequest,
    query: web::Query<AllocationListParams>,
) -> ActixResult<HttpResponse> {
    ALLOCATION_SERVICE
        .list_allocations(&req, query.into_inner())
        .await
}

pub async fn get_allocation(
    req: HttpRequest,
    path: web::Path<AllocationPath>,
) -> ActixResult<HttpResponse> {
    match subject_id(&path) {
        Ok(subject_id) => ALLOCATION_SERVICE.get_allocation_view(&req, subject_id).await,
        Err(resp) => Ok(resp),
    }
}

pub async fn allocate_markers(
    req: HttpRequest,
    path: web::Path<AllocationPath>,
    body: web::Json<AllocateMarkersRequest>,
) -> ActixResult<HttpResponse> {
    // 分配校验会给出更完整的错误信息
    ALLOCATION_SERVICE
        .allocate_markers(&req, path.subject_id, body.into_inner())
        .await
}

pub async fn submit_grade(
    req: HttpRequest,
    path: web::Path<AllocationPath>,
    body: web::Json<SubmitMarkerGradeRequest>,
) -> ActixResult<HttpResponse> {
    match subject_id(&path) {
        Ok(subject_id) => {
            MARKING_SERVICE
                .submit_grade(&req, subject_id, body.into_inner())
                .await
        }
        Err(resp) => Ok(resp),
    }
}

pub async fn ratify(
    req: HttpRequest,
    path: web::Path<AllocationPath>,
    body: web::Json<RatifyRequest>,
) -> ActixResult<HttpResponse> {
    match subject_id(&path) {
        Ok(subject_id) => {
            RATIFICATION_SERVICE
                .ratify(&req, subject_id, body.into_inner())
                .await
        }
        Err(resp) => Ok(resp),
    }
}

// 配置路由
pub fn configure_assignment_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/assignments/{assignment_id}")
            // 先认证，再解析当前用户在该作业上的能力
            .wrap(middlewares::RequireCapability::new())
            .wrap(middlewares::RequireJWT)
            .service(
                web::resource("/marking/settings")
                    .route(
                        web::get()
                            .to(get_settings)
                            // 班级成员均可读取
                            .wrap(middlewares::RequireCapability::any(&[
                                Capability::ViewAssignment,
                            ])),
                    )
                    .route(
                        web::put()
                            .to(update_settings)
                            .wrap(middlewares::RequireCapability::any(&[Capability::Allocate])),
                    ),
            )
            .service(
                web::resource("/allocations").route(
                    web::get()
                        .to(list_allocations)
                        // 分配总览页
                        .wrap(middlewares::RequireCapability::any(&[
                            Capability::Allocate,
                            Capability::ViewAll,
                        ])),
                ),
            )
            .service(
                web::resource("/allocations/{subject_id}")
                    // 视图再按能力裁剪
                    .route(
                        web::get()
                            .to(get_allocation)
                            .wrap(middlewares::RequireCapability::any(&[
                                Capability::ViewAssignment,
                            ])),
                    )
                    .route(
                        web::put()
                            .to(allocate_markers)
                            .wrap(middlewares::RequireCapability::any(&[Capability::Allocate])),
                    ),
            )
            .service(
                web::resource("/allocations/{subject_id}/grade").route(
                    web::post()
                        .to(submit_grade)
                        .wrap(middlewares::RequireCapability::any(&[
                            Capability::MarkFirst,
                            Capability::MarkSecond,
                        ]))
                        .wrap(middlewares::RateLimit::grade()),
                ),
            )
            .service(
                web::resource("/allocations/{subject_id}/ratify").route(
                    web::post()
                        .to(ratify)
                        .wrap(middlewares::RequireCapability::any(&[Capability::Ratify]))
                        .wrap(middlewares::RateLimit::ratify()),
                ),
            ),
    );
}
