use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;
use serde::Deserialize;

use crate::middlewares;
use crate::models::users::entities::UserRole;
use crate::services::PrivacyService;

static PRIVACY_SERVICE: Lazy<PrivacyService> = Lazy::new(PrivacyService::new_lazy);

#[derive(Debug, Deserialize)]
pub struct UserPath {
    pub user_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct AssignmentPath {
    pub assignment_id: i64,
}

// HTTP处理程序
pub async fn export_user(req: HttpRequest, path: web::Path<UserPath>) -> ActixResult<HttpResponse> {
    PRIVACY_SERVICE.export_user(&req, path.user_id).await
}

pub async fn delete_user(req: HttpRequest, path: web::Path<UserPath>) -> ActixResult<HttpResponse> {
    PRIVACY_SERVICE.delete_user(&req, path.user_id).await
}

pub async fn delete_assignment(
    req: HttpRequest,
    path: web::Path<AssignmentPath>,
) -> ActixResult<HttpResponse> {
    PRIVACY_SERVICE
        .delete_assignment(&req, path.assignment_id)
        .await
}

// 配置路由
pub fn configure_privacy_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/privacy")
            // 仅管理员可用
            .wrap(middlewares::RequireRole::new_any(UserRole::admin_roles()))
            .wrap(middlewares::RateLimit::privacy())
            .wrap(middlewares::RequireJWT)
            .service(
                web::resource("/users/{user_id}")
                    .route(web::get().to(export_user))
                    .route(web::delete().to(delete_user)),
            )
            .service(
                web::resource("/assignments/{assignment_id}")
                    .route(web::delete().to(delete_assignment)),
            ),
    );
}
