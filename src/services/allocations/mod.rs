pub mod allocate;
pub mod list;
pub mod settings;
pub mod view;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::models::allocations::requests::{
    AllocateMarkersRequest, AllocationListParams, UpdateMarkingSettingsRequest,
};
use crate::storage::Storage;

pub struct AllocationService {
    storage: Option<Arc<dyn Storage>>,
}

impl AllocationService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> ActixResult<Arc<dyn Storage>> {
        match &self.storage {
            Some(storage) => Ok(storage.clone()),
            None => super::storage_from_request(request),
        }
    }

    /// 获取作业的有效双评设置
    pub async fn get_settings(&self, request: &HttpRequest) -> ActixResult<HttpResponse> {
        settings::get_settings(self, request).await
    }

    /// 写入作业级双评设置
    pub async fn update_settings(
        &self,
        request: &HttpRequest,
        req: UpdateMarkingSettingsRequest,
    ) -> ActixResult<HttpResponse> {
        settings::update_settings(self, request, req).await
    }

    /// 分页列出裁剪后的分配视图
    pub async fn list_allocations(
        &self,
        request: &HttpRequest,
        params: AllocationListParams,
    ) -> ActixResult<HttpResponse> {
        list::list_allocations(self, request, params).await
    }

    /// 获取单个学生的分配视图
    pub async fn get_allocation_view(
        &self,
        request: &HttpRequest,
        subject_id: i64,
    ) -> ActixResult<HttpResponse> {
        view::get_allocation_view(self, request, subject_id).await
    }

    /// 分配两位评分人
    pub async fn allocate_markers(
        &self,
        request: &HttpRequest,
        subject_id: i64,
        req: AllocateMarkersRequest,
    ) -> ActixResult<HttpResponse> {
        allocate::allocate_markers(self, request, subject_id, req).await
    }
}
