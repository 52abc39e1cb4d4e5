pub mod gradebook;
pub mod ratify;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::models::allocations::requests::RatifyRequest;
use crate::storage::Storage;

pub struct RatificationService {
    storage: Option<Arc<dyn Storage>>,
}

impl RatificationService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> ActixResult<Arc<dyn Storage>> {
        match &self.storage {
            Some(storage) => Ok(storage.clone()),
            None => super::storage_from_request(request),
        }
    }

    /// 复核定分并同步成绩簿
    pub async fn ratify(
        &self,
        request: &HttpRequest,
        subject_id: i64,
        req: RatifyRequest,
    ) -> ActixResult<HttpResponse> {
        ratify::ratify(self, request, subject_id, req).await
    }
}
