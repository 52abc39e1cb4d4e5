pub mod grade;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::models::allocations::requests::SubmitMarkerGradeRequest;
use crate::storage::Storage;

pub struct MarkingService {
    storage: Option<Arc<dyn Storage>>,
}

impl MarkingService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> ActixResult<Arc<dyn Storage>> {
        match &self.storage {
            Some(storage) => Ok(storage.clone()),
            None => super::storage_from_request(request),
        }
    }

    /// 评分人提交自己评分位的成绩
    pub async fn submit_grade(
        &self,
        request: &HttpRequest,
        subject_id: i64,
        req: SubmitMarkerGradeRequest,
    ) -> ActixResult<HttpResponse> {
        grade::submit_grade(self, request, subject_id, req).await
    }
}
