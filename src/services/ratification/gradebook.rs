use std::sync::Arc;

use tracing::debug;

use crate::errors::Result;
use crate::models::allocations::responses::RatificationResult;
use crate::models::assignments::entities::Assignment;
use crate::storage::Storage;

/// 把最终成绩写回宿主成绩簿
///
/// 不计分的作业跳过同步，返回 `Ok(false)`。
pub async fn sync_gradebook(
    storage: &Arc<dyn Storage>,
    assignment: &Assignment,
    result: &RatificationResult,
) -> Result<bool> {
    if !assignment.is_graded() {
        debug!(
            "Assignment {} is not graded, skipping gradebook sync",
            assignment.id
        );
        return Ok(false);
    }

    let comment = (!result.comment.is_empty()).then(|| result.comment.clone());
    storage
        .upsert_gradebook_grade(
            result.assignment_id,
            result.subject_id,
            result.ratifier_id,
            result.final_grade,
            comment,
        )
        .await?;
    Ok(true)
}
