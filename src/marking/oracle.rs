//! 基于存储的能力查询

use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::{DoubleMarkingError, Result};
use crate::models::assignments::entities::Assignment;
use crate::models::users::entities::User;
use crate::storage::Storage;

use super::capabilities::{CapabilityOracle, CapabilitySet};

/// 由平台角色与作业所在班级的成员角色推导能力
pub struct StorageCapabilityOracle {
    storage: Arc<dyn Storage>,
}

impl StorageCapabilityOracle {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// 用户与作业都已加载时使用，避免重复查询
    pub async fn capabilities_in(
        &self,
        user: &User,
        assignment: &Assignment,
    ) -> Result<CapabilitySet> {
        if !user.is_active() {
            return Ok(CapabilitySet::default());
        }
        if user.is_admin() {
            return Ok(CapabilitySet::all());
        }

        let class_user = self
            .storage
            .get_class_user_by_user_id_and_class_id(user.id, assignment.class_id)
            .await?;

        Ok(CapabilitySet::for_roles(
            &user.role,
            class_user.as_ref().map(|cu| &cu.role),
        ))
    }
}

#[async_trait]
impl CapabilityOracle for StorageCapabilityOracle {
    async fn capabilities_for(&self, user_id: i64, assignment_id: i64) -> Result<CapabilitySet> {
        let assignment = self
            .storage
            .get_assignment_by_id(assignment_id)
            .await?
            .ok_or_else(|| DoubleMarkingError::not_found(format!("作业 {assignment_id} 不存在")))?;

        // 未知用户没有任何能力
        let Some(user) = self.storage.get_user_by_id(user_id).await? else {
            return Ok(CapabilitySet::default());
        };

        self.capabilities_in(&user, &assignment).await
    }
}
