use async_trait::async_trait;
use serde::Serialize;
use ts_rs::TS;

use crate::errors::Result;
use crate::models::class_users::entities::ClassUserRole;
use crate::models::users::entities::UserRole;

/// 双评相关能力
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    ViewAssignment,
    MarkFirst,
    MarkSecond,
    Ratify,
    Allocate,
    ViewMarkers,
    ViewAllGrades,
    ViewDifferences,
    ViewAll,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Capability::ViewAssignment => "view_assignment",
            Capability::MarkFirst => "mark_first",
            Capability::MarkSecond => "mark_second",
            Capability::Ratify => "ratify",
            Capability::Allocate => "allocate",
            Capability::ViewMarkers => "view_markers",
            Capability::ViewAllGrades => "view_all_grades",
            Capability::ViewDifferences => "view_differences",
            Capability::ViewAll => "view_all",
        };
        write!(f, "{name}")
    }
}

/// 每个请求解析一次的能力集合
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/marking.ts")]
pub struct CapabilitySet {
    pub view_assignment: bool,
    pub mark_first: bool,
    pub mark_second: bool,
    pub ratify: bool,
    pub allocate: bool,
    pub view_markers: bool,
    pub view_all_grades: bool,
    pub view_differences: bool,
    pub view_all: bool,
}

impl CapabilitySet {
    pub fn all() -> Self {
        Self {
            view_assignment: true,
            mark_first: true,
            mark_second: true,
            ratify: true,
            allocate: true,
            view_markers: true,
            view_all_grades: true,
            view_differences: true,
            view_all: true,
        }
    }

    /// 由平台角色与班级角色推导能力
    pub fn for_roles(user_role: &UserRole, class_role: Option<&ClassUserRole>) -> Self {
        if *user_role == UserRole::Admin {
            return Self::all();
        }

        match class_role {
            Some(ClassUserRole::Teacher) => Self::all(),
            Some(ClassUserRole::Marker) => Self {
                view_assignment: true,
                mark_first: true,
                mark_second: true,
                ..Self::default()
            },
            Some(ClassUserRole::Student) => Self {
                view_assignment: true,
                ..Self::default()
            },
            None => Self::default(),
        }
    }

    pub fn has(&self, capability: Capability) -> bool {
        match capability {
            Capability::ViewAssignment => self.view_assignment,
            Capability::MarkFirst => self.mark_first,
            Capability::MarkSecond => self.mark_second,
            Capability::Ratify => self.ratify,
            Capability::Allocate => self.allocate,
            Capability::ViewMarkers => self.view_markers,
            Capability::ViewAllGrades => self.view_all_grades,
            Capability::ViewDifferences => self.view_differences,
            Capability::ViewAll => self.view_all,
        }
    }
}

/// 发起请求的身份及其能力
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewer {
    pub id: i64,
    pub capabilities: CapabilitySet,
}

impl Viewer {
    pub fn new(id: i64, capabilities: CapabilitySet) -> Self {
        Self { id, capabilities }
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities.has(capability)
    }
}

/// 能力查询接口
#[async_trait]
pub trait CapabilityOracle: Send + Sync {
    /// 解析用户在某个作业上下文中的全部能力
    async fn capabilities_for(&self, user_id: i64, assignment_id: i64) -> Result<CapabilitySet>;

    async fn has_capability(
        &self,
        capability: Capability,
        assignment_id: i64,
        user_id: i64,
    ) -> Result<bool> {
        Ok(self
            .capabilities_for(user_id, assignment_id)
            .await?
            .has(capability))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_has_everything() {
        let caps = CapabilitySet::for_roles(&UserRole::Admin, None);
        assert_eq!(caps, CapabilitySet::all());
    }

    #[test]
    fn test_marker_can_only_mark() {
        let caps = CapabilitySet::for_roles(&UserRole::User, Some(&ClassUserRole::Marker));
        assert!(caps.has(Capability::MarkFirst));
        assert!(caps.has(Capability::MarkSecond));
        assert!(!caps.has(Capability::Ratify));
        assert!(!caps.has(Capability::Allocate));
        assert!(!caps.has(Capability::ViewAll));
    }

    #[test]
    fn test_student_and_outsider() {
        let student = CapabilitySet::for_roles(&UserRole::User, Some(&ClassUserRole::Student));
        assert!(student.has(Capability::ViewAssignment));
        assert!(!student.has(Capability::MarkFirst));

        let outsider = CapabilitySet::for_roles(&UserRole::Teacher, None);
        assert_eq!(outsider, CapabilitySet::default());
    }
}
