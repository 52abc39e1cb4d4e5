//! 双评可见性与复核定分
//!
//! 裁剪与定分均为纯逻辑；能力查询通过 `CapabilityOracle` 接入存储。

pub mod capabilities;
pub mod oracle;
pub mod ratification;
pub mod view;

pub use capabilities::{Capability, CapabilityOracle, CapabilitySet, Viewer};
pub use oracle::StorageCapabilityOracle;
pub use ratification::resolve_ratification;
pub use view::{grade_difference, resolve_view, threshold_exceeded};
