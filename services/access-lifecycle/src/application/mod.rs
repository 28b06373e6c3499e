//! 应用层模块

pub mod commands;
pub mod lifecycle;
pub mod registry;

pub use commands::{GrantCommand, RevokeCommand};
pub use lifecycle::{
    ActiveLifecycles, LifecycleDeps, LifecycleHandle, LifecycleSettings, LifecycleStatus,
};
pub use registry::LifecycleRegistry;
