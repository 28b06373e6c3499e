//! 应用权限领域模块

#![allow(clippy::module_inception)]

pub mod events;
pub mod history;
pub mod ledger;
pub mod permission;

pub use events::{SignalEvent, SignalKind};
pub use history::History;
pub use ledger::{PermissionLedger, PermissionState};
pub use permission::{ApplicationPermission, PermissionStatus, PermissionTable};
