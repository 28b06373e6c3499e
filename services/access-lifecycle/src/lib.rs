//! Access Lifecycle Service - 员工应用访问权限生命周期
//!
//! 接收授予/回收命令，调用外部 provisioning 系统，维护每个员工的权限表和事件历史，
//! 限时权限到期后自动回收。

pub mod api;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
