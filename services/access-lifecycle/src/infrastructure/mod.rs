//! 基础设施层
//!
//! 事件日志存储和 provisioning 外部系统的实现

pub mod journal;
pub mod provisioning;
