//! 权限生命周期
//!
//! ```text
//! GrantCommand ─┐
//!               ├─► SignalIngestor ─► EventQueue ─► LifecycleController ─► ProvisioningService
//! RevokeCommand ┘                        ▲                │
//!                                        │                ├─► PermissionLedger (表 + 历史)
//!                      ExpiryTimerManager ◄───────────────┘
//! ```
//!
//! 控制器是唯一的写入方，按队列顺序逐个处理事件；查询只读取账本快照。

pub mod controller;
pub mod handle;
pub mod ingestor;
pub mod queue;
pub mod timer;

pub use controller::LifecycleController;
pub use handle::{
    ActiveLifecycles, LifecycleDeps, LifecycleHandle, LifecycleSettings, LifecycleStatus,
};
pub use ingestor::SignalIngestor;
pub use queue::{EventReceiver, EventSender, QueueClosed, QueuedEvent, TimerId, event_queue};
pub use timer::ExpiryTimerManager;
