//! 事件日志实现

mod jsonl;
mod memory;

use std::sync::Arc;

use permit_config::JournalConfig;
use permit_errors::AppResult;
use tracing::{info, warn};

pub use jsonl::JsonlEventJournal;
pub use memory::InMemoryEventJournal;

use crate::domain::EventJournal;

/// 根据配置创建日志存储，未配置目录时使用内存存储
pub async fn build_journal(config: &JournalConfig) -> AppResult<Arc<dyn EventJournal>> {
    match &config.dir {
        Some(dir) => {
            info!(dir = %dir, "Using JSONL event journal");
            Ok(Arc::new(JsonlEventJournal::open(dir).await?))
        }
        None => {
            warn!("No journal directory configured, lifecycles will not survive a restart");
            Ok(Arc::new(InMemoryEventJournal::new()))
        }
    }
}
