//! JSONL 文件事件日志
//!
//! 每个主体一个 `{subject}.jsonl` 文件，每行一个条目。
//! 崩溃可能留下写了一半的末行，读取时跳过；中间行损坏视为存储错误。

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use permit_common::SubjectId;
use permit_errors::{AppError, AppResult};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

use crate::domain::{EventJournal, JournalEntry};

const EXTENSION: &str = "jsonl";

#[derive(Debug)]
pub struct JsonlEventJournal {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlEventJournal {
    /// 打开日志目录，不存在时创建
    pub async fn open(dir: impl AsRef<Path>) -> AppResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await.map_err(|e| {
            AppError::storage(format!(
                "Failed to create journal directory {}: {e}",
                dir.display()
            ))
        })?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    fn path_for(&self, subject: &SubjectId) -> PathBuf {
        self.dir.join(format!("{subject}.{EXTENSION}"))
    }
}

#[async_trait]
impl EventJournal for JsonlEventJournal {
    async fn append(&self, subject: &SubjectId, entry: &JournalEntry) -> AppResult<()> {
        let mut line = serde_json::to_string(entry)
            .map_err(|e| AppError::storage(format!("Failed to encode journal entry: {e}")))?;
        line.push('\n');

        let path = self.path_for(subject);
        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| AppError::storage(format!("Failed to open {}: {e}", path.display())))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| AppError::storage(format!("Failed to write {}: {e}", path.display())))?;
        file.sync_data()
            .await
            .map_err(|e| AppError::storage(format!("Failed to sync {}: {e}", path.display())))?;
        Ok(())
    }

    async fn load(&self, subject: &SubjectId) -> AppResult<Vec<JournalEntry>> {
        let path = self.path_for(subject);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(AppError::storage(format!(
                    "Failed to read {}: {e}",
                    path.display()
                )));
            }
        };

        let lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
        let mut entries = Vec::with_capacity(lines.len());
        for (index, line) in lines.iter().enumerate() {
            match serde_json::from_str::<JournalEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) if index + 1 == lines.len() => {
                    warn!(
                        subject_id = %subject,
                        error = %e,
                        "Skipping truncated trailing journal line"
                    );
                }
                Err(e) => {
                    return Err(AppError::storage(format!(
                        "Corrupt journal {} at line {}: {e}",
                        path.display(),
                        index + 1
                    )));
                }
            }
        }
        Ok(entries)
    }

    async fn subjects(&self) -> AppResult<Vec<SubjectId>> {
        let mut dir = fs::read_dir(&self.dir).await.map_err(|e| {
            AppError::storage(format!("Failed to list {}: {e}", self.dir.display()))
        })?;

        let mut subjects = Vec::new();
        while let Some(item) = dir
            .next_entry()
            .await
            .map_err(|e| AppError::storage(format!("Failed to list {}: {e}", self.dir.display())))?
        {
            let path = item.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                let subject = SubjectId::from(stem);
                if subject.validate().is_ok() {
                    subjects.push(subject);
                }
            }
        }
        subjects.sort();
        Ok(subjects)
    }
}
