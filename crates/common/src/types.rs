//! 通用类型定义

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

use crate::utils::random_digits;

const SUBJECT_ID_MAX_LEN: usize = 128;

/// 主体 ID（一个员工对应一个权限生命周期）
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[display("{_0}")]
#[serde(transparent)]
pub struct SubjectId(pub String);

impl SubjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// 生成 `employee-` + 6 位数字的 ID
    pub fn generate() -> Self {
        Self(format!("employee-{}", random_digits(6)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 校验 ID 格式
    ///
    /// ID 会被用作文件名和 URL 路径段，只允许字母数字、`-`、`_`、`.`
    pub fn validate(&self) -> Result<(), String> {
        if self.0.is_empty() {
            return Err("Subject ID cannot be empty".to_string());
        }
        if self.0.len() > SUBJECT_ID_MAX_LEN {
            return Err(format!(
                "Subject ID cannot exceed {} characters",
                SUBJECT_ID_MAX_LEN
            ));
        }
        if self.0.starts_with('.') {
            return Err("Subject ID cannot start with '.'".to_string());
        }
        if !self
            .0
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        {
            return Err(
                "Subject ID can only contain alphanumeric, hyphen, underscore, and dot"
                    .to_string(),
            );
        }
        Ok(())
    }
}

impl From<&str> for SubjectId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
