// ==========================================
// PV 配置快照管理 - 配置服务错误类型
// ==========================================
// 约定: 状态码 200 为唯一成功标志,其余均视为失败
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 唯一成功状态码
pub const SUCCESS_STATUS: u16 = 200;

/// 记录不存在
pub const NOT_FOUND_STATUS: u16 = 404;

/// 名称冲突 (同类型下重名)
pub const CONFLICT_STATUS: u16 = 409;

/// 服务内部错误
pub const INTERNAL_ERROR_STATUS: u16 = 500;

/// 配置服务错误类型
#[derive(Error, Debug)]
pub enum ConfigServiceError {
    #[error("配置服务返回失败状态: operation={operation}, code={code}, message={message}")]
    Status {
        code: u16,
        operation: String,
        message: String,
    },

    #[error("配置服务数据序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("配置服务锁获取失败: {0}")]
    LockError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ConfigServiceError {
    pub fn status(code: u16, operation: &str, message: impl Into<String>) -> Self {
        ConfigServiceError::Status {
            code,
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    /// 状态码 (非状态类错误返回 None)
    pub fn code(&self) -> Option<u16> {
        match self {
            ConfigServiceError::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.code() == Some(NOT_FOUND_STATUS)
    }
}

// SQLite 错误映射为服务状态码
impl From<rusqlite::Error> for ConfigServiceError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::QueryReturnedNoRows => {
                ConfigServiceError::status(NOT_FOUND_STATUS, "query", "记录未找到")
            }
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("UNIQUE") => {
                ConfigServiceError::status(CONFLICT_STATUS, "write", msg)
            }
            other => ConfigServiceError::status(INTERNAL_ERROR_STATUS, "sqlite", other.to_string()),
        }
    }
}

/// 将原始状态码转换为结果
///
/// # 参数
/// - code: 服务返回的状态码
/// - operation: 调用名称 (写入错误信息)
pub fn check_status(code: u16, operation: &str) -> ServiceResult<()> {
    if code == SUCCESS_STATUS {
        Ok(())
    } else {
        Err(ConfigServiceError::status(
            code,
            operation,
            format!("状态码 {}", code),
        ))
    }
}

/// Result 类型别名
pub type ServiceResult<T> = Result<T, ConfigServiceError>;
