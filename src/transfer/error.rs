// ==========================================
// PV 配置快照管理 - 快照文件传输错误类型
// ==========================================

use thiserror::Error;

/// 快照文件导入/导出错误类型
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .csv）")]
    UnsupportedFormat(String),

    #[error("CSV 解析失败: {0}")]
    Csv(#[from] csv::Error),

    #[error("文件读写失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("数据行无效 (行 {row}): {message}")]
    InvalidRow { row: usize, message: String },
}

/// Result 类型别名
pub type TransferResult<T> = Result<T, TransferError>;
