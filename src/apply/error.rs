// ==========================================
// PV 配置快照管理 - 下发/读取错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 单个 PV 读写错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PvError {
    #[error("PV 未连接: {0}")]
    Disconnected(String),

    #[error("PV 访问超时: pv={pv}, timeout={timeout_ms}ms")]
    Timeout { pv: String, timeout_ms: u64 },

    #[error("PV 拒绝写入: pv={pv}, 原因={reason}")]
    Rejected { pv: String, reason: String },
}

impl PvError {
    /// 出错的 PV 名
    pub fn pv(&self) -> &str {
        match self {
            PvError::Disconnected(pv) => pv,
            PvError::Timeout { pv, .. } => pv,
            PvError::Rejected { pv, .. } => pv,
        }
    }
}

/// 下发流程错误类型
#[derive(Error, Debug)]
pub enum ApplyError {
    #[error(transparent)]
    Pv(#[from] PvError),

    #[error("下发任务异常退出: {0}")]
    WorkerFailed(String),

    #[error("读取配置失败: {failed} 个 PV 读取出错 (首个: {first})")]
    ReadFailed { failed: usize, first: PvError },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result 类型别名
pub type ApplyResult<T> = Result<T, ApplyError>;
