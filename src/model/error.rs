// ==========================================
// PV 配置快照管理 - 配置表错误类型
// ==========================================
// 职责: 定义模型层错误类型，服务层错误原样包装
// 说明: 所有错误向上传递，由界面层转换为提示框
// ==========================================

use crate::domain::types::{ConfigKey, ValueType};
use crate::service::error::ConfigServiceError;
use thiserror::Error;

/// 模型层错误类型
#[derive(Error, Debug)]
pub enum ModelError {
    // ===== 查找错误 =====
    #[error("配置未找到: id={0}")]
    NotFound(String),

    #[error("未知配置类型: {0}")]
    UnknownConfigType(String),

    #[error("配置类型不一致: 期望 {expected}, 实际 {actual}")]
    ConfigTypeMismatch { expected: String, actual: String },

    #[error("列越界: column={column}, 列数={count}")]
    ColumnOutOfRange { column: usize, count: usize },

    #[error("行越界: row={row}, 行数={count}")]
    RowOutOfRange { row: usize, count: usize },

    #[error("配置已关闭: key={0}")]
    ConfigurationNotOpen(ConfigKey),

    #[error("配置缺少 PV 取值: config={config}, pv={pv}")]
    MissingValue { config: String, pv: String },

    // ===== 校验错误 =====
    #[error("类型不匹配 (pv={pv}): 期望 {expected}, 实际 {actual}")]
    TypeMismatch {
        pv: String,
        expected: ValueType,
        actual: ValueType,
    },

    #[error("输入无法解析 (pv={pv}): {message}")]
    InvalidInput { pv: String, message: String },

    #[error("非数值 PV 无法插值: pv={pv}, type={value_type}")]
    NonNumericInterpolation { pv: String, value_type: ValueType },

    #[error("插值需要恰好选择两列，实际选择 {0} 列")]
    InvalidColumnSelection(usize),

    #[error("派生参数不足: {func} 需要 {expected} 个参数，实际 {actual} 个")]
    InvalidDeriveParameters {
        func: String,
        expected: usize,
        actual: usize,
    },

    // ===== 服务错误 =====
    #[error(transparent)]
    Service(#[from] ConfigServiceError),
}

/// Result 类型别名
pub type ModelResult<T> = Result<T, ModelError>;
