// ==========================================
// PV 配置快照管理 - 领域模型层
// ==========================================
// 职责: 定义取值类型、配置快照实体、行顺序、撤销操作
// 红线: 不含表格逻辑,不依赖具体存储实现
// ==========================================

pub mod action;
pub mod configuration;
pub mod pv_descriptor;
pub mod types;

// 重导出核心类型
pub use action::Action;
pub use configuration::Configuration;
pub use pv_descriptor::{compare_pv_names, descriptors_from_map, sort_descriptors, MagnetClass, PvDescriptor};
pub use types::{ConfigKey, DeriveFunc, Value, ValueType};
