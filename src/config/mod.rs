// ==========================================
// PV 配置快照管理 - 设置层
// ==========================================
// 职责: 管理器运行参数 (撤销容量、显示精度、下发校验参数)
// 存储: config_kv 表
// ==========================================

pub mod config_manager;

pub use config_manager::{config_keys, defaults, ManagerSettings, SettingsManager};
