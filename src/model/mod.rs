// ==========================================
// PV 配置快照管理 - 配置表模型层
// ==========================================
// 职责: 多列配置表、撤销/重做历史、变更通知
// ==========================================

pub mod config_model;
pub mod error;
pub mod events;
pub mod history;

pub use config_model::{ConfigModel, DEFAULT_CONFIG_NAME};
pub use error::{ModelError, ModelResult};
pub use events::{ModelEvent, ModelObserver, NoOpObserver, ObserverSet};
pub use history::History;
