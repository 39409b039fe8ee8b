// ==========================================
// PV 配置快照管理 - 核心库
// ==========================================
// 职责: 多列 PV 配置表 (编辑/撤销/重做/派生/插值/保存)
//       以及配置快照的持久化、下发校验与文件传输
// 技术栈: Rust + SQLite + tokio
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 取值类型与配置快照
pub mod domain;

// 设备/PV 目录
pub mod catalog;

// 配置服务层 - 持久化契约与实现
pub mod service;

// 模型层 - 多列配置表
pub mod model;

// 下发与读取
pub mod apply;

// 快照文件导入/导出
pub mod transfer;

// 配置层 - 运行参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

pub use catalog::{PvCatalog, StaticPvCatalog};
pub use config::{ManagerSettings, SettingsManager};
pub use domain::{Action, ConfigKey, Configuration, DeriveFunc, PvDescriptor, Value, ValueType};
pub use model::{ConfigModel, ModelError, ModelEvent, ModelObserver, ModelResult};
pub use service::{ConfigServiceClient, ConfigServiceError, ServiceResult, SqliteConfigService};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "PV 配置快照管理";
