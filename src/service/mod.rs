// ==========================================
// PV 配置快照管理 - 配置服务层
// ==========================================
// 职责: 配置快照的持久化契约与实现
// 红线: 服务层不含表格/撤销逻辑
// ==========================================

pub mod client;
pub mod error;
pub mod sqlite_service;

pub use client::{
    ConfigServiceClient, ConfigurationFilter, ConfigurationSummary, PvItem, StoredConfiguration,
};
pub use error::{check_status, ConfigServiceError, ServiceResult, SUCCESS_STATUS};
pub use sqlite_service::SqliteConfigService;
