// ==========================================
// PV 配置快照管理 - 配置服务接口
// ==========================================
// 职责: 定义远程配置服务的调用契约 (不包含实现)
// 实现者: SqliteConfigService, 测试中的内存实现
// ==========================================

use crate::domain::types::{Value, ValueType};
use crate::service::error::ServiceResult;
use serde::{Deserialize, Serialize};

// ==========================================
// 传输结构
// ==========================================

/// 单个 PV 条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PvItem {
    pub pv_name: String,
    pub pv_type: ValueType,
    pub value: Value,
}

impl PvItem {
    pub fn new(pv_name: impl Into<String>, value: Value) -> Self {
        let pv_type = value.value_type();
        Self {
            pv_name: pv_name.into(),
            pv_type,
            value,
        }
    }
}

/// 按ID读取的完整配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredConfiguration {
    pub id: String,
    pub name: String,
    pub config_type: String,
    pub items: Vec<PvItem>,
}

/// 配置列表摘要
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigurationSummary {
    pub id: String,
    pub name: String,
    pub config_type: String,
    pub created_at: String,
    pub updated_at: String,
}

/// 列表过滤条件 (均为可选)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigurationFilter {
    pub config_type: Option<String>,
    pub name_contains: Option<String>,
}

impl ConfigurationFilter {
    pub fn by_type(config_type: impl Into<String>) -> Self {
        Self {
            config_type: Some(config_type.into()),
            name_contains: None,
        }
    }
}

// ==========================================
// ConfigServiceClient Trait
// ==========================================
// 所有调用均为同步阻塞; 非 200 状态以 ConfigServiceError::Status 返回
pub trait ConfigServiceClient: Send + Sync {
    /// 按ID读取配置 (不存在时返回 404)
    fn get_pv_configuration_by_id(&self, id: &str) -> ServiceResult<StoredConfiguration>;

    /// 新建配置记录,返回新ID
    fn insert_pv_configuration(&self, name: &str, config_type: &str) -> ServiceResult<String>;

    /// 批量写入配置条目
    fn insert_pv_configuration_items(&self, id: &str, items: &[PvItem]) -> ServiceResult<()>;

    /// 修改配置名称
    fn update_pv_configuration(&self, id: &str, new_name: &str) -> ServiceResult<()>;

    /// 修改单个条目的值
    fn update_pv_configuration_item(
        &self,
        id: &str,
        pv_name: &str,
        value: &Value,
    ) -> ServiceResult<()>;

    /// 删除配置 (条目级联删除)
    fn delete_pv_configuration(&self, id: &str) -> ServiceResult<()>;

    /// 按条件列出配置
    fn get_pv_configurations(
        &self,
        filter: &ConfigurationFilter,
    ) -> ServiceResult<Vec<ConfigurationSummary>>;
}
