// ==========================================
// 内存配置服务 - 用于集成测试
// ==========================================
// 支持故障注入: 指定调用在第 N 次 (从 0 计) 起返回给定状态码
// 与 SQLite 实现一致: 同一类型下配置名唯一,重名返回 409
// ==========================================

use pv_config_manager::domain::types::Value;
use pv_config_manager::service::client::{
    ConfigServiceClient, ConfigurationFilter, ConfigurationSummary, PvItem, StoredConfiguration,
};
use pv_config_manager::service::error::{
    check_status, ConfigServiceError, ServiceResult, CONFLICT_STATUS, NOT_FOUND_STATUS,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

#[derive(Debug, Clone)]
struct Record {
    name: String,
    config_type: String,
    items: BTreeMap<String, PvItem>,
}

#[derive(Debug, Clone, Copy)]
struct Failure {
    after: usize,
    code: u16,
}

#[derive(Default)]
struct State {
    records: BTreeMap<String, Record>,
    next_id: usize,
    calls: Vec<String>,
    call_counts: HashMap<String, usize>,
    failures: HashMap<String, Failure>,
}

/// 内存配置服务
#[derive(Default)]
pub struct MockConfigService {
    state: Mutex<State>,
}

impl MockConfigService {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定操作在成功 `after` 次之后开始返回 `code`
    pub fn fail_after(&self, operation: &str, after: usize, code: u16) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(operation.to_string(), Failure { after, code });
    }

    /// 指定操作立即开始失败
    pub fn fail(&self, operation: &str, code: u16) {
        self.fail_after(operation, 0, code);
    }

    /// 取消故障注入
    pub fn heal(&self) {
        self.state.lock().unwrap().failures.clear();
    }

    /// 全部调用记录 (按顺序)
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .call_counts
            .get(operation)
            .copied()
            .unwrap_or(0)
    }

    pub fn record_count(&self) -> usize {
        self.state.lock().unwrap().records.len()
    }

    /// 直接读取存储的值
    pub fn stored_value(&self, id: &str, pv_name: &str) -> Option<Value> {
        self.state
            .lock()
            .unwrap()
            .records
            .get(id)
            .and_then(|r| r.items.get(pv_name))
            .map(|item| item.value.clone())
    }

    pub fn stored_name(&self, id: &str) -> Option<String> {
        self.state.lock().unwrap().records.get(id).map(|r| r.name.clone())
    }

    /// 预置一份配置,返回ID
    pub fn seed(&self, name: &str, config_type: &str, items: &[(&str, Value)]) -> String {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("cfg-{:04}", state.next_id);
        let items = items
            .iter()
            .map(|(pv, v)| (pv.to_string(), PvItem::new(*pv, v.clone())))
            .collect();
        state.records.insert(
            id.clone(),
            Record {
                name: name.to_string(),
                config_type: config_type.to_string(),
                items,
            },
        );
        id
    }

    fn enter(&self, operation: &str) -> ServiceResult<std::sync::MutexGuard<'_, State>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(operation.to_string());
        let count = {
            let entry = state.call_counts.entry(operation.to_string()).or_insert(0);
            *entry += 1;
            *entry - 1
        };
        if let Some(failure) = state.failures.get(operation).copied() {
            if count >= failure.after {
                check_status(failure.code, operation)?;
            }
        }
        Ok(state)
    }

    fn check_unique(
        state: &State,
        operation: &str,
        config_type: &str,
        name: &str,
        except_id: Option<&str>,
    ) -> ServiceResult<()> {
        let taken = state.records.iter().any(|(id, r)| {
            Some(id.as_str()) != except_id && r.config_type == config_type && r.name == name
        });
        if taken {
            return Err(ConfigServiceError::status(
                CONFLICT_STATUS,
                operation,
                format!("duplicate name: config_type={}, name={}", config_type, name),
            ));
        }
        Ok(())
    }

    fn not_found(operation: &str, id: &str) -> ConfigServiceError {
        ConfigServiceError::status(NOT_FOUND_STATUS, operation, format!("id={}", id))
    }
}

impl ConfigServiceClient for MockConfigService {
    fn get_pv_configuration_by_id(&self, id: &str) -> ServiceResult<StoredConfiguration> {
        let state = self.enter("get_pv_configuration_by_id")?;
        let record = state
            .records
            .get(id)
            .ok_or_else(|| Self::not_found("get_pv_configuration_by_id", id))?;
        Ok(StoredConfiguration {
            id: id.to_string(),
            name: record.name.clone(),
            config_type: record.config_type.clone(),
            items: record.items.values().cloned().collect(),
        })
    }

    fn insert_pv_configuration(&self, name: &str, config_type: &str) -> ServiceResult<String> {
        let mut state = self.enter("insert_pv_configuration")?;
        Self::check_unique(&state, "insert_pv_configuration", config_type, name, None)?;
        state.next_id += 1;
        let id = format!("cfg-{:04}", state.next_id);
        state.records.insert(
            id.clone(),
            Record {
                name: name.to_string(),
                config_type: config_type.to_string(),
                items: BTreeMap::new(),
            },
        );
        Ok(id)
    }

    fn insert_pv_configuration_items(&self, id: &str, items: &[PvItem]) -> ServiceResult<()> {
        let mut state = self.enter("insert_pv_configuration_items")?;
        let record = state
            .records
            .get_mut(id)
            .ok_or_else(|| Self::not_found("insert_pv_configuration_items", id))?;
        for item in items {
            record.items.insert(item.pv_name.clone(), item.clone());
        }
        Ok(())
    }

    fn update_pv_configuration(&self, id: &str, new_name: &str) -> ServiceResult<()> {
        let mut state = self.enter("update_pv_configuration")?;
        let config_type = state
            .records
            .get(id)
            .map(|r| r.config_type.clone())
            .ok_or_else(|| Self::not_found("update_pv_configuration", id))?;
        Self::check_unique(&state, "update_pv_configuration", &config_type, new_name, Some(id))?;
        let record = state
            .records
            .get_mut(id)
            .ok_or_else(|| Self::not_found("update_pv_configuration", id))?;
        record.name = new_name.to_string();
        Ok(())
    }

    fn update_pv_configuration_item(
        &self,
        id: &str,
        pv_name: &str,
        value: &Value,
    ) -> ServiceResult<()> {
        let mut state = self.enter("update_pv_configuration_item")?;
        let item = state
            .records
            .get_mut(id)
            .and_then(|r| r.items.get_mut(pv_name))
            .ok_or_else(|| Self::not_found("update_pv_configuration_item", id))?;
        *item = PvItem::new(pv_name, value.clone());
        Ok(())
    }

    fn delete_pv_configuration(&self, id: &str) -> ServiceResult<()> {
        let mut state = self.enter("delete_pv_configuration")?;
        state
            .records
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Self::not_found("delete_pv_configuration", id))
    }

    fn get_pv_configurations(
        &self,
        filter: &ConfigurationFilter,
    ) -> ServiceResult<Vec<ConfigurationSummary>> {
        let state = self.enter("get_pv_configurations")?;
        Ok(state
            .records
            .iter()
            .filter(|(_, r)| {
                filter
                    .config_type
                    .as_deref()
                    .map_or(true, |t| r.config_type == t)
                    && filter
                        .name_contains
                        .as_deref()
                        .map_or(true, |n| r.name.contains(n))
            })
            .map(|(id, r)| ConfigurationSummary {
                id: id.clone(),
                name: r.name.clone(),
                config_type: r.config_type.clone(),
                created_at: String::new(),
                updated_at: String::new(),
            })
            .collect())
    }
}
