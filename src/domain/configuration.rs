// ==========================================
// PV 配置快照管理 - 配置快照实体
// ==========================================
// 职责: 一份命名、定型的 PV 取值快照,及其脏标记与持久化
// 状态: NEW -> (保存) -> 已持久化/干净 <-> 已持久化/脏
//       改名标记与脏标记正交,仅在保存成功后清除
// ==========================================

use crate::domain::types::{ConfigKey, Value};
use crate::service::client::{ConfigServiceClient, PvItem, StoredConfiguration};
use crate::service::error::{ConfigServiceError, ServiceResult};
use std::collections::BTreeMap;

// ==========================================
// Configuration - 配置快照
// ==========================================
#[derive(Debug)]
pub struct Configuration {
    key: ConfigKey,                           // 会话内身份 (不随改名变化)
    id: Option<String>,                       // 持久化ID (保存前为空)
    name: String,                             // 显示名称
    config_type: String,                      // 配置类型 (创建后不可变)
    values: BTreeMap<String, Value>,          // PV名 -> 当前值
    is_new: bool,                             // 首次保存成功前为 true
    renamed: bool,                            // 已持久化后是否改过名
    old_name: Option<String>,                 // 首次改名前的名称
    dirty_pvs: BTreeMap<String, Option<Value>>, // PV名 -> 编辑前的值 (None 表示服务端无此条目)
}

impl Configuration {
    /// 新建配置 (尚未持久化)
    pub fn new(
        name: impl Into<String>,
        config_type: impl Into<String>,
        values: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            key: ConfigKey::new(),
            id: None,
            name: name.into(),
            config_type: config_type.into(),
            values,
            is_new: true,
            renamed: false,
            old_name: None,
            dirty_pvs: BTreeMap::new(),
        }
    }

    /// 由服务端记录构造 (已持久化、干净)
    pub fn from_stored(stored: StoredConfiguration) -> Self {
        let values = stored
            .items
            .into_iter()
            .map(|item| (item.pv_name, item.value))
            .collect();

        Self {
            key: ConfigKey::new(),
            id: Some(stored.id),
            name: stored.name,
            config_type: stored.config_type,
            values,
            is_new: false,
            renamed: false,
            old_name: None,
            dirty_pvs: BTreeMap::new(),
        }
    }

    /// 按ID从配置服务加载
    ///
    /// # 返回
    /// - Ok(Some(Configuration)): 加载成功
    /// - Ok(None): 服务端不存在该ID
    /// - Err: 其他服务错误
    pub fn load(client: &dyn ConfigServiceClient, id: &str) -> ServiceResult<Option<Self>> {
        match client.get_pv_configuration_by_id(id) {
            Ok(stored) => {
                tracing::info!(config_id = %id, name = %stored.name, "加载配置");
                Ok(Some(Self::from_stored(stored)))
            }
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// 删除服务端配置
    pub fn delete(client: &dyn ConfigServiceClient, id: &str) -> ServiceResult<()> {
        client.delete_pv_configuration(id)
    }

    // ===== 只读访问 =====

    pub fn key(&self) -> ConfigKey {
        self.key
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config_type(&self) -> &str {
        &self.config_type
    }

    pub fn value(&self, pv_name: &str) -> Option<&Value> {
        self.values.get(pv_name)
    }

    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn is_renamed(&self) -> bool {
        self.renamed
    }

    pub fn old_name(&self) -> Option<&str> {
        self.old_name.as_deref()
    }

    pub fn dirty_pvs(&self) -> &BTreeMap<String, Option<Value>> {
        &self.dirty_pvs
    }

    /// 是否有待保存内容
    pub fn is_dirty(&self) -> bool {
        self.is_new || self.renamed || !self.dirty_pvs.is_empty()
    }

    /// 当前名称或首次改名前的名称是否匹配
    pub fn matches_name(&self, name: &str) -> bool {
        self.name == name || self.old_name.as_deref() == Some(name)
    }

    /// 全部条目 (按 PV 名排序)
    pub fn items(&self) -> Vec<PvItem> {
        self.values
            .iter()
            .map(|(pv_name, value)| PvItem::new(pv_name.clone(), value.clone()))
            .collect()
    }

    // ===== 修改 =====

    /// 修改名称
    ///
    /// 已持久化的配置首次改名时记录原名并打上改名标记,
    /// 保存前的后续改名不再覆盖原名
    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        if name == self.name {
            return;
        }
        if !self.is_new && !self.renamed {
            self.old_name = Some(self.name.clone());
            self.renamed = true;
        }
        self.name = name;
    }

    /// 修改 PV 值
    ///
    /// - 值未变化: 不做任何事
    /// - 新配置: 不做脏标记
    /// - 已脏且改回原值: 清除脏标记
    /// - 首次修改: 记录修改前的值
    pub fn set_value(&mut self, pv_name: &str, value: Value) {
        let current = self.values.get(pv_name);
        if current == Some(&value) {
            return;
        }

        if !self.is_new {
            match self.dirty_pvs.get(pv_name) {
                Some(original) => {
                    if original.as_ref() == Some(&value) {
                        self.dirty_pvs.remove(pv_name);
                    }
                }
                None => {
                    self.dirty_pvs.insert(pv_name.to_string(), current.cloned());
                }
            }
        }

        self.values.insert(pv_name.to_string(), value);
    }

    /// 恢复 PV 值 (撤销/重做)
    ///
    /// - Some: 同 set_value
    /// - None: 恢复为缺失; 若该 PV 编辑前即缺失,清除其脏标记
    pub fn restore_value(&mut self, pv_name: &str, value: Option<Value>) {
        match value {
            Some(value) => self.set_value(pv_name, value),
            None => self.remove_value(pv_name),
        }
    }

    fn remove_value(&mut self, pv_name: &str) {
        let Some(current) = self.values.remove(pv_name) else {
            return;
        };
        if self.is_new {
            return;
        }
        match self.dirty_pvs.get(pv_name) {
            Some(None) => {
                self.dirty_pvs.remove(pv_name);
            }
            Some(Some(_)) => {}
            None => {
                self.dirty_pvs.insert(pv_name.to_string(), Some(current));
            }
        }
    }

    /// 保存到配置服务
    ///
    /// # 说明
    /// - 新配置: 先写配置记录,再批量写条目; 任一失败则本地状态不变
    /// - 已持久化: 先处理改名,再逐条更新脏 PV; 每条成功即清除其脏标记,
    ///   失败时中止,剩余脏标记保留供重试 (不回滚)
    pub fn save(&mut self, client: &dyn ConfigServiceClient) -> ServiceResult<()> {
        if self.is_new {
            let id = client.insert_pv_configuration(&self.name, &self.config_type)?;
            if let Err(e) = client.insert_pv_configuration_items(&id, &self.items()) {
                // 回收刚创建的记录
                match client.delete_pv_configuration(&id) {
                    Ok(()) => tracing::warn!(
                        config_id = %id,
                        name = %self.name,
                        error = %e,
                        "配置条目写入失败,已删除新建的配置记录"
                    ),
                    Err(cleanup) => tracing::error!(
                        config_id = %id,
                        name = %self.name,
                        error = %e,
                        cleanup_error = %cleanup,
                        "配置条目写入失败,且新建的配置记录未能删除"
                    ),
                }
                return Err(e);
            }

            tracing::info!(config_id = %id, name = %self.name, "新配置保存成功");
            self.id = Some(id);
            self.is_new = false;
            self.renamed = false;
            self.old_name = None;
            self.dirty_pvs.clear();
            return Ok(());
        }

        let id = self.id.clone().ok_or_else(|| {
            ConfigServiceError::Other(anyhow::anyhow!(
                "已持久化的配置缺少ID: name={}",
                self.name
            ))
        })?;

        if self.renamed {
            client.update_pv_configuration(&id, &self.name)?;
            self.renamed = false;
            self.old_name = None;
        }

        let pending: Vec<(String, bool)> = self
            .dirty_pvs
            .iter()
            .map(|(pv_name, original)| (pv_name.clone(), original.is_some()))
            .collect();

        for (pv_name, existed) in pending {
            match self.values.get(&pv_name) {
                Some(value) if existed => {
                    client.update_pv_configuration_item(&id, &pv_name, value)?;
                }
                Some(value) => {
                    client.insert_pv_configuration_items(
                        &id,
                        &[PvItem::new(pv_name.clone(), value.clone())],
                    )?;
                }
                None => {}
            }
            self.dirty_pvs.remove(&pv_name);
        }

        tracing::info!(config_id = %id, name = %self.name, "配置保存成功");
        Ok(())
    }
}
