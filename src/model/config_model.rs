// ==========================================
// PV 配置快照管理 - 多列配置表
// ==========================================
// 职责: 维护打开的配置列、单元格编辑与撤销/重做、派生配置
// 行: 按磁铁族排序的 PV 列表 (构造时从目录生成一次)
// 列: 打开的配置快照 (插入顺序即列顺序)
// 红线: 撤销/重做与列查找均按 ConfigKey 定位,不按显示名称
// ==========================================

use crate::catalog::PvCatalog;
use crate::config::ManagerSettings;
use crate::domain::action::Action;
use crate::domain::configuration::Configuration;
use crate::domain::pv_descriptor::{descriptors_from_map, PvDescriptor};
use crate::domain::types::{ConfigKey, DeriveFunc, Value};
use crate::model::error::{ModelError, ModelResult};
use crate::model::events::{ModelEvent, ModelObserver, ObserverSet};
use crate::model::history::History;
use crate::service::client::{ConfigServiceClient, ConfigurationFilter, ConfigurationSummary};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// 新建配置的默认名称
pub const DEFAULT_CONFIG_NAME: &str = "new_configuration";

// ==========================================
// ConfigModel - 配置表
// ==========================================
pub struct ConfigModel {
    config_type: String,
    vertical_header: Vec<PvDescriptor>,
    row_index: HashMap<String, usize>,
    configurations: Vec<Configuration>,
    history: History,
    client: Arc<dyn ConfigServiceClient>,
    observers: ObserverSet,
    float_precision: usize,
}

impl ConfigModel {
    /// 创建配置表
    ///
    /// # 参数
    /// - config_type: 配置类型 (决定行列表)
    /// - catalog: 设备/PV 目录
    /// - client: 配置服务
    /// - settings: 运行参数 (撤销容量、显示精度)
    pub fn new(
        config_type: &str,
        catalog: &dyn PvCatalog,
        client: Arc<dyn ConfigServiceClient>,
        settings: &ManagerSettings,
    ) -> ModelResult<Self> {
        let pvs = catalog
            .pvs(config_type)
            .ok_or_else(|| ModelError::UnknownConfigType(config_type.to_string()))?;

        let vertical_header = descriptors_from_map(&pvs);
        let row_index = vertical_header
            .iter()
            .enumerate()
            .map(|(row, d)| (d.name.clone(), row))
            .collect();

        tracing::debug!(
            config_type,
            rows = vertical_header.len(),
            undo_capacity = settings.undo_capacity,
            "创建配置表"
        );

        Ok(Self {
            config_type: config_type.to_string(),
            vertical_header,
            row_index,
            configurations: Vec::new(),
            history: History::new(settings.undo_capacity),
            client,
            observers: ObserverSet::new(),
            float_precision: settings.float_precision,
        })
    }

    /// 注册观察者
    pub fn subscribe(&mut self, observer: Arc<dyn ModelObserver>) {
        self.observers.subscribe(observer);
    }

    // ==========================================
    // 表格读取
    // ==========================================

    pub fn config_type(&self) -> &str {
        &self.config_type
    }

    pub fn vertical_header(&self) -> &[PvDescriptor] {
        &self.vertical_header
    }

    pub fn row_count(&self) -> usize {
        self.vertical_header.len()
    }

    pub fn column_count(&self) -> usize {
        self.configurations.len()
    }

    pub fn configurations(&self) -> &[Configuration] {
        &self.configurations
    }

    pub fn configuration(&self, column: usize) -> ModelResult<&Configuration> {
        self.check_column(column)?;
        Ok(&self.configurations[column])
    }

    /// PV 所在行
    pub fn row_of(&self, pv_name: &str) -> Option<usize> {
        self.row_index.get(pv_name).copied()
    }

    /// 单元格原始值
    pub fn value(&self, row: usize, column: usize) -> ModelResult<&Value> {
        let descriptor = self.descriptor(row)?;
        let config = self.configuration(column)?;
        config
            .value(&descriptor.name)
            .ok_or_else(|| ModelError::MissingValue {
                config: config.name().to_string(),
                pv: descriptor.name.clone(),
            })
    }

    /// 单元格显示文本 (浮点按固定精度)
    pub fn data(&self, row: usize, column: usize) -> ModelResult<String> {
        Ok(self.value(row, column)?.format(self.float_precision))
    }

    /// 列标题: 配置名称,有待保存内容时追加 "*"
    pub fn header_data(&self, column: usize) -> ModelResult<String> {
        let config = self.configuration(column)?;
        if config.is_dirty() {
            Ok(format!("{}*", config.name()))
        } else {
            Ok(config.name().to_string())
        }
    }

    /// 行标题: PV 名
    pub fn vertical_header_data(&self, row: usize) -> ModelResult<&str> {
        Ok(self.descriptor(row)?.name.as_str())
    }

    // ==========================================
    // 单元格编辑与撤销/重做
    // ==========================================

    /// 修改单元格
    ///
    /// 每次调用恰好压入一条撤销记录 (超出容量时淘汰最早的)
    pub fn set_data(&mut self, row: usize, column: usize, value: Value) -> ModelResult<()> {
        let descriptor = self.descriptor(row)?.clone();
        self.check_column(column)?;

        if value.value_type() != descriptor.value_type {
            return Err(ModelError::TypeMismatch {
                pv: descriptor.name,
                expected: descriptor.value_type,
                actual: value.value_type(),
            });
        }

        let config = &mut self.configurations[column];
        // 缺失的条目以 None 记录,撤销时恢复为缺失
        let old = config.value(&descriptor.name).cloned();

        self.history.push_undo(Action::SetValue {
            config_key: config.key(),
            pv_name: descriptor.name.clone(),
            old,
            new: Some(value.clone()),
        });
        config.set_value(&descriptor.name, value);

        tracing::debug!(
            config = %config.name(),
            pv = %descriptor.name,
            undo_len = self.history.undo_len(),
            "修改单元格"
        );

        self.observers.publish(ModelEvent::DataChanged { row, column });
        self.observers.publish(ModelEvent::HeaderChanged { column });
        Ok(())
    }

    /// 以文本修改单元格 (按行声明类型解析)
    pub fn set_data_from_text(&mut self, row: usize, column: usize, text: &str) -> ModelResult<()> {
        let descriptor = self.descriptor(row)?;
        let value = descriptor
            .value_type
            .parse(text)
            .map_err(|message| ModelError::InvalidInput {
                pv: descriptor.name.clone(),
                message,
            })?;
        self.set_data(row, column, value)
    }

    /// 撤销最近一次修改
    ///
    /// # 返回
    /// - Ok(true): 已撤销,逆操作压入重做栈
    /// - Ok(false): 撤销栈为空
    pub fn undo(&mut self) -> ModelResult<bool> {
        let Some(action) = self.history.pop_undo() else {
            return Ok(false);
        };
        self.replay(&action)?;
        self.history.push_redo(action.inverse());
        tracing::debug!(undo_len = self.history.undo_len(), redo_len = self.history.redo_len(), "撤销");
        Ok(true)
    }

    /// 重做最近一次撤销
    pub fn redo(&mut self) -> ModelResult<bool> {
        let Some(action) = self.history.pop_redo() else {
            return Ok(false);
        };
        self.replay(&action)?;
        self.history.push_undo(action.inverse());
        tracing::debug!(undo_len = self.history.undo_len(), redo_len = self.history.redo_len(), "重做");
        Ok(true)
    }

    pub fn undo_len(&self) -> usize {
        self.history.undo_len()
    }

    pub fn redo_len(&self) -> usize {
        self.history.redo_len()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// 将记录中的旧值写回 (按身份定位列)
    fn replay(&mut self, action: &Action) -> ModelResult<()> {
        match action {
            Action::SetValue {
                config_key,
                pv_name,
                old,
                ..
            } => {
                let column = self
                    .configuration_column(*config_key)
                    .ok_or(ModelError::ConfigurationNotOpen(*config_key))?;
                self.configurations[column].restore_value(pv_name, old.clone());

                if let Some(row) = self.row_of(pv_name) {
                    self.observers.publish(ModelEvent::DataChanged { row, column });
                }
                self.observers.publish(ModelEvent::HeaderChanged { column });
                Ok(())
            }
        }
    }

    // ==========================================
    // 列管理
    // ==========================================

    /// 添加配置列
    ///
    /// # 参数
    /// - column: 插入位置 (超出列数时追加到末尾)
    /// - id: 给定时按ID从服务加载
    /// - config_name: 新建配置的名称 (缺省为 "new_configuration")
    /// - values: 新建配置的取值 (缺失的 PV 以类型默认值补齐)
    ///
    /// # 返回
    /// 实际插入的列号
    pub fn add_configuration(
        &mut self,
        column: usize,
        id: Option<&str>,
        config_name: Option<&str>,
        values: Option<BTreeMap<String, Value>>,
    ) -> ModelResult<usize> {
        match id {
            Some(id) => self.load_configuration(column, id),
            None => self.new_configuration(
                column,
                config_name.unwrap_or(DEFAULT_CONFIG_NAME),
                values.unwrap_or_default(),
            ),
        }
    }

    /// 按ID加载配置并插入
    pub fn load_configuration(&mut self, column: usize, id: &str) -> ModelResult<usize> {
        let config = Configuration::load(self.client.as_ref(), id)?
            .ok_or_else(|| ModelError::NotFound(id.to_string()))?;

        if config.config_type() != self.config_type {
            return Err(ModelError::ConfigTypeMismatch {
                expected: self.config_type.clone(),
                actual: config.config_type().to_string(),
            });
        }

        Ok(self.insert_configuration(column, config))
    }

    /// 新建配置并插入
    pub fn new_configuration(
        &mut self,
        column: usize,
        name: &str,
        mut values: BTreeMap<String, Value>,
    ) -> ModelResult<usize> {
        for descriptor in &self.vertical_header {
            values
                .entry(descriptor.name.clone())
                .or_insert_with(|| descriptor.value_type.default_value());
        }
        let config = Configuration::new(name, self.config_type.clone(), values);
        Ok(self.insert_configuration(column, config))
    }

    fn insert_configuration(&mut self, column: usize, config: Configuration) -> usize {
        let column = column.min(self.configurations.len());
        tracing::info!(column, name = %config.name(), is_new = config.is_new(), "插入配置列");
        self.configurations.insert(column, config);
        self.observers.publish(ModelEvent::ColumnInserted { column });
        column
    }

    /// 按名称查找列 (当前名称或首次改名前的名称)
    pub fn get_configuration_column(&self, name: &str) -> Option<usize> {
        self.configurations.iter().position(|c| c.matches_name(name))
    }

    /// 按身份查找列
    pub fn configuration_column(&self, key: ConfigKey) -> Option<usize> {
        self.configurations.iter().position(|c| c.key() == key)
    }

    /// 修改列名称
    pub fn rename_configuration(&mut self, column: usize, name: &str) -> ModelResult<()> {
        self.check_column(column)?;
        self.configurations[column].set_name(name);
        self.observers.publish(ModelEvent::HeaderChanged { column });
        Ok(())
    }

    /// 基于某列派生新配置,插入到该列右侧
    ///
    /// # 说明
    /// - TUNE: 名称含 "-QD" 的 PV 加 params[0]; 否则名称含 "QF" 的 PV 加 params[1]
    /// - CHROMATICITY: 偏移尚未定义,原样复制
    pub fn derive_configuration(
        &mut self,
        new_name: &str,
        base_column: usize,
        func: DeriveFunc,
        params: &[f64],
    ) -> ModelResult<usize> {
        self.check_column(base_column)?;
        if func == DeriveFunc::Tune && params.len() < 2 {
            return Err(ModelError::InvalidDeriveParameters {
                func: func.to_string(),
                expected: 2,
                actual: params.len(),
            });
        }

        let base = &self.configurations[base_column];
        let values: BTreeMap<String, Value> = match func {
            DeriveFunc::Tune => base
                .values()
                .iter()
                .map(|(pv, value)| {
                    let derived = if pv.contains("-QD") {
                        value.offset(params[0])
                    } else if pv.contains("QF") {
                        value.offset(params[1])
                    } else {
                        value.clone()
                    };
                    (pv.clone(), derived)
                })
                .collect(),
            DeriveFunc::Chromaticity => {
                tracing::warn!(base = %base.name(), "色品派生未定义偏移，按原值复制");
                base.values().clone()
            }
        };

        let config = Configuration::new(new_name, self.config_type.clone(), values);
        Ok(self.insert_configuration(base_column + 1, config))
    }

    /// 两列取算术平均生成新配置,插入到两列中靠右者的右侧
    ///
    /// 任一行声明类型非数值时,在修改任何状态之前报错
    pub fn interpolate_configuration(
        &mut self,
        new_name: &str,
        column1: usize,
        column2: usize,
    ) -> ModelResult<usize> {
        self.check_column(column1)?;
        self.check_column(column2)?;

        if let Some(d) = self
            .vertical_header
            .iter()
            .find(|d| !d.value_type.is_numeric())
        {
            return Err(ModelError::NonNumericInterpolation {
                pv: d.name.clone(),
                value_type: d.value_type,
            });
        }

        let first = &self.configurations[column1];
        let second = &self.configurations[column2];
        let mut values = BTreeMap::new();
        for descriptor in &self.vertical_header {
            let pv = &descriptor.name;
            let a = first.value(pv).ok_or_else(|| ModelError::MissingValue {
                config: first.name().to_string(),
                pv: pv.clone(),
            })?;
            let b = second.value(pv).ok_or_else(|| ModelError::MissingValue {
                config: second.name().to_string(),
                pv: pv.clone(),
            })?;
            let mean = Value::mean(a, b).ok_or_else(|| ModelError::TypeMismatch {
                pv: pv.clone(),
                expected: a.value_type(),
                actual: b.value_type(),
            })?;
            values.insert(pv.clone(), mean);
        }

        let config = Configuration::new(new_name, self.config_type.clone(), values);
        Ok(self.insert_configuration(column1.max(column2) + 1, config))
    }

    /// 按界面选择的列插值 (必须恰好两列)
    pub fn interpolate_selection(&mut self, new_name: &str, columns: &[usize]) -> ModelResult<usize> {
        match columns {
            [first, second] => self.interpolate_configuration(new_name, *first, *second),
            _ => Err(ModelError::InvalidColumnSelection(columns.len())),
        }
    }

    /// 关闭配置列 (不清理撤销/重做,调用方应先调用 clean_undo)
    pub fn close_configuration(&mut self, column: usize) -> ModelResult<Configuration> {
        self.check_column(column)?;
        let config = self.configurations.remove(column);
        tracing::info!(column, name = %config.name(), dirty = config.is_dirty(), "关闭配置列");
        self.observers.publish(ModelEvent::ColumnRemoved { column });
        Ok(config)
    }

    /// 清除某列配置的全部撤销/重做条目
    ///
    /// # 返回
    /// 被清除的条目数
    pub fn clean_undo(&mut self, column: usize) -> ModelResult<usize> {
        let key = self.configuration(column)?.key();
        Ok(self.clean_undo_for(key))
    }

    /// 按身份清除撤销/重做条目 (列已关闭时使用 close_configuration 返回的配置身份)
    pub fn clean_undo_for(&mut self, key: ConfigKey) -> usize {
        let removed = self.history.purge(key);
        tracing::debug!(config_key = %key, removed, "清理撤销/重做条目");
        removed
    }

    /// 保存列配置 (仅在有待保存内容时调用服务)
    ///
    /// # 返回
    /// - Ok(true): 已保存
    /// - Ok(false): 无待保存内容
    pub fn save_configuration(&mut self, column: usize) -> ModelResult<bool> {
        self.check_column(column)?;
        let config = &mut self.configurations[column];

        let saved = if config.is_dirty() {
            if let Err(e) = config.save(self.client.as_ref()) {
                tracing::warn!(column, name = %config.name(), error = %e, "保存配置失败");
                return Err(e.into());
            }
            true
        } else {
            false
        };

        self.observers.publish(ModelEvent::ColumnRangeChanged {
            column,
            first_row: 0,
            last_row: self.vertical_header.len().saturating_sub(1),
        });
        self.observers.publish(ModelEvent::HeaderChanged { column });
        Ok(saved)
    }

    // ==========================================
    // 服务透传
    // ==========================================

    /// 列出服务端配置
    pub fn list_configurations(
        &self,
        filter: &ConfigurationFilter,
    ) -> ModelResult<Vec<ConfigurationSummary>> {
        Ok(self.client.get_pv_configurations(filter)?)
    }

    /// 删除服务端配置
    pub fn delete_configuration(&self, id: &str) -> ModelResult<()> {
        Ok(Configuration::delete(self.client.as_ref(), id)?)
    }

    // ==========================================
    // 内部校验
    // ==========================================

    fn descriptor(&self, row: usize) -> ModelResult<&PvDescriptor> {
        self.vertical_header
            .get(row)
            .ok_or(ModelError::RowOutOfRange {
                row,
                count: self.vertical_header.len(),
            })
    }

    fn check_column(&self, column: usize) -> ModelResult<()> {
        if column < self.configurations.len() {
            Ok(())
        } else {
            Err(ModelError::ColumnOutOfRange {
                column,
                count: self.configurations.len(),
            })
        }
    }
}
