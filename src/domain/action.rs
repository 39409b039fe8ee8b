// ==========================================
// PV 配置快照管理 - 撤销/重做操作记录
// ==========================================
// 用途: 撤销栈与重做栈中的条目
// 说明: 以配置身份 (ConfigKey) 定位,与显示名称无关
// ==========================================

use crate::domain::types::{ConfigKey, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// 单元格取值修改 (None 表示单元格缺失取值)
    SetValue {
        config_key: ConfigKey,
        pv_name: String,
        old: Option<Value>,
        new: Option<Value>,
    },
}

impl Action {
    pub fn config_key(&self) -> ConfigKey {
        match self {
            Action::SetValue { config_key, .. } => *config_key,
        }
    }

    /// 逆操作 (新旧值互换)
    pub fn inverse(&self) -> Action {
        match self {
            Action::SetValue {
                config_key,
                pv_name,
                old,
                new,
            } => Action::SetValue {
                config_key: *config_key,
                pv_name: pv_name.clone(),
                old: new.clone(),
                new: old.clone(),
            },
        }
    }
}
