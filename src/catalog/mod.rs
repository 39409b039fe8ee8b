// ==========================================
// PV 配置快照管理 - 设备/PV 目录
// ==========================================
// 职责: 按配置类型提供 PV 集合 (PV 名 -> 声明类型)
// 用途: 配置表构造时生成行列表 (只调用一次)
// ==========================================

use crate::domain::types::ValueType;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

// ==========================================
// PvCatalog Trait
// ==========================================
pub trait PvCatalog: Send + Sync {
    /// 指定配置类型的 PV 集合 (未知类型返回 None)
    fn pvs(&self, config_type: &str) -> Option<BTreeMap<String, ValueType>>;

    /// 已知配置类型 (排序)
    fn config_types(&self) -> Vec<String>;
}

// ==========================================
// StaticPvCatalog - 内存目录
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct StaticPvCatalog {
    types: HashMap<String, BTreeMap<String, ValueType>>,
}

impl StaticPvCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册 (或替换) 一个配置类型
    pub fn with_type<I, S>(mut self, config_type: impl Into<String>, pvs: I) -> Self
    where
        I: IntoIterator<Item = (S, ValueType)>,
        S: Into<String>,
    {
        let map = pvs.into_iter().map(|(name, t)| (name.into(), t)).collect();
        self.types.insert(config_type.into(), map);
        self
    }

    /// 从 JSON 文档加载
    ///
    /// # 格式
    /// `{"global_config": {"SI-Fam:PS-QFA:Current-SP": "Float", ...}, ...}`
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        #[derive(Deserialize)]
        #[serde(transparent)]
        struct Document(HashMap<String, BTreeMap<String, ValueType>>);

        let Document(types) = serde_json::from_str(json)?;
        Ok(Self { types })
    }
}

impl PvCatalog for StaticPvCatalog {
    fn pvs(&self, config_type: &str) -> Option<BTreeMap<String, ValueType>> {
        self.types.get(config_type).cloned()
    }

    fn config_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.types.keys().cloned().collect();
        types.sort();
        types
    }
}
