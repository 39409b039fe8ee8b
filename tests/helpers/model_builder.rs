// ==========================================
// 配置表构建器 - 用于集成测试
// ==========================================

use pv_config_manager::catalog::StaticPvCatalog;
use pv_config_manager::config::ManagerSettings;
use pv_config_manager::domain::types::{Value, ValueType};
use pv_config_manager::model::ConfigModel;
use pv_config_manager::service::client::ConfigServiceClient;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const CONFIG_TYPE: &str = "global_config";

pub const QD: &str = "SI-Fam:PS-QD:Current-SP";
pub const QF: &str = "SI-Fam:PS-QF:Current-SP";
pub const DIPOLE: &str = "SI-Fam:PS-B1B2-1:Current-SP";
pub const QF_STATE: &str = "SI-Fam:PS-QF:PwrState-Sel";

/// 纯数值目录 (QD, QF, 二极铁)
pub fn numeric_catalog() -> StaticPvCatalog {
    StaticPvCatalog::new().with_type(
        CONFIG_TYPE,
        [
            (QD, ValueType::Float),
            (QF, ValueType::Float),
            (DIPOLE, ValueType::Float),
        ],
    )
}

/// 含开关量的目录
pub fn mixed_catalog() -> StaticPvCatalog {
    numeric_catalog().with_type(
        CONFIG_TYPE,
        [
            (QD, ValueType::Float),
            (QF, ValueType::Float),
            (DIPOLE, ValueType::Float),
            (QF_STATE, ValueType::Bool),
        ],
    )
}

pub fn build_model(catalog: &StaticPvCatalog, client: Arc<dyn ConfigServiceClient>) -> ConfigModel {
    ConfigModel::new(CONFIG_TYPE, catalog, client, &ManagerSettings::default())
        .expect("Failed to create model")
}

/// QD/QF/二极铁的取值
pub fn values(qd: f64, qf: f64, dipole: f64) -> BTreeMap<String, Value> {
    BTreeMap::from([
        (QD.to_string(), Value::Float(qd)),
        (QF.to_string(), Value::Float(qf)),
        (DIPOLE.to_string(), Value::Float(dipole)),
    ])
}

pub fn items(qd: f64, qf: f64, dipole: f64) -> Vec<(&'static str, Value)> {
    vec![
        (QD, Value::Float(qd)),
        (QF, Value::Float(qf)),
        (DIPOLE, Value::Float(dipole)),
    ]
}
