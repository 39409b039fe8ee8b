// ==========================================
// PV 配置快照管理 - PV 描述与行顺序
// ==========================================
// 职责: 表格行 (PV 名 + 声明类型) 及其磁铁族排序
// 顺序: 二极铁 < 四极铁 < 六极铁 < CH < CV < FCH < FCV < 其他
//       同一类中 Fam 族电源先于单体电源
//       四极铁内 QF < QD < Q1~Q4; 六极铁内 SF < SD
//       最后按 PV 名排序保证确定性
// ==========================================

use crate::domain::types::ValueType;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// 表格行描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PvDescriptor {
    pub name: String,
    pub value_type: ValueType,
}

impl PvDescriptor {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
        }
    }
}

// ==========================================
// MagnetClass - 磁铁分类
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MagnetClass {
    Dipole,
    QuadF,
    QuadD,
    QuadNumbered,
    SextF,
    SextD,
    CorrectorH,
    CorrectorV,
    FastCorrectorH,
    FastCorrectorV,
    Other,
}

impl MagnetClass {
    /// 由设备名 (如 "QFA", "B1B2-1", "FCH") 判定分类
    pub fn from_device(device: &str) -> Self {
        let bytes = device.as_bytes();
        if device.starts_with("FCH") {
            MagnetClass::FastCorrectorH
        } else if device.starts_with("FCV") {
            MagnetClass::FastCorrectorV
        } else if device.starts_with("CH") {
            MagnetClass::CorrectorH
        } else if device.starts_with("CV") {
            MagnetClass::CorrectorV
        } else if device.starts_with("QF") {
            MagnetClass::QuadF
        } else if device.starts_with("QD") {
            MagnetClass::QuadD
        } else if bytes.len() >= 2 && bytes[0] == b'Q' && (b'1'..=b'4').contains(&bytes[1]) {
            MagnetClass::QuadNumbered
        } else if device.starts_with("SF") {
            MagnetClass::SextF
        } else if device.starts_with("SD") {
            MagnetClass::SextD
        } else if is_dipole(bytes) {
            MagnetClass::Dipole
        } else {
            MagnetClass::Other
        }
    }

    /// 大类序号
    fn group_rank(&self) -> u8 {
        match self {
            MagnetClass::Dipole => 0,
            MagnetClass::QuadF | MagnetClass::QuadD | MagnetClass::QuadNumbered => 1,
            MagnetClass::SextF | MagnetClass::SextD => 2,
            MagnetClass::CorrectorH => 3,
            MagnetClass::CorrectorV => 4,
            MagnetClass::FastCorrectorH => 5,
            MagnetClass::FastCorrectorV => 6,
            MagnetClass::Other => 7,
        }
    }

    /// 大类内的子序号
    fn sub_rank(&self) -> u8 {
        match self {
            MagnetClass::QuadF | MagnetClass::SextF => 0,
            MagnetClass::QuadD | MagnetClass::SextD => 1,
            MagnetClass::QuadNumbered => 2,
            _ => 0,
        }
    }
}

/// 二极铁: "B", "B-1", "B1B2-1", "BC"
fn is_dipole(bytes: &[u8]) -> bool {
    match bytes {
        [b'B'] => true,
        [b'B', next, ..] => next.is_ascii_digit() || *next == b'-' || *next == b'C',
        _ => false,
    }
}

/// PV 名拆解: "SI-Fam:PS-QFA:Current-SP" -> (是否族电源, 设备名 "QFA")
fn parse_pv_name(pv_name: &str) -> (bool, &str) {
    let mut parts = pv_name.split(':');
    let section = parts.next().unwrap_or("");
    let device_part = parts.next().unwrap_or("");

    let is_family = section.split('-').nth(1) == Some("Fam");
    let device = device_part
        .split_once('-')
        .map(|(_, dev)| dev)
        .unwrap_or(device_part);

    (is_family, device)
}

fn sort_key(pv_name: &str) -> (u8, u8, u8) {
    let (is_family, device) = parse_pv_name(pv_name);
    let class = MagnetClass::from_device(device);
    (class.group_rank(), u8::from(!is_family), class.sub_rank())
}

/// 两个 PV 名的行顺序比较
pub fn compare_pv_names(a: &str, b: &str) -> Ordering {
    sort_key(a).cmp(&sort_key(b)).then_with(|| a.cmp(b))
}

/// 原地排序
pub fn sort_descriptors(descriptors: &mut [PvDescriptor]) {
    descriptors.sort_by(|a, b| compare_pv_names(&a.name, &b.name));
}

/// 由目录映射生成已排序的行列表
pub fn descriptors_from_map(pvs: &BTreeMap<String, ValueType>) -> Vec<PvDescriptor> {
    let mut descriptors: Vec<PvDescriptor> = pvs
        .iter()
        .map(|(name, value_type)| PvDescriptor::new(name.clone(), *value_type))
        .collect();
    sort_descriptors(&mut descriptors);
    descriptors
}
