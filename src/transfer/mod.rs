// ==========================================
// PV 配置快照管理 - 快照文件导入/导出
// ==========================================
// 格式: CSV, 表头 pv_name,pv_type,value
// 导出: 按行顺序 (PV 描述符顺序) 写出
// 导入: 生成一份新配置 (未保存),行号从 1 开始计数 (不含表头)
// ==========================================

pub mod error;

pub use error::{TransferError, TransferResult};

use crate::domain::configuration::Configuration;
use crate::domain::pv_descriptor::PvDescriptor;
use crate::domain::types::ValueType;
use csv::{ReaderBuilder, WriterBuilder};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

/// CSV 表头
pub const CSV_HEADER: [&str; 3] = ["pv_name", "pv_type", "value"];

/// 导出配置到 CSV
///
/// # 参数
/// - descriptors: 行顺序; 为空时按 PV 名顺序导出全部条目
///
/// # 返回
/// 写出的数据行数
pub fn export_csv<P: AsRef<Path>>(
    config: &Configuration,
    descriptors: &[PvDescriptor],
    path: P,
) -> TransferResult<usize> {
    let path = path.as_ref();
    check_extension(path)?;

    let mut writer = WriterBuilder::new().from_path(path)?;
    writer.write_record(CSV_HEADER)?;

    let names: Vec<&str> = if descriptors.is_empty() {
        config.values().keys().map(String::as_str).collect()
    } else {
        descriptors.iter().map(|d| d.name.as_str()).collect()
    };

    let mut rows = 0;
    for name in names {
        if let Some(value) = config.value(name) {
            writer.write_record([name, value.value_type().as_str(), value.to_string().as_str()])?;
            rows += 1;
        }
    }
    writer.flush()?;

    tracing::info!(file = %path.display(), name = %config.name(), rows, "导出配置");
    Ok(rows)
}

/// 从 CSV 导入一份新配置
pub fn import_csv<P: AsRef<Path>>(
    path: P,
    name: &str,
    config_type: &str,
) -> TransferResult<Configuration> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(TransferError::FileNotFound(path.display().to_string()));
    }
    check_extension(path)?;

    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    if headers != CSV_HEADER {
        return Err(TransferError::InvalidRow {
            row: 0,
            message: format!("表头应为 {}, 实际 {}", CSV_HEADER.join(","), headers.join(",")),
        });
    }

    let mut values = BTreeMap::new();
    for (idx, result) in reader.records().enumerate() {
        let row = idx + 1;
        let record = result?;

        // 跳过完全空白的行
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }

        let (pv_name, pv_type, raw) = match (record.get(0), record.get(1), record.get(2)) {
            (Some(pv), Some(t), Some(v)) if !pv.is_empty() => (pv, t, v),
            _ => {
                return Err(TransferError::InvalidRow {
                    row,
                    message: "缺少 pv_name/pv_type/value".to_string(),
                })
            }
        };

        let value_type = ValueType::from_str(pv_type).ok_or_else(|| TransferError::InvalidRow {
            row,
            message: format!("未知类型: {}", pv_type),
        })?;
        let value = value_type
            .parse(raw)
            .map_err(|message| TransferError::InvalidRow { row, message })?;

        if values.insert(pv_name.to_string(), value).is_some() {
            return Err(TransferError::InvalidRow {
                row,
                message: format!("PV 重复: {}", pv_name),
            });
        }
    }

    tracing::info!(file = %path.display(), config = name, rows = values.len(), "导入配置");
    Ok(Configuration::new(name, config_type, values))
}

fn check_extension(path: &Path) -> TransferResult<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    if ext == "csv" {
        Ok(())
    } else {
        Err(TransferError::UnsupportedFormat(ext))
    }
}
