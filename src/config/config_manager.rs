// ==========================================
// PV 配置快照管理 - 设置管理器
// ==========================================
// 职责: 管理器运行参数的加载、查询、覆写
// 存储: config_kv 表 (key-value + scope)
// 说明: 缺失或格式错误的配置项回退为默认值
// ==========================================

use crate::db::open_sqlite_connection;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::error::Error;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ==========================================
// ManagerSettings - 运行参数
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerSettings {
    pub undo_capacity: usize,    // 撤销/重做栈容量
    pub float_precision: usize,  // 浮点显示精度
    pub apply_wait: Duration,    // 下发与校验之间的等待
    pub check_tolerance: f64,    // 校验容差
    pub pv_timeout: Duration,    // 单次 PV 读写超时
    pub check_readback: bool,    // 校验读回值 (-RB/-Sts) 而非设定值
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            undo_capacity: defaults::UNDO_CAPACITY,
            float_precision: defaults::FLOAT_PRECISION,
            apply_wait: Duration::from_millis(defaults::APPLY_WAIT_MS),
            check_tolerance: defaults::CHECK_TOLERANCE,
            pv_timeout: Duration::from_millis(defaults::PV_TIMEOUT_MS),
            check_readback: defaults::CHECK_READBACK,
        }
    }
}

// ==========================================
// SettingsManager - 设置管理器
// ==========================================
pub struct SettingsManager {
    conn: Arc<Mutex<Connection>>,
}

impl SettingsManager {
    /// 创建新的 SettingsManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;
        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    /// 从已有连接创建 SettingsManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
            conn_guard.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS config_kv (
                    scope_id TEXT NOT NULL,
                    key TEXT NOT NULL,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                    PRIMARY KEY (scope_id, key)
                );
                "#,
            )?;
        }

        Ok(Self { conn })
    }

    /// 读取 global scope 的配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 写入 global scope 的配置值 (UPSERT)
    pub fn set_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        tracing::info!(config_key = key, value, "更新设置项");
        Ok(())
    }

    /// 读取配置值并解析,缺失或格式错误时返回默认值
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> Result<T, Box<dyn Error>>
    where
        T: FromStr,
    {
        match self.get_global_config_value(key)? {
            Some(raw) => match raw.trim().parse::<T>() {
                Ok(v) => Ok(v),
                Err(_) => {
                    tracing::warn!(config_key = key, raw_value = %raw, "设置项格式错误，使用默认值");
                    Ok(default)
                }
            },
            None => Ok(default),
        }
    }

    /// 加载全部运行参数
    pub fn load_settings(&self) -> Result<ManagerSettings, Box<dyn Error>> {
        let mut undo_capacity =
            self.get_parsed_or_default(config_keys::UNDO_CAPACITY, defaults::UNDO_CAPACITY)?;
        if undo_capacity == 0 {
            tracing::warn!(config_key = config_keys::UNDO_CAPACITY, "撤销栈容量不能为 0，使用默认值");
            undo_capacity = defaults::UNDO_CAPACITY;
        }

        let mut float_precision =
            self.get_parsed_or_default(config_keys::FLOAT_PRECISION, defaults::FLOAT_PRECISION)?;
        if float_precision > defaults::MAX_FLOAT_PRECISION {
            tracing::warn!(
                config_key = config_keys::FLOAT_PRECISION,
                float_precision,
                "浮点精度超出上限，截断"
            );
            float_precision = defaults::MAX_FLOAT_PRECISION;
        }

        let apply_wait_ms =
            self.get_parsed_or_default(config_keys::APPLY_WAIT_MS, defaults::APPLY_WAIT_MS)?;
        let pv_timeout_ms =
            self.get_parsed_or_default(config_keys::PV_TIMEOUT_MS, defaults::PV_TIMEOUT_MS)?;

        let mut check_tolerance =
            self.get_parsed_or_default(config_keys::CHECK_TOLERANCE, defaults::CHECK_TOLERANCE)?;
        if !check_tolerance.is_finite() || check_tolerance < 0.0 {
            tracing::warn!(config_key = config_keys::CHECK_TOLERANCE, "校验容差无效，使用默认值");
            check_tolerance = defaults::CHECK_TOLERANCE;
        }

        let check_readback =
            self.get_parsed_or_default(config_keys::CHECK_READBACK, defaults::CHECK_READBACK)?;

        Ok(ManagerSettings {
            undo_capacity,
            float_precision,
            apply_wait: Duration::from_millis(apply_wait_ms),
            check_tolerance,
            pv_timeout: Duration::from_millis(pv_timeout_ms),
            check_readback,
        })
    }

    /// 获取所有配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt = conn.prepare(
            "SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key",
        )?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }
}

// ==========================================
// 默认值
// ==========================================
pub mod defaults {
    pub const UNDO_CAPACITY: usize = 75;
    pub const FLOAT_PRECISION: usize = 6;
    pub const MAX_FLOAT_PRECISION: usize = 15;
    pub const APPLY_WAIT_MS: u64 = 1_000;
    pub const CHECK_TOLERANCE: f64 = 1e-6;
    pub const PV_TIMEOUT_MS: u64 = 3_000;
    pub const CHECK_READBACK: bool = true;
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    pub const UNDO_CAPACITY: &str = "undo_capacity";
    pub const FLOAT_PRECISION: &str = "float_precision";
    pub const APPLY_WAIT_MS: &str = "apply_wait_ms";
    pub const CHECK_TOLERANCE: &str = "check_tolerance";
    pub const PV_TIMEOUT_MS: &str = "pv_timeout_ms";
    pub const CHECK_READBACK: &str = "check_readback";
}
