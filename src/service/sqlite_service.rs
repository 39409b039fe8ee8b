// ==========================================
// PV 配置快照管理 - SQLite 配置服务
// ==========================================
// 职责: 以本地 SQLite 实现配置服务契约
// 存储: pv_configuration / pv_configuration_item 两张表
// 说明: 条目值以 JSON 文本保存 ({"type": ..., "value": ...})
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::types::{Value, ValueType};
use crate::service::client::{
    ConfigServiceClient, ConfigurationFilter, ConfigurationSummary, PvItem, StoredConfiguration,
};
use crate::service::error::{
    ConfigServiceError, ServiceResult, INTERNAL_ERROR_STATUS, NOT_FOUND_STATUS,
};
use rusqlite::{params, Connection, Result as SqliteResult};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub struct SqliteConfigService {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteConfigService {
    pub fn new(db_path: &str) -> ServiceResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        let service = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        service.ensure_tables()?;
        Ok(service)
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ServiceResult<Self> {
        let service = Self { conn };
        service.ensure_tables()?;
        Ok(service)
    }

    fn get_conn(&self) -> ServiceResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| ConfigServiceError::LockError(e.to_string()))
    }

    fn now() -> String {
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
    }

    /// 确保表存在（如果不存在则创建）
    fn ensure_tables(&self) -> ServiceResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS pv_configuration (
              config_id TEXT PRIMARY KEY,
              name TEXT NOT NULL,
              config_type TEXT NOT NULL,
              created_at TEXT NOT NULL DEFAULT (datetime('now')),
              updated_at TEXT NOT NULL DEFAULT (datetime('now')),
              UNIQUE(config_type, name)
            );

            CREATE TABLE IF NOT EXISTS pv_configuration_item (
              config_id TEXT NOT NULL,
              pv_name TEXT NOT NULL,
              pv_type TEXT NOT NULL,
              value_json TEXT NOT NULL,
              PRIMARY KEY (config_id, pv_name),
              FOREIGN KEY (config_id) REFERENCES pv_configuration(config_id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_pv_configuration_type
              ON pv_configuration(config_type);
            "#,
        )?;
        Ok(())
    }

    fn touch(conn: &Connection, id: &str) -> ServiceResult<()> {
        conn.execute(
            "UPDATE pv_configuration SET updated_at = ?1 WHERE config_id = ?2",
            params![Self::now(), id],
        )?;
        Ok(())
    }

    fn not_found(operation: &str, id: &str) -> ConfigServiceError {
        ConfigServiceError::status(NOT_FOUND_STATUS, operation, format!("配置不存在: id={}", id))
    }
}

impl ConfigServiceClient for SqliteConfigService {
    fn get_pv_configuration_by_id(&self, id: &str) -> ServiceResult<StoredConfiguration> {
        let conn = self.get_conn()?;

        let header = conn.query_row(
            "SELECT config_id, name, config_type FROM pv_configuration WHERE config_id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        );
        let (config_id, name, config_type) = match header {
            Ok(v) => v,
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                return Err(Self::not_found("get_pv_configuration_by_id", id))
            }
            Err(e) => return Err(e.into()),
        };

        let mut stmt = conn.prepare(
            r#"
            SELECT pv_name, pv_type, value_json
            FROM pv_configuration_item
            WHERE config_id = ?1
            ORDER BY pv_name ASC
            "#,
        )?;
        let rows = stmt
            .query_map(params![id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<SqliteResult<Vec<_>>>()?;

        let mut items = Vec::with_capacity(rows.len());
        for (pv_name, pv_type, value_json) in rows {
            let pv_type = ValueType::from_str(&pv_type).ok_or_else(|| {
                ConfigServiceError::status(
                    INTERNAL_ERROR_STATUS,
                    "get_pv_configuration_by_id",
                    format!("未知 PV 类型: {} ({})", pv_type, pv_name),
                )
            })?;
            let value: Value = serde_json::from_str(&value_json)?;
            items.push(PvItem {
                pv_name,
                pv_type,
                value,
            });
        }

        Ok(StoredConfiguration {
            id: config_id,
            name,
            config_type,
            items,
        })
    }

    fn insert_pv_configuration(&self, name: &str, config_type: &str) -> ServiceResult<String> {
        let conn = self.get_conn()?;
        let id = Uuid::new_v4().to_string();
        let now = Self::now();
        conn.execute(
            r#"
            INSERT INTO pv_configuration (config_id, name, config_type, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![id, name, config_type, now, now],
        )?;
        tracing::info!(config_id = %id, name, config_type, "新建配置记录");
        Ok(id)
    }

    fn insert_pv_configuration_items(&self, id: &str, items: &[PvItem]) -> ServiceResult<()> {
        let mut conn = self.get_conn()?;

        let exists: bool = conn
            .query_row(
                "SELECT 1 FROM pv_configuration WHERE config_id = ?1",
                params![id],
                |_row| Ok(true),
            )
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(false),
                other => Err(other),
            })?;
        if !exists {
            return Err(Self::not_found("insert_pv_configuration_items", id));
        }

        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO pv_configuration_item (config_id, pv_name, pv_type, value_json)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(config_id, pv_name) DO UPDATE SET
                    pv_type = excluded.pv_type,
                    value_json = excluded.value_json
                "#,
            )?;
            for item in items {
                let value_json = serde_json::to_string(&item.value)?;
                stmt.execute(params![id, item.pv_name, item.pv_type.as_str(), value_json])?;
            }
        }
        Self::touch(&tx, id)?;
        tx.commit()?;

        tracing::debug!(config_id = %id, count = items.len(), "批量写入配置条目");
        Ok(())
    }

    fn update_pv_configuration(&self, id: &str, new_name: &str) -> ServiceResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE pv_configuration SET name = ?1, updated_at = ?2 WHERE config_id = ?3",
            params![new_name, Self::now(), id],
        )?;
        if affected == 0 {
            return Err(Self::not_found("update_pv_configuration", id));
        }
        Ok(())
    }

    fn update_pv_configuration_item(
        &self,
        id: &str,
        pv_name: &str,
        value: &Value,
    ) -> ServiceResult<()> {
        let conn = self.get_conn()?;
        let value_json = serde_json::to_string(value)?;
        let affected = conn.execute(
            r#"
            UPDATE pv_configuration_item
            SET value_json = ?1, pv_type = ?2
            WHERE config_id = ?3 AND pv_name = ?4
            "#,
            params![value_json, value.value_type().as_str(), id, pv_name],
        )?;
        if affected == 0 {
            return Err(ConfigServiceError::status(
                NOT_FOUND_STATUS,
                "update_pv_configuration_item",
                format!("配置条目不存在: id={}, pv={}", id, pv_name),
            ));
        }
        Self::touch(&conn, id)?;
        Ok(())
    }

    fn delete_pv_configuration(&self, id: &str) -> ServiceResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "DELETE FROM pv_configuration WHERE config_id = ?1",
            params![id],
        )?;
        if affected == 0 {
            return Err(Self::not_found("delete_pv_configuration", id));
        }
        tracing::info!(config_id = %id, "删除配置记录");
        Ok(())
    }

    fn get_pv_configurations(
        &self,
        filter: &ConfigurationFilter,
    ) -> ServiceResult<Vec<ConfigurationSummary>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT config_id, name, config_type, created_at, updated_at
            FROM pv_configuration
            WHERE (?1 IS NULL OR config_type = ?1)
              AND (?2 IS NULL OR name LIKE '%' || ?2 || '%')
            ORDER BY config_type ASC, name ASC
            "#,
        )?;

        let rows = stmt
            .query_map(params![filter.config_type, filter.name_contains], |row| {
                Ok(ConfigurationSummary {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    config_type: row.get(2)?,
                    created_at: row.get(3)?,
                    updated_at: row.get(4)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(rows)
    }
}
