// ==========================================
// 纸卷分切生产系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::slitting_config_trait::SlittingConfigReader;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global scope 配置（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let key = key.trim();
        if key.is_empty() {
            return Err("配置键不能为空".into());
        }

        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at)
             VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;

        tracing::info!(key = key, value = value, "配置已更新");
        Ok(())
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self
            .get_global_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 读取整数配置；格式错误时告警并回退默认值
    fn get_i64_or_default(&self, key: &str, default: i64) -> Result<i64, Box<dyn Error>> {
        let raw = match self.get_global_config_value(key)? {
            Some(v) => v,
            None => return Ok(default),
        };
        match raw.trim().parse::<i64>() {
            Ok(v) => Ok(v),
            Err(_) => {
                tracing::warn!(
                    config_key = key,
                    value = raw.as_str(),
                    default = default,
                    "配置值不是整数，使用默认值"
                );
                Ok(default)
            }
        }
    }

    /// 获取所有配置的快照（JSON格式）
    ///
    /// # 返回
    /// - Ok(String): 配置快照的JSON字符串（按键排序）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
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

impl SlittingConfigReader for ConfigManager {
    fn get_parent_width_tolerance_mm(&self) -> Result<i32, Box<dyn Error>> {
        let value = self.get_i64_or_default(config_keys::PARENT_WIDTH_TOLERANCE_MM, 0)?;
        Ok(i32::try_from(value.max(0)).unwrap_or(i32::MAX))
    }

    fn get_schedule_no_prefix(&self) -> Result<String, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::SCHEDULE_NO_PREFIX, "SL")?;
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Ok("SL".to_string());
        }
        Ok(trimmed.to_string())
    }

    fn get_default_page_size(&self) -> Result<i64, Box<dyn Error>> {
        let value = self.get_i64_or_default(config_keys::DEFAULT_PAGE_SIZE, 50)?;
        Ok(if value > 0 { value } else { 50 })
    }

    fn get_max_page_size(&self) -> Result<i64, Box<dyn Error>> {
        let value = self.get_i64_or_default(config_keys::MAX_PAGE_SIZE, 500)?;
        Ok(if value > 0 { value } else { 500 })
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 母卷匹配
    pub const PARENT_WIDTH_TOLERANCE_MM: &str = "slitting.parent_width_tolerance_mm";

    // 排程号
    pub const SCHEDULE_NO_PREFIX: &str = "slitting.schedule_no_prefix";

    // 分页
    pub const DEFAULT_PAGE_SIZE: &str = "slitting.default_page_size";
    pub const MAX_PAGE_SIZE: &str = "slitting.max_page_size";
}
