// ==========================================
// 评审分配系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::assign_config_trait::{AssignConfigReader, DEFAULT_SELECTOR_EPSILON};
use crate::db::open_sqlite_connection;
use crate::domain::types::ReassignMode;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// 配置键
pub mod config_keys {
    pub const SELECTOR_EPSILON: &str = "assign.selector_epsilon";
    pub const REASSIGN_MODE: &str = "assign.reassign_mode";
    pub const RNG_SEED: &str = "assign.rng_seed";
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let conn_guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO config_kv (scope_id, key, value, updated_at)
               VALUES ('global', ?1, ?2, datetime('now'))
               ON CONFLICT(scope_id, key) DO UPDATE SET
                   value = excluded.value,
                   updated_at = excluded.updated_at"#,
            params![key, value],
        )?;
        Ok(())
    }

    /// 获取所有配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            "SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key",
        )?;

        let config_map = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<rusqlite::Result<BTreeMap<_, _>>>()?;

        let json_value = json!(config_map);
        serde_json::to_string(&json_value).map_err(|e| RepositoryError::Other(e.into()))
    }
}

impl AssignConfigReader for ConfigManager {
    fn get_selector_epsilon(&self) -> RepositoryResult<f64> {
        let raw = match self.get_config_value(config_keys::SELECTOR_EPSILON)? {
            Some(v) => v,
            None => return Ok(DEFAULT_SELECTOR_EPSILON),
        };

        match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() && v > 0.0 => Ok(v),
            _ => {
                tracing::warn!(
                    key = config_keys::SELECTOR_EPSILON,
                    value = %raw,
                    "配置值无效, 使用默认值 {}",
                    DEFAULT_SELECTOR_EPSILON
                );
                Ok(DEFAULT_SELECTOR_EPSILON)
            }
        }
    }

    fn get_reassign_mode(&self) -> RepositoryResult<ReassignMode> {
        let raw = match self.get_config_value(config_keys::REASSIGN_MODE)? {
            Some(v) => v,
            None => return Ok(ReassignMode::default()),
        };

        match ReassignMode::from_config_str(&raw) {
            Some(mode) => Ok(mode),
            None => {
                tracing::warn!(
                    key = config_keys::REASSIGN_MODE,
                    value = %raw,
                    "配置值无效, 使用默认值 IN_PLACE"
                );
                Ok(ReassignMode::default())
            }
        }
    }

    fn get_rng_seed(&self) -> RepositoryResult<Option<u64>> {
        let raw = match self.get_config_value(config_keys::RNG_SEED)? {
            Some(v) if !v.trim().is_empty() => v,
            _ => return Ok(None),
        };

        match raw.trim().parse::<u64>() {
            Ok(seed) => Ok(Some(seed)),
            Err(_) => {
                tracing::warn!(key = config_keys::RNG_SEED, value = %raw, "配置值无效, 忽略种子");
                Ok(None)
            }
        }
    }
}
