// ==========================================
// 租赁订单装箱标签系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::db::{configure_sqlite_connection, ensure_schema, open_sqlite_connection};
use crate::domain::label::LabelSettings;
use crate::engine::classifier::CategoryClassifier;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 全局作用域 ID
pub const GLOBAL_SCOPE: &str = "global";

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 品类识别: 追加箱体关键词（逗号分隔）
    pub const EXTRA_CASE_KEYWORDS: &str = "classifier.extra_case_keywords";

    // 提交超时（毫秒,0 = 不限时）
    pub const COMMIT_TIMEOUT_MS: &str = "commit.timeout_ms";

    // 标签默认公司名
    pub const LABEL_COMPANY_NAME: &str = "label.company_name";
}

/// 默认公司名
pub const DEFAULT_COMPANY_NAME: &str = "RENTAL CO.";

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
        ensure_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            configure_sqlite_connection(&guard)?;
            ensure_schema(&guard)?;
        }

        Ok(Self { conn })
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![GLOBAL_SCOPE, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 读取配置值，带默认值
    pub fn get_config_or_default(&self, key: &str, default: &str) -> RepositoryResult<String> {
        Ok(self
            .get_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 写入配置值（存在则覆盖）
    pub fn set_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO config_kv (scope_id, key, value, updated_at)
               VALUES (?1, ?2, ?3, datetime('now'))
               ON CONFLICT(scope_id, key)
               DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at"#,
            params![GLOBAL_SCOPE, key, value],
        )?;
        tracing::info!(key, value, "配置已更新");
        Ok(())
    }

    /// 全部全局配置（用于诊断输出）
    pub fn snapshot(&self) -> RepositoryResult<HashMap<String, String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1")?;
        let pairs = stmt
            .query_map(params![GLOBAL_SCOPE], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<HashMap<_, _>, _>>()?;
        Ok(pairs)
    }

    // ==========================================
    // 类型化读取
    // ==========================================

    /// 追加的箱体关键词
    pub fn extra_case_keywords(&self) -> RepositoryResult<Vec<String>> {
        let raw = self.get_config_or_default(config_keys::EXTRA_CASE_KEYWORDS, "")?;
        Ok(raw
            .split(',')
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect())
    }

    /// 提交超时（None = 不限时）
    ///
    /// 非法值按不限时处理并告警
    pub fn commit_timeout(&self) -> RepositoryResult<Option<Duration>> {
        let raw = self.get_config_or_default(config_keys::COMMIT_TIMEOUT_MS, "0")?;
        match raw.trim().parse::<u64>() {
            Ok(0) => Ok(None),
            Ok(ms) => Ok(Some(Duration::from_millis(ms))),
            Err(_) => {
                tracing::warn!(value = %raw, "commit.timeout_ms 非法,按不限时处理");
                Ok(None)
            }
        }
    }

    pub fn company_name(&self) -> RepositoryResult<String> {
        self.get_config_or_default(config_keys::LABEL_COMPANY_NAME, DEFAULT_COMPANY_NAME)
    }

    /// 按配置构造品类识别器
    pub fn build_classifier(&self) -> RepositoryResult<CategoryClassifier> {
        Ok(CategoryClassifier::with_extra_case_keywords(
            self.extra_case_keywords()?,
        ))
    }

    /// 按配置构造默认标签设置
    pub fn default_label_settings(&self) -> RepositoryResult<LabelSettings> {
        Ok(LabelSettings::with_company_name(self.company_name()?))
    }
}
