// ==========================================
// 租赁订单装箱标签系统 - 标签预设仓储
// ==========================================
// 存储: label_preset（settings 以 JSON 保存）
// 规则: 同名预设覆盖;用户的第一个预设自动成为默认
// ==========================================

use crate::db::ensure_schema;
use crate::domain::label::{LabelPreset, LabelSettings};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{Local, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::sync::{Arc, Mutex};

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct LabelPresetRepository {
    conn: Arc<Mutex<Connection>>,
}

impl LabelPresetRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        let repo = Self { conn };
        if let Err(e) = repo.ensure_tables() {
            tracing::warn!("label_preset ensure failed: {}", e);
        }
        repo
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn ensure_tables(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        ensure_schema(&conn)?;
        Ok(())
    }

    /// 用户的全部预设（默认在前,其余按名称）
    pub fn list_by_user(&self, user_id: &str) -> RepositoryResult<Vec<LabelPreset>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT preset_id, user_id, name, settings_json, logo_url, is_default, updated_at
            FROM label_preset
            WHERE user_id = ?1
            ORDER BY is_default DESC, name ASC
            "#,
        )?;

        let rows = stmt
            .query_map(params![user_id], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(into_preset).collect()
    }

    /// 默认预设（无默认时取第一个）
    pub fn find_default(&self, user_id: &str) -> RepositoryResult<Option<LabelPreset>> {
        Ok(self.list_by_user(user_id)?.into_iter().next())
    }

    pub fn find_by_id(&self, preset_id: &str) -> RepositoryResult<Option<LabelPreset>> {
        let conn = self.get_conn()?;
        let row = conn
            .query_row(
                r#"
                SELECT preset_id, user_id, name, settings_json, logo_url, is_default, updated_at
                FROM label_preset
                WHERE preset_id = ?1
                "#,
                params![preset_id],
                map_row,
            )
            .optional()?;
        row.map(into_preset).transpose()
    }

    /// 保存预设
    ///
    /// - 同名存在: 更新 settings;logo_url 为 None 时保留原值
    /// - 不存在: 新建,用户的第一个预设设为默认
    ///
    /// # 返回
    /// - preset_id
    pub fn save(
        &self,
        user_id: &str,
        name: &str,
        settings: &LabelSettings,
        logo_url: Option<&str>,
    ) -> RepositoryResult<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RepositoryError::ValidationError("预设名称为空".to_string()));
        }

        let settings_json = serde_json::to_string(settings)?;
        let now = Local::now().naive_local().format(TS_FORMAT).to_string();

        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing: Option<String> = tx
            .query_row(
                "SELECT preset_id FROM label_preset WHERE user_id = ?1 AND name = ?2",
                params![user_id, name],
                |row| row.get(0),
            )
            .optional()?;

        let preset_id = match existing {
            Some(preset_id) => {
                tx.execute(
                    r#"UPDATE label_preset
                       SET settings_json = ?1, logo_url = COALESCE(?2, logo_url), updated_at = ?3
                       WHERE preset_id = ?4"#,
                    params![settings_json, logo_url, now, preset_id],
                )?;
                preset_id
            }
            None => {
                let count: i64 = tx.query_row(
                    "SELECT COUNT(*) FROM label_preset WHERE user_id = ?1",
                    params![user_id],
                    |row| row.get(0),
                )?;
                let preset_id = uuid::Uuid::new_v4().to_string();
                tx.execute(
                    r#"INSERT INTO label_preset (
                            preset_id, user_id, name, settings_json, logo_url, is_default, updated_at
                        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
                    params![
                        preset_id,
                        user_id,
                        name,
                        settings_json,
                        logo_url,
                        if count == 0 { 1 } else { 0 },
                        now,
                    ],
                )?;
                preset_id
            }
        };

        tx.commit()?;
        Ok(preset_id)
    }

    /// 删除预设
    ///
    /// # 返回
    /// - true: 已删除
    /// - false: 不存在
    pub fn delete(&self, preset_id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "DELETE FROM label_preset WHERE preset_id = ?1",
            params![preset_id],
        )?;
        Ok(affected > 0)
    }
}

type PresetRow = (String, String, String, String, Option<String>, i64, String);

fn map_row(row: &Row) -> rusqlite::Result<PresetRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn into_preset(row: PresetRow) -> RepositoryResult<LabelPreset> {
    let (preset_id, user_id, name, settings_json, logo_url, is_default, updated_at) = row;
    let settings: LabelSettings = serde_json::from_str(&settings_json)?;
    let updated_at = NaiveDateTime::parse_from_str(&updated_at, TS_FORMAT).map_err(|e| {
        RepositoryError::FieldValueError {
            field: "updated_at".to_string(),
            message: e.to_string(),
        }
    })?;

    Ok(LabelPreset {
        preset_id,
        user_id,
        name,
        settings,
        logo_url,
        is_default: is_default != 0,
        updated_at,
    })
}
