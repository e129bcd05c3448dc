// ==========================================
// 租赁订单装箱标签系统 - 人工分配仓储
// ==========================================
// 存储: case_assignment（每箱一行） + case_assignment_revision（修订号）
// 红线:
// - 整单替换在单个事务内完成（删除 + 插入 + 修订号递增）
// - 修订号不符时拒绝写入,防止过期会话覆盖新数据
// - 调用方超时/取消后,未提交的写入回滚
// ==========================================

use crate::db::ensure_schema;
use crate::domain::case::{AssignedContent, CaseAssignmentRecord};
use crate::domain::types::ItemId;
use crate::engine::store::{AssignmentStore, SavedAssignments};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::Local;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

pub struct CaseAssignmentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CaseAssignmentRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        let repo = Self { conn };
        // best-effort: 建表失败不阻断启动,使用时再暴露错误
        if let Err(e) = repo.ensure_tables() {
            tracing::warn!("case_assignment ensure failed: {}", e);
        }
        repo
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        lock_shared(&self.conn)
    }

    fn ensure_tables(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        ensure_schema(&conn)?;
        Ok(())
    }

    /// 当前修订号（从未保存为 0）
    pub fn current_revision(&self, user_id: &str, order_id: &str) -> RepositoryResult<u64> {
        let conn = self.get_conn()?;
        read_revision(&conn, user_id, order_id)
    }

    /// 读取已保存的分配（按保存顺序）
    pub fn find_by_order(&self, user_id: &str, order_id: &str) -> RepositoryResult<SavedAssignments> {
        let conn = self.get_conn()?;
        load_saved(&conn, user_id, order_id)
    }

    /// 整单替换
    ///
    /// # 返回
    /// - Ok(new_revision)
    /// - Err(OptimisticLockFailure): expected_revision 与库中不符
    ///
    /// # 红线
    /// - 必须在事务中完成,任一步失败全部回滚
    pub fn replace(
        &self,
        user_id: &str,
        order_id: &str,
        expected_revision: u64,
        records: &[CaseAssignmentRecord],
    ) -> RepositoryResult<u64> {
        let mut conn = self.get_conn()?;
        replace_saved(&mut conn, user_id, order_id, expected_revision, records, None)
    }
}

// ==========================================
// 同步实现（供阻塞线程池调用）
// ==========================================

fn lock_shared(conn: &Mutex<Connection>) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|e| RepositoryError::LockError(e.to_string()))
}

fn load_saved(conn: &Connection, user_id: &str, order_id: &str) -> RepositoryResult<SavedAssignments> {
    let revision = read_revision(conn, user_id, order_id)?;

    let mut stmt = conn.prepare(
        r#"
        SELECT container_item_id, container_name, content_json
        FROM case_assignment
        WHERE user_id = ?1 AND order_id = ?2
        ORDER BY position
        "#,
    )?;

    let rows = stmt
        .query_map(params![user_id, order_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut records = Vec::with_capacity(rows.len());
    for (container_item_id, container_name, content_json) in rows {
        let content_list: Vec<AssignedContent> = serde_json::from_str(&content_json)?;
        records.push(CaseAssignmentRecord {
            container_item_id: ItemId(to_index(container_item_id)?),
            container_name,
            content_list,
        });
    }

    Ok(SavedAssignments { revision, records })
}

/// 事务内替换
///
/// IMMEDIATE 事务: 开始即取写锁,锁被占用时按 busy_timeout 等待,
/// 而不是在第一次写入时直接返回 SQLITE_BUSY。
/// abandoned 置位后（调用方已超时或取消）在提交前回滚。
fn replace_saved(
    conn: &mut Connection,
    user_id: &str,
    order_id: &str,
    expected_revision: u64,
    records: &[CaseAssignmentRecord],
    abandoned: Option<&AtomicBool>,
) -> RepositoryResult<u64> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let actual = read_revision(&tx, user_id, order_id)?;
    if actual != expected_revision {
        return Err(RepositoryError::OptimisticLockFailure {
            user_id: user_id.to_string(),
            order_id: order_id.to_string(),
            expected: expected_revision,
            actual,
        });
    }

    let now = Local::now().naive_local().format("%Y-%m-%d %H:%M:%S").to_string();

    tx.execute(
        "DELETE FROM case_assignment WHERE user_id = ?1 AND order_id = ?2",
        params![user_id, order_id],
    )?;

    {
        let mut stmt = tx.prepare(
            r#"INSERT INTO case_assignment (
                    user_id, order_id, container_item_id, container_name,
                    content_json, position, saved_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
        )?;

        for (position, record) in records.iter().enumerate() {
            let content_json = serde_json::to_string(&record.content_list)?;
            stmt.execute(params![
                user_id,
                order_id,
                record.container_item_id.index() as i64,
                record.container_name,
                content_json,
                position as i64,
                now,
            ])?;
        }
    }

    let new_revision = actual + 1;
    tx.execute(
        r#"INSERT INTO case_assignment_revision (user_id, order_id, revision, updated_at)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT(user_id, order_id)
           DO UPDATE SET revision = excluded.revision, updated_at = excluded.updated_at"#,
        params![user_id, order_id, new_revision as i64, now],
    )?;

    if abandoned.is_some_and(|flag| flag.load(Ordering::SeqCst)) {
        // tx drop 即回滚
        tracing::warn!(user_id, order_id, "调用方已放弃提交,回滚 case_assignment 写入");
        return Err(RepositoryError::DatabaseTransactionError(format!(
            "提交已放弃: order_id={}",
            order_id
        )));
    }

    tx.commit()?;
    tracing::debug!(user_id, order_id, revision = new_revision, rows = records.len(), "case_assignment replaced");
    Ok(new_revision)
}

/// 异步等待被丢弃时置位,通知阻塞线程放弃写入
struct AbandonOnDrop {
    flag: Arc<AtomicBool>,
    armed: bool,
}

impl AbandonOnDrop {
    fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for AbandonOnDrop {
    fn drop(&mut self) {
        if self.armed {
            self.flag.store(true, Ordering::SeqCst);
        }
    }
}

fn read_revision(conn: &Connection, user_id: &str, order_id: &str) -> RepositoryResult<u64> {
    let revision: Option<i64> = conn
        .query_row(
            "SELECT revision FROM case_assignment_revision WHERE user_id = ?1 AND order_id = ?2",
            params![user_id, order_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(revision.map(|r| r.max(0) as u64).unwrap_or(0))
}

fn to_index(raw: i64) -> RepositoryResult<usize> {
    usize::try_from(raw).map_err(|_| RepositoryError::FieldValueError {
        field: "container_item_id".to_string(),
        message: format!("负数下标: {}", raw),
    })
}

// ==========================================
// AssignmentStore 实现
// ==========================================
// SQLite 调用放到阻塞线程池,避免占住 async 执行器;
// 否则等锁期间 commit 的超时与取消都无法触发

#[async_trait]
impl AssignmentStore for CaseAssignmentRepository {
    async fn load_assignments(
        &self,
        user_id: &str,
        order_id: &str,
    ) -> RepositoryResult<SavedAssignments> {
        let conn = self.conn.clone();
        let user_id = user_id.to_string();
        let order_id = order_id.to_string();

        tokio::task::spawn_blocking(move || -> RepositoryResult<SavedAssignments> {
            let conn = lock_shared(&conn)?;
            load_saved(&conn, &user_id, &order_id)
        })
        .await
        .map_err(|e| RepositoryError::InternalError(format!("任务执行失败: {}", e)))?
    }

    async fn replace_assignments(
        &self,
        user_id: &str,
        order_id: &str,
        expected_revision: u64,
        records: &[CaseAssignmentRecord],
    ) -> RepositoryResult<u64> {
        let conn = self.conn.clone();
        let user_id = user_id.to_string();
        let order_id = order_id.to_string();
        let records = records.to_vec();

        let guard = AbandonOnDrop::new();
        let abandoned = guard.flag.clone();

        let result = tokio::task::spawn_blocking(move || -> RepositoryResult<u64> {
            let mut conn = lock_shared(&conn)?;
            replace_saved(
                &mut conn,
                &user_id,
                &order_id,
                expected_revision,
                &records,
                Some(abandoned.as_ref()),
            )
        })
        .await
        .map_err(|e| RepositoryError::InternalError(format!("任务执行失败: {}", e)));

        guard.disarm();
        result?
    }
}
