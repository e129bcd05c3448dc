// ==========================================
// 租赁订单装箱标签系统 - 分配持久化接口
// ==========================================
// Engine 层定义 trait,Repository 层实现
// 语义: 按 (user_id, order_id) 整单替换,带修订号乐观锁
// ==========================================

use crate::domain::case::CaseAssignmentRecord;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// 已保存的分配（修订号 0 表示从未保存）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SavedAssignments {
    pub revision: u64,
    pub records: Vec<CaseAssignmentRecord>,
}

#[async_trait]
pub trait AssignmentStore: Send + Sync {
    /// 读取已保存的分配
    async fn load_assignments(
        &self,
        user_id: &str,
        order_id: &str,
    ) -> RepositoryResult<SavedAssignments>;

    /// 整单替换
    ///
    /// # 参数
    /// - expected_revision: 会话读取时的修订号
    ///
    /// # 返回
    /// - Ok(new_revision)
    /// - Err(OptimisticLockFailure): 期间已有其他提交落库
    ///
    /// # 红线
    /// - 删除与插入必须原子完成,失败时保留旧记录
    async fn replace_assignments(
        &self,
        user_id: &str,
        order_id: &str,
        expected_revision: u64,
        records: &[CaseAssignmentRecord],
    ) -> RepositoryResult<u64>;
}

// ==========================================
// InMemoryAssignmentStore - 内存实现
// ==========================================
// 用于无数据库场景（预览/测试）
#[derive(Debug, Default)]
pub struct InMemoryAssignmentStore {
    entries: Mutex<HashMap<(String, String), SavedAssignments>>,
}

impl InMemoryAssignmentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AssignmentStore for InMemoryAssignmentStore {
    async fn load_assignments(
        &self,
        user_id: &str,
        order_id: &str,
    ) -> RepositoryResult<SavedAssignments> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        Ok(entries
            .get(&(user_id.to_string(), order_id.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn replace_assignments(
        &self,
        user_id: &str,
        order_id: &str,
        expected_revision: u64,
        records: &[CaseAssignmentRecord],
    ) -> RepositoryResult<u64> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        let entry = entries
            .entry((user_id.to_string(), order_id.to_string()))
            .or_default();

        if entry.revision != expected_revision {
            return Err(RepositoryError::OptimisticLockFailure {
                user_id: user_id.to_string(),
                order_id: order_id.to_string(),
                expected: expected_revision,
                actual: entry.revision,
            });
        }

        entry.revision += 1;
        entry.records = records.to_vec();
        Ok(entry.revision)
    }
}
