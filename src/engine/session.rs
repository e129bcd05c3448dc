// ==========================================
// 租赁订单装箱标签系统 - 编辑会话
// ==========================================
// 状态机: Idle -> Editing -> Committing -> Editing ... -> Idle
// - 打开订单进入 Editing,离开订单回到 Idle（未提交修改丢弃）
// - Committing 期间唯一的挂起点是持久化调用
// - 提交失败不回滚内存状态
// - 会话关闭后,进行中的提交结果被丢弃,不得落库
// ==========================================

use crate::domain::order::Order;
use crate::domain::types::{ItemId, Placement};
use crate::engine::assignment::AssignmentEngine;
use crate::engine::error::{AssignmentResult, SessionError, SessionResult};
use crate::engine::store::{AssignmentStore, SavedAssignments};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    Idle,       // 未打开订单
    Editing,    // 可编辑
    Committing, // 持久化进行中
}

/// 提交结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    pub revision: u64,
    pub record_count: usize,
}

#[derive(Debug)]
struct SessionSignals {
    state: watch::Sender<SessionState>,
    cancelled: watch::Sender<bool>,
}

/// 会话句柄: 供其他任务观察状态或取消会话（如页面跳转）
#[derive(Debug, Clone)]
pub struct SessionHandle {
    session_id: String,
    signals: Arc<SessionSignals>,
}

impl SessionHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn state(&self) -> SessionState {
        *self.signals.state.borrow()
    }

    pub fn is_cancelled(&self) -> bool {
        *self.signals.cancelled.borrow()
    }

    /// 取消会话: 进行中的提交立即返回 Cancelled
    pub fn cancel(&self) {
        self.signals.cancelled.send_replace(true);
        self.signals.state.send_replace(SessionState::Idle);
    }
}

/// Committing 状态守卫
///
/// 离开作用域时回到 Editing（含 commit future 被中途丢弃）;
/// 会话已取消时保持 Idle
struct CommittingGuard {
    signals: Arc<SessionSignals>,
}

impl CommittingGuard {
    fn enter(signals: Arc<SessionSignals>) -> Self {
        signals.state.send_replace(SessionState::Committing);
        Self { signals }
    }
}

impl Drop for CommittingGuard {
    fn drop(&mut self) {
        if !*self.signals.cancelled.borrow() {
            self.signals.state.send_replace(SessionState::Editing);
        }
    }
}

// ==========================================
// EditingSession - 单订单编辑会话
// ==========================================
#[derive(Debug)]
pub struct EditingSession {
    session_id: String,
    user_id: String,
    engine: AssignmentEngine,
    revision: u64,
    signals: Arc<SessionSignals>,
}

impl EditingSession {
    /// 打开订单并恢复已保存的分配
    pub fn open(user_id: impl Into<String>, order: Order, saved: SavedAssignments) -> Self {
        let mut engine = AssignmentEngine::new(order);
        engine.restore(&saved.records);

        let (state_tx, _) = watch::channel(SessionState::Editing);
        let (cancel_tx, _) = watch::channel(false);

        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            engine,
            revision: saved.revision,
            signals: Arc::new(SessionSignals {
                state: state_tx,
                cancelled: cancel_tx,
            }),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn order_id(&self) -> &str {
        &self.engine.order().id
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn engine(&self) -> &AssignmentEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut AssignmentEngine {
        &mut self.engine
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            session_id: self.session_id.clone(),
            signals: Arc::clone(&self.signals),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.signals.state.borrow()
    }

    pub fn is_cancelled(&self) -> bool {
        *self.signals.cancelled.borrow()
    }

    // ===== 变更操作（委托给分配引擎） =====

    pub fn elect_as_case(&mut self, id: ItemId) -> AssignmentResult<bool> {
        self.engine.elect_as_case(id)
    }

    pub fn relocate(&mut self, item: ItemId, from: Placement, to: Placement) -> AssignmentResult<()> {
        self.engine.relocate(item, from, to)
    }

    pub fn assign_exclusive(&mut self, item: ItemId, container: ItemId) -> AssignmentResult<()> {
        self.engine.assign_exclusive(item, container)
    }

    /// 提交当前分配（整单替换）
    ///
    /// # 参数
    /// - store: 持久化协作方
    /// - timeout: None 表示不限时
    ///
    /// # 说明
    /// - 记录在挂起前生成快照
    /// - 失败时内存状态保持不变,可直接重试
    /// - 成功后采用新的修订号
    pub async fn commit<S>(&mut self, store: &S, timeout: Option<Duration>) -> SessionResult<CommitOutcome>
    where
        S: AssignmentStore + ?Sized,
    {
        let order_id = self.engine.order().id.clone();
        if self.is_cancelled() {
            return Err(SessionError::Cancelled(order_id));
        }

        let records = self.engine.build_records();
        let expected_revision = self.revision;
        let _committing = CommittingGuard::enter(self.signals.clone());
        tracing::info!(
            session_id = %self.session_id,
            order_id = %order_id,
            records = records.len(),
            expected_revision,
            "提交装箱分配"
        );

        let mut cancelled_rx = self.signals.cancelled.subscribe();
        let write = async {
            let fut = store.replace_assignments(&self.user_id, &order_id, expected_revision, &records);
            match timeout {
                Some(limit) => match tokio::time::timeout(limit, fut).await {
                    Ok(res) => res.map_err(SessionError::from),
                    Err(_) => Err(SessionError::TimedOut {
                        order_id: order_id.clone(),
                        timeout_ms: limit.as_millis() as u64,
                    }),
                },
                None => fut.await.map_err(SessionError::from),
            }
        };

        let result = tokio::select! {
            biased;
            _ = cancelled_rx.wait_for(|cancelled| *cancelled) => {
                Err(SessionError::Cancelled(order_id.clone()))
            }
            res = write => res,
        };

        match result {
            Ok(new_revision) => {
                self.revision = new_revision;
                tracing::info!(order_id = %order_id, revision = new_revision, "装箱分配已保存");
                Ok(CommitOutcome {
                    revision: new_revision,
                    record_count: records.len(),
                })
            }
            Err(SessionError::Cancelled(order_id)) => {
                tracing::warn!(order_id = %order_id, "会话已关闭,丢弃提交");
                Err(SessionError::Cancelled(order_id))
            }
            Err(e) => {
                tracing::warn!(order_id = %order_id, error = %e, "装箱分配保存失败,内存状态保留");
                Err(e)
            }
        }
    }
}

// ==========================================
// SessionController - 会话控制器
// ==========================================
// 同一时刻最多一个打开的订单
pub struct SessionController<S: AssignmentStore> {
    store: Arc<S>,
    user_id: String,
    commit_timeout: Option<Duration>,
    current: Option<EditingSession>,
}

impl<S: AssignmentStore> SessionController<S> {
    pub fn new(store: Arc<S>, user_id: impl Into<String>) -> Self {
        Self {
            store,
            user_id: user_id.into(),
            commit_timeout: None,
            current: None,
        }
    }

    pub fn with_commit_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.commit_timeout = timeout;
        self
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn state(&self) -> SessionState {
        self.current
            .as_ref()
            .map(EditingSession::state)
            .unwrap_or(SessionState::Idle)
    }

    /// 打开订单（关闭并丢弃之前的会话）
    pub async fn open_order(&mut self, order: Order) -> SessionResult<&mut EditingSession> {
        order.validate().map_err(SessionError::InvalidOrder)?;
        self.close();

        let saved = self.store.load_assignments(&self.user_id, &order.id).await?;
        tracing::info!(
            user_id = %self.user_id,
            order_id = %order.id,
            revision = saved.revision,
            saved_cases = saved.records.len(),
            "打开订单编辑"
        );

        Ok(self
            .current
            .insert(EditingSession::open(self.user_id.clone(), order, saved)))
    }

    /// 离开订单: 取消进行中的提交并丢弃未提交修改
    pub fn close(&mut self) {
        if let Some(session) = self.current.take() {
            session.handle().cancel();
            tracing::info!(order_id = %session.order_id(), "关闭订单编辑");
        }
    }

    pub fn session(&self) -> Option<&EditingSession> {
        self.current.as_ref()
    }

    pub fn session_mut(&mut self) -> SessionResult<&mut EditingSession> {
        self.current.as_mut().ok_or(SessionError::NoOpenOrder)
    }

    /// 提交当前会话
    ///
    /// 会话在提交期间被取消时回到 Idle
    pub async fn commit(&mut self) -> SessionResult<CommitOutcome> {
        let timeout = self.commit_timeout;
        let store = Arc::clone(&self.store);
        let session = self.current.as_mut().ok_or(SessionError::NoOpenOrder)?;

        let result = session.commit(store.as_ref(), timeout).await;
        if matches!(result, Err(SessionError::Cancelled(_))) {
            self.current = None;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::case::CaseAssignmentRecord;
    use crate::domain::order::Item;
    use crate::domain::types::{Category, OrderStatus};
    use crate::engine::store::InMemoryAssignmentStore;
    use crate::repository::error::{RepositoryError, RepositoryResult};
    use async_trait::async_trait;

    fn order() -> Order {
        Order {
            id: "ord-1".to_string(),
            order_ref: "R-1".to_string(),
            customer_name: "Acme".to_string(),
            job_name: "Gala".to_string(),
            job_date: "2025-02-15".to_string(),
            return_date: String::new(),
            venue: String::new(),
            asset_code: "ORD-1".to_string(),
            status: OrderStatus::Confirmed,
            items: vec![
                Item::new("Road Case", 1).with_category(Category::Case),
                Item::new("Mixer", 1).with_category(Category::Audio),
                Item::new("Cable", 4).with_category(Category::Cable),
            ],
            notes: None,
        }
    }

    /// 永远失败的存储
    struct FailingStore;

    #[async_trait]
    impl AssignmentStore for FailingStore {
        async fn load_assignments(&self, _: &str, _: &str) -> RepositoryResult<SavedAssignments> {
            Ok(SavedAssignments::default())
        }

        async fn replace_assignments(
            &self,
            _: &str,
            _: &str,
            _: u64,
            _: &[CaseAssignmentRecord],
        ) -> RepositoryResult<u64> {
            Err(RepositoryError::DatabaseTransactionError("disk full".to_string()))
        }
    }

    /// 永不返回的存储
    struct PendingStore;

    #[async_trait]
    impl AssignmentStore for PendingStore {
        async fn load_assignments(&self, _: &str, _: &str) -> RepositoryResult<SavedAssignments> {
            Ok(SavedAssignments::default())
        }

        async fn replace_assignments(
            &self,
            _: &str,
            _: &str,
            _: u64,
            _: &[CaseAssignmentRecord],
        ) -> RepositoryResult<u64> {
            std::future::pending::<()>().await;
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_state_machine_idle_editing_idle() {
        let mut controller = SessionController::new(Arc::new(InMemoryAssignmentStore::new()), "u1");
        assert_eq!(controller.state(), SessionState::Idle);

        controller.open_order(order()).await.unwrap();
        assert_eq!(controller.state(), SessionState::Editing);

        controller.close();
        assert_eq!(controller.state(), SessionState::Idle);
        assert!(matches!(controller.commit().await, Err(SessionError::NoOpenOrder)));
    }

    #[tokio::test]
    async fn test_commit_then_reopen_restores() {
        let store = Arc::new(InMemoryAssignmentStore::new());
        let mut controller = SessionController::new(Arc::clone(&store), "u1");

        let session = controller.open_order(order()).await.unwrap();
        session.assign_exclusive(ItemId(2), ItemId(0)).unwrap();
        let outcome = controller.commit().await.unwrap();
        assert_eq!(outcome, CommitOutcome { revision: 1, record_count: 1 });
        assert_eq!(controller.state(), SessionState::Editing);

        let reopened = controller.open_order(order()).await.unwrap();
        assert_eq!(reopened.revision(), 1);
        assert_eq!(reopened.engine().contents_of(ItemId(0)), &[ItemId(2)]);
    }

    #[tokio::test]
    async fn test_failed_commit_keeps_state() {
        let mut controller = SessionController::new(Arc::new(FailingStore), "u1");
        let session = controller.open_order(order()).await.unwrap();
        session.assign_exclusive(ItemId(1), ItemId(0)).unwrap();
        let before = session.engine().snapshot();

        let err = controller.commit().await.unwrap_err();
        assert!(matches!(err, SessionError::Store(_)));
        assert_eq!(controller.state(), SessionState::Editing);
        let session = controller.session_mut().unwrap();
        assert_eq!(session.engine().snapshot(), before);
        assert_eq!(session.revision(), 0);
    }

    #[tokio::test]
    async fn test_cancel_discards_in_flight_commit() {
        let mut session = EditingSession::open("u1", order(), SavedAssignments::default());
        let handle = session.handle();

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            handle.cancel();
        });

        let result = session.commit(&PendingStore, None).await;
        canceller.await.unwrap();
        assert!(matches!(result, Err(SessionError::Cancelled(_))));
        assert_eq!(session.state(), SessionState::Idle);

        // 取消后的会话不能再提交
        let store = InMemoryAssignmentStore::new();
        assert!(matches!(
            session.commit(&store, None).await,
            Err(SessionError::Cancelled(_))
        ));
        assert_eq!(store.load_assignments("u1", "ord-1").await.unwrap().revision, 0);
    }

    #[tokio::test]
    async fn test_commit_timeout() {
        let mut session = EditingSession::open("u1", order(), SavedAssignments::default());
        let result = session
            .commit(&PendingStore, Some(Duration::from_millis(10)))
            .await;
        assert!(matches!(result, Err(SessionError::TimedOut { timeout_ms: 10, .. })));
        assert_eq!(session.state(), SessionState::Editing);
    }

    #[tokio::test]
    async fn test_dropped_commit_returns_to_editing() {
        let mut session = EditingSession::open("u1", order(), SavedAssignments::default());
        let handle = session.handle();

        // 调用方自己的超时丢弃了 commit future
        let outer = tokio::time::timeout(
            Duration::from_millis(10),
            session.commit(&PendingStore, None),
        )
        .await;
        assert!(outer.is_err());
        assert_eq!(session.state(), SessionState::Editing);
        assert_eq!(handle.state(), SessionState::Editing);

        // 仍可继续编辑与提交
        session.assign_exclusive(ItemId(1), ItemId(0)).unwrap();
        let store = InMemoryAssignmentStore::new();
        assert_eq!(session.commit(&store, None).await.unwrap().revision, 1);
    }

    #[tokio::test]
    async fn test_stale_session_cannot_overwrite_newer_commit() {
        let store = Arc::new(InMemoryAssignmentStore::new());
        let mut stale = EditingSession::open("u1", order(), SavedAssignments::default());
        let mut fresh = EditingSession::open("u1", order(), SavedAssignments::default());

        fresh.assign_exclusive(ItemId(1), ItemId(0)).unwrap();
        fresh.commit(store.as_ref(), None).await.unwrap();

        let err = stale.commit(store.as_ref(), None).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Store(RepositoryError::OptimisticLockFailure { expected: 0, actual: 1, .. })
        ));
        let saved = store.load_assignments("u1", "ord-1").await.unwrap();
        assert_eq!(saved.records[0].content_list.len(), 1);
    }
}
