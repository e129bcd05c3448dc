// ==========================================
// 租赁订单装箱标签系统 - 人工装箱 API
// ==========================================
// 职责: 打开/离开订单、人工箱体切换、物品移动、提交
// 并发: 会话由 tokio Mutex 串行化;离开订单通过会话句柄取消,
//       不需要等待进行中的提交释放锁
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::assignment::AssignmentState;
use crate::domain::case::ResolvedCase;
use crate::domain::order::Order;
use crate::domain::types::{ItemId, Placement};
use crate::engine::adapters::{ActiveCaseToggle, DragRelocate};
use crate::engine::session::{CommitOutcome, SessionController, SessionHandle, SessionState};
use crate::repository::case_assignment_repo::CaseAssignmentRepository;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;

/// 当前订单的编辑视图
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentView {
    pub order_id: String,
    pub state: SessionState,
    pub revision: u64,
    pub active_case: Option<ItemId>,
    pub container_ids: Vec<ItemId>,
    pub unassigned_ids: Vec<ItemId>,
    pub assignment: AssignmentState,
    pub cases: Vec<ResolvedCase>,
}

struct Workspace {
    controller: SessionController<CaseAssignmentRepository>,
    toggle: ActiveCaseToggle,
}

/// 人工装箱API
pub struct AssignmentApi {
    workspace: AsyncMutex<Workspace>,
    // 当前会话句柄（离开订单时无需拿到 workspace 锁即可取消）
    handle: Mutex<Option<SessionHandle>>,
    drag: DragRelocate,
}

impl AssignmentApi {
    /// 创建新的AssignmentApi实例
    ///
    /// # 参数
    /// - repo: 分配持久化仓储
    /// - config_manager: 读取提交超时
    /// - user_id: 当前用户
    pub fn new(
        repo: Arc<CaseAssignmentRepository>,
        config_manager: &ConfigManager,
        user_id: impl Into<String>,
    ) -> ApiResult<Self> {
        let controller =
            SessionController::new(repo, user_id).with_commit_timeout(config_manager.commit_timeout()?);
        Ok(Self {
            workspace: AsyncMutex::new(Workspace {
                controller,
                toggle: ActiveCaseToggle::new(),
            }),
            handle: Mutex::new(None),
            drag: DragRelocate,
        })
    }

    fn set_handle(&self, handle: Option<SessionHandle>) -> ApiResult<()> {
        let mut guard = self
            .handle
            .lock()
            .map_err(|e| ApiError::InternalError(format!("会话句柄锁获取失败: {}", e)))?;
        *guard = handle;
        Ok(())
    }

    /// 当前会话状态（不等待进行中的提交）
    pub fn state(&self) -> ApiResult<SessionState> {
        let guard = self
            .handle
            .lock()
            .map_err(|e| ApiError::InternalError(format!("会话句柄锁获取失败: {}", e)))?;
        Ok(guard
            .as_ref()
            .filter(|h| !h.is_cancelled())
            .map(SessionHandle::state)
            .unwrap_or(SessionState::Idle))
    }

    // ==========================================
    // 会话生命周期
    // ==========================================

    /// 打开订单（离开之前的订单,未提交修改丢弃）
    pub async fn open_order(&self, order: Order) -> ApiResult<AssignmentView> {
        self.leave_order().await?;

        let mut ws = self.workspace.lock().await;
        let handle = ws.controller.open_order(order).await?.handle();
        ws.toggle.clear();
        self.set_handle(Some(handle))?;
        Self::view_of(&ws)
    }

    /// 离开订单: 先取消进行中的提交,再关闭会话
    pub async fn leave_order(&self) -> ApiResult<()> {
        let handle = {
            let mut guard = self
                .handle
                .lock()
                .map_err(|e| ApiError::InternalError(format!("会话句柄锁获取失败: {}", e)))?;
            guard.take()
        };
        if let Some(handle) = handle {
            handle.cancel();
        }

        let mut ws = self.workspace.lock().await;
        ws.controller.close();
        ws.toggle.clear();
        Ok(())
    }

    pub async fn view(&self) -> ApiResult<AssignmentView> {
        let ws = self.workspace.lock().await;
        Self::view_of(&ws)
    }

    // ==========================================
    // 变更操作
    // ==========================================

    /// 切换人工箱体
    ///
    /// # 返回
    /// - Ok(true): 已成为人工箱体
    /// - Ok(false): 已取消,原内容回到未分配
    pub async fn elect_as_case(&self, item: ItemId) -> ApiResult<bool> {
        let mut ws = self.workspace.lock().await;
        let Workspace { controller, toggle } = &mut *ws;
        let session = controller.session_mut()?;
        Ok(toggle.elect_as_case(session.engine_mut(), item)?)
    }

    /// 显式移动（来源必须与当前位置一致）
    pub async fn relocate(&self, item: ItemId, from: Placement, to: Placement) -> ApiResult<()> {
        let mut ws = self.workspace.lock().await;
        ws.controller.session_mut()?.relocate(item, from, to)?;
        Ok(())
    }

    /// 拖拽放置（来源取当前位置）
    pub async fn drop_item(&self, item: ItemId, target: Placement) -> ApiResult<()> {
        let mut ws = self.workspace.lock().await;
        let session = ws.controller.session_mut()?;
        self.drag.drop_item(session.engine_mut(), item, target)?;
        Ok(())
    }

    pub async fn assign_exclusive(&self, item: ItemId, container: ItemId) -> ApiResult<()> {
        let mut ws = self.workspace.lock().await;
        ws.controller.session_mut()?.assign_exclusive(item, container)?;
        Ok(())
    }

    pub async fn select_case(&self, case_id: ItemId) -> ApiResult<()> {
        let mut ws = self.workspace.lock().await;
        let Workspace { controller, toggle } = &mut *ws;
        let session = controller.session_mut()?;
        toggle.select_case(session.engine(), case_id)?;
        Ok(())
    }

    /// 勾选/取消物品（相对当前选中箱体）
    pub async fn toggle_item(&self, item: ItemId) -> ApiResult<bool> {
        let mut ws = self.workspace.lock().await;
        let Workspace { controller, toggle } = &mut *ws;
        let session = controller.session_mut()?;
        Ok(toggle.toggle(session.engine_mut(), item)?)
    }

    // ==========================================
    // 提交
    // ==========================================

    /// 提交当前订单的装箱分配
    pub async fn commit(&self) -> ApiResult<CommitOutcome> {
        let mut ws = self.workspace.lock().await;
        let result = ws.controller.commit().await;
        if matches!(result, Err(crate::engine::SessionError::Cancelled(_))) {
            ws.toggle.clear();
        }
        Ok(result?)
    }

    fn view_of(ws: &Workspace) -> ApiResult<AssignmentView> {
        let session = ws
            .controller
            .session()
            .ok_or_else(|| ApiError::from(crate::engine::SessionError::NoOpenOrder))?;
        let engine = session.engine();

        Ok(AssignmentView {
            order_id: session.order_id().to_string(),
            state: session.state(),
            revision: session.revision(),
            active_case: ws.toggle.active(),
            container_ids: engine.all_container_ids(),
            unassigned_ids: engine.unassigned_ids(),
            assignment: engine.snapshot(),
            cases: engine.assigned_cases(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::Item;
    use crate::domain::types::{Category, OrderStatus};
    use rusqlite::Connection;

    fn order() -> Order {
        Order {
            id: "o1".to_string(),
            order_ref: "R1".to_string(),
            customer_name: "Acme".to_string(),
            job_name: "Gala".to_string(),
            job_date: "2025-01-10".to_string(),
            return_date: String::new(),
            venue: String::new(),
            asset_code: "AC-1".to_string(),
            status: OrderStatus::Confirmed,
            items: vec![
                Item::new("Case A", 1).with_category(Category::Case),
                Item::new("Mic", 2).with_category(Category::Audio),
                Item::new("Speaker", 1).with_category(Category::Audio),
            ],
            notes: None,
        }
    }

    fn api() -> AssignmentApi {
        let conn = Arc::new(Mutex::new(Connection::open_in_memory().unwrap()));
        let config = ConfigManager::from_connection(conn.clone()).unwrap();
        let repo = Arc::new(CaseAssignmentRepository::new(conn));
        AssignmentApi::new(repo, &config, "user-1").unwrap()
    }

    #[tokio::test]
    async fn test_requires_open_order() {
        let api = api();
        assert_eq!(api.state().unwrap(), SessionState::Idle);
        let err = api.assign_exclusive(ItemId(1), ItemId(0)).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidStateTransition { .. }));
    }

    #[tokio::test]
    async fn test_toggle_commit_and_reopen() {
        let api = api();
        api.open_order(order()).await.unwrap();
        assert_eq!(api.state().unwrap(), SessionState::Editing);

        api.select_case(ItemId(0)).await.unwrap();
        assert!(api.toggle_item(ItemId(1)).await.unwrap());
        api.drop_item(ItemId(2), Placement::Case(ItemId(0))).await.unwrap();

        let outcome = api.commit().await.unwrap();
        assert_eq!(outcome.revision, 1);
        assert_eq!(outcome.record_count, 1);

        api.leave_order().await.unwrap();
        assert_eq!(api.state().unwrap(), SessionState::Idle);

        let view = api.open_order(order()).await.unwrap();
        assert_eq!(view.revision, 1);
        assert_eq!(view.active_case, None);
        assert_eq!(view.assignment.contents_of(ItemId(0)), &[ItemId(1), ItemId(2)]);
        assert!(view.unassigned_ids.is_empty());
    }

    #[tokio::test]
    async fn test_toggle_without_active_case_is_rejected() {
        let api = api();
        api.open_order(order()).await.unwrap();
        let err = api.toggle_item(ItemId(1)).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidStateTransition { .. }));
    }
}
