// ==========================================
// 租赁订单装箱标签系统 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 红线: 所有分配错误都是局部可恢复的,拒绝时状态不变
// ==========================================

use crate::domain::types::{ItemId, Placement};
use crate::repository::error::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssignmentError {
    // ===== 标识错误 =====
    #[error("物品不存在: item={item}, 订单共 {item_count} 项")]
    UnknownItem { item: ItemId, item_count: usize },

    #[error("目标不是箱体: item={0}")]
    NotAContainer(ItemId),

    #[error("箱体不能作为内容移动: item={0}")]
    ContainerNotMovable(ItemId),

    // ===== 状态错误 =====
    #[error("品类识别出的箱体不能取消: item={0}")]
    AutoDetectedCase(ItemId),

    #[error("来源位置不符: item={item}, 期望 {expected}, 实际 {actual}")]
    PlacementMismatch {
        item: ItemId,
        expected: Placement,
        actual: Placement,
    },

    #[error("未选择当前箱体")]
    NoActiveCase,
}

pub type AssignmentResult<T> = Result<T, AssignmentError>;

/// 编辑会话错误
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("没有打开的订单")]
    NoOpenOrder,

    #[error("订单无效: {0}")]
    InvalidOrder(String),

    #[error("提交已取消: order_id={0}")]
    Cancelled(String),

    #[error("提交超时: order_id={order_id}, timeout={timeout_ms}ms")]
    TimedOut { order_id: String, timeout_ms: u64 },

    #[error(transparent)]
    Assignment(#[from] AssignmentError),

    #[error(transparent)]
    Store(#[from] RepositoryError),
}

pub type SessionResult<T> = Result<T, SessionError>;
