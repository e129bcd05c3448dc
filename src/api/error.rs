// ==========================================
// 租赁订单装箱标签系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型,把下层错误转换为用户可读的错误消息
// ==========================================

use crate::engine::error::{AssignmentError, SessionError};
use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    // ==========================================
    // 并发控制错误
    // ==========================================
    #[error("乐观锁冲突: {0}")]
    OptimisticLockFailure(String),

    #[error("提交已取消: {0}")]
    CommitCancelled(String),

    #[error("提交超时: {0}")]
    CommitTimeout(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 导入错误
    // ==========================================
    #[error("订单源导入失败: {0}")]
    ImportError(String),

    #[error("数据验证失败: {0}")]
    ValidationError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            // 并发控制错误
            RepositoryError::OptimisticLockFailure {
                user_id,
                order_id,
                expected,
                actual,
            } => ApiError::OptimisticLockFailure(format!(
                "订单{}的装箱分配已被其他会话修改（user={}, 期望revision={}, 实际revision={}）",
                order_id, user_id, expected, actual
            )),

            // 数据库错误
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }

            // 数据质量错误
            RepositoryError::ValidationError(msg) => ApiError::ValidationError(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::SerializationError(e) => ApiError::InternalError(e.to_string()),

            // 通用错误
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
        }
    }
}

// ==========================================
// 从引擎错误转换
// ==========================================
impl From<AssignmentError> for ApiError {
    fn from(err: AssignmentError) -> Self {
        match err {
            AssignmentError::UnknownItem { .. } => ApiError::InvalidInput(err.to_string()),
            AssignmentError::NoActiveCase => ApiError::InvalidStateTransition {
                from: "NO_ACTIVE_CASE".to_string(),
                to: "ASSIGN".to_string(),
            },
            _ => ApiError::BusinessRuleViolation(err.to_string()),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NoOpenOrder => ApiError::InvalidStateTransition {
                from: "IDLE".to_string(),
                to: "EDITING".to_string(),
            },
            SessionError::InvalidOrder(msg) => ApiError::ValidationError(msg),
            SessionError::Cancelled(order_id) => ApiError::CommitCancelled(order_id),
            SessionError::TimedOut {
                order_id,
                timeout_ms,
            } => ApiError::CommitTimeout(format!("order_id={}, timeout={}ms", order_id, timeout_ms)),
            SessionError::Assignment(e) => e.into(),
            SessionError::Store(e) => e.into(),
        }
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::InvalidOrder(msg) => ApiError::ValidationError(msg),
            other => ApiError::ImportError(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
