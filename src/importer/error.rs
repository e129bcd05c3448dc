// ==========================================
// 租赁订单装箱标签系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 数据映射错误 =====
    #[error("字段缺失 ({platform}): {field}")]
    MissingField { platform: String, field: String },

    #[error("字段类型错误 ({platform}, 字段 {field}): {message}")]
    FieldTypeError {
        platform: String,
        field: String,
        message: String,
    },

    #[error("订单数据无效: {0}")]
    InvalidOrder(String),

    // ===== 解析错误 =====
    #[error("JSON 解析失败: {0}")]
    JsonParseError(#[from] serde_json::Error),
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
