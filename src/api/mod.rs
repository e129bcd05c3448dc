// ==========================================
// 租赁订单装箱标签系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供界面层/命令行调用
// ==========================================

pub mod assignment_api;
pub mod error;
pub mod order_api;

// 重导出核心类型
pub use assignment_api::{AssignmentApi, AssignmentView};
pub use error::{ApiError, ApiResult};
pub use order_api::OrderApi;
