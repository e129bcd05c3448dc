// ==========================================
// 租赁订单装箱标签系统 - 领域模型层
// ==========================================
// 职责: 定义订单、物品、装箱视图、分配状态等领域类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod assignment;
pub mod case;
pub mod label;
pub mod order;
pub mod types;

// 重导出核心类型
pub use assignment::AssignmentState;
pub use case::{round_weight, AssignedContent, CaseAssignmentRecord, ResolvedCase, UNASSIGNED_CASE_NAME};
pub use label::{FontSize, LabelMode, LabelOrientation, LabelPreset, LabelPresetKey, LabelSettings};
pub use order::{Item, Order};
pub use types::{Category, ItemId, OrderStatus, Placement};
