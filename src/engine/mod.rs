// ==========================================
// 租赁订单装箱标签系统 - 引擎层
// ==========================================
// 职责: 品类识别、自动装箱解析、人工分配与编辑会话
// 红线: Engine 不拼 SQL,持久化通过 AssignmentStore trait 注入
// ==========================================

pub mod adapters;
pub mod assignment;
pub mod classifier;
pub mod error;
pub mod resolver;
pub mod session;
pub mod store;

// 重导出核心引擎
pub use adapters::{ActiveCaseToggle, DragRelocate};
pub use assignment::AssignmentEngine;
pub use classifier::{CategoryClassifier, ClassifiedName, CASE_KEYWORDS};
pub use error::{AssignmentError, AssignmentResult, SessionError, SessionResult};
pub use resolver::CaseResolver;
pub use session::{CommitOutcome, EditingSession, SessionController, SessionHandle, SessionState};
pub use store::{AssignmentStore, InMemoryAssignmentStore, SavedAssignments};
