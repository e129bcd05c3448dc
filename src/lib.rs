// ==========================================
// 租赁订单装箱标签系统 - 核心库
// ==========================================
// 职责: 订单物品品类识别、自动装箱解析、人工装箱分配
// 技术栈: Rust + SQLite (rusqlite) + tokio
// 红线: 同一内容物品最多属于一个箱体
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 导入层 - 上游订单源
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 状态组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{Category, ItemId, OrderStatus, Placement};

// 领域实体
pub use domain::{
    AssignmentState, CaseAssignmentRecord, Item, LabelPreset, LabelSettings, Order, ResolvedCase,
};

// 引擎
pub use engine::{
    ActiveCaseToggle, AssignmentEngine, AssignmentStore, CaseResolver, CategoryClassifier,
    DragRelocate, SessionController, SessionState,
};

// API
pub use api::{ApiError, AssignmentApi, OrderApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "租赁订单装箱标签系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
