// ==========================================
// 租赁订单装箱标签系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{AssignmentApi, OrderApi};
use crate::config::config_manager::ConfigManager;
use crate::db::{ensure_schema, open_sqlite_connection};
use crate::repository::{CaseAssignmentRepository, LabelPresetRepository};

/// 应用状态
///
/// 包含所有API实例和共享资源（单用户、单连接）
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 当前用户
    pub user_id: String,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 订单浏览API
    pub order_api: Arc<OrderApi>,

    /// 人工装箱API
    pub assignment_api: Arc<AssignmentApi>,

    /// 分配仓储
    pub case_assignment_repo: Arc<CaseAssignmentRepository>,

    /// 标签预设仓储
    pub label_preset_repo: Arc<LabelPresetRepository>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    /// - user_id: 当前用户（分配与标签预设按用户隔离）
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误
    pub fn new(db_path: String, user_id: impl Into<String>) -> Result<Self, String> {
        let user_id = user_id.into();
        tracing::info!(db_path = %db_path, user_id = %user_id, "初始化AppState");

        // 共享连接
        let conn = open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        ensure_schema(&conn).map_err(|e| format!("数据库表初始化失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let case_assignment_repo = Arc::new(CaseAssignmentRepository::new(conn.clone()));
        let label_preset_repo = Arc::new(LabelPresetRepository::new(conn));

        // ==========================================
        // 初始化API层
        // ==========================================
        let order_api = Arc::new(OrderApi::new(config_manager.clone()));
        let assignment_api = Arc::new(
            AssignmentApi::new(case_assignment_repo.clone(), &config_manager, user_id.clone())
                .map_err(|e| format!("无法创建AssignmentApi: {}", e))?,
        );

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            user_id,
            config_manager,
            order_api,
            assignment_api,
            case_assignment_repo,
            label_preset_repo,
        })
    }
}

// ==========================================
// 辅助函数
// ==========================================

/// 获取默认数据库路径
///
/// # 返回
/// - 环境变量 RENTAL_CASE_LABELS_DB_PATH（非空时）
/// - 开发环境: 本地数据目录/rental-case-labels-dev/rental_case_labels.db
/// - 生产环境: 本地数据目录/rental-case-labels/rental_case_labels.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("RENTAL_CASE_LABELS_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./rental_case_labels.db");

    if let Some(data_dir) = dirs::data_local_dir() {
        #[cfg(debug_assertions)]
        {
            path = data_dir.join("rental-case-labels-dev");
        }

        #[cfg(not(debug_assertions))]
        {
            path = data_dir.join("rental-case-labels");
        }

        // 目录创建失败时由打开数据库报错
        std::fs::create_dir_all(&path).ok();
        path = path.join("rental_case_labels.db");
    }

    path.to_string_lossy().to_string()
}
