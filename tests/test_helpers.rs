// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库初始化、测试订单构造
// ==========================================

#![allow(dead_code)]

use rental_case_labels::db::{ensure_schema, open_sqlite_connection};
use rental_case_labels::domain::{Category, Item, Order, OrderStatus};
use rusqlite::Connection;
use std::error::Error;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file
        .path()
        .to_str()
        .ok_or("临时文件路径不是 UTF-8")?
        .to_string();

    let conn = open_sqlite_connection(&db_path)?;
    ensure_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 打开共享连接
pub fn open_shared(db_path: &str) -> Arc<Mutex<Connection>> {
    Arc::new(Mutex::new(open_sqlite_connection(db_path).unwrap()))
}

/// 测试订单: 两个识别箱体 + 五个内容物品
///
/// 下标: 0=Case A, 1=c1, 2=Case B, 3=c2, 4=c3, 5=c4, 6=c5
pub fn two_case_order(id: &str) -> Order {
    Order {
        id: id.to_string(),
        order_ref: format!("REF-{}", id),
        customer_name: "Acme Events".to_string(),
        job_name: "Spring Gala".to_string(),
        job_date: "2025-04-01".to_string(),
        return_date: "2025-04-03".to_string(),
        venue: "Main Hall".to_string(),
        asset_code: format!("AC-{}", id),
        status: OrderStatus::Confirmed,
        items: vec![
            Item::new("Case A", 1)
                .with_category(Category::Case)
                .with_weight(8.0)
                .with_serial("SER-A"),
            Item::new("c1", 1).with_category(Category::Audio).with_weight(1.5),
            Item::new("Case B", 1).with_category(Category::Case),
            Item::new("c2", 2).with_category(Category::Cable).with_weight(0.25),
            Item::new("c3", 1).with_category(Category::Lighting),
            Item::new("c4", 1).with_category(Category::General),
            Item::new("c5", 3).with_category(Category::Video).with_weight(2.0),
        ],
        notes: None,
    }
}

/// 没有任何识别箱体的订单（可人工指定箱体）
pub fn loose_order(id: &str, names: &[&str]) -> Order {
    Order {
        id: id.to_string(),
        order_ref: format!("REF-{}", id),
        customer_name: "Globex".to_string(),
        job_name: "Trade Show".to_string(),
        job_date: "2025-05-10".to_string(),
        return_date: String::new(),
        venue: String::new(),
        asset_code: format!("AC-{}", id),
        status: OrderStatus::Confirmed,
        items: names
            .iter()
            .map(|name| Item::new(*name, 1).with_category(Category::General))
            .collect(),
        notes: None,
    }
}
