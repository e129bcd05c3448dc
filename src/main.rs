// ==========================================
// 租赁订单装箱标签系统 - 命令行入口
// ==========================================
// Usage:
//   rental-case-labels preview <orders.json> [order_id...]
//   rental-case-labels search <orders.json> <query>
//   rental-case-labels import-crms <opportunities.json>
//   rental-case-labels saved <order_id>
//   rental-case-labels config <key> [value]
//
// 环境变量:
//   RENTAL_CASE_LABELS_DB_PATH  数据库路径
//   RENTAL_CASE_LABELS_USER     当前用户（默认 local）
// ==========================================

use anyhow::{bail, Context};
use rental_case_labels::app::{get_default_db_path, AppState};
use rental_case_labels::domain::Order;
use std::path::Path;

fn read_json(path: &str) -> anyhow::Result<serde_json::Value> {
    let raw = std::fs::read_to_string(Path::new(path))
        .with_context(|| format!("无法读取文件: {}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("JSON 解析失败: {}", path))
}

/// 订单文件: 单个订单或订单数组
fn read_orders(path: &str) -> anyhow::Result<Vec<Order>> {
    let value = read_json(path)?;
    let orders = if value.is_array() {
        serde_json::from_value(value)?
    } else {
        vec![serde_json::from_value(value)?]
    };
    Ok(orders)
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    rental_case_labels::logging::init();

    let mut args = std::env::args().skip(1);
    let command = args.next().unwrap_or_else(|| "help".to_string());
    let rest: Vec<String> = args.collect();

    let db_path = get_default_db_path();
    let user_id = std::env::var("RENTAL_CASE_LABELS_USER")
        .ok()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| "local".to_string());

    tracing::info!(
        version = rental_case_labels::VERSION,
        command = %command,
        "{}",
        rental_case_labels::APP_NAME
    );

    let state = AppState::new(db_path, user_id).map_err(anyhow::Error::msg)?;

    match (command.as_str(), rest.as_slice()) {
        ("preview", [path, selected @ ..]) => {
            let orders = read_orders(path)?;
            let selected: Vec<String> = if selected.is_empty() {
                orders.iter().map(|o| o.id.clone()).collect()
            } else {
                selected.to_vec()
            };
            print_json(&state.order_api.preview_cases(&orders, &selected))
        }
        ("search", [path, query]) => {
            let orders = read_orders(path)?;
            print_json(&state.order_api.search(&orders, query))
        }
        ("import-crms", [path]) => {
            let response = read_json(path)?;
            let orders = state.order_api.import_current_rms(&response)?;
            print_json(&orders)
        }
        ("saved", [order_id]) => {
            let saved = state
                .case_assignment_repo
                .find_by_order(&state.user_id, order_id)?;
            println!("revision={}", saved.revision);
            print_json(&saved.records)
        }
        ("config", [key]) => {
            match state.config_manager.get_config_value(key)? {
                Some(value) => println!("{}={}", key, value),
                None => println!("{} (未设置)", key),
            }
            Ok(())
        }
        ("config", [key, value]) => {
            state.config_manager.set_config_value(key, value)?;
            println!("{}={}", key, value);
            Ok(())
        }
        ("help", _) => {
            println!(
                "用法: rental-case-labels <preview|search|import-crms|saved|config> [参数...]"
            );
            Ok(())
        }
        (other, _) => bail!("未知命令或参数不足: {}", other),
    }
}
