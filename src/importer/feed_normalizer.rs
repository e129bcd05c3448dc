// ==========================================
// 租赁订单装箱标签系统 - 订单源标准化
// ==========================================
// 职责: 把已取回的上游载荷转换为标准 Order
// 来源: Odoo (JSON-RPC sale.order / sale.order.line), currentRMS (opportunities)
// 红线: 不做网络请求,不做重试
// ==========================================

use crate::domain::order::{Item, Order};
use crate::domain::types::{Category, OrderStatus};
use crate::engine::classifier::CategoryClassifier;
use crate::importer::error::{ImportError, ImportResult};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::OnceLock;

static HTML_TAG: OnceLock<Regex> = OnceLock::new();

fn html_tag() -> &'static Regex {
    HTML_TAG.get_or_init(|| Regex::new(r"<[^>]*>").expect("Invalid HTML tag pattern"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedPlatform {
    Odoo,
    CurrentRms,
}

impl fmt::Display for FeedPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedPlatform::Odoo => write!(f, "odoo"),
            FeedPlatform::CurrentRms => write!(f, "currentrms"),
        }
    }
}

/// 多来源合并结果: 单个来源失败不影响其他来源
#[derive(Debug, Default)]
pub struct FeedBatch {
    pub orders: Vec<Order>,
    pub errors: Vec<String>,
}

// ==========================================
// FeedNormalizer - 订单源标准化器
// ==========================================
pub struct FeedNormalizer {
    classifier: CategoryClassifier,
    today: NaiveDate,
}

impl FeedNormalizer {
    pub fn new(classifier: CategoryClassifier) -> Self {
        Self {
            classifier,
            today: Local::now().date_naive(),
        }
    }

    /// 固定"今天"（Odoo 缺少下单日期时使用）
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    // ==========================================
    // Odoo
    // ==========================================

    /// 标准化单个 Odoo 租赁订单
    ///
    /// # 参数
    /// - order: sale.order search_read 结果中的一项
    /// - lines: 该订单 sale.order.line read 结果（数组）
    pub fn normalize_odoo(&self, order: &Value, lines: &Value) -> ImportResult<Order> {
        let platform = FeedPlatform::Odoo;
        let raw_id = id_field(order, platform)?;
        let name = str_field(order, "name");

        let status = match str_field(order, "rental_status") {
            Some("confirmed") | Some("pickup") => OrderStatus::Confirmed,
            Some("return") => OrderStatus::InProgress,
            Some("returned") => OrderStatus::Returned,
            _ => OrderStatus::Confirmed,
        };

        let customer_name = order
            .get("partner_id")
            .and_then(|p| p.get(1))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or("Unknown Customer");

        let job_date = str_field(order, "date_order")
            .map(odoo_date)
            .unwrap_or_else(|| self.today.format("%Y-%m-%d").to_string());
        let return_date = str_field(order, "rental_return_date")
            .map(odoo_date)
            .unwrap_or_default();

        let items = lines
            .as_array()
            .map(|lines| lines.iter().map(|line| self.odoo_line(line)).collect())
            .unwrap_or_default();

        let notes = str_field(order, "note")
            .map(|note| html_tag().replace_all(note, "").trim().to_string())
            .filter(|note| !note.is_empty());

        finish(Order {
            id: format!("odoo-{}", raw_id),
            order_ref: name
                .map(str::to_string)
                .unwrap_or_else(|| format!("ODO-{}", raw_id)),
            customer_name: customer_name.to_string(),
            job_name: name.unwrap_or("Rental Order").to_string(),
            job_date,
            return_date,
            venue: String::new(),
            asset_code: format!("ODO-{}", raw_id),
            status,
            items,
            notes,
        })
    }

    fn odoo_line(&self, line: &Value) -> Item {
        let product_name = line
            .get("product_id")
            .and_then(|p| p.get(1))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty());
        let line_name = str_field(line, "name");

        let display = product_name.or(line_name).unwrap_or("Product");
        // 品类按行描述优先识别
        let category = self
            .classifier
            .classify(line_name.or(product_name).unwrap_or(""));

        Item {
            name: self.classifier.clean_name(display),
            quantity: quantity_field(line, "product_uom_qty"),
            serial_number: None,
            weight: None,
            category: Some(category),
        }
    }

    // ==========================================
    // currentRMS
    // ==========================================

    /// 标准化 currentRMS opportunities 响应（{"opportunities": [...]}）
    pub fn normalize_current_rms_response(&self, response: &Value) -> ImportResult<Vec<Order>> {
        let opportunities = response
            .get("opportunities")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        opportunities
            .iter()
            .map(|opp| self.normalize_current_rms(opp))
            .collect()
    }

    /// 标准化单个 currentRMS opportunity
    pub fn normalize_current_rms(&self, opp: &Value) -> ImportResult<Order> {
        let platform = FeedPlatform::CurrentRms;
        let raw_id = id_field(opp, platform)?;

        let status = match opp.get("status").and_then(Value::as_i64) {
            Some(1) | Some(2) => OrderStatus::Confirmed,
            Some(3) => OrderStatus::InProgress,
            Some(4) => OrderStatus::Returned,
            _ => OrderStatus::Confirmed,
        };

        let items = opp
            .get("opportunity_items")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(|item| self.current_rms_item(item)).collect())
            .unwrap_or_default();

        finish(Order {
            id: format!("crms-{}", raw_id),
            order_ref: str_field(opp, "number")
                .map(str::to_string)
                .unwrap_or_else(|| format!("CRMS-{}", raw_id)),
            customer_name: str_field(opp, "member_name")
                .or_else(|| str_field(opp, "organisation_name"))
                .unwrap_or("Unknown")
                .to_string(),
            job_name: str_field(opp, "subject").unwrap_or("Opportunity").to_string(),
            job_date: str_field(opp, "starts_at").map(iso_date).unwrap_or_default(),
            return_date: str_field(opp, "ends_at").map(iso_date).unwrap_or_default(),
            venue: str_field(opp, "venue")
                .or_else(|| str_field(opp, "destination"))
                .unwrap_or("")
                .to_string(),
            asset_code: format!("CRMS-{}", raw_id),
            status,
            items,
            notes: str_field(opp, "description").map(str::to_string),
        })
    }

    fn current_rms_item(&self, item: &Value) -> Item {
        let raw_name = str_field(item, "name")
            .or_else(|| str_field(item, "product_name"))
            .unwrap_or("Item");
        let classified = self.classifier.classify_item(raw_name);

        // 产品组名是已知品类时直接采用,否则按名称识别
        let category = str_field(item, "product_group_name")
            .and_then(Category::from_label)
            .unwrap_or(classified.category);

        Item {
            name: classified.name,
            quantity: quantity_field(item, "quantity"),
            serial_number: str_field(item, "serial_number").map(str::to_string),
            weight: item
                .get("weight")
                .and_then(number_of)
                .filter(|w| *w > 0.0),
            category: Some(category),
        }
    }

    // ==========================================
    // 合并
    // ==========================================

    /// 合并多个来源的结果,失败来源记为 "<platform>: <message>"
    pub fn merge_feeds(
        &self,
        results: Vec<(FeedPlatform, ImportResult<Vec<Order>>)>,
    ) -> FeedBatch {
        let mut batch = FeedBatch::default();
        for (platform, result) in results {
            match result {
                Ok(orders) => batch.orders.extend(orders),
                Err(e) => {
                    tracing::warn!(%platform, error = %e, "订单源标准化失败");
                    batch.errors.push(format!("{}: {}", platform, e));
                }
            }
        }
        batch
    }
}

// ==========================================
// 字段读取辅助
// ==========================================

/// 非空字符串字段（Odoo 用 false 表示空值）
fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn id_field(value: &Value, platform: FeedPlatform) -> ImportResult<String> {
    match value.get("id") {
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(other) => Err(ImportError::FieldTypeError {
            platform: platform.to_string(),
            field: "id".to_string(),
            message: format!("不支持的类型: {}", other),
        }),
        None => Err(ImportError::MissingField {
            platform: platform.to_string(),
            field: "id".to_string(),
        }),
    }
}

fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// 数量: 缺失或小于 1 时按 1
fn quantity_field(value: &Value, key: &str) -> u32 {
    value
        .get(key)
        .and_then(number_of)
        .map(|q| q.round())
        .filter(|q| *q >= 1.0)
        .map(|q| q.min(f64::from(u32::MAX)) as u32)
        .unwrap_or(1)
}

/// Odoo 日期时间 "YYYY-MM-DD HH:MM:SS" -> "YYYY-MM-DD"
fn odoo_date(raw: &str) -> String {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.date().format("%Y-%m-%d").to_string())
        .unwrap_or_else(|_| raw.split(' ').next().unwrap_or(raw).to_string())
}

/// ISO 8601 日期时间 -> "YYYY-MM-DD"
fn iso_date(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive().format("%Y-%m-%d").to_string())
        .unwrap_or_else(|_| raw.split('T').next().unwrap_or(raw).to_string())
}

fn finish(order: Order) -> ImportResult<Order> {
    order.validate().map_err(ImportError::InvalidOrder)?;
    Ok(order)
}
