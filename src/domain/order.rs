// ==========================================
// 租赁订单装箱标签系统 - 订单领域模型
// ==========================================
// 订单与物品由订单源产出,会话期间只读
// 红线: items 顺序有意义（决定轮转分配）
// ==========================================

use crate::domain::types::{deserialize_optional_category, Category, ItemId, OrderStatus};
use serde::{Deserialize, Serialize};

// ==========================================
// Item - 订单物品
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub name: String,                 // 显示名称（已清洗）
    pub quantity: u32,                // 数量 (>= 1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>, // 序列号
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,          // 单件重量 (kg)
    #[serde(
        default,
        alias = "productCategory",
        deserialize_with = "deserialize_optional_category",
        skip_serializing_if = "Option::is_none"
    )]
    pub category: Option<Category>,   // 品类 (None = 未分类)
}

impl Item {
    pub fn new(name: impl Into<String>, quantity: u32) -> Self {
        Self {
            name: name.into(),
            quantity,
            serial_number: None,
            weight: None,
            category: None,
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn with_serial(mut self, serial: impl Into<String>) -> Self {
        self.serial_number = Some(serial.into());
        self
    }

    /// 是否被品类识别为箱体
    pub fn is_case(&self) -> bool {
        self.category.map(|c| c.is_case()).unwrap_or(false)
    }

    /// 行重量 = 单件重量 × 数量（缺失重量按 0 计）
    pub fn line_weight(&self) -> f64 {
        self.weight.unwrap_or(0.0) * f64::from(self.quantity)
    }
}

// ==========================================
// Order - 租赁订单
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub order_ref: String,
    pub customer_name: String,
    pub job_name: String,
    pub job_date: String,
    #[serde(default)]
    pub return_date: String,
    #[serde(default)]
    pub venue: String,
    #[serde(alias = "caseAssetCode")]
    pub asset_code: String,           // 兜底资产编码
    pub status: OrderStatus,
    pub items: Vec<Item>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Order {
    /// 按标识取物品
    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(id.index())
    }

    pub fn contains(&self, id: ItemId) -> bool {
        id.index() < self.items.len()
    }

    /// 全部物品标识（按订单顺序）
    pub fn item_ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        (0..self.items.len()).map(ItemId)
    }

    /// 品类识别出的箱体标识（按订单顺序）
    pub fn auto_case_ids(&self) -> Vec<ItemId> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.is_case())
            .map(|(idx, _)| ItemId(idx))
            .collect()
    }

    /// 基础校验: id 非空、数量 >= 1
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("订单 id 为空".to_string());
        }
        if let Some((idx, item)) = self
            .items
            .iter()
            .enumerate()
            .find(|(_, item)| item.quantity < 1)
        {
            return Err(format!(
                "物品数量必须 >= 1: order={}, item#{} '{}'",
                self.id, idx, item.name
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_deserializes_feed_aliases() {
        let json = r#"{
            "id": "crms-7",
            "orderRef": "CRMS-7",
            "customerName": "Acme",
            "jobName": "Gala",
            "jobDate": "2025-02-15",
            "caseAssetCode": "CRMS-7",
            "status": "confirmed",
            "items": [
                {"name": "Peli 1610", "quantity": 1, "productCategory": "Case", "weight": 12.5},
                {"name": "Widget", "quantity": 2, "productCategory": "sound"}
            ]
        }"#;

        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.asset_code, "CRMS-7");
        assert_eq!(order.return_date, "");
        assert_eq!(order.items[0].category, Some(Category::Case));
        assert_eq!(order.items[1].category, None);
        assert_eq!(order.auto_case_ids(), vec![ItemId(0)]);
    }

    #[test]
    fn test_validate_rejects_zero_quantity() {
        let order = Order {
            id: "o1".to_string(),
            order_ref: "R1".to_string(),
            customer_name: String::new(),
            job_name: String::new(),
            job_date: String::new(),
            return_date: String::new(),
            venue: String::new(),
            asset_code: "A".to_string(),
            status: OrderStatus::Confirmed,
            items: vec![Item::new("Mixer", 0)],
            notes: None,
        };
        assert!(order.validate().is_err());
    }

    #[test]
    fn test_line_weight_treats_missing_as_zero() {
        assert_eq!(Item::new("x", 3).line_weight(), 0.0);
        assert_eq!(Item::new("x", 3).with_weight(2.0).line_weight(), 6.0);
    }
}
