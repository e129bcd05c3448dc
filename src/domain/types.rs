// ==========================================
// 租赁订单装箱标签系统 - 领域类型定义
// ==========================================
// 职责: 品类 / 订单状态 / 物品标识 / 放置位置
// 红线: 品类只由文本推断,不依赖数量、重量或位置
// ==========================================

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// ==========================================
// 物品品类 (Category)
// ==========================================
// 序列化格式: lowercase (与订单源一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Case,     // 箱体/容器
    Cable,    // 线材
    Audio,    // 音频
    Lighting, // 灯光
    Video,    // 视频
    Rigging,  // 吊挂
    General,  // 其他
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Case => "case",
            Category::Cable => "cable",
            Category::Audio => "audio",
            Category::Lighting => "lighting",
            Category::Video => "video",
            Category::Rigging => "rigging",
            Category::General => "general",
        }
    }

    /// 解析订单源给出的品类标签（大小写不敏感）
    ///
    /// 未知标签返回 None（视为未分类）
    pub fn from_label(label: &str) -> Option<Category> {
        match label.trim().to_lowercase().as_str() {
            "case" => Some(Category::Case),
            "cable" => Some(Category::Cable),
            "audio" => Some(Category::Audio),
            "lighting" => Some(Category::Lighting),
            "video" => Some(Category::Video),
            "rigging" => Some(Category::Rigging),
            "general" => Some(Category::General),
            _ => None,
        }
    }

    pub fn is_case(&self) -> bool {
        matches!(self, Category::Case)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 反序列化可选品类: 大小写不敏感,未知标签记为未分类
pub(crate) fn deserialize_optional_category<'de, D>(
    deserializer: D,
) -> Result<Option<Category>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(Category::from_label))
}

// ==========================================
// 订单状态 (Order Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Confirmed,  // 已确认
    InProgress, // 出库中
    Returned,   // 已归还
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Confirmed => write!(f, "confirmed"),
            OrderStatus::InProgress => write!(f, "in_progress"),
            OrderStatus::Returned => write!(f, "returned"),
        }
    }
}

// ==========================================
// 物品标识 (ItemId)
// ==========================================
// 取值: 物品在 order.items 中的下标
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub usize);

impl ItemId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ==========================================
// 放置位置 (Placement)
// ==========================================
// Unassigned 为合成的"未分配"桶,不对应任何物品
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Placement {
    Unassigned,
    Case(ItemId),
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placement::Unassigned => write!(f, "unassigned"),
            Placement::Case(id) => write!(f, "case{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_label_is_case_insensitive() {
        assert_eq!(Category::from_label("Case"), Some(Category::Case));
        assert_eq!(Category::from_label(" LIGHTING "), Some(Category::Lighting));
        assert_eq!(Category::from_label("sound"), None);
    }

    #[test]
    fn test_order_status_serde_format() {
        let json = serde_json::to_string(&OrderStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        let parsed: OrderStatus = serde_json::from_str("\"returned\"").unwrap();
        assert_eq!(parsed, OrderStatus::Returned);
    }
}
