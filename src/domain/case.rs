// ==========================================
// 租赁订单装箱标签系统 - 装箱视图与落库记录
// ==========================================
// ResolvedCase: 只读派生视图,按需重算,不原地修改
// CaseAssignmentRecord: 提交给持久化协作方的整单替换记录
// ==========================================

use crate::domain::order::{Item, Order};
use crate::domain::types::{Category, ItemId, OrderStatus};
use serde::{Deserialize, Serialize};

/// 合成箱体名称（订单无任何箱体时使用）
pub const UNASSIGNED_CASE_NAME: &str = "Unassigned";

// ==========================================
// ResolvedCase - 解析后的箱体
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedCase {
    // ===== 订单元数据（显示用副本） =====
    pub order_id: String,
    pub order_ref: String,
    pub customer_name: String,
    pub job_name: String,
    pub job_date: String,
    pub return_date: String,
    pub venue: String,
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    // ===== 箱体与内容 =====
    pub case_item: Item,
    pub asset_code: String,
    pub contents: Vec<Item>,
    pub total_weight: f64, // kg, 保留两位小数
}

impl ResolvedCase {
    /// 组装箱体视图
    ///
    /// # 规则
    /// - asset_code: 箱体序列号优先,否则订单兜底编码
    /// - total_weight: Σ(内容重量×数量) + 箱体单件重量,四舍五入到 0.01
    pub fn assemble(order: &Order, case_item: Item, contents: Vec<Item>) -> Self {
        let contents_weight: f64 = contents.iter().map(Item::line_weight).sum();
        let total_weight = round_weight(contents_weight + case_item.weight.unwrap_or(0.0));
        let asset_code = case_item
            .serial_number
            .clone()
            .unwrap_or_else(|| order.asset_code.clone());

        Self {
            order_id: order.id.clone(),
            order_ref: order.order_ref.clone(),
            customer_name: order.customer_name.clone(),
            job_name: order.job_name.clone(),
            job_date: order.job_date.clone(),
            return_date: order.return_date.clone(),
            venue: order.venue.clone(),
            status: order.status,
            notes: order.notes.clone(),
            case_item,
            asset_code,
            contents,
            total_weight,
        }
    }

    /// 合成"未分配"箱体
    pub fn unassigned(order: &Order, contents: Vec<Item>) -> Self {
        let case_item = Item::new(UNASSIGNED_CASE_NAME, 1).with_category(Category::Case);
        Self::assemble(order, case_item, contents)
    }
}

/// 重量取两位小数（四舍五入）
pub fn round_weight(kg: f64) -> f64 {
    (kg * 100.0).round() / 100.0
}

// ==========================================
// CaseAssignmentRecord - 人工分配落库记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseAssignmentRecord {
    pub container_item_id: ItemId,
    pub container_name: String,
    pub content_list: Vec<AssignedContent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedContent {
    pub name: String,
    pub quantity: u32,
    pub source_item_id: ItemId,
}
