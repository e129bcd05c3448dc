// ==========================================
// 租赁订单装箱标签系统 - 订单浏览 API
// ==========================================
// 职责: 订单检索、多订单装箱预览、上游载荷导入
// 说明: 订单列表由调用方持有,本层不缓存
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::case::ResolvedCase;
use crate::domain::order::Order;
use crate::engine::resolver::CaseResolver;
use crate::importer::{FeedBatch, FeedNormalizer, FeedPlatform, ImportResult};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

/// 订单浏览API
pub struct OrderApi {
    config_manager: Arc<ConfigManager>,
    resolver: CaseResolver,
}

impl OrderApi {
    pub fn new(config_manager: Arc<ConfigManager>) -> Self {
        Self {
            config_manager,
            resolver: CaseResolver::new(),
        }
    }

    /// 按关键字检索订单
    ///
    /// 不区分大小写,匹配 jobName / customerName / assetCode / orderRef;空查询返回全部
    pub fn search<'a>(&self, orders: &'a [Order], query: &str) -> Vec<&'a Order> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return orders.iter().collect();
        }

        orders
            .iter()
            .filter(|order| {
                [
                    &order.job_name,
                    &order.customer_name,
                    &order.asset_code,
                    &order.order_ref,
                ]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
            })
            .collect()
    }

    /// 选中订单的装箱预览（按订单列表顺序展开）
    pub fn preview_cases(&self, orders: &[Order], selected_ids: &[String]) -> Vec<ResolvedCase> {
        let selected: HashSet<&str> = selected_ids.iter().map(String::as_str).collect();
        let cases: Vec<ResolvedCase> = orders
            .iter()
            .filter(|order| selected.contains(order.id.as_str()))
            .flat_map(|order| self.resolver.resolve(order))
            .collect();

        tracing::debug!(
            selected = selected.len(),
            cases = cases.len(),
            "生成装箱预览"
        );
        cases
    }

    /// 单个订单的装箱解析
    pub fn resolve_order(&self, order: &Order) -> ApiResult<Vec<ResolvedCase>> {
        order.validate().map_err(ApiError::ValidationError)?;
        Ok(self.resolver.resolve(order))
    }

    // ==========================================
    // 上游载荷导入
    // ==========================================

    /// 按当前配置构造标准化器（追加箱体关键词即时生效）
    pub fn normalizer(&self) -> ApiResult<FeedNormalizer> {
        Ok(FeedNormalizer::new(self.config_manager.build_classifier()?))
    }

    /// 导入 Odoo 订单: orders 为 sale.order 数组,lines 为对应订单行数组
    pub fn import_odoo(&self, orders: &Value, lines: &[Value]) -> ApiResult<Vec<Order>> {
        let normalizer = self.normalizer()?;
        let raw_orders = orders
            .as_array()
            .ok_or_else(|| ApiError::InvalidInput("Odoo 订单载荷必须是数组".to_string()))?;
        if raw_orders.len() != lines.len() {
            return Err(ApiError::InvalidInput(format!(
                "Odoo 订单数({})与订单行组数({})不一致",
                raw_orders.len(),
                lines.len()
            )));
        }

        let imported = raw_orders
            .iter()
            .zip(lines)
            .map(|(order, lines)| normalizer.normalize_odoo(order, lines))
            .collect::<ImportResult<Vec<_>>>()?;
        tracing::info!(count = imported.len(), "Odoo 订单导入完成");
        Ok(imported)
    }

    /// 导入 currentRMS opportunities 响应
    pub fn import_current_rms(&self, response: &Value) -> ApiResult<Vec<Order>> {
        let imported = self.normalizer()?.normalize_current_rms_response(response)?;
        tracing::info!(count = imported.len(), "currentRMS 订单导入完成");
        Ok(imported)
    }

    /// 合并多个来源（单个来源失败记录错误,不影响其他来源）
    pub fn merge_feeds(
        &self,
        results: Vec<(FeedPlatform, ImportResult<Vec<Order>>)>,
    ) -> ApiResult<FeedBatch> {
        Ok(self.normalizer()?.merge_feeds(results))
    }
}
