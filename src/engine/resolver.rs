// ==========================================
// 租赁订单装箱标签系统 - 自动装箱解析器
// ==========================================
// 输入: 已分类订单
// 输出: 有序 ResolvedCase 列表（顺序 = 箱体在订单中的顺序）
// 规则:
// - 无箱体: 单个合成 "Unassigned" 箱体装下全部内容
// - 1 个箱体: 装下全部内容
// - N > 1 个箱体: 内容第 j 项 -> 箱体 j mod N（纯位置轮转）
// 红线: 纯函数,永不失败;每个内容物品恰好出现在一个箱体中
// ==========================================

use crate::domain::case::ResolvedCase;
use crate::domain::order::{Item, Order};

#[derive(Debug, Clone, Copy, Default)]
pub struct CaseResolver;

impl CaseResolver {
    pub fn new() -> Self {
        Self
    }

    /// 解析订单为箱体列表
    pub fn resolve(&self, order: &Order) -> Vec<ResolvedCase> {
        let (containers, contents): (Vec<&Item>, Vec<&Item>) =
            order.items.iter().partition(|item| item.is_case());

        if containers.is_empty() {
            let contents = contents.into_iter().cloned().collect();
            return vec![ResolvedCase::unassigned(order, contents)];
        }

        let n = containers.len();
        containers
            .into_iter()
            .enumerate()
            .map(|(i, container)| {
                let assigned: Vec<Item> = if n == 1 {
                    contents.iter().map(|item| (*item).clone()).collect()
                } else {
                    contents
                        .iter()
                        .enumerate()
                        .filter(|(j, _)| j % n == i)
                        .map(|(_, item)| (*item).clone())
                        .collect()
                };
                ResolvedCase::assemble(order, container.clone(), assigned)
            })
            .collect()
    }
}
