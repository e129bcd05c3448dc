// ==========================================
// 租赁订单装箱标签系统 - 交互适配器
// ==========================================
// 两种前端交互方式,均只调用 AssignmentEngine 的规范变更接口:
// - DragRelocate: 拖拽物品到箱体/未分配区
// - ActiveCaseToggle: 先选中箱体,再勾选/取消物品
// 两者可在同一会话中随意交替使用
// ==========================================

use crate::domain::types::{ItemId, Placement};
use crate::engine::assignment::AssignmentEngine;
use crate::engine::error::{AssignmentError, AssignmentResult};

/// 拖拽式移动
#[derive(Debug, Clone, Copy, Default)]
pub struct DragRelocate;

impl DragRelocate {
    /// 把物品放到目标位置（来源取当前位置）
    pub fn drop_item(
        &self,
        engine: &mut AssignmentEngine,
        item: ItemId,
        target: Placement,
    ) -> AssignmentResult<()> {
        let from = engine.placement_of(item)?;
        engine.relocate(item, from, target)
    }
}

/// 选中箱体 + 勾选
#[derive(Debug, Clone, Default)]
pub struct ActiveCaseToggle {
    active: Option<ItemId>,
}

impl ActiveCaseToggle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<ItemId> {
        self.active
    }

    /// 选中当前箱体
    pub fn select_case(&mut self, engine: &AssignmentEngine, case_id: ItemId) -> AssignmentResult<()> {
        if !engine.order().contains(case_id) {
            return Err(AssignmentError::UnknownItem {
                item: case_id,
                item_count: engine.order().items.len(),
            });
        }
        if !engine.is_container(case_id) {
            return Err(AssignmentError::NotAContainer(case_id));
        }
        self.active = Some(case_id);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.active = None;
    }

    /// 切换人工箱体;取消的正是当前箱体时清空选中
    pub fn elect_as_case(&mut self, engine: &mut AssignmentEngine, id: ItemId) -> AssignmentResult<bool> {
        let elected = engine.elect_as_case(id)?;
        if !elected && self.active == Some(id) {
            self.active = None;
        }
        Ok(elected)
    }

    /// 勾选/取消物品
    ///
    /// # 返回
    /// - Ok(true): 物品现在位于当前箱体
    /// - Ok(false): 物品回到未分配
    pub fn toggle(&mut self, engine: &mut AssignmentEngine, item: ItemId) -> AssignmentResult<bool> {
        let active = match self.active {
            Some(id) if engine.is_container(id) => id,
            _ => {
                self.active = None;
                return Err(AssignmentError::NoActiveCase);
            }
        };

        if engine.placement_of(item)? == Placement::Case(active) {
            engine.unassign(item)?;
            Ok(false)
        } else {
            engine.assign_exclusive(item, active)?;
            Ok(true)
        }
    }

    /// 物品所在的其他箱体（用于界面标记 "In: xxx"）
    pub fn assigned_elsewhere(&self, engine: &AssignmentEngine, item: ItemId) -> Option<ItemId> {
        match engine.placement_of(item) {
            Ok(Placement::Case(case_id)) if Some(case_id) != self.active => Some(case_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{Item, Order};
    use crate::domain::types::{Category, OrderStatus};

    fn engine() -> AssignmentEngine {
        AssignmentEngine::new(Order {
            id: "o".to_string(),
            order_ref: "R".to_string(),
            customer_name: String::new(),
            job_name: String::new(),
            job_date: String::new(),
            return_date: String::new(),
            venue: String::new(),
            asset_code: "A".to_string(),
            status: OrderStatus::InProgress,
            items: vec![
                Item::new("Case A", 1).with_category(Category::Case),
                Item::new("Case B", 1).with_category(Category::Case),
                Item::new("Mic", 1),
                Item::new("Desk", 1),
            ],
            notes: None,
        })
    }

    const A: ItemId = ItemId(0);
    const B: ItemId = ItemId(1);
    const MIC: ItemId = ItemId(2);
    const DESK: ItemId = ItemId(3);

    #[test]
    fn test_toggle_requires_active_case() {
        let mut engine = engine();
        let mut toggle = ActiveCaseToggle::new();
        assert_eq!(toggle.toggle(&mut engine, MIC), Err(AssignmentError::NoActiveCase));
        assert_eq!(toggle.select_case(&engine, MIC), Err(AssignmentError::NotAContainer(MIC)));
    }

    #[test]
    fn test_toggle_in_and_out() {
        let mut engine = engine();
        let mut toggle = ActiveCaseToggle::new();
        toggle.select_case(&engine, A).unwrap();

        assert!(toggle.toggle(&mut engine, MIC).unwrap());
        assert_eq!(engine.contents_of(A), &[MIC]);
        assert!(!toggle.toggle(&mut engine, MIC).unwrap());
        assert_eq!(engine.unassigned_ids(), vec![MIC, DESK]);
    }

    #[test]
    fn test_interleaving_drag_and_toggle() {
        let mut engine = engine();
        let drag = DragRelocate;
        let mut toggle = ActiveCaseToggle::new();

        drag.drop_item(&mut engine, MIC, Placement::Case(A)).unwrap();
        toggle.select_case(&engine, B).unwrap();
        assert_eq!(toggle.assigned_elsewhere(&engine, MIC), Some(A));

        // 勾选把物品从 A 挪到 B
        assert!(toggle.toggle(&mut engine, MIC).unwrap());
        drag.drop_item(&mut engine, DESK, Placement::Case(B)).unwrap();
        drag.drop_item(&mut engine, MIC, Placement::Unassigned).unwrap();

        assert!(engine.contents_of(A).is_empty());
        assert_eq!(engine.contents_of(B), &[DESK]);
        assert_eq!(engine.unassigned_ids(), vec![MIC]);
        assert!(engine.state().is_exclusive());
    }

    #[test]
    fn test_unelecting_active_case_clears_selection() {
        let mut engine = engine();
        let mut toggle = ActiveCaseToggle::new();
        toggle.elect_as_case(&mut engine, DESK).unwrap();
        toggle.select_case(&engine, DESK).unwrap();
        toggle.toggle(&mut engine, MIC).unwrap();

        assert!(!toggle.elect_as_case(&mut engine, DESK).unwrap());
        assert_eq!(toggle.active(), None);
        assert_eq!(engine.unassigned_ids(), vec![MIC, DESK]);
    }
}
