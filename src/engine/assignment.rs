// ==========================================
// 租赁订单装箱标签系统 - 人工分配引擎
// ==========================================
// 在自动识别结果之上叠加人工覆写:
// - elect_as_case: 指定/取消箱体（取消时级联释放其内容）
// - relocate: 拖拽式移动（来源 -> 目标）
// - assign_exclusive: 选中箱体后勾选
// 两种入口共用同一个排他放置操作 place()
// 派生视图每次读取时重新计算,不缓存
// ==========================================

use crate::domain::assignment::AssignmentState;
use crate::domain::case::{AssignedContent, CaseAssignmentRecord, ResolvedCase};
use crate::domain::order::{Item, Order};
use crate::domain::types::{ItemId, Placement};
use crate::engine::error::{AssignmentError, AssignmentResult};
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
pub struct AssignmentEngine {
    order: Order,
    auto_case_ids: BTreeSet<ItemId>,
    state: AssignmentState,
}

impl AssignmentEngine {
    pub fn new(order: Order) -> Self {
        let auto_case_ids = order.auto_case_ids().into_iter().collect();
        Self {
            order,
            auto_case_ids,
            state: AssignmentState::new(),
        }
    }

    pub fn order(&self) -> &Order {
        &self.order
    }

    pub fn state(&self) -> &AssignmentState {
        &self.state
    }

    /// 可序列化的状态快照
    pub fn snapshot(&self) -> AssignmentState {
        self.state.clone()
    }

    // ==========================================
    // 派生视图
    // ==========================================

    pub fn is_auto_case(&self, id: ItemId) -> bool {
        self.auto_case_ids.contains(&id)
    }

    pub fn is_container(&self, id: ItemId) -> bool {
        self.is_auto_case(id) || self.state.elected_case_ids.contains(&id)
    }

    /// 全部箱体 = 自动识别 ∪ 人工指定（按订单顺序）
    pub fn all_container_ids(&self) -> Vec<ItemId> {
        self.order
            .item_ids()
            .filter(|id| self.is_container(*id))
            .collect()
    }

    /// 全部内容物品 = 订单物品 - 箱体（按订单顺序）
    pub fn all_content_ids(&self) -> Vec<ItemId> {
        self.order
            .item_ids()
            .filter(|id| !self.is_container(*id))
            .collect()
    }

    pub fn assigned_ids(&self) -> BTreeSet<ItemId> {
        self.state.assigned_ids()
    }

    /// 未分配内容（按订单顺序）
    pub fn unassigned_ids(&self) -> Vec<ItemId> {
        let assigned = self.assigned_ids();
        self.all_content_ids()
            .into_iter()
            .filter(|id| !assigned.contains(id))
            .collect()
    }

    pub fn contents_of(&self, case_id: ItemId) -> &[ItemId] {
        self.state.contents_of(case_id)
    }

    /// 内容物品当前位置
    pub fn placement_of(&self, item: ItemId) -> AssignmentResult<Placement> {
        self.ensure_content(item)?;
        Ok(self
            .state
            .case_of(item)
            .map(Placement::Case)
            .unwrap_or(Placement::Unassigned))
    }

    // ==========================================
    // 变更操作
    // ==========================================

    /// 切换人工箱体
    ///
    /// # 返回
    /// - Ok(true): 已指定为箱体
    /// - Ok(false): 已取消,原分配内容回到未分配
    pub fn elect_as_case(&mut self, id: ItemId) -> AssignmentResult<bool> {
        self.ensure_exists(id)?;
        if self.is_auto_case(id) {
            return Err(AssignmentError::AutoDetectedCase(id));
        }

        if self.state.elected_case_ids.remove(&id) {
            let released = self.state.assignments.remove(&id).unwrap_or_default();
            tracing::debug!(item = %id, released = released.len(), "取消人工箱体");
            return Ok(false);
        }

        // 成为箱体后不能再出现在任何分配列表中
        self.state.detach(id);
        self.state.elected_case_ids.insert(id);
        tracing::debug!(item = %id, "指定人工箱体");
        Ok(true)
    }

    /// 拖拽移动: 从 from 移到 to
    ///
    /// from 必须与物品当前位置一致;from == to 时不做任何修改
    pub fn relocate(&mut self, item: ItemId, from: Placement, to: Placement) -> AssignmentResult<()> {
        self.ensure_content(item)?;
        self.ensure_placement(from)?;
        self.ensure_placement(to)?;

        if from == to {
            return Ok(());
        }

        let actual = self.placement_of(item)?;
        if actual != from {
            return Err(AssignmentError::PlacementMismatch {
                item,
                expected: from,
                actual,
            });
        }

        self.place(item, to);
        Ok(())
    }

    /// 排他分配: 从所有列表移除后追加到目标箱体
    pub fn assign_exclusive(&mut self, item: ItemId, container: ItemId) -> AssignmentResult<()> {
        self.ensure_content(item)?;
        self.ensure_placement(Placement::Case(container))?;
        self.place(item, Placement::Case(container));
        Ok(())
    }

    /// 放回未分配
    pub fn unassign(&mut self, item: ItemId) -> AssignmentResult<()> {
        self.ensure_content(item)?;
        self.place(item, Placement::Unassigned);
        Ok(())
    }

    /// 唯一的放置操作: 先从来源移除,再插入目标;已在目标中则不变
    fn place(&mut self, item: ItemId, target: Placement) {
        let current = self
            .state
            .case_of(item)
            .map(Placement::Case)
            .unwrap_or(Placement::Unassigned);
        if current == target {
            return;
        }

        self.state.detach(item);
        if let Placement::Case(case_id) = target {
            self.state.append(case_id, item);
        }
        tracing::debug!(item = %item, from = %current, to = %target, "移动物品");
    }

    // ==========================================
    // 输出
    // ==========================================

    /// 按当前人工分配组装箱体视图（供渲染层使用）
    ///
    /// 存在未分配内容时,末尾追加合成的 "Unassigned" 箱体
    pub fn assigned_cases(&self) -> Vec<ResolvedCase> {
        let mut cases: Vec<ResolvedCase> = self
            .all_container_ids()
            .into_iter()
            .map(|case_id| {
                let contents = self.items_of(self.contents_of(case_id));
                ResolvedCase::assemble(&self.order, self.order.items[case_id.index()].clone(), contents)
            })
            .collect();

        let unassigned = self.unassigned_ids();
        if !unassigned.is_empty() {
            cases.push(ResolvedCase::unassigned(&self.order, self.items_of(&unassigned)));
        }
        cases
    }

    /// 构造整单替换记录（每个箱体一条,按订单顺序）
    pub fn build_records(&self) -> Vec<CaseAssignmentRecord> {
        self.all_container_ids()
            .into_iter()
            .map(|case_id| CaseAssignmentRecord {
                container_item_id: case_id,
                container_name: self.order.items[case_id.index()].name.clone(),
                content_list: self
                    .contents_of(case_id)
                    .iter()
                    .map(|id| {
                        let item = &self.order.items[id.index()];
                        AssignedContent {
                            name: item.name.clone(),
                            quantity: item.quantity,
                            source_item_id: *id,
                        }
                    })
                    .collect(),
            })
            .collect()
    }

    /// 从已保存记录恢复状态
    ///
    /// 名称或标识与当前订单不符的条目被丢弃
    ///
    /// # 返回
    /// - 丢弃的条目数
    pub fn restore(&mut self, records: &[CaseAssignmentRecord]) -> usize {
        self.state = AssignmentState::new();
        let mut dropped = 0;

        // 1) 先确定全部箱体,避免后续记录中的箱体被当作内容
        let mut valid_records = Vec::with_capacity(records.len());
        for record in records {
            let matches = self
                .order
                .item(record.container_item_id)
                .map(|item| item.name == record.container_name)
                .unwrap_or(false);
            if !matches {
                dropped += 1 + record.content_list.len();
                continue;
            }
            if !self.is_auto_case(record.container_item_id) {
                self.state.elected_case_ids.insert(record.container_item_id);
            }
            valid_records.push(record);
        }

        // 2) 再放置内容
        for record in valid_records {
            for content in &record.content_list {
                let valid = self
                    .order
                    .item(content.source_item_id)
                    .map(|item| item.name == content.name)
                    .unwrap_or(false)
                    && !self.is_container(content.source_item_id)
                    && self.state.case_of(content.source_item_id).is_none();
                if valid {
                    self.state.append(record.container_item_id, content.source_item_id);
                } else {
                    dropped += 1;
                }
            }
        }

        if dropped > 0 {
            tracing::warn!(order_id = %self.order.id, dropped, "恢复分配时丢弃失效条目");
        }
        dropped
    }

    // ==========================================
    // 校验
    // ==========================================

    fn ensure_exists(&self, id: ItemId) -> AssignmentResult<()> {
        if self.order.contains(id) {
            Ok(())
        } else {
            Err(AssignmentError::UnknownItem {
                item: id,
                item_count: self.order.items.len(),
            })
        }
    }

    fn ensure_content(&self, id: ItemId) -> AssignmentResult<()> {
        self.ensure_exists(id)?;
        if self.is_container(id) {
            return Err(AssignmentError::ContainerNotMovable(id));
        }
        Ok(())
    }

    fn ensure_placement(&self, placement: Placement) -> AssignmentResult<()> {
        match placement {
            Placement::Unassigned => Ok(()),
            Placement::Case(case_id) => {
                self.ensure_exists(case_id)?;
                if self.is_container(case_id) {
                    Ok(())
                } else {
                    Err(AssignmentError::NotAContainer(case_id))
                }
            }
        }
    }

    fn items_of(&self, ids: &[ItemId]) -> Vec<Item> {
        ids.iter()
            .filter_map(|id| self.order.item(*id).cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{Category, OrderStatus};

    // ==========================================
    // 测试数据准备
    // ==========================================
    // 0: Peli Case (自动箱体)
    // 1: Mixer
    // 2: Speaker
    // 3: Stage Box (可人工指定)
    // 4: XLR Cable
    // 5: Trunk (自动箱体)
    fn sample_order() -> Order {
        Order {
            id: "ord-7".to_string(),
            order_ref: "R-7".to_string(),
            customer_name: "Acme".to_string(),
            job_name: "Gala".to_string(),
            job_date: "2025-02-15".to_string(),
            return_date: "2025-02-20".to_string(),
            venue: String::new(),
            asset_code: "ORD-7".to_string(),
            status: OrderStatus::Confirmed,
            items: vec![
                Item::new("Peli Case", 1).with_category(Category::Case).with_weight(8.0),
                Item::new("Mixer", 1).with_category(Category::Audio).with_weight(12.0),
                Item::new("Speaker", 2).with_category(Category::Audio).with_weight(20.0),
                Item::new("Stage Box", 1).with_category(Category::Audio).with_weight(4.0),
                Item::new("XLR Cable", 10).with_category(Category::Cable).with_weight(0.5),
                Item::new("Trunk", 1).with_category(Category::Case),
            ],
            notes: None,
        }
    }

    const PELI: ItemId = ItemId(0);
    const MIXER: ItemId = ItemId(1);
    const SPEAKER: ItemId = ItemId(2);
    const STAGE_BOX: ItemId = ItemId(3);
    const CABLE: ItemId = ItemId(4);
    const TRUNK: ItemId = ItemId(5);

    #[test]
    fn test_derived_views_initial() {
        let engine = AssignmentEngine::new(sample_order());
        assert_eq!(engine.all_container_ids(), vec![PELI, TRUNK]);
        assert_eq!(engine.all_content_ids(), vec![MIXER, SPEAKER, STAGE_BOX, CABLE]);
        assert_eq!(engine.unassigned_ids(), vec![MIXER, SPEAKER, STAGE_BOX, CABLE]);
        assert!(engine.assigned_ids().is_empty());
    }

    #[test]
    fn test_assign_exclusive_moves_between_cases() {
        let mut engine = AssignmentEngine::new(sample_order());
        engine.assign_exclusive(MIXER, PELI).unwrap();
        engine.assign_exclusive(MIXER, TRUNK).unwrap();

        assert!(engine.contents_of(PELI).is_empty());
        assert_eq!(engine.contents_of(TRUNK), &[MIXER]);
        assert!(engine.state().is_exclusive());
    }

    #[test]
    fn test_relocate_and_assign_exclusive_agree() {
        let mut by_drag = AssignmentEngine::new(sample_order());
        let mut by_pick = AssignmentEngine::new(sample_order());

        by_drag.relocate(SPEAKER, Placement::Unassigned, Placement::Case(PELI)).unwrap();
        by_drag.relocate(SPEAKER, Placement::Case(PELI), Placement::Case(TRUNK)).unwrap();
        by_pick.assign_exclusive(SPEAKER, PELI).unwrap();
        by_pick.assign_exclusive(SPEAKER, TRUNK).unwrap();

        assert_eq!(by_drag.snapshot(), by_pick.snapshot());
    }

    #[test]
    fn test_relocate_same_source_and_target_is_noop() {
        let mut engine = AssignmentEngine::new(sample_order());
        engine.assign_exclusive(MIXER, PELI).unwrap();
        engine.assign_exclusive(CABLE, PELI).unwrap();
        let before = engine.snapshot();

        engine.relocate(MIXER, Placement::Case(PELI), Placement::Case(PELI)).unwrap();
        engine.assign_exclusive(MIXER, PELI).unwrap();
        assert_eq!(engine.snapshot(), before);
    }

    #[test]
    fn test_relocate_rejects_wrong_source_without_change() {
        let mut engine = AssignmentEngine::new(sample_order());
        engine.assign_exclusive(MIXER, PELI).unwrap();
        let before = engine.snapshot();

        let err = engine
            .relocate(MIXER, Placement::Case(TRUNK), Placement::Unassigned)
            .unwrap_err();
        assert_eq!(
            err,
            AssignmentError::PlacementMismatch {
                item: MIXER,
                expected: Placement::Case(TRUNK),
                actual: Placement::Case(PELI),
            }
        );
        assert_eq!(engine.snapshot(), before);
    }

    #[test]
    fn test_containers_cannot_move() {
        let mut engine = AssignmentEngine::new(sample_order());
        assert_eq!(
            engine.assign_exclusive(TRUNK, PELI),
            Err(AssignmentError::ContainerNotMovable(TRUNK))
        );
        assert_eq!(
            engine.relocate(PELI, Placement::Unassigned, Placement::Case(TRUNK)),
            Err(AssignmentError::ContainerNotMovable(PELI))
        );
    }

    #[test]
    fn test_invalid_ids_rejected() {
        let mut engine = AssignmentEngine::new(sample_order());
        assert!(matches!(
            engine.assign_exclusive(ItemId(99), PELI),
            Err(AssignmentError::UnknownItem { item_count: 6, .. })
        ));
        assert_eq!(
            engine.assign_exclusive(MIXER, SPEAKER),
            Err(AssignmentError::NotAContainer(SPEAKER))
        );
        assert!(engine.elect_as_case(ItemId(6)).is_err());
        assert!(engine.assigned_ids().is_empty());
    }

    #[test]
    fn test_auto_case_cannot_be_unelected() {
        let mut engine = AssignmentEngine::new(sample_order());
        assert_eq!(
            engine.elect_as_case(PELI),
            Err(AssignmentError::AutoDetectedCase(PELI))
        );
    }

    #[test]
    fn test_unelect_cascades_contents_back_to_unassigned() {
        let mut engine = AssignmentEngine::new(sample_order());
        assert!(engine.elect_as_case(STAGE_BOX).unwrap());
        engine.assign_exclusive(MIXER, STAGE_BOX).unwrap();
        engine.assign_exclusive(CABLE, STAGE_BOX).unwrap();
        assert_eq!(engine.all_container_ids(), vec![PELI, STAGE_BOX, TRUNK]);

        assert!(!engine.elect_as_case(STAGE_BOX).unwrap());
        assert!(!engine.state().assignments.contains_key(&STAGE_BOX));
        assert_eq!(engine.unassigned_ids(), vec![MIXER, SPEAKER, STAGE_BOX, CABLE]);
    }

    #[test]
    fn test_electing_assigned_item_removes_it_from_lists() {
        let mut engine = AssignmentEngine::new(sample_order());
        engine.assign_exclusive(STAGE_BOX, PELI).unwrap();
        engine.elect_as_case(STAGE_BOX).unwrap();

        assert!(engine.contents_of(PELI).is_empty());
        assert!(engine.is_container(STAGE_BOX));
        assert!(!engine.unassigned_ids().contains(&STAGE_BOX));
    }

    #[test]
    fn test_build_records_covers_every_container() {
        let mut engine = AssignmentEngine::new(sample_order());
        engine.assign_exclusive(CABLE, TRUNK).unwrap();
        engine.assign_exclusive(MIXER, TRUNK).unwrap();

        let records = engine.build_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].container_name, "Peli Case");
        assert!(records[0].content_list.is_empty());
        assert_eq!(records[1].container_name, "Trunk");
        let names: Vec<&str> = records[1].content_list.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["XLR Cable", "Mixer"]);
        assert_eq!(records[1].content_list[0].quantity, 10);
        assert_eq!(records[1].content_list[0].source_item_id, CABLE);
    }

    #[test]
    fn test_assigned_cases_appends_unassigned_bucket() {
        let mut engine = AssignmentEngine::new(sample_order());
        engine.assign_exclusive(MIXER, PELI).unwrap();

        let cases = engine.assigned_cases();
        assert_eq!(cases.len(), 3);
        assert_eq!(cases[0].total_weight, 20.0);
        assert_eq!(cases[2].case_item.name, "Unassigned");
        assert_eq!(cases[2].contents.len(), 3);
        // 2*20 + 4 + 10*0.5
        assert_eq!(cases[2].total_weight, 49.0);
    }

    #[test]
    fn test_restore_roundtrip_and_drops_stale_entries() {
        let mut engine = AssignmentEngine::new(sample_order());
        engine.elect_as_case(STAGE_BOX).unwrap();
        engine.assign_exclusive(MIXER, STAGE_BOX).unwrap();
        engine.assign_exclusive(SPEAKER, PELI).unwrap();
        let mut records = engine.build_records();
        let expected = engine.snapshot();

        let mut restored = AssignmentEngine::new(sample_order());
        assert_eq!(restored.restore(&records), 0);
        assert_eq!(restored.snapshot(), expected);

        // 名称被改动的内容条目应被丢弃
        records[0].content_list.push(AssignedContent {
            name: "Renamed".to_string(),
            quantity: 1,
            source_item_id: CABLE,
        });
        let mut again = AssignmentEngine::new(sample_order());
        assert_eq!(again.restore(&records), 1);
        assert_eq!(again.snapshot(), expected);
    }
}
