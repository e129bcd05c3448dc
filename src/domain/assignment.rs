// ==========================================
// 租赁订单装箱标签系统 - 人工分配状态
// ==========================================
// 会话级可变状态,仅在内存中存在,commit 后才落库
// 不变式:
// - 每个内容物品至多出现在一个箱体的分配列表中
// - 分配列表的值只包含内容物品,不包含箱体本身
// ==========================================

use crate::domain::types::ItemId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentState {
    /// 人工指定的箱体（品类识别之外）
    pub elected_case_ids: BTreeSet<ItemId>,
    /// 箱体 -> 有序内容列表
    pub assignments: BTreeMap<ItemId, Vec<ItemId>>,
}

impl AssignmentState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 物品当前所在箱体
    pub fn case_of(&self, item: ItemId) -> Option<ItemId> {
        self.assignments
            .iter()
            .find(|(_, contents)| contents.contains(&item))
            .map(|(case_id, _)| *case_id)
    }

    /// 已分配物品集合
    pub fn assigned_ids(&self) -> BTreeSet<ItemId> {
        self.assignments.values().flatten().copied().collect()
    }

    pub fn contents_of(&self, case_id: ItemId) -> &[ItemId] {
        self.assignments
            .get(&case_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// 从所有分配列表中移除物品（空列表一并删除）
    pub(crate) fn detach(&mut self, item: ItemId) {
        for contents in self.assignments.values_mut() {
            contents.retain(|id| *id != item);
        }
        self.assignments.retain(|_, contents| !contents.is_empty());
    }

    pub(crate) fn append(&mut self, case_id: ItemId, item: ItemId) {
        self.assignments.entry(case_id).or_default().push(item);
    }

    /// 每个物品至多属于一个箱体
    pub fn is_exclusive(&self) -> bool {
        let mut seen = BTreeSet::new();
        self.assignments
            .values()
            .flatten()
            .all(|id| seen.insert(*id))
    }
}
