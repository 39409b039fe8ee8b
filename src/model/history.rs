// ==========================================
// PV 配置快照管理 - 撤销/重做历史
// ==========================================
// 约束: 两个栈均有容量上限,超出时淘汰最早的条目
// 约束: 整个表格共用一套栈 (不按列区分),严格后进先出
// ==========================================

use crate::domain::action::Action;
use crate::domain::types::ConfigKey;
use std::collections::VecDeque;

#[derive(Debug)]
pub struct History {
    undo: VecDeque<Action>,
    redo: VecDeque<Action>,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            undo: VecDeque::with_capacity(capacity),
            redo: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn push_undo(&mut self, action: Action) {
        Self::push_bounded(&mut self.undo, action, self.capacity);
    }

    pub fn push_redo(&mut self, action: Action) {
        Self::push_bounded(&mut self.redo, action, self.capacity);
    }

    pub fn pop_undo(&mut self) -> Option<Action> {
        self.undo.pop_back()
    }

    pub fn pop_redo(&mut self) -> Option<Action> {
        self.redo.pop_back()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// 撤销栈 (最早在前)
    pub fn undo_entries(&self) -> impl Iterator<Item = &Action> {
        self.undo.iter()
    }

    /// 重做栈 (最早在前)
    pub fn redo_entries(&self) -> impl Iterator<Item = &Action> {
        self.redo.iter()
    }

    /// 移除某个配置的全部条目
    ///
    /// # 返回
    /// 被移除的条目数 (两个栈合计)
    pub fn purge(&mut self, key: ConfigKey) -> usize {
        let before = self.undo.len() + self.redo.len();
        self.undo.retain(|a| a.config_key() != key);
        self.redo.retain(|a| a.config_key() != key);
        before - (self.undo.len() + self.redo.len())
    }

    fn push_bounded(stack: &mut VecDeque<Action>, action: Action, capacity: usize) {
        stack.push_back(action);
        while stack.len() > capacity {
            stack.pop_front();
        }
    }
}
