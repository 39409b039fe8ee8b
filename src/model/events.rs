// ==========================================
// PV 配置快照管理 - 配置表事件通知
// ==========================================
// 职责: 定义表格变更事件与观察者 trait，实现依赖倒置
// 说明: 模型层只发布事件，界面层实现观察者并自行刷新
// ==========================================

use std::sync::Arc;

// ==========================================
// 表格变更事件
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelEvent {
    /// 单元格取值变更
    DataChanged { row: usize, column: usize },
    /// 列标题变更 (名称或脏标记)
    HeaderChanged { column: usize },
    /// 插入列
    ColumnInserted { column: usize },
    /// 移除列
    ColumnRemoved { column: usize },
    /// 整列刷新 (保存后)
    ColumnRangeChanged {
        column: usize,
        first_row: usize,
        last_row: usize,
    },
}

impl ModelEvent {
    /// 事件标识
    pub fn as_str(&self) -> &str {
        match self {
            ModelEvent::DataChanged { .. } => "DataChanged",
            ModelEvent::HeaderChanged { .. } => "HeaderChanged",
            ModelEvent::ColumnInserted { .. } => "ColumnInserted",
            ModelEvent::ColumnRemoved { .. } => "ColumnRemoved",
            ModelEvent::ColumnRangeChanged { .. } => "ColumnRangeChanged",
        }
    }
}

// ==========================================
// 观察者 Trait
// ==========================================

/// 配置表观察者
///
/// 界面层实现; 通知在调用线程内同步投递
pub trait ModelObserver: Send + Sync {
    fn notify(&self, event: &ModelEvent);
}

/// 空操作观察者
///
/// 用于不需要刷新的场景（如单元测试）
#[derive(Debug, Clone, Default)]
pub struct NoOpObserver;

impl ModelObserver for NoOpObserver {
    fn notify(&self, event: &ModelEvent) {
        tracing::trace!("NoOpObserver: 跳过事件 - {}", event.as_str());
    }
}

/// 观察者列表
#[derive(Default)]
pub struct ObserverSet {
    observers: Vec<Arc<dyn ModelObserver>>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, observer: Arc<dyn ModelObserver>) {
        self.observers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn publish(&self, event: ModelEvent) {
        for observer in &self.observers {
            observer.notify(&event);
        }
    }
}
