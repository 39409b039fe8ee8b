// ==========================================
// 记录型观察者 - 用于集成测试
// ==========================================

use pv_config_manager::model::{ModelEvent, ModelObserver};
use std::sync::Mutex;

#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ModelEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ModelEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl ModelObserver for RecordingObserver {
    fn notify(&self, event: &ModelEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
