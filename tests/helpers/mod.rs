// ==========================================
// 集成测试共享辅助模块
// ==========================================
#![allow(dead_code)]

pub mod mock_service;
pub mod model_builder;
pub mod recording_observer;

pub use mock_service::MockConfigService;
pub use model_builder::*;
pub use recording_observer::RecordingObserver;
