// ==========================================
// PV 配置快照管理 - PV 访问接口
// ==========================================
// 职责: 定义 PV 读写契约; 提供内存实现用于离线与测试
// 说明: 设定值写入后镜像到回读 PV (-SP -> -RB, -Sel -> -Sts)
// ==========================================

use crate::apply::error::PvError;
use crate::domain::types::Value;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ==========================================
// PvAccess Trait
// ==========================================
#[async_trait]
pub trait PvAccess: Send + Sync {
    /// 读取 PV 当前值
    async fn get(&self, pv_name: &str) -> Result<Value, PvError>;

    /// 写入 PV
    async fn put(&self, pv_name: &str, value: &Value) -> Result<(), PvError>;
}

/// 设定值 PV 对应的回读 PV 名
///
/// - `xxx-SP` -> `xxx-RB`
/// - `xxx-Sel` -> `xxx-Sts`
/// - 其他: None
pub fn readback_name(pv_name: &str) -> Option<String> {
    if let Some(prefix) = pv_name.strip_suffix("-SP") {
        Some(format!("{}-RB", prefix))
    } else {
        pv_name
            .strip_suffix("-Sel")
            .map(|prefix| format!("{}-Sts", prefix))
    }
}

// ==========================================
// MemoryPvAccess - 内存 PV 表
// ==========================================
#[derive(Default)]
struct MemoryState {
    values: HashMap<String, Value>,
    disconnected: HashSet<String>,
    rejected: HashSet<String>,
    frozen_readbacks: HashSet<String>,
    delay: Option<Duration>,
    put_count: usize,
}

/// 内存 PV 表
///
/// 支持注入故障: 断连、拒绝写入、回读不跟随、固定延迟
#[derive(Clone, Default)]
pub struct MemoryPvAccess {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryPvAccess {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // 锁中毒时沿用内部数据
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 预置 PV 值 (不触发回读镜像)
    pub fn insert(&self, pv_name: impl Into<String>, value: Value) {
        self.lock().values.insert(pv_name.into(), value);
    }

    /// 直接读取内存值 (不经过故障注入)
    pub fn peek(&self, pv_name: &str) -> Option<Value> {
        self.lock().values.get(pv_name).cloned()
    }

    /// 标记 PV 断连
    pub fn disconnect(&self, pv_name: impl Into<String>) {
        self.lock().disconnected.insert(pv_name.into());
    }

    /// 标记 PV 拒绝写入
    pub fn reject_puts(&self, pv_name: impl Into<String>) {
        self.lock().rejected.insert(pv_name.into());
    }

    /// 写入设定值时不更新其回读 PV
    pub fn freeze_readback(&self, setpoint: impl Into<String>) {
        self.lock().frozen_readbacks.insert(setpoint.into());
    }

    /// 每次读写前等待固定时长
    pub fn set_delay(&self, delay: Duration) {
        self.lock().delay = Some(delay);
    }

    /// 成功写入次数
    pub fn put_count(&self) -> usize {
        self.lock().put_count
    }

    async fn simulate_latency(&self) {
        let delay = self.lock().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl PvAccess for MemoryPvAccess {
    async fn get(&self, pv_name: &str) -> Result<Value, PvError> {
        self.simulate_latency().await;
        let state = self.lock();
        if state.disconnected.contains(pv_name) {
            return Err(PvError::Disconnected(pv_name.to_string()));
        }
        state
            .values
            .get(pv_name)
            .cloned()
            .ok_or_else(|| PvError::Disconnected(pv_name.to_string()))
    }

    async fn put(&self, pv_name: &str, value: &Value) -> Result<(), PvError> {
        self.simulate_latency().await;
        let mut state = self.lock();
        if state.disconnected.contains(pv_name) {
            return Err(PvError::Disconnected(pv_name.to_string()));
        }
        if state.rejected.contains(pv_name) {
            return Err(PvError::Rejected {
                pv: pv_name.to_string(),
                reason: "写入被拒绝".to_string(),
            });
        }

        state.values.insert(pv_name.to_string(), value.clone());
        if !state.frozen_readbacks.contains(pv_name) {
            if let Some(readback) = readback_name(pv_name) {
                state.values.insert(readback, value.clone());
            }
        }
        state.put_count += 1;
        Ok(())
    }
}
