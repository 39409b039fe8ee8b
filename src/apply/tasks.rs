// ==========================================
// PV 配置快照管理 - 下发步骤
// ==========================================
// 职责: 将一份配置展开为 设定 -> 等待 -> 校验 的步骤序列
// 红线: 步骤只描述要做什么,执行由 ApplyWorker 负责
// ==========================================

use crate::apply::pv_access::readback_name;
use crate::config::ManagerSettings;
use crate::domain::configuration::Configuration;
use crate::service::client::PvItem;
use serde::Serialize;
use std::time::Duration;

// ==========================================
// ApplyStep - 单个步骤
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ApplyStep {
    /// 逐个写入设定值
    Set(Vec<PvItem>),
    /// 等待设备响应
    Wait(Duration),
    /// 读回校验 (readback 为 true 时读 -RB/-Sts)
    Check {
        items: Vec<PvItem>,
        readback: bool,
        tolerance: f64,
    },
}

impl ApplyStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplyStep::Set(_) => "SET",
            ApplyStep::Wait(_) => "WAIT",
            ApplyStep::Check { .. } => "CHECK",
        }
    }
}

/// 校验时实际读取的 PV 名
pub fn check_target(pv_name: &str, readback: bool) -> String {
    if readback {
        readback_name(pv_name).unwrap_or_else(|| pv_name.to_string())
    } else {
        pv_name.to_string()
    }
}

// ==========================================
// ApplyPlan - 步骤序列
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplyPlan {
    pub name: String,
    pub steps: Vec<ApplyStep>,
    pub pv_timeout: Duration,
}

impl ApplyPlan {
    pub fn new(name: impl Into<String>, pv_timeout: Duration) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            pv_timeout,
        }
    }

    pub fn with_step(mut self, step: ApplyStep) -> Self {
        self.steps.push(step);
        self
    }

    /// "加载并下发": 设定全部 PV,等待,再校验
    pub fn load_and_apply(config: &Configuration, settings: &ManagerSettings) -> Self {
        let items = config.items();
        Self::new(config.name(), settings.pv_timeout)
            .with_step(ApplyStep::Set(items.clone()))
            .with_step(ApplyStep::Wait(settings.apply_wait))
            .with_step(ApplyStep::Check {
                items,
                readback: settings.check_readback,
                tolerance: settings.check_tolerance,
            })
    }

    /// 设定步骤中的 PV 总数
    pub fn set_count(&self) -> usize {
        self.steps
            .iter()
            .map(|s| match s {
                ApplyStep::Set(items) => items.len(),
                _ => 0,
            })
            .sum()
    }
}
