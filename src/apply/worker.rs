// ==========================================
// PV 配置快照管理 - 下发执行器
// ==========================================
// 职责: 在 tokio 任务中执行 ApplyPlan,通过通道报告进度
// 取消: 在每个 PV 与每个步骤之间检查取消标志,进行中的读写/等待先完成
// 超时: 每次 PV 读写都受 pv_timeout 约束
// ==========================================

use crate::apply::error::{ApplyError, ApplyResult, PvError};
use crate::apply::pv_access::PvAccess;
use crate::apply::tasks::{check_target, ApplyPlan, ApplyStep};
use crate::domain::configuration::Configuration;
use crate::domain::pv_descriptor::PvDescriptor;
use crate::domain::types::Value;
use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{info, warn};

// ==========================================
// 进度事件与结果
// ==========================================

#[derive(Debug, Clone, PartialEq)]
pub enum ApplyEvent {
    StepStarted { index: usize, kind: &'static str },
    ItemSet { pv: String },
    ItemFailed { error: PvError },
    ItemChecked { pv: String, ok: bool },
    StepFinished { index: usize },
    Cancelled,
    Finished,
}

/// 校验不通过的 PV
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckMismatch {
    pub pv: String,
    pub expected: Value,
    pub actual: Option<Value>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApplyReport {
    pub plan: String,
    pub applied: usize,
    pub set_failures: Vec<String>,
    pub mismatches: Vec<CheckMismatch>,
    pub completed_steps: usize,
    pub cancelled: bool,
}

impl ApplyReport {
    pub fn is_success(&self) -> bool {
        !self.cancelled && self.set_failures.is_empty() && self.mismatches.is_empty()
    }
}

/// 给单次 PV 调用加上超时
pub async fn with_timeout<T, F>(pv: &str, timeout: Duration, call: F) -> Result<T, PvError>
where
    F: Future<Output = Result<T, PvError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(PvError::Timeout {
            pv: pv.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}

// ==========================================
// ApplyHandle - 运行中的下发任务
// ==========================================
pub struct ApplyHandle {
    cancel: Arc<AtomicBool>,
    events: UnboundedReceiver<ApplyEvent>,
    task: JoinHandle<ApplyReport>,
}

impl ApplyHandle {
    /// 请求取消
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// 下一条进度事件 (任务结束且事件取完后返回 None)
    pub async fn next_event(&mut self) -> Option<ApplyEvent> {
        self.events.recv().await
    }

    /// 等待任务结束
    pub async fn join(self) -> ApplyResult<ApplyReport> {
        self.task
            .await
            .map_err(|e| ApplyError::WorkerFailed(e.to_string()))
    }
}

// ==========================================
// ApplyWorker - 执行器
// ==========================================
pub struct ApplyWorker {
    pv: Arc<dyn PvAccess>,
    plan: ApplyPlan,
    cancel: Arc<AtomicBool>,
    events: UnboundedSender<ApplyEvent>,
}

impl ApplyWorker {
    /// 启动下发任务 (需在 tokio 运行时内调用)
    pub fn spawn(pv: Arc<dyn PvAccess>, plan: ApplyPlan) -> ApplyHandle {
        let cancel = Arc::new(AtomicBool::new(false));
        let (tx, rx) = unbounded_channel();
        let worker = ApplyWorker {
            pv,
            plan,
            cancel: cancel.clone(),
            events: tx,
        };
        let task = tokio::spawn(worker.run());
        ApplyHandle {
            cancel,
            events: rx,
            task,
        }
    }

    fn emit(&self, event: ApplyEvent) {
        // 接收端已丢弃时忽略
        let _ = self.events.send(event);
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    async fn run(self) -> ApplyReport {
        let mut report = ApplyReport {
            plan: self.plan.name.clone(),
            ..Default::default()
        };
        info!(plan = %self.plan.name, steps = self.plan.steps.len(), "开始下发");

        for (index, step) in self.plan.steps.iter().enumerate() {
            if self.cancelled() {
                report.cancelled = true;
                break;
            }
            self.emit(ApplyEvent::StepStarted {
                index,
                kind: step.as_str(),
            });

            let finished = match step {
                ApplyStep::Set(items) => {
                    let mut finished = true;
                    for item in items {
                        if self.cancelled() {
                            finished = false;
                            break;
                        }
                        let result = with_timeout(
                            &item.pv_name,
                            self.plan.pv_timeout,
                            self.pv.put(&item.pv_name, &item.value),
                        )
                        .await;
                        match result {
                            Ok(()) => {
                                report.applied += 1;
                                self.emit(ApplyEvent::ItemSet {
                                    pv: item.pv_name.clone(),
                                });
                            }
                            Err(error) => {
                                warn!(pv = %item.pv_name, error = %error, "设定值写入失败");
                                report.set_failures.push(error.to_string());
                                self.emit(ApplyEvent::ItemFailed { error });
                            }
                        }
                    }
                    finished
                }
                ApplyStep::Wait(duration) => {
                    tokio::time::sleep(*duration).await;
                    true
                }
                ApplyStep::Check {
                    items,
                    readback,
                    tolerance,
                } => {
                    let mut finished = true;
                    for item in items {
                        if self.cancelled() {
                            finished = false;
                            break;
                        }
                        let target = check_target(&item.pv_name, *readback);
                        let result =
                            with_timeout(&target, self.plan.pv_timeout, self.pv.get(&target)).await;
                        let mismatch = match result {
                            Ok(actual) if actual.approx_eq(&item.value, *tolerance) => None,
                            Ok(actual) => Some(CheckMismatch {
                                pv: target.clone(),
                                expected: item.value.clone(),
                                actual: Some(actual),
                                error: None,
                            }),
                            Err(e) => Some(CheckMismatch {
                                pv: target.clone(),
                                expected: item.value.clone(),
                                actual: None,
                                error: Some(e.to_string()),
                            }),
                        };
                        self.emit(ApplyEvent::ItemChecked {
                            pv: target,
                            ok: mismatch.is_none(),
                        });
                        if let Some(m) = mismatch {
                            warn!(pv = %m.pv, expected = %m.expected, "校验不通过");
                            report.mismatches.push(m);
                        }
                    }
                    finished
                }
            };

            if !finished {
                report.cancelled = true;
                break;
            }
            report.completed_steps += 1;
            self.emit(ApplyEvent::StepFinished { index });
        }

        if report.cancelled {
            info!(plan = %report.plan, completed_steps = report.completed_steps, "下发已取消");
            self.emit(ApplyEvent::Cancelled);
        } else {
            info!(
                plan = %report.plan,
                applied = report.applied,
                set_failures = report.set_failures.len(),
                mismatches = report.mismatches.len(),
                "下发完成"
            );
        }
        self.emit(ApplyEvent::Finished);
        report
    }
}

// ==========================================
// 读取当前机器状态
// ==========================================

/// "读取并保存": 并发读取全部 PV,生成一份新配置 (保存由调用方决定)
///
/// # 返回
/// - Ok(Configuration): 新配置 (is_new)
/// - Err(ReadFailed): 任一 PV 读取失败
pub async fn read_configuration(
    pv: &dyn PvAccess,
    descriptors: &[PvDescriptor],
    name: &str,
    config_type: &str,
    timeout: Duration,
) -> ApplyResult<Configuration> {
    let reads = descriptors.iter().map(|d| async move {
        let result = with_timeout(&d.name, timeout, pv.get(&d.name)).await;
        (d, result)
    });
    let results = join_all(reads).await;

    let mut values = BTreeMap::new();
    let mut errors = Vec::new();
    for (descriptor, result) in results {
        match result {
            Ok(value) => {
                if value.value_type() != descriptor.value_type {
                    warn!(
                        pv = %descriptor.name,
                        expected = %descriptor.value_type,
                        actual = %value.value_type(),
                        "读取值类型与声明不一致"
                    );
                }
                values.insert(descriptor.name.clone(), value);
            }
            Err(e) => errors.push(e),
        }
    }

    info!(config = name, total = descriptors.len(), failed = errors.len(), "读取配置完成");

    let failed = errors.len();
    if let Some(first) = errors.into_iter().next() {
        return Err(ApplyError::ReadFailed { failed, first });
    }
    Ok(Configuration::new(name, config_type, values))
}
