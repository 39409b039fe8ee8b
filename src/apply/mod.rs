// ==========================================
// PV 配置快照管理 - 下发与读取
// ==========================================
// 职责: PV 访问契约、下发步骤、异步执行器、读取机器状态
// 红线: 不修改配置表; 读取结果作为新配置交给调用方
// ==========================================

pub mod error;
pub mod pv_access;
pub mod tasks;
pub mod worker;

pub use error::{ApplyError, ApplyResult, PvError};
pub use pv_access::{readback_name, MemoryPvAccess, PvAccess};
pub use tasks::{check_target, ApplyPlan, ApplyStep};
pub use worker::{
    read_configuration, with_timeout, ApplyEvent, ApplyHandle, ApplyReport, ApplyWorker,
    CheckMismatch,
};
