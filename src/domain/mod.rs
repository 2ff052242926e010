// ==========================================
// 纸卷分切生产系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、状态类型、输入校验
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod job;
pub mod machine;
pub mod output;
pub mod roll;
pub mod schedule;
pub mod stock;
pub mod types;

// 重导出核心类型
pub use job::{Job, JobKind, NewJob, NewJobKind, NewPlannedOutput, PlannedOutput};
pub use machine::Machine;
pub use output::{ActualOutput, NewActualOutput};
pub use roll::JobRoll;
pub use schedule::Schedule;
pub use stock::{NewStock, Stock};
pub use types::{
    JobStatus, MachineStatus, RollStatus, ScheduleStatus, StockCondition, StockStatus,
};
