// ==========================================
// 纸卷分切生产系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口（进程内调用）
// 约定: 写操作经 UnitOfWork 事务执行，操作人由调用方传入
// ==========================================

pub mod dto;
pub mod error;
pub mod job_api;
pub mod machine_api;
pub mod output_api;
pub mod roll_api;
pub mod schedule_api;
pub mod validator;

// 重导出核心类型
pub use dto::{
    ApprovalResult, JobDetail, JobFilter, JobSummary, Page, RollDetail, ScheduleDetail,
    ScheduleFilter, ScheduleSummary,
};
pub use error::{ApiError, ApiResult};
pub use job_api::JobApi;
pub use machine_api::MachineApi;
pub use output_api::OutputApi;
pub use roll_api::RollApi;
pub use schedule_api::ScheduleApi;

/// 业务时间（本地时间）
pub(crate) fn current_time() -> chrono::NaiveDateTime {
    chrono::Local::now().naive_local()
}
