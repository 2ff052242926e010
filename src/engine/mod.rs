// ==========================================
// 纸卷分切生产系统 - 引擎层
// ==========================================
// 职责: 状态转换表、完工/审批/母卷匹配规则、差异分析
// 红线: Engine 不拼 SQL，不持有连接；规则拒绝必须给出原因
// ==========================================

pub mod approval;
pub mod completion;
pub mod stock_match;
pub mod transitions;
pub mod variance;

// 重导出核心引擎
pub use approval::{ApprovalPlan, ApprovalPlanner, StockPosting};
pub use completion::{
    check_completion_mode, check_inline_outputs, check_roll_capacity, check_roll_completion,
    JobCompletion,
};
pub use stock_match::{check_parent_stock, StockRejection};
pub use transitions::{
    next_job_status, next_roll_status, next_schedule_status, JobAction, RollAction,
    ScheduleAction, TransitionRejected,
};
pub use variance::{VarianceAnalyzer, VarianceLine, VarianceReport, VarianceSummary};
