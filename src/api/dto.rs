// ==========================================
// 纸卷分切生产系统 - API 查询/响应结构
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::job::{Job, PlannedOutput};
use crate::domain::output::ActualOutput;
use crate::domain::roll::JobRoll;
use crate::domain::schedule::Schedule;
use crate::domain::stock::Stock;
use crate::domain::types::{JobStatus, ScheduleStatus};
use crate::engine::variance::VarianceReport;

/// 分页结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

// ===== 查询条件 =====

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleFilter {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub status: Option<ScheduleStatus>,
    /// 按排程号/备注模糊匹配
    pub keyword: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobFilter {
    pub schedule_id: Option<String>,
    pub status: Option<JobStatus>,
    pub machine_id: Option<String>,
    pub operator_id: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub keyword: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// ===== 排程 =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSummary {
    pub schedule: Schedule,
    pub total_jobs: i64,
    pub approved_jobs: i64,
    pub can_publish: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleDetail {
    pub schedule: Schedule,
    pub jobs: Vec<Job>,
    pub total_jobs: i64,
    pub approved_jobs: i64,
    pub can_publish: bool,
}

// ===== 作业 =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub job: Job,
    pub schedule_no: String,
    pub scheduled_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollDetail {
    pub roll: JobRoll,
    pub outputs: Vec<ActualOutput>,
}

/// 作业完整关系图: 作业 → 计划产出 / 作业卷 → 实际产出
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDetail {
    pub job: Job,
    pub schedule_no: String,
    pub planned_outputs: Vec<PlannedOutput>,
    pub rolls: Vec<RollDetail>,
    /// 不挂在作业卷下的产出（母卷寻址作业一次性提交）
    pub unrolled_outputs: Vec<ActualOutput>,
    pub variance: VarianceReport,
}

/// 审批结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalResult {
    pub job: Job,
    pub created_stock: Vec<Stock>,
    pub consumed_stock_ids: Vec<String>,
    pub loss_quantity: i64,
}
