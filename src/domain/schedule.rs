// ==========================================
// 纸卷分切生产系统 - 分切排程领域模型
// ==========================================
// 职责: 一天的分切作业集合
// 生命周期: DRAFT → PUBLISHED → IN_PROGRESS → COMPLETED
// ==========================================

use crate::domain::types::ScheduleStatus;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// Schedule - 分切排程
// ==========================================
// 对齐: slitting_schedule 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub schedule_id: String,
    pub schedule_no: String, // 排程号 (如 SL-20240601-001)
    pub scheduled_date: NaiveDate,
    pub status: ScheduleStatus,
    pub memo: Option<String>,

    // ===== 操作追溯 =====
    pub created_by: String,
    pub created_at: NaiveDateTime,
    pub published_by: Option<String>,
    pub published_at: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
}

impl Schedule {
    /// 发布条件: 草稿状态且至少一个作业
    pub fn can_publish(&self, total_jobs: i64) -> bool {
        self.status == ScheduleStatus::Draft && total_jobs > 0
    }

    /// 是否还能追加作业
    pub fn accepts_jobs(&self) -> bool {
        self.status == ScheduleStatus::Draft
    }
}

/// 生成排程号: {prefix}-{YYYYMMDD}-{NNN}
pub fn format_schedule_no(prefix: &str, date: NaiveDate, seq: i64) -> String {
    format!("{}-{}-{:03}", prefix, date.format("%Y%m%d"), seq)
}
