// ==========================================
// 纸卷分切生产系统 - 作业卷领域模型
// ==========================================
// 职责: 作业内的一次物理上机（消耗一个母卷库存单元）
// 生命周期: REGISTERED → IN_PROGRESS → COMPLETED / CANCELLED
// ==========================================

use crate::domain::types::RollStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// JobRoll - 作业卷
// ==========================================
// 对齐: slitting_job_roll 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRoll {
    pub roll_id: String,
    pub job_id: String,
    pub seq_no: i32,
    pub stock_id: String, // 消耗的母卷库存
    pub status: RollStatus,
    pub notes: Option<String>,

    // ===== 操作追溯 =====
    pub registered_by: String,
    pub registered_at: NaiveDateTime,
    pub started_by: Option<String>,
    pub started_at: Option<NaiveDateTime>,
    pub completed_by: Option<String>,
    pub completed_at: Option<NaiveDateTime>,
    pub cancelled_by: Option<String>,
    pub cancelled_at: Option<NaiveDateTime>,
}
