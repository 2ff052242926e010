// ==========================================
// 纸卷分切生产系统 - 分切机台领域模型
// ==========================================
// 职责: 机台登记与简单状态 (空闲/运行/维护)
// ==========================================

use crate::domain::types::MachineStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// Machine - 分切机台
// ==========================================
// 对齐: machine 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Machine {
    pub machine_id: String,
    pub machine_code: String, // 机台代码 (唯一)
    pub name: String,
    pub status: MachineStatus,
    pub updated_at: NaiveDateTime,
}

impl Machine {
    /// 是否可以开工
    pub fn accepts_work(&self) -> bool {
        !matches!(self.status, MachineStatus::Maintenance)
    }
}
