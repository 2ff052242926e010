// ==========================================
// 纸卷分切生产系统 - 分切作业领域模型
// ==========================================
// 职责: 单台机台上的一次分切作业及其计划产出
// 寻址方式: 母卷直接寻址（旧版）/ 品目+宽度寻址（现行）
// 说明: 寻址方式在创建时确定并显式落库，不从字段是否为空反推
// ==========================================

use crate::domain::types::JobStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// JobKind - 作业寻址方式
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobKind {
    /// 旧版: 直接指定一个母卷库存
    StockAddressed { parent_stock_id: String },
    /// 现行: 指定品目与母卷名义宽度，按计划卷数逐卷登记
    ItemAddressed {
        item_id: String,
        parent_width_mm: i32,
        planned_roll_count: i32,
    },
}

impl JobKind {
    pub const STOCK_CODE: &'static str = "STOCK";
    pub const ITEM_CODE: &'static str = "ITEM";

    /// 数据库判别列取值
    pub fn code(&self) -> &'static str {
        match self {
            JobKind::StockAddressed { .. } => Self::STOCK_CODE,
            JobKind::ItemAddressed { .. } => Self::ITEM_CODE,
        }
    }

    pub fn planned_roll_count(&self) -> Option<i32> {
        match self {
            JobKind::StockAddressed { .. } => None,
            JobKind::ItemAddressed {
                planned_roll_count, ..
            } => Some(*planned_roll_count),
        }
    }
}

// ==========================================
// Job - 分切作业
// ==========================================
// 对齐: slitting_job 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub schedule_id: String,
    pub seq_no: i32, // 排程内序号
    pub machine_id: String,
    pub operator_id: Option<String>,
    pub kind: JobKind,
    pub status: JobStatus,
    pub memo: Option<String>,
    pub completion_memo: Option<String>,

    // ===== 操作追溯 =====
    pub created_by: String,
    pub created_at: NaiveDateTime,
    pub started_by: Option<String>,
    pub started_at: Option<NaiveDateTime>,
    pub completed_by: Option<String>,
    pub completed_at: Option<NaiveDateTime>,
    pub approved_by: Option<String>,
    pub approved_at: Option<NaiveDateTime>,
}

// ==========================================
// PlannedOutput - 计划产出行
// ==========================================
// 对齐: slitting_planned_output 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedOutput {
    pub planned_output_id: String,
    pub job_id: String,
    pub seq_no: i32,
    pub item_id: String,
    pub width_mm: i32,
    pub quantity: i64,
    pub notes: Option<String>,
}

// ==========================================
// 新建作业请求
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPlannedOutput {
    pub item_id: String,
    pub width_mm: i32,
    pub quantity: i64,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NewJobKind {
    StockAddressed {
        parent_stock_id: String,
    },
    ItemAddressed {
        item_id: String,
        parent_width_mm: i32,
        planned_roll_count: i32,
        planned_outputs: Vec<NewPlannedOutput>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJob {
    pub machine_id: String,
    pub operator_id: Option<String>,
    pub kind: NewJobKind,
    pub memo: Option<String>,
}

impl NewJob {
    /// 输入校验（不访问数据库）
    ///
    /// # 返回
    /// - Ok(()): 通过
    /// - Err(String): 第一条违规原因
    pub fn validate(&self) -> Result<(), String> {
        if self.machine_id.trim().is_empty() {
            return Err("机台ID不能为空".to_string());
        }
        match &self.kind {
            NewJobKind::StockAddressed { parent_stock_id } => {
                if parent_stock_id.trim().is_empty() {
                    return Err("母卷库存ID不能为空".to_string());
                }
            }
            NewJobKind::ItemAddressed {
                item_id,
                parent_width_mm,
                planned_roll_count,
                planned_outputs,
            } => {
                if item_id.trim().is_empty() {
                    return Err("母卷品目ID不能为空".to_string());
                }
                if *parent_width_mm <= 0 {
                    return Err(format!("母卷宽度必须大于0: {}", parent_width_mm));
                }
                if *planned_roll_count < 1 {
                    return Err(format!("计划卷数必须至少为1: {}", planned_roll_count));
                }
                for (idx, line) in planned_outputs.iter().enumerate() {
                    if line.item_id.trim().is_empty() {
                        return Err(format!("计划产出第{}行品目不能为空", idx + 1));
                    }
                    if line.width_mm <= 0 || line.width_mm > *parent_width_mm {
                        return Err(format!(
                            "计划产出第{}行宽度{}mm超出范围(0, {}]",
                            idx + 1,
                            line.width_mm,
                            parent_width_mm
                        ));
                    }
                    if line.quantity <= 0 {
                        return Err(format!(
                            "计划产出第{}行数量必须大于0: {}",
                            idx + 1,
                            line.quantity
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}
