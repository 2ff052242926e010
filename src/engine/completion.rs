// ==========================================
// 纸卷分切生产系统 - 作业完工规则
// ==========================================
// 职责: 两种完工方式的前置条件判定（纯函数）
// - FromRolls: 品目/宽度寻址作业，经作业卷台账完工
// - Inline:    母卷寻址（旧版）作业，完工时一次性提交产出
// ==========================================

use crate::domain::job::JobKind;
use crate::domain::output::NewActualOutput;
use crate::domain::roll::JobRoll;
use crate::domain::types::RollStatus;
use serde::{Deserialize, Serialize};

// ==========================================
// JobCompletion - 完工请求
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobCompletion {
    FromRolls {
        memo: Option<String>,
    },
    Inline {
        memo: Option<String>,
        outputs: Vec<NewActualOutput>,
    },
}

impl JobCompletion {
    pub fn memo(&self) -> Option<&str> {
        match self {
            JobCompletion::FromRolls { memo } | JobCompletion::Inline { memo, .. } => {
                memo.as_deref()
            }
        }
    }

    pub fn mode_name(&self) -> &'static str {
        match self {
            JobCompletion::FromRolls { .. } => "FROM_ROLLS",
            JobCompletion::Inline { .. } => "INLINE",
        }
    }
}

/// 完工方式与寻址方式必须匹配
pub fn check_completion_mode(kind: &JobKind, completion: &JobCompletion) -> Result<(), String> {
    match (kind, completion) {
        (JobKind::ItemAddressed { .. }, JobCompletion::FromRolls { .. }) => Ok(()),
        (JobKind::StockAddressed { .. }, JobCompletion::Inline { .. }) => Ok(()),
        (JobKind::ItemAddressed { .. }, JobCompletion::Inline { .. }) => {
            Err("品目/宽度寻址作业必须经作业卷完工，不接受一次性产出".to_string())
        }
        (JobKind::StockAddressed { .. }, JobCompletion::FromRolls { .. }) => {
            Err("母卷寻址作业没有作业卷，完工时必须一次性提交产出".to_string())
        }
    }
}

/// 作业卷完工条件: 至少一卷已完成，且没有卷仍在分切中
pub fn check_roll_completion(rolls: &[JobRoll]) -> Result<(), String> {
    if let Some(running) = rolls.iter().find(|r| r.status == RollStatus::InProgress) {
        return Err(format!(
            "作业卷{}(序号{})仍在分切中，不能完工",
            running.roll_id, running.seq_no
        ));
    }
    let completed = rolls
        .iter()
        .filter(|r| r.status == RollStatus::Completed)
        .count();
    if completed == 0 {
        return Err("没有已完成的作业卷，不能完工".to_string());
    }
    Ok(())
}

/// 一次性提交的产出: 至少一条，逐条校验，不关联计划行
pub fn check_inline_outputs(outputs: &[NewActualOutput]) -> Result<(), String> {
    if outputs.is_empty() {
        return Err("一次性完工必须至少提交一条产出".to_string());
    }
    for (idx, output) in outputs.iter().enumerate() {
        output
            .validate()
            .map_err(|msg| format!("第{}条产出: {}", idx + 1, msg))?;
        if output.planned_output_id.is_some() {
            return Err(format!("第{}条产出: 母卷寻址作业没有计划产出行", idx + 1));
        }
    }
    Ok(())
}

/// 登记新卷前的卷数上限判定
///
/// # 规则
/// - 已取消的卷占用序号，同样计入计划卷数
pub fn check_roll_capacity(kind: &JobKind, total_rolls: i64) -> Result<(), String> {
    match kind.planned_roll_count() {
        None => Err("母卷寻址作业不使用作业卷台账".to_string()),
        Some(planned) if total_rolls >= i64::from(planned) => Err(format!(
            "作业卷数已达计划卷数{}，不能继续登记",
            planned
        )),
        Some(_) => Ok(()),
    }
}
