// ==========================================
// 纸卷分切生产系统 - 审批入库计划
// ==========================================
// 职责: 由作业、作业卷、有效产出生成入库/消耗清单（纯函数）
// 红线: 计划生成失败时不产生任何台账写入；执行由 JobApi 在同一事务内完成
// ==========================================

use crate::domain::job::{Job, JobKind};
use crate::domain::output::ActualOutput;
use crate::domain::roll::JobRoll;
use crate::domain::stock::NewStock;
use crate::domain::types::{RollStatus, StockCondition};
use serde::Serialize;

/// 单条产出入库
#[derive(Debug, Clone, Serialize)]
pub struct StockPosting {
    pub output_id: String,
    pub new_stock: NewStock,
}

/// 审批计划
#[derive(Debug, Clone, Serialize)]
pub struct ApprovalPlan {
    pub job_id: String,
    pub postings: Vec<StockPosting>,
    /// 待消耗的母卷库存ID（按卷序号）
    pub consumed_stock_ids: Vec<String>,
    pub loss_quantity: i64,
}

// ==========================================
// ApprovalPlanner
// ==========================================
pub struct ApprovalPlanner;

impl ApprovalPlanner {
    pub fn new() -> Self {
        Self
    }

    /// 生成审批计划
    ///
    /// # 参数
    /// - job: 处于 COMPLETED 的作业（状态由调用方判定）
    /// - rolls: 作业全部作业卷
    /// - outputs: 有效产出（已排除取消卷上的产出）
    ///
    /// # 返回
    /// - Err(String): 卷/产出合计不一致，整体拒绝
    pub fn plan(
        &self,
        job: &Job,
        rolls: &[JobRoll],
        outputs: &[ActualOutput],
    ) -> Result<ApprovalPlan, String> {
        let consumed_stock_ids = match &job.kind {
            JobKind::StockAddressed { parent_stock_id } => vec![parent_stock_id.clone()],
            JobKind::ItemAddressed { .. } => {
                if let Some(open) = rolls.iter().find(|r| r.status.is_open()) {
                    return Err(format!(
                        "作业卷{}状态为{}，作业卷未全部结束",
                        open.roll_id, open.status
                    ));
                }
                let mut completed: Vec<&JobRoll> = rolls
                    .iter()
                    .filter(|r| r.status == RollStatus::Completed)
                    .collect();
                completed.sort_by_key(|r| r.seq_no);
                if completed.is_empty() {
                    return Err("没有已完成的作业卷，无法审批".to_string());
                }
                completed.into_iter().map(|r| r.stock_id.clone()).collect()
            }
        };

        let mut postings = Vec::new();
        let mut loss_quantity = 0_i64;
        for output in outputs {
            if output.job_id != job.job_id {
                return Err(format!(
                    "产出{}不属于作业{}",
                    output.output_id, job.job_id
                ));
            }
            if let Some(stock_id) = &output.created_stock_id {
                return Err(format!(
                    "产出{}已入库为库存{}，不能重复入库",
                    output.output_id, stock_id
                ));
            }
            if let Some(roll_id) = &output.roll_id {
                let on_completed = rolls
                    .iter()
                    .any(|r| &r.roll_id == roll_id && r.status == RollStatus::Completed);
                if !on_completed {
                    return Err(format!(
                        "产出{}所属作业卷{}未完成",
                        output.output_id, roll_id
                    ));
                }
            }

            if output.is_loss {
                loss_quantity += output.quantity;
                continue;
            }
            postings.push(StockPosting {
                output_id: output.output_id.clone(),
                new_stock: NewStock {
                    item_id: output.item_id.clone(),
                    width_mm: output.width_mm,
                    quantity: output.quantity,
                    weight_kg: output.weight_kg,
                    length_m: output.length_m,
                    condition: StockCondition::Slitted,
                    source_job_id: Some(job.job_id.clone()),
                    source_roll_id: output.roll_id.clone(),
                },
            });
        }

        if postings.is_empty() {
            return Err("作业没有可入库的实际产出（非损耗）".to_string());
        }

        Ok(ApprovalPlan {
            job_id: job.job_id.clone(),
            postings,
            consumed_stock_ids,
            loss_quantity,
        })
    }
}

impl Default for ApprovalPlanner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::JobStatus;
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn job(kind: JobKind) -> Job {
        Job {
            job_id: "J1".to_string(),
            schedule_id: "SCH1".to_string(),
            seq_no: 1,
            machine_id: "M1".to_string(),
            operator_id: None,
            kind,
            status: JobStatus::Completed,
            memo: None,
            completion_memo: None,
            created_by: "planner".to_string(),
            created_at: ts(),
            started_by: None,
            started_at: None,
            completed_by: None,
            completed_at: None,
            approved_by: None,
            approved_at: None,
        }
    }

    fn item_kind() -> JobKind {
        JobKind::ItemAddressed {
            item_id: "I1".to_string(),
            parent_width_mm: 1200,
            planned_roll_count: 2,
        }
    }

    fn roll(id: &str, seq: i32, stock: &str, status: RollStatus) -> JobRoll {
        JobRoll {
            roll_id: id.to_string(),
            job_id: "J1".to_string(),
            seq_no: seq,
            stock_id: stock.to_string(),
            status,
            notes: None,
            registered_by: "op".to_string(),
            registered_at: ts(),
            started_by: None,
            started_at: None,
            completed_by: None,
            completed_at: None,
            cancelled_by: None,
            cancelled_at: None,
        }
    }

    fn output(id: &str, roll_id: Option<&str>, qty: i64, is_loss: bool) -> ActualOutput {
        ActualOutput {
            output_id: id.to_string(),
            job_id: "J1".to_string(),
            roll_id: roll_id.map(str::to_string),
            planned_output_id: None,
            item_id: "I2".to_string(),
            width_mm: 600,
            quantity: qty,
            length_m: None,
            weight_kg: Some(150.0),
            is_loss,
            notes: None,
            created_stock_id: None,
            recorded_by: "op".to_string(),
            recorded_at: ts(),
        }
    }

    #[test]
    fn test_plan_posts_non_loss_and_consumes_completed_rolls() {
        let rolls = vec![
            roll("R2", 2, "S2", RollStatus::Completed),
            roll("R1", 1, "S1", RollStatus::Completed),
            roll("R3", 3, "S3", RollStatus::Cancelled),
        ];
        let outputs = vec![
            output("O1", Some("R1"), 1, false),
            output("O2", Some("R1"), 1, false),
            output("O3", Some("R2"), 2, true),
        ];

        let plan = ApprovalPlanner::new()
            .plan(&job(item_kind()), &rolls, &outputs)
            .unwrap();

        assert_eq!(plan.postings.len(), 2);
        assert_eq!(plan.consumed_stock_ids, vec!["S1", "S2"]);
        assert_eq!(plan.loss_quantity, 2);
        let first = &plan.postings[0].new_stock;
        assert_eq!(first.condition, StockCondition::Slitted);
        assert_eq!(first.source_job_id.as_deref(), Some("J1"));
        assert_eq!(first.source_roll_id.as_deref(), Some("R1"));
    }

    #[test]
    fn test_plan_rejects_zero_outputs() {
        let rolls = vec![roll("R1", 1, "S1", RollStatus::Completed)];
        let err = ApprovalPlanner::new()
            .plan(&job(item_kind()), &rolls, &[])
            .unwrap_err();
        assert!(err.contains("没有可入库"));

        // 全部为损耗同样拒绝
        let only_loss = vec![output("O1", Some("R1"), 3, true)];
        assert!(ApprovalPlanner::new()
            .plan(&job(item_kind()), &rolls, &only_loss)
            .is_err());
    }

    #[test]
    fn test_plan_rejects_already_posted_output() {
        let rolls = vec![roll("R1", 1, "S1", RollStatus::Completed)];
        let mut posted = output("O1", Some("R1"), 1, false);
        posted.created_stock_id = Some("NEW1".to_string());
        assert!(ApprovalPlanner::new()
            .plan(&job(item_kind()), &rolls, &[posted])
            .is_err());
    }

    #[test]
    fn test_plan_legacy_job_consumes_parent_stock() {
        let legacy = job(JobKind::StockAddressed {
            parent_stock_id: "P1".to_string(),
        });
        let outputs = vec![output("O1", None, 4, false)];
        let plan = ApprovalPlanner::new().plan(&legacy, &[], &outputs).unwrap();
        assert_eq!(plan.consumed_stock_ids, vec!["P1"]);
        assert_eq!(plan.postings[0].new_stock.quantity, 4);
        assert_eq!(plan.postings[0].new_stock.source_roll_id, None);
    }
}
