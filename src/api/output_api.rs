// ==========================================
// 纸卷分切生产系统 - 实际产出登记 API
// ==========================================
// 职责: 在分切中的作业卷上登记实际产出（含损耗）
// 口径: 登记时不按计划数量设上限，超产/欠产由差异分析反映
// ==========================================

use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::api::job_api::load_job;
use crate::api::roll_api::load_roll;
use crate::api::validator::{require_actor, require_non_empty};
use crate::domain::output::{ActualOutput, NewActualOutput};
use crate::domain::types::RollStatus;
use crate::engine::transitions::TransitionRejected;
use crate::repository::job_repo::JobRepository;
use crate::repository::output_repo::ActualOutputRepository;
use crate::repository::unit_of_work::UnitOfWork;

pub struct OutputApi {
    uow: Arc<UnitOfWork>,
}

impl OutputApi {
    pub fn new(uow: Arc<UnitOfWork>) -> Self {
        Self { uow }
    }

    /// 登记实际产出
    ///
    /// # 规则
    /// - 作业卷必须为 IN_PROGRESS
    /// - 关联计划产出行时，该行必须属于同一作业
    pub fn record_output(
        &self,
        job_id: &str,
        roll_id: &str,
        output: NewActualOutput,
        actor: &str,
    ) -> ApiResult<ActualOutput> {
        require_non_empty(job_id, "作业ID")?;
        require_non_empty(roll_id, "作业卷ID")?;
        require_actor(actor)?;
        output.validate().map_err(ApiError::ValidationError)?;

        let recorded = self
            .uow
            .execute(|tx| {
                let job = load_job(tx, job_id)?;
                let roll = load_roll(tx, &job, roll_id)?;
                if roll.status != RollStatus::InProgress {
                    return Err(ApiError::invalid_transition(
                        "JobRoll",
                        roll_id,
                        TransitionRejected {
                            current: roll.status.to_string(),
                            action: "record_output",
                        },
                    ));
                }

                if let Some(planned_id) = output.planned_output_id.as_deref() {
                    let belongs = JobRepository::new(tx)
                        .find_planned_output(planned_id)?
                        .is_some_and(|line| line.job_id == job_id);
                    if !belongs {
                        return Err(ApiError::ValidationError(format!(
                            "计划产出行{}不属于作业{}",
                            planned_id, job_id
                        )));
                    }
                }

                let recorded = ActualOutput {
                    output_id: uuid::Uuid::new_v4().to_string(),
                    job_id: job_id.to_string(),
                    roll_id: Some(roll_id.to_string()),
                    planned_output_id: output.planned_output_id.clone(),
                    item_id: output.item_id.trim().to_string(),
                    width_mm: output.width_mm,
                    quantity: output.quantity,
                    length_m: output.length_m,
                    weight_kg: output.weight_kg,
                    is_loss: output.is_loss,
                    notes: output.notes.clone(),
                    created_stock_id: None,
                    recorded_by: actor.to_string(),
                    recorded_at: super::current_time(),
                };
                ActualOutputRepository::new(tx).insert(&recorded)?;
                Ok(recorded)
            })
            .inspect_err(|e| {
                tracing::warn!(
                    job_id = job_id,
                    roll_id = roll_id,
                    error = %e,
                    "产出登记被拒绝"
                );
            })?;

        tracing::info!(
            job_id = job_id,
            roll_id = roll_id,
            output_id = %recorded.output_id,
            quantity = recorded.quantity,
            is_loss = recorded.is_loss,
            "实际产出已登记"
        );
        Ok(recorded)
    }

    /// 作业全部产出（含已取消卷上的产出）
    pub fn list_outputs(&self, job_id: &str) -> ApiResult<Vec<ActualOutput>> {
        require_non_empty(job_id, "作业ID")?;
        self.uow.read(|conn| {
            load_job(conn, job_id)?;
            Ok(ActualOutputRepository::new(conn).find_by_job(job_id)?)
        })
    }

    pub fn list_roll_outputs(&self, job_id: &str, roll_id: &str) -> ApiResult<Vec<ActualOutput>> {
        require_non_empty(job_id, "作业ID")?;
        require_non_empty(roll_id, "作业卷ID")?;
        self.uow.read(|conn| {
            let job = load_job(conn, job_id)?;
            load_roll(conn, &job, roll_id)?;
            Ok(ActualOutputRepository::new(conn).find_by_roll(roll_id)?)
        })
    }
}
