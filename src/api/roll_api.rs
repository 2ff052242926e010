// ==========================================
// 纸卷分切生产系统 - 作业卷台账 API
// ==========================================
// 职责: 作业卷登记、开工、完工、取消；候选母卷查询
// 状态: REGISTERED → IN_PROGRESS → COMPLETED，非终态可 → CANCELLED
// 红线:
// - 作业卷数不超过计划卷数（取消的卷不计）
// - 同一作业同一时刻至多一卷 IN_PROGRESS（条件更新 + 部分唯一索引）
// - 一个库存单元至多支撑一个未结束的卷
// ==========================================

use std::sync::Arc;

use rusqlite::Connection;

use crate::api::error::{ApiError, ApiResult};
use crate::api::job_api::load_job;
use crate::api::validator::{config_error, require_actor, require_non_empty};
use crate::config::SlittingConfigReader;
use crate::domain::job::{Job, JobKind};
use crate::domain::roll::JobRoll;
use crate::domain::stock::Stock;
use crate::domain::types::{JobStatus, RollStatus};
use crate::engine::completion::check_roll_capacity;
use crate::engine::stock_match::check_parent_stock;
use crate::engine::transitions::{next_roll_status, RollAction, TransitionRejected};
use crate::repository::ledger::StockLedger;
use crate::repository::roll_repo::JobRollRepository;
use crate::repository::unit_of_work::UnitOfWork;

pub struct RollApi {
    uow: Arc<UnitOfWork>,
    config: Arc<dyn SlittingConfigReader>,
    stock_ledger: Arc<dyn StockLedger>,
}

impl RollApi {
    pub fn new(
        uow: Arc<UnitOfWork>,
        config: Arc<dyn SlittingConfigReader>,
        stock_ledger: Arc<dyn StockLedger>,
    ) -> Self {
        Self {
            uow,
            config,
            stock_ledger,
        }
    }

    /// 候选母卷: 品目一致、宽度在容差内、状态可用的母卷
    pub fn list_candidate_stock(&self, job_id: &str) -> ApiResult<Vec<Stock>> {
        require_non_empty(job_id, "作业ID")?;
        let tolerance = self
            .config
            .get_parent_width_tolerance_mm()
            .map_err(config_error)?;

        self.uow.read(|conn| {
            let job = load_job(conn, job_id)?;
            match &job.kind {
                JobKind::ItemAddressed {
                    item_id,
                    parent_width_mm,
                    ..
                } => self
                    .stock_ledger
                    .find_available_parent_stock(
                        conn,
                        Some(item_id.as_str()),
                        Some(*parent_width_mm),
                        tolerance,
                    )
                    .map_err(|e| {
                        ApiError::dependency(
                            "StockLedger",
                            "find_available_parent_stock",
                            format!("job_id={}", job_id),
                            e,
                        )
                    }),
                JobKind::StockAddressed { .. } => Err(ApiError::ValidationError(format!(
                    "作业{}为母卷寻址作业，不使用作业卷台账",
                    job_id
                ))),
            }
        })
    }

    /// 登记作业卷（预留母卷）
    ///
    /// # 规则
    /// - 作业为 READY / IN_PROGRESS 且为品目/宽度寻址
    /// - 卷数未达计划卷数
    /// - 母卷: PARENT + AVAILABLE，品目一致，宽度在容差内
    /// - 母卷已被其他未结束的卷占用 → Conflict
    pub fn register_roll(
        &self,
        job_id: &str,
        stock_id: &str,
        notes: Option<&str>,
        actor: &str,
    ) -> ApiResult<JobRoll> {
        require_non_empty(job_id, "作业ID")?;
        require_non_empty(stock_id, "库存ID")?;
        require_actor(actor)?;
        let tolerance = self
            .config
            .get_parent_width_tolerance_mm()
            .map_err(config_error)?;

        let roll = self
            .uow
            .execute(|tx| {
                let job = load_job(tx, job_id)?;
                if !matches!(job.status, JobStatus::Ready | JobStatus::InProgress) {
                    return Err(ApiError::invalid_transition(
                        "Job",
                        job_id,
                        TransitionRejected {
                            current: job.status.to_string(),
                            action: "register_roll",
                        },
                    ));
                }

                let roll_repo = JobRollRepository::new(tx);
                let counts = roll_repo.count_by_job(job_id)?;
                check_roll_capacity(&job.kind, counts.total())
                    .map_err(|msg| ApiError::ValidationError(format!("作业{}: {}", job_id, msg)))?;

                if let Some(open) = roll_repo.find_open_by_stock(stock_id)? {
                    return Err(ApiError::Conflict(format!(
                        "库存{}已被作业{}的作业卷{}占用",
                        stock_id, open.job_id, open.roll_id
                    )));
                }

                let stock = self
                    .stock_ledger
                    .find_stock(tx, stock_id)
                    .map_err(|e| {
                        ApiError::dependency(
                            "StockLedger",
                            "find_stock",
                            format!("stock_id={}", stock_id),
                            e,
                        )
                    })?
                    .ok_or_else(|| ApiError::ValidationError(format!("库存{}不存在", stock_id)))?;
                check_parent_stock(&job.kind, &stock, tolerance)
                    .map_err(|r| ApiError::stock_rejected(job_id, r))?;

                self.stock_ledger
                    .reserve_stock(tx, stock_id)
                    .map_err(|e| {
                        ApiError::dependency(
                            "StockLedger",
                            "reserve_stock",
                            format!("job_id={}, stock_id={}", job_id, stock_id),
                            e,
                        )
                    })?;

                let roll = JobRoll {
                    roll_id: uuid::Uuid::new_v4().to_string(),
                    job_id: job_id.to_string(),
                    seq_no: roll_repo.next_seq_in_job(job_id)?,
                    stock_id: stock_id.to_string(),
                    status: RollStatus::Registered,
                    notes: notes.map(str::to_string),
                    registered_by: actor.to_string(),
                    registered_at: super::current_time(),
                    started_by: None,
                    started_at: None,
                    completed_by: None,
                    completed_at: None,
                    cancelled_by: None,
                    cancelled_at: None,
                };
                roll_repo.insert(&roll)?;
                Ok(roll)
            })
            .inspect_err(|e| log_rejection("register_roll", job_id, None, e))?;

        tracing::info!(
            job_id = job_id,
            roll_id = %roll.roll_id,
            seq_no = roll.seq_no,
            stock_id = stock_id,
            actor = actor,
            "作业卷已登记"
        );
        Ok(roll)
    }

    /// REGISTERED → IN_PROGRESS
    ///
    /// 作业须为 IN_PROGRESS；同作业已有分切中的卷时拒绝。
    ///
    /// # 并发
    /// - 落败方在胜方提交后读到分切中的卷：InvalidStateTransition
    /// - 落败方的条件更新未命中或触发唯一索引：Conflict
    /// - 两种情况下落败方都不修改任何数据
    pub fn start_roll(&self, job_id: &str, roll_id: &str, actor: &str) -> ApiResult<JobRoll> {
        require_non_empty(job_id, "作业ID")?;
        require_non_empty(roll_id, "作业卷ID")?;
        require_actor(actor)?;

        let roll = self
            .uow
            .execute(|tx| {
                let job = load_job(tx, job_id)?;
                require_job_running(&job, RollAction::Start)?;
                let roll = load_roll(tx, &job, roll_id)?;
                next_roll_status(roll.status, RollAction::Start)
                    .map_err(|r| ApiError::invalid_transition("JobRoll", roll_id, r))?;

                let roll_repo = JobRollRepository::new(tx);
                if let Some(running) = roll_repo.find_in_progress(job_id)? {
                    return Err(ApiError::InvalidStateTransition {
                        entity: "JobRoll".to_string(),
                        id: roll_id.to_string(),
                        from: format!(
                            "{}（作业卷{}已在分切中）",
                            roll.status, running.roll_id
                        ),
                        action: RollAction::Start.to_string(),
                    });
                }

                if roll_repo.mark_started(roll_id, actor, super::current_time())? == 0 {
                    return Err(ApiError::Conflict(format!(
                        "作业{}的作业卷{}开工失败: 状态已被其他请求修改",
                        job_id, roll_id
                    )));
                }
                load_roll(tx, &job, roll_id)
            })
            .inspect_err(|e| log_rejection("start_roll", job_id, Some(roll_id), e))?;

        tracing::info!(job_id = job_id, roll_id = roll_id, actor = actor, "作业卷开始分切");
        Ok(roll)
    }

    /// IN_PROGRESS → COMPLETED
    pub fn complete_roll(
        &self,
        job_id: &str,
        roll_id: &str,
        notes: Option<&str>,
        actor: &str,
    ) -> ApiResult<JobRoll> {
        require_non_empty(job_id, "作业ID")?;
        require_non_empty(roll_id, "作业卷ID")?;
        require_actor(actor)?;

        let roll = self
            .uow
            .execute(|tx| {
                let job = load_job(tx, job_id)?;
                let roll = load_roll(tx, &job, roll_id)?;
                next_roll_status(roll.status, RollAction::Complete)
                    .map_err(|r| ApiError::invalid_transition("JobRoll", roll_id, r))?;

                if JobRollRepository::new(tx).mark_completed(
                    roll_id,
                    actor,
                    super::current_time(),
                    notes,
                )? == 0
                {
                    return Err(ApiError::Conflict(format!(
                        "作业{}的作业卷{}完工失败: 状态已被其他请求修改",
                        job_id, roll_id
                    )));
                }
                load_roll(tx, &job, roll_id)
            })
            .inspect_err(|e| log_rejection("complete_roll", job_id, Some(roll_id), e))?;

        tracing::info!(job_id = job_id, roll_id = roll_id, actor = actor, "作业卷已完成");
        Ok(roll)
    }

    /// 非终态 → CANCELLED，释放母卷预留
    ///
    /// 已取消卷上记录的产出不再参与入库与差异分析。
    pub fn cancel_roll(
        &self,
        job_id: &str,
        roll_id: &str,
        notes: Option<&str>,
        actor: &str,
    ) -> ApiResult<JobRoll> {
        require_non_empty(job_id, "作业ID")?;
        require_non_empty(roll_id, "作业卷ID")?;
        require_actor(actor)?;

        let roll = self
            .uow
            .execute(|tx| {
                let job = load_job(tx, job_id)?;
                let roll = load_roll(tx, &job, roll_id)?;
                next_roll_status(roll.status, RollAction::Cancel)
                    .map_err(|r| ApiError::invalid_transition("JobRoll", roll_id, r))?;

                if JobRollRepository::new(tx).mark_cancelled(
                    roll_id,
                    roll.status,
                    actor,
                    super::current_time(),
                    notes,
                )? == 0
                {
                    return Err(ApiError::Conflict(format!(
                        "作业{}的作业卷{}取消失败: 状态已被其他请求修改",
                        job_id, roll_id
                    )));
                }

                self.stock_ledger
                    .release_stock(tx, &roll.stock_id)
                    .map_err(|e| {
                        ApiError::dependency(
                            "StockLedger",
                            "release_stock",
                            format!("job_id={}, roll_id={}", job_id, roll_id),
                            e,
                        )
                    })?;
                load_roll(tx, &job, roll_id)
            })
            .inspect_err(|e| log_rejection("cancel_roll", job_id, Some(roll_id), e))?;

        tracing::info!(
            job_id = job_id,
            roll_id = roll_id,
            stock_id = %roll.stock_id,
            actor = actor,
            "作业卷已取消，母卷预留已释放"
        );
        Ok(roll)
    }

    pub fn list_rolls(&self, job_id: &str) -> ApiResult<Vec<JobRoll>> {
        require_non_empty(job_id, "作业ID")?;
        self.uow.read(|conn| {
            load_job(conn, job_id)?;
            Ok(JobRollRepository::new(conn).find_by_job(job_id)?)
        })
    }
}

/// 读取作业卷并校验归属
pub(crate) fn load_roll(conn: &Connection, job: &Job, roll_id: &str) -> ApiResult<JobRoll> {
    JobRollRepository::new(conn)
        .find_by_id(roll_id)?
        .filter(|r| r.job_id == job.job_id)
        .ok_or_else(|| {
            ApiError::NotFound(format!(
                "JobRoll(id={})不存在或不属于作业{}",
                roll_id, job.job_id
            ))
        })
}

fn require_job_running(job: &Job, action: RollAction) -> ApiResult<()> {
    if job.status != JobStatus::InProgress {
        return Err(ApiError::invalid_transition(
            "Job",
            &job.job_id,
            TransitionRejected {
                current: job.status.to_string(),
                action: action.name(),
            },
        ));
    }
    Ok(())
}

fn log_rejection(action: &str, job_id: &str, roll_id: Option<&str>, err: &ApiError) {
    tracing::warn!(
        job_id = job_id,
        roll_id = ?roll_id,
        action = action,
        error = %err,
        "作业卷操作被拒绝"
    );
}
