// ==========================================
// 纸卷分切生产系统 - 作业状态机 API
// ==========================================
// 职责: 作业生命周期推进、审批入库、查询与差异报告
// 状态: PENDING → READY → IN_PROGRESS → COMPLETED → APPROVED
// 红线:
// - 每次转换（含台账/机台副作用）在同一工作单元内提交或整体回滚
// - 转换使用条件更新，竞争失败返回 Conflict
// - 审批是唯一的入库点，且不可重复审批
// ==========================================

use std::sync::Arc;

use rusqlite::Connection;

use crate::api::dto::{ApprovalResult, JobDetail, JobFilter, JobSummary, Page, RollDetail};
use crate::api::error::{ApiError, ApiResult};
use crate::api::schedule_api::load_schedule;
use crate::api::validator::{check_date_range, normalize_page, require_actor, require_non_empty};
use crate::config::SlittingConfigReader;
use crate::domain::job::Job;
use crate::domain::output::ActualOutput;
use crate::domain::types::{JobStatus, MachineStatus, RollStatus, ScheduleStatus};
use crate::engine::approval::ApprovalPlanner;
use crate::engine::completion::{
    check_completion_mode, check_inline_outputs, check_roll_completion, JobCompletion,
};
use crate::engine::transitions::{
    next_job_status, next_schedule_status, JobAction, ScheduleAction,
};
use crate::engine::variance::{VarianceAnalyzer, VarianceReport};
use crate::repository::job_repo::{JobQuery, JobRepository};
use crate::repository::ledger::{MachineRegistry, StockLedger};
use crate::repository::output_repo::ActualOutputRepository;
use crate::repository::roll_repo::JobRollRepository;
use crate::repository::schedule_repo::ScheduleRepository;
use crate::repository::unit_of_work::UnitOfWork;

/// 完工时自动取消未开工卷的备注
const AUTO_CANCEL_NOTE: &str = "作业完工，未开工卷自动取消";

// ==========================================
// JobApi - 作业状态机 API
// ==========================================

/// 作业状态机API
///
/// 职责：
/// 1. 就绪/开工/完工/审批 四个转换
/// 2. 开工/完工时维护机台状态
/// 3. 审批时按产出入库并消耗母卷
/// 4. 作业列表、完整关系图、差异报告
pub struct JobApi {
    uow: Arc<UnitOfWork>,
    config: Arc<dyn SlittingConfigReader>,
    stock_ledger: Arc<dyn StockLedger>,
    machine_registry: Arc<dyn MachineRegistry>,
    planner: ApprovalPlanner,
    analyzer: VarianceAnalyzer,
}

impl JobApi {
    pub fn new(
        uow: Arc<UnitOfWork>,
        config: Arc<dyn SlittingConfigReader>,
        stock_ledger: Arc<dyn StockLedger>,
        machine_registry: Arc<dyn MachineRegistry>,
    ) -> Self {
        Self {
            uow,
            config,
            stock_ledger,
            machine_registry,
            planner: ApprovalPlanner::new(),
            analyzer: VarianceAnalyzer::new(),
        }
    }

    // ==========================================
    // 状态转换
    // ==========================================

    /// PENDING → READY（排程须已发布）
    pub fn mark_ready(&self, job_id: &str, actor: &str) -> ApiResult<Job> {
        require_non_empty(job_id, "作业ID")?;
        require_actor(actor)?;

        let job = self
            .uow
            .execute(|tx| {
                let job = load_job(tx, job_id)?;
                next_job_status(job.status, JobAction::MarkReady)
                    .map_err(|r| ApiError::invalid_transition("Job", job_id, r))?;

                let schedule = load_schedule(tx, &job.schedule_id)?;
                if !schedule.status.is_executable() {
                    return Err(ApiError::ValidationError(format!(
                        "作业{}所属排程{}状态为{}，尚未发布",
                        job_id, schedule.schedule_no, schedule.status
                    )));
                }

                apply_transition(tx, &job, JobAction::MarkReady, actor, None)?;
                load_job(tx, job_id)
            })
            .inspect_err(|e| log_rejection(JobAction::MarkReady, job_id, e))?;

        tracing::info!(job_id = job_id, actor = actor, "作业已就绪");
        Ok(job)
    }

    /// READY → IN_PROGRESS
    ///
    /// # 副作用
    /// - 机台置为 RUNNING（维护中的机台拒绝开工）
    /// - 排程首个作业开工时 PUBLISHED → IN_PROGRESS
    pub fn start_job(&self, job_id: &str, actor: &str) -> ApiResult<Job> {
        require_non_empty(job_id, "作业ID")?;
        require_actor(actor)?;

        let job = self
            .uow
            .execute(|tx| {
                let job = load_job(tx, job_id)?;
                next_job_status(job.status, JobAction::Start)
                    .map_err(|r| ApiError::invalid_transition("Job", job_id, r))?;

                let context = format!("job_id={}, machine_id={}", job_id, job.machine_id);
                let machine = self
                    .machine_registry
                    .find_machine(tx, &job.machine_id)
                    .map_err(|e| {
                        ApiError::dependency("MachineRegistry", "find_machine", context.as_str(), e)
                    })?
                    .ok_or_else(|| ApiError::DependencyFailure {
                        dependency: "MachineRegistry".to_string(),
                        operation: "find_machine".to_string(),
                        context: context.clone(),
                        message: "机台不存在".to_string(),
                    })?;
                if !machine.accepts_work() {
                    return Err(ApiError::ValidationError(format!(
                        "机台{}处于{}，不能开工",
                        machine.machine_code, machine.status
                    )));
                }

                apply_transition(tx, &job, JobAction::Start, actor, None)?;

                self.machine_registry
                    .set_status(tx, &job.machine_id, MachineStatus::Running)
                    .map_err(|e| {
                        ApiError::dependency("MachineRegistry", "set_status", context.as_str(), e)
                    })?;

                let schedule = load_schedule(tx, &job.schedule_id)?;
                if schedule.status == ScheduleStatus::Published {
                    next_schedule_status(schedule.status, ScheduleAction::Begin).map_err(|r| {
                        ApiError::invalid_transition("Schedule", &schedule.schedule_id, r)
                    })?;
                    if ScheduleRepository::new(tx).mark_in_progress(&schedule.schedule_id)? == 0 {
                        return Err(ApiError::Conflict(format!(
                            "排程{}进入生产中失败: 状态已被其他请求修改",
                            schedule.schedule_id
                        )));
                    }
                    tracing::info!(schedule_id = %schedule.schedule_id, "排程进入生产中");
                }
                load_job(tx, job_id)
            })
            .inspect_err(|e| log_rejection(JobAction::Start, job_id, e))?;

        tracing::info!(
            job_id = job_id,
            machine_id = %job.machine_id,
            actor = actor,
            "作业已开工"
        );
        Ok(job)
    }

    /// IN_PROGRESS → COMPLETED
    ///
    /// # 参数
    /// - completion: FromRolls（品目/宽度寻址）或 Inline（母卷寻址，一次性提交产出）
    ///
    /// # 规则
    /// - FromRolls: 至少一卷已完成，且无卷在分切中；未开工卷自动取消并释放母卷
    /// - Inline: 至少一条产出，产出不挂作业卷
    /// - 机台上没有其他执行中的作业时，机台回到 IDLE
    pub fn complete_job(
        &self,
        job_id: &str,
        completion: JobCompletion,
        actor: &str,
    ) -> ApiResult<Job> {
        require_non_empty(job_id, "作业ID")?;
        require_actor(actor)?;

        let mode = completion.mode_name();
        let job = self
            .uow
            .execute(|tx| {
                let job = load_job(tx, job_id)?;
                next_job_status(job.status, JobAction::Complete)
                    .map_err(|r| ApiError::invalid_transition("Job", job_id, r))?;
                check_completion_mode(&job.kind, &completion).map_err(|msg| {
                    ApiError::ValidationError(format!("作业{}: {}", job_id, msg))
                })?;

                match &completion {
                    JobCompletion::FromRolls { .. } => self.close_rolls(tx, &job, actor)?,
                    JobCompletion::Inline { outputs, .. } => {
                        check_inline_outputs(outputs).map_err(|msg| {
                            ApiError::ValidationError(format!("作业{}: {}", job_id, msg))
                        })?;
                        let output_repo = ActualOutputRepository::new(tx);
                        let now = super::current_time();
                        for new_output in outputs {
                            output_repo.insert(&ActualOutput {
                                output_id: uuid::Uuid::new_v4().to_string(),
                                job_id: job_id.to_string(),
                                roll_id: None,
                                planned_output_id: None,
                                item_id: new_output.item_id.trim().to_string(),
                                width_mm: new_output.width_mm,
                                quantity: new_output.quantity,
                                length_m: new_output.length_m,
                                weight_kg: new_output.weight_kg,
                                is_loss: new_output.is_loss,
                                notes: new_output.notes.clone(),
                                created_stock_id: None,
                                recorded_by: actor.to_string(),
                                recorded_at: now,
                            })?;
                        }
                    }
                }

                apply_transition(tx, &job, JobAction::Complete, actor, completion.memo())?;
                self.release_machine(tx, &job)?;
                load_job(tx, job_id)
            })
            .inspect_err(|e| log_rejection(JobAction::Complete, job_id, e))?;

        tracing::info!(job_id = job_id, mode = mode, actor = actor, "作业已完工");
        Ok(job)
    }

    /// 完工前收口作业卷: 校验卷状态，取消未开工卷并释放母卷
    fn close_rolls(&self, conn: &Connection, job: &Job, actor: &str) -> ApiResult<()> {
        let roll_repo = JobRollRepository::new(conn);
        let rolls = roll_repo.find_by_job(&job.job_id)?;
        check_roll_completion(&rolls)
            .map_err(|msg| ApiError::ValidationError(format!("作业{}: {}", job.job_id, msg)))?;

        let now = super::current_time();
        for roll in rolls.iter().filter(|r| r.status == RollStatus::Registered) {
            let affected = roll_repo.mark_cancelled(
                &roll.roll_id,
                RollStatus::Registered,
                actor,
                now,
                Some(AUTO_CANCEL_NOTE),
            )?;
            if affected == 0 {
                return Err(ApiError::Conflict(format!(
                    "作业卷{}状态已被其他请求修改",
                    roll.roll_id
                )));
            }
            self.stock_ledger
                .release_stock(conn, &roll.stock_id)
                .map_err(|e| {
                    ApiError::dependency(
                        "StockLedger",
                        "release_stock",
                        format!("job_id={}, roll_id={}", job.job_id, roll.roll_id),
                        e,
                    )
                })?;
            tracing::info!(
                job_id = %job.job_id,
                roll_id = %roll.roll_id,
                stock_id = %roll.stock_id,
                "未开工作业卷已自动取消"
            );
        }
        Ok(())
    }

    /// 机台上没有其他执行中的作业时，RUNNING → IDLE
    fn release_machine(&self, conn: &Connection, job: &Job) -> ApiResult<()> {
        let others = JobRepository::new(conn)
            .count_in_progress_on_machine(&job.machine_id, Some(&job.job_id))?;
        if others > 0 {
            return Ok(());
        }

        let context = format!("job_id={}, machine_id={}", job.job_id, job.machine_id);
        let machine = self
            .machine_registry
            .find_machine(conn, &job.machine_id)
            .map_err(|e| ApiError::dependency("MachineRegistry", "find_machine", context.as_str(), e))?;
        if let Some(machine) = machine {
            if machine.status == MachineStatus::Running {
                self.machine_registry
                    .set_status(conn, &job.machine_id, MachineStatus::Idle)
                    .map_err(|e| {
                        ApiError::dependency("MachineRegistry", "set_status", context.as_str(), e)
                    })?;
            }
        }
        Ok(())
    }

    /// COMPLETED → APPROVED（入库）
    ///
    /// # 步骤（同一事务）
    /// 1. 每条有效的非损耗产出生成一条 SLITTED 库存，并回写到产出
    /// 2. 消耗已完成作业卷的母卷（母卷寻址作业消耗其母卷）
    /// 3. 作业置为 APPROVED
    /// 4. 排程内全部作业已审批时，排程置为 COMPLETED
    ///
    /// 任一步失败整体回滚，作业保持 COMPLETED。
    pub fn approve_job(&self, job_id: &str, actor: &str) -> ApiResult<ApprovalResult> {
        require_non_empty(job_id, "作业ID")?;
        require_actor(actor)?;

        let result = self
            .uow
            .execute(|tx| {
                let job = load_job(tx, job_id)?;
                next_job_status(job.status, JobAction::Approve)
                    .map_err(|r| ApiError::invalid_transition("Job", job_id, r))?;

                let rolls = JobRollRepository::new(tx).find_by_job(job_id)?;
                let output_repo = ActualOutputRepository::new(tx);
                let outputs = output_repo.find_effective_by_job(job_id)?;
                let plan = self
                    .planner
                    .plan(&job, &rolls, &outputs)
                    .map_err(|msg| ApiError::ValidationError(format!("作业{}: {}", job_id, msg)))?;

                let mut created_stock = Vec::with_capacity(plan.postings.len());
                for posting in &plan.postings {
                    let stock = self
                        .stock_ledger
                        .create_stock(tx, &posting.new_stock)
                        .map_err(|e| {
                            ApiError::dependency(
                                "StockLedger",
                                "create_stock",
                                format!("job_id={}, output_id={}", job_id, posting.output_id),
                                e,
                            )
                        })?;
                    output_repo.link_created_stock(&posting.output_id, &stock.stock_id)?;
                    tracing::debug!(
                        job_id = job_id,
                        output_id = %posting.output_id,
                        stock_id = %stock.stock_id,
                        quantity = stock.quantity,
                        "产出已入库"
                    );
                    created_stock.push(stock);
                }

                for stock_id in &plan.consumed_stock_ids {
                    self.stock_ledger
                        .consume_stock(tx, stock_id)
                        .map_err(|e| {
                            ApiError::dependency(
                                "StockLedger",
                                "consume_stock",
                                format!("job_id={}, stock_id={}", job_id, stock_id),
                                e,
                            )
                        })?;
                }

                apply_transition(tx, &job, JobAction::Approve, actor, None)?;

                let (total_jobs, approved_jobs) =
                    JobRepository::new(tx).count_by_schedule(&job.schedule_id)?;
                if total_jobs > 0
                    && approved_jobs == total_jobs
                    && ScheduleRepository::new(tx)
                        .mark_completed(&job.schedule_id, super::current_time())?
                        > 0
                {
                    tracing::info!(schedule_id = %job.schedule_id, "排程作业全部审批，排程已完成");
                }

                Ok(ApprovalResult {
                    job: load_job(tx, job_id)?,
                    created_stock,
                    consumed_stock_ids: plan.consumed_stock_ids,
                    loss_quantity: plan.loss_quantity,
                })
            })
            .inspect_err(|e| log_rejection(JobAction::Approve, job_id, e))?;

        tracing::info!(
            job_id = job_id,
            created = result.created_stock.len(),
            consumed = result.consumed_stock_ids.len(),
            actor = actor,
            "作业已审批入库"
        );
        Ok(result)
    }

    // ==========================================
    // 查询接口
    // ==========================================

    pub fn get_job(&self, job_id: &str) -> ApiResult<Job> {
        require_non_empty(job_id, "作业ID")?;
        self.uow.read(|conn| load_job(conn, job_id))
    }

    /// 分页查询作业
    pub fn list_jobs(&self, filter: &JobFilter) -> ApiResult<Page<JobSummary>> {
        check_date_range(filter.date_from, filter.date_to)?;
        let (limit, offset) = normalize_page(self.config.as_ref(), filter.limit, filter.offset)?;

        let query = JobQuery {
            schedule_id: filter.schedule_id.clone(),
            status: filter.status,
            machine_id: filter.machine_id.clone(),
            operator_id: filter.operator_id.clone(),
            date_from: filter.date_from,
            date_to: filter.date_to,
            keyword: filter.keyword.clone(),
            limit,
            offset,
        };

        let (rows, total) = self
            .uow
            .read(|conn| Ok::<_, ApiError>(JobRepository::new(conn).list(&query)?))?;

        Ok(Page {
            items: rows
                .into_iter()
                .map(|row| JobSummary {
                    job: row.job,
                    schedule_no: row.schedule_no,
                    scheduled_date: row.scheduled_date,
                })
                .collect(),
            total,
            limit,
            offset,
        })
    }

    /// 作业完整关系图: 计划产出、作业卷及其产出、差异报告
    pub fn get_job_detail(&self, job_id: &str) -> ApiResult<JobDetail> {
        require_non_empty(job_id, "作业ID")?;

        self.uow.read(|conn| {
            let job = load_job(conn, job_id)?;
            let schedule = load_schedule(conn, &job.schedule_id)?;
            let planned_outputs = JobRepository::new(conn).find_planned_outputs(job_id)?;
            let rolls = JobRollRepository::new(conn).find_by_job(job_id)?;
            let output_repo = ActualOutputRepository::new(conn);
            let outputs = output_repo.find_by_job(job_id)?;
            let effective = output_repo.find_effective_by_job(job_id)?;

            let rolls = rolls
                .into_iter()
                .map(|roll| {
                    let roll_outputs = outputs
                        .iter()
                        .filter(|o| o.roll_id.as_deref() == Some(roll.roll_id.as_str()))
                        .cloned()
                        .collect();
                    RollDetail {
                        roll,
                        outputs: roll_outputs,
                    }
                })
                .collect();
            let unrolled_outputs = outputs
                .iter()
                .filter(|o| o.roll_id.is_none())
                .cloned()
                .collect();
            let variance = self.analyzer.analyze(job_id, &planned_outputs, &effective);

            Ok(JobDetail {
                job,
                schedule_no: schedule.schedule_no,
                planned_outputs,
                rolls,
                unrolled_outputs,
                variance,
            })
        })
    }

    /// 计划/实际差异报告（已取消卷上的产出不计）
    pub fn get_variance_report(&self, job_id: &str) -> ApiResult<VarianceReport> {
        require_non_empty(job_id, "作业ID")?;

        self.uow.read(|conn| {
            load_job(conn, job_id)?;
            let planned = JobRepository::new(conn).find_planned_outputs(job_id)?;
            let actuals = ActualOutputRepository::new(conn).find_effective_by_job(job_id)?;
            Ok(self.analyzer.analyze(job_id, &planned, &actuals))
        })
    }
}

pub(crate) fn load_job(conn: &Connection, job_id: &str) -> ApiResult<Job> {
    JobRepository::new(conn)
        .find_by_id(job_id)?
        .ok_or_else(|| ApiError::NotFound(format!("Job(id={})不存在", job_id)))
}

/// 条件更新作业状态；未命中说明并发请求已先行修改
fn apply_transition(
    conn: &Connection,
    job: &Job,
    action: JobAction,
    actor: &str,
    completion_memo: Option<&str>,
) -> ApiResult<JobStatus> {
    let next = next_job_status(job.status, action)
        .map_err(|r| ApiError::invalid_transition("Job", &job.job_id, r))?;
    let affected = JobRepository::new(conn).transition_status(
        &job.job_id,
        job.status,
        next,
        actor,
        super::current_time(),
        completion_memo,
    )?;
    if affected == 0 {
        return Err(ApiError::Conflict(format!(
            "作业{}执行{}时状态已被其他请求修改",
            job.job_id, action
        )));
    }
    Ok(next)
}

fn log_rejection(action: JobAction, job_id: &str, err: &ApiError) {
    tracing::warn!(job_id = job_id, action = %action, error = %err, "作业状态转换被拒绝");
}
