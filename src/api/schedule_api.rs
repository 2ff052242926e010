// ==========================================
// 纸卷分切生产系统 - 排程管理 API
// ==========================================
// 职责: 排程创建、作业编入、发布、完成、分页查询
// 状态: DRAFT → PUBLISHED → IN_PROGRESS → COMPLETED（只前进）
// ==========================================

use std::sync::Arc;

use chrono::NaiveDate;

use crate::api::dto::{Page, ScheduleDetail, ScheduleFilter, ScheduleSummary};
use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::{
    check_date_range, config_error, normalize_page, require_actor, require_non_empty,
};
use crate::config::SlittingConfigReader;
use crate::domain::job::{Job, JobKind, NewJob, NewJobKind, PlannedOutput};
use crate::domain::schedule::{format_schedule_no, Schedule};
use crate::domain::types::{JobStatus, ScheduleStatus};
use crate::engine::stock_match::check_parent_stock;
use crate::engine::transitions::{next_schedule_status, ScheduleAction, TransitionRejected};
use crate::repository::job_repo::JobRepository;
use crate::repository::ledger::{MachineRegistry, StockLedger};
use crate::repository::schedule_repo::{ScheduleQuery, ScheduleRepository};
use crate::repository::unit_of_work::UnitOfWork;
use rusqlite::Connection;

// ==========================================
// ScheduleApi - 排程管理 API
// ==========================================
pub struct ScheduleApi {
    uow: Arc<UnitOfWork>,
    config: Arc<dyn SlittingConfigReader>,
    stock_ledger: Arc<dyn StockLedger>,
    machine_registry: Arc<dyn MachineRegistry>,
}

impl ScheduleApi {
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
        }
    }

    // ==========================================
    // 排程维护
    // ==========================================

    /// 创建排程（DRAFT）
    ///
    /// # 参数
    /// - scheduled_date: 生产日期
    /// - memo: 备注
    /// - actor: 创建人
    ///
    /// # 返回
    /// - Ok(Schedule): 新排程，排程号按 {前缀}-{YYYYMMDD}-{序号} 生成
    pub fn create_schedule(
        &self,
        scheduled_date: NaiveDate,
        memo: Option<&str>,
        actor: &str,
    ) -> ApiResult<Schedule> {
        require_actor(actor)?;
        let prefix = self.config.get_schedule_no_prefix().map_err(config_error)?;

        let schedule = self.uow.execute(|tx| {
            let repo = ScheduleRepository::new(tx);
            let seq = repo.next_seq_for_date(scheduled_date)?;
            let schedule = Schedule {
                schedule_id: uuid::Uuid::new_v4().to_string(),
                schedule_no: format_schedule_no(&prefix, scheduled_date, seq),
                scheduled_date,
                status: ScheduleStatus::Draft,
                memo: memo.map(str::trim).filter(|m| !m.is_empty()).map(str::to_string),
                created_by: actor.to_string(),
                created_at: super::current_time(),
                published_by: None,
                published_at: None,
                completed_at: None,
            };
            repo.insert(&schedule)?;
            Ok::<_, ApiError>(schedule)
        })?;

        tracing::info!(
            schedule_id = %schedule.schedule_id,
            schedule_no = %schedule.schedule_no,
            actor = actor,
            "排程已创建"
        );
        Ok(schedule)
    }

    /// 向草稿排程编入作业
    ///
    /// # 规则
    /// - 排程必须为 DRAFT
    /// - 机台必须已登记
    /// - 母卷寻址作业: 母卷必须为可用母卷，编入时即预留
    /// - 品目/宽度寻址作业: 同时写入计划产出行
    pub fn add_job(&self, schedule_id: &str, new_job: NewJob, actor: &str) -> ApiResult<Job> {
        require_non_empty(schedule_id, "排程ID")?;
        require_actor(actor)?;
        new_job.validate().map_err(ApiError::ValidationError)?;

        let job = self
            .uow
            .execute(|tx| self.add_job_in_tx(tx, schedule_id, new_job, actor))
            .inspect_err(|e| {
                tracing::warn!(schedule_id = schedule_id, error = %e, "编入作业被拒绝");
            })?;

        tracing::info!(
            schedule_id = schedule_id,
            job_id = %job.job_id,
            seq_no = job.seq_no,
            kind = job.kind.code(),
            actor = actor,
            "作业已编入排程"
        );
        Ok(job)
    }

    fn add_job_in_tx(
        &self,
        conn: &Connection,
        schedule_id: &str,
        new_job: NewJob,
        actor: &str,
    ) -> ApiResult<Job> {
        let schedule = load_schedule(conn, schedule_id)?;
        if !schedule.accepts_jobs() {
            return Err(ApiError::invalid_transition(
                "Schedule",
                schedule_id,
                TransitionRejected {
                    current: schedule.status.to_string(),
                    action: "add_job",
                },
            ));
        }

        if self
            .machine_registry
            .find_machine(conn, &new_job.machine_id)
            .map_err(|e| {
                ApiError::dependency(
                    "MachineRegistry",
                    "find_machine",
                    format!("machine_id={}", new_job.machine_id),
                    e,
                )
            })?
            .is_none()
        {
            return Err(ApiError::ValidationError(format!(
                "机台{}不存在",
                new_job.machine_id
            )));
        }

        let job_repo = JobRepository::new(conn);
        let job_id = uuid::Uuid::new_v4().to_string();
        let now = super::current_time();

        let (kind, planned_lines) = match new_job.kind {
            NewJobKind::StockAddressed { parent_stock_id } => {
                let kind = JobKind::StockAddressed {
                    parent_stock_id: parent_stock_id.trim().to_string(),
                };
                let stock = self
                    .stock_ledger
                    .find_stock(conn, parent_stock_id.trim())
                    .map_err(|e| {
                        ApiError::dependency(
                            "StockLedger",
                            "find_stock",
                            format!("stock_id={}", parent_stock_id),
                            e,
                        )
                    })?
                    .ok_or_else(|| {
                        ApiError::ValidationError(format!("母卷库存{}不存在", parent_stock_id))
                    })?;
                check_parent_stock(&kind, &stock, 0)
                    .map_err(|r| ApiError::stock_rejected(&job_id, r))?;
                self.stock_ledger
                    .reserve_stock(conn, &stock.stock_id)
                    .map_err(|e| {
                        ApiError::dependency(
                            "StockLedger",
                            "reserve_stock",
                            format!("job_id={}, stock_id={}", job_id, stock.stock_id),
                            e,
                        )
                    })?;
                (kind, Vec::new())
            }
            NewJobKind::ItemAddressed {
                item_id,
                parent_width_mm,
                planned_roll_count,
                planned_outputs,
            } => {
                let lines: Vec<PlannedOutput> = planned_outputs
                    .into_iter()
                    .enumerate()
                    .map(|(idx, line)| PlannedOutput {
                        planned_output_id: uuid::Uuid::new_v4().to_string(),
                        job_id: job_id.clone(),
                        seq_no: idx as i32 + 1,
                        item_id: line.item_id.trim().to_string(),
                        width_mm: line.width_mm,
                        quantity: line.quantity,
                        notes: line.notes,
                    })
                    .collect();
                (
                    JobKind::ItemAddressed {
                        item_id: item_id.trim().to_string(),
                        parent_width_mm,
                        planned_roll_count,
                    },
                    lines,
                )
            }
        };

        let job = Job {
            job_id: job_id.clone(),
            schedule_id: schedule_id.to_string(),
            seq_no: job_repo.next_seq_in_schedule(schedule_id)?,
            machine_id: new_job.machine_id.trim().to_string(),
            operator_id: new_job
                .operator_id
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty()),
            kind,
            status: JobStatus::Pending,
            memo: new_job.memo,
            completion_memo: None,
            created_by: actor.to_string(),
            created_at: now,
            started_by: None,
            started_at: None,
            completed_by: None,
            completed_at: None,
            approved_by: None,
            approved_at: None,
        };
        job_repo.insert(&job)?;
        for line in &planned_lines {
            job_repo.insert_planned_output(line)?;
        }
        Ok(job)
    }

    /// 发布排程: DRAFT → PUBLISHED
    ///
    /// # 规则
    /// - 至少包含一个作业（canPublish = DRAFT 且 作业数 > 0）
    /// - 发布后 PENDING 作业可被标记为 READY
    pub fn publish_schedule(&self, schedule_id: &str, actor: &str) -> ApiResult<Schedule> {
        require_non_empty(schedule_id, "排程ID")?;
        require_actor(actor)?;

        let schedule = self
            .uow
            .execute(|tx| {
                let repo = ScheduleRepository::new(tx);
                let schedule = load_schedule(tx, schedule_id)?;
                next_schedule_status(schedule.status, ScheduleAction::Publish)
                    .map_err(|r| ApiError::invalid_transition("Schedule", schedule_id, r))?;

                let (total_jobs, _) = JobRepository::new(tx).count_by_schedule(schedule_id)?;
                if !schedule.can_publish(total_jobs) {
                    return Err(ApiError::ValidationError(format!(
                        "排程{}没有作业，不能发布",
                        schedule.schedule_no
                    )));
                }

                if repo.mark_published(schedule_id, actor, super::current_time())? == 0 {
                    return Err(ApiError::Conflict(format!(
                        "排程{}状态已被其他请求修改",
                        schedule_id
                    )));
                }
                load_schedule(tx, schedule_id)
            })
            .inspect_err(|e| {
                tracing::warn!(schedule_id = schedule_id, error = %e, "发布排程被拒绝");
            })?;

        tracing::info!(
            schedule_id = schedule_id,
            schedule_no = %schedule.schedule_no,
            actor = actor,
            "排程已发布"
        );
        Ok(schedule)
    }

    /// 显式完成排程
    ///
    /// # 规则
    /// - 排程为 PUBLISHED / IN_PROGRESS
    /// - 全部作业已审批（APPROVED 为作业唯一终态）
    pub fn complete_schedule(&self, schedule_id: &str, actor: &str) -> ApiResult<Schedule> {
        require_non_empty(schedule_id, "排程ID")?;
        require_actor(actor)?;

        let schedule = self
            .uow
            .execute(|tx| {
                let schedule = load_schedule(tx, schedule_id)?;
                next_schedule_status(schedule.status, ScheduleAction::Complete)
                    .map_err(|r| ApiError::invalid_transition("Schedule", schedule_id, r))?;

                let (total_jobs, approved_jobs) =
                    JobRepository::new(tx).count_by_schedule(schedule_id)?;
                if total_jobs == 0 || approved_jobs < total_jobs {
                    return Err(ApiError::ValidationError(format!(
                        "排程{}尚有{}个作业未审批，不能完成",
                        schedule.schedule_no,
                        total_jobs - approved_jobs
                    )));
                }

                if ScheduleRepository::new(tx).mark_completed(schedule_id, super::current_time())?
                    == 0
                {
                    return Err(ApiError::Conflict(format!(
                        "排程{}状态已被其他请求修改",
                        schedule_id
                    )));
                }
                load_schedule(tx, schedule_id)
            })
            .inspect_err(|e| {
                tracing::warn!(schedule_id = schedule_id, error = %e, "完成排程被拒绝");
            })?;

        tracing::info!(schedule_id = schedule_id, actor = actor, "排程已完成");
        Ok(schedule)
    }

    // ==========================================
    // 查询接口
    // ==========================================

    /// 分页查询排程
    pub fn list_schedules(&self, filter: &ScheduleFilter) -> ApiResult<Page<ScheduleSummary>> {
        check_date_range(filter.date_from, filter.date_to)?;
        let (limit, offset) = normalize_page(self.config.as_ref(), filter.limit, filter.offset)?;

        let query = ScheduleQuery {
            date_from: filter.date_from,
            date_to: filter.date_to,
            status: filter.status,
            keyword: filter.keyword.clone(),
            limit,
            offset,
        };

        let (rows, total) = self
            .uow
            .read(|conn| Ok::<_, ApiError>(ScheduleRepository::new(conn).list(&query)?))?;

        let items = rows
            .into_iter()
            .map(|row| ScheduleSummary {
                can_publish: row.schedule.can_publish(row.total_jobs),
                schedule: row.schedule,
                total_jobs: row.total_jobs,
                approved_jobs: row.approved_jobs,
            })
            .collect();

        Ok(Page {
            items,
            total,
            limit,
            offset,
        })
    }

    /// 排程详情（含作业列表）
    pub fn get_schedule_detail(&self, schedule_id: &str) -> ApiResult<ScheduleDetail> {
        require_non_empty(schedule_id, "排程ID")?;

        self.uow.read(|conn| {
            let schedule = load_schedule(conn, schedule_id)?;
            let job_repo = JobRepository::new(conn);
            let jobs = job_repo.find_by_schedule(schedule_id)?;
            let (total_jobs, approved_jobs) = job_repo.count_by_schedule(schedule_id)?;
            Ok(ScheduleDetail {
                can_publish: schedule.can_publish(total_jobs),
                schedule,
                jobs,
                total_jobs,
                approved_jobs,
            })
        })
    }
}

pub(crate) fn load_schedule(conn: &Connection, schedule_id: &str) -> ApiResult<Schedule> {
    ScheduleRepository::new(conn)
        .find_by_id(schedule_id)?
        .ok_or_else(|| ApiError::NotFound(format!("Schedule(id={})不存在", schedule_id)))
}
