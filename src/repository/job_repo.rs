// ==========================================
// 纸卷分切生产系统 - 分切作业数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 说明: 寻址方式由 job_kind 判别列决定，映射时不从空值反推
// ==========================================

use crate::domain::job::{Job, JobKind, PlannedOutput};
use crate::domain::types::JobStatus;
use crate::repository::error::RepositoryResult;
use crate::repository::query_builder::{like_pattern, ListQueryBuilder};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Result as SqliteResult, Row};

const JOB_COLUMNS: &str = r#"
    j.job_id, j.schedule_id, j.seq_no, j.machine_id, j.operator_id,
    j.job_kind, j.parent_stock_id, j.item_id, j.parent_width_mm, j.planned_roll_count,
    j.status, j.memo, j.completion_memo,
    j.created_by, j.created_at, j.started_by, j.started_at,
    j.completed_by, j.completed_at, j.approved_by, j.approved_at
"#;

/// 作业列表查询条件
#[derive(Debug, Clone, Default)]
pub struct JobQuery {
    pub schedule_id: Option<String>,
    pub status: Option<JobStatus>,
    pub machine_id: Option<String>,
    pub operator_id: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub keyword: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

/// 作业列表行（附带排程信息）
#[derive(Debug, Clone)]
pub struct JobListRow {
    pub job: Job,
    pub schedule_no: String,
    pub scheduled_date: NaiveDate,
}

// ==========================================
// JobRepository - 作业/计划产出表访问
// ==========================================
pub struct JobRepository<'c> {
    conn: &'c Connection,
}

impl<'c> JobRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn insert(&self, job: &Job) -> RepositoryResult<()> {
        let (parent_stock_id, item_id, parent_width_mm, planned_roll_count) = match &job.kind {
            JobKind::StockAddressed { parent_stock_id } => {
                (Some(parent_stock_id.as_str()), None, None, None)
            }
            JobKind::ItemAddressed {
                item_id,
                parent_width_mm,
                planned_roll_count,
            } => (
                None,
                Some(item_id.as_str()),
                Some(*parent_width_mm),
                Some(*planned_roll_count),
            ),
        };

        self.conn.execute(
            r#"
            INSERT INTO slitting_job (
                job_id, schedule_id, seq_no, machine_id, operator_id,
                job_kind, parent_stock_id, item_id, parent_width_mm, planned_roll_count,
                status, memo, completion_memo, created_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
            params![
                job.job_id,
                job.schedule_id,
                job.seq_no,
                job.machine_id,
                job.operator_id,
                job.kind.code(),
                parent_stock_id,
                item_id,
                parent_width_mm,
                planned_roll_count,
                job.status,
                job.memo,
                job.completion_memo,
                job.created_by,
                job.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn insert_planned_output(&self, line: &PlannedOutput) -> RepositoryResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO slitting_planned_output (
                planned_output_id, job_id, seq_no, item_id, width_mm, quantity, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                line.planned_output_id,
                line.job_id,
                line.seq_no,
                line.item_id,
                line.width_mm,
                line.quantity,
                line.notes,
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, job_id: &str) -> RepositoryResult<Option<Job>> {
        let sql = format!("SELECT {} FROM slitting_job j WHERE j.job_id = ?1", JOB_COLUMNS);
        let job = self
            .conn
            .query_row(&sql, params![job_id], map_job_row)
            .optional()?;
        Ok(job)
    }

    pub fn find_by_schedule(&self, schedule_id: &str) -> RepositoryResult<Vec<Job>> {
        let sql = format!(
            "SELECT {} FROM slitting_job j WHERE j.schedule_id = ?1 ORDER BY j.seq_no ASC",
            JOB_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let jobs = stmt
            .query_map(params![schedule_id], map_job_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(jobs)
    }

    pub fn find_planned_outputs(&self, job_id: &str) -> RepositoryResult<Vec<PlannedOutput>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT planned_output_id, job_id, seq_no, item_id, width_mm, quantity, notes
            FROM slitting_planned_output
            WHERE job_id = ?1
            ORDER BY seq_no ASC
            "#,
        )?;
        let lines = stmt
            .query_map(params![job_id], map_planned_output_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(lines)
    }

    pub fn find_planned_output(
        &self,
        planned_output_id: &str,
    ) -> RepositoryResult<Option<PlannedOutput>> {
        let line = self
            .conn
            .query_row(
                r#"
                SELECT planned_output_id, job_id, seq_no, item_id, width_mm, quantity, notes
                FROM slitting_planned_output
                WHERE planned_output_id = ?1
                "#,
                params![planned_output_id],
                map_planned_output_row,
            )
            .optional()?;
        Ok(line)
    }

    /// 排程内下一个作业序号
    pub fn next_seq_in_schedule(&self, schedule_id: &str) -> RepositoryResult<i32> {
        let max: Option<i32> = self.conn.query_row(
            "SELECT MAX(seq_no) FROM slitting_job WHERE schedule_id = ?1",
            params![schedule_id],
            |row| row.get(0),
        )?;
        Ok(max.unwrap_or(0) + 1)
    }

    /// 排程作业计数
    ///
    /// # 返回
    /// - (作业总数, 已审批数)
    pub fn count_by_schedule(&self, schedule_id: &str) -> RepositoryResult<(i64, i64)> {
        let counts = self.conn.query_row(
            r#"
            SELECT COUNT(*), COALESCE(SUM(CASE WHEN status = ?2 THEN 1 ELSE 0 END), 0)
            FROM slitting_job WHERE schedule_id = ?1
            "#,
            params![schedule_id, JobStatus::Approved],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(counts)
    }

    /// 机台上执行中的作业数
    ///
    /// # 参数
    /// - excluding_job_id: 不计入统计的作业（None 统计全部）
    pub fn count_in_progress_on_machine(
        &self,
        machine_id: &str,
        excluding_job_id: Option<&str>,
    ) -> RepositoryResult<i64> {
        let count = self.conn.query_row(
            r#"
            SELECT COUNT(*) FROM slitting_job
            WHERE machine_id = ?1 AND status = ?2 AND (?3 IS NULL OR job_id <> ?3)
            "#,
            params![machine_id, JobStatus::InProgress, excluding_job_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// 条件状态更新，同时写入对应阶段的操作人/时间
    ///
    /// # 返回
    /// - 受影响行数（0 表示当前状态不是 expected 或作业不存在）
    pub fn transition_status(
        &self,
        job_id: &str,
        expected: JobStatus,
        next: JobStatus,
        actor: &str,
        now: NaiveDateTime,
        completion_memo: Option<&str>,
    ) -> RepositoryResult<usize> {
        let affected = self.conn.execute(
            r#"
            UPDATE slitting_job SET
                status = ?3,
                started_by = CASE WHEN ?3 = 'IN_PROGRESS' THEN ?4 ELSE started_by END,
                started_at = CASE WHEN ?3 = 'IN_PROGRESS' THEN ?5 ELSE started_at END,
                completed_by = CASE WHEN ?3 = 'COMPLETED' THEN ?4 ELSE completed_by END,
                completed_at = CASE WHEN ?3 = 'COMPLETED' THEN ?5 ELSE completed_at END,
                completion_memo = CASE WHEN ?3 = 'COMPLETED' THEN ?6 ELSE completion_memo END,
                approved_by = CASE WHEN ?3 = 'APPROVED' THEN ?4 ELSE approved_by END,
                approved_at = CASE WHEN ?3 = 'APPROVED' THEN ?5 ELSE approved_at END
            WHERE job_id = ?1 AND status = ?2
            "#,
            params![job_id, expected, next, actor, now, completion_memo],
        )?;
        Ok(affected)
    }

    /// 分页查询作业
    ///
    /// # 返回
    /// - (当前页, 总数)
    pub fn list(&self, query: &JobQuery) -> RepositoryResult<(Vec<JobListRow>, i64)> {
        let select = format!(
            r#"
            SELECT {}, s.schedule_no, s.scheduled_date
            FROM slitting_job j
            JOIN slitting_schedule s ON s.schedule_id = j.schedule_id
            "#,
            JOB_COLUMNS
        );

        let builder = ListQueryBuilder::new(&select)
            .and_where("j.schedule_id = ?", query.schedule_id.clone())
            .and_where("j.status = ?", query.status.map(|s| s.as_db_str().to_string()))
            .and_where("j.machine_id = ?", query.machine_id.clone())
            .and_where("j.operator_id = ?", query.operator_id.clone())
            .and_where("s.scheduled_date >= ?", query.date_from.map(|d| d.to_string()))
            .and_where("s.scheduled_date <= ?", query.date_to.map(|d| d.to_string()))
            .and_where_repeated(
                "s.schedule_no LIKE ? ESCAPE '\\' OR j.item_id LIKE ? ESCAPE '\\' OR j.memo LIKE ? ESCAPE '\\'",
                query
                    .keyword
                    .as_deref()
                    .filter(|k| !k.trim().is_empty())
                    .map(like_pattern),
            )
            .order_by("s.scheduled_date DESC, s.schedule_no ASC, j.seq_no ASC");

        let total: i64 = self.conn.query_row(
            &builder.build_count(),
            params_from_iter(builder.values().iter()),
            |row| row.get(0),
        )?;

        let mut stmt = self.conn.prepare(&builder.build_page())?;
        let rows = stmt
            .query_map(
                params_from_iter(builder.page_values(query.limit, query.offset)),
                |row| {
                    Ok(JobListRow {
                        job: map_job_row(row)?,
                        schedule_no: row.get(21)?,
                        scheduled_date: row.get(22)?,
                    })
                },
            )?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok((rows, total))
    }
}

fn map_job_row(row: &Row) -> SqliteResult<Job> {
    let kind_code: String = row.get(5)?;
    let kind = match kind_code.as_str() {
        JobKind::STOCK_CODE => JobKind::StockAddressed {
            parent_stock_id: row.get(6)?,
        },
        JobKind::ITEM_CODE => JobKind::ItemAddressed {
            item_id: row.get(7)?,
            parent_width_mm: row.get(8)?,
            planned_roll_count: row.get(9)?,
        },
        other => {
            return Err(rusqlite::Error::FromSqlConversionFailure(
                5,
                Type::Text,
                format!("未知的作业寻址方式: {}", other).into(),
            ))
        }
    };

    Ok(Job {
        job_id: row.get(0)?,
        schedule_id: row.get(1)?,
        seq_no: row.get(2)?,
        machine_id: row.get(3)?,
        operator_id: row.get(4)?,
        kind,
        status: row.get(10)?,
        memo: row.get(11)?,
        completion_memo: row.get(12)?,
        created_by: row.get(13)?,
        created_at: row.get(14)?,
        started_by: row.get(15)?,
        started_at: row.get(16)?,
        completed_by: row.get(17)?,
        completed_at: row.get(18)?,
        approved_by: row.get(19)?,
        approved_at: row.get(20)?,
    })
}

fn map_planned_output_row(row: &Row) -> SqliteResult<PlannedOutput> {
    Ok(PlannedOutput {
        planned_output_id: row.get(0)?,
        job_id: row.get(1)?,
        seq_no: row.get(2)?,
        item_id: row.get(3)?,
        width_mm: row.get(4)?,
        quantity: row.get(5)?,
        notes: row.get(6)?,
    })
}
