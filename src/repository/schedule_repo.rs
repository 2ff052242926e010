// ==========================================
// 纸卷分切生产系统 - 分切排程数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 说明: 状态推进使用条件更新，返回受影响行数由调用方判定
// ==========================================

use crate::domain::schedule::Schedule;
use crate::domain::types::{JobStatus, ScheduleStatus};
use crate::repository::error::RepositoryResult;
use crate::repository::query_builder::{like_pattern, ListQueryBuilder};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Result as SqliteResult, Row};

const SCHEDULE_COLUMNS: &str = r#"
    s.schedule_id, s.schedule_no, s.scheduled_date, s.status, s.memo,
    s.created_by, s.created_at, s.published_by, s.published_at, s.completed_at
"#;

/// 排程列表查询条件
#[derive(Debug, Clone, Default)]
pub struct ScheduleQuery {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub status: Option<ScheduleStatus>,
    pub keyword: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

/// 排程列表行（含作业计数）
#[derive(Debug, Clone)]
pub struct ScheduleListRow {
    pub schedule: Schedule,
    pub total_jobs: i64,
    pub approved_jobs: i64,
}

// ==========================================
// ScheduleRepository - 排程表访问
// ==========================================
pub struct ScheduleRepository<'c> {
    conn: &'c Connection,
}

impl<'c> ScheduleRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn insert(&self, schedule: &Schedule) -> RepositoryResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO slitting_schedule (
                schedule_id, schedule_no, scheduled_date, status, memo,
                created_by, created_at, published_by, published_at, completed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                schedule.schedule_id,
                schedule.schedule_no,
                schedule.scheduled_date,
                schedule.status,
                schedule.memo,
                schedule.created_by,
                schedule.created_at,
                schedule.published_by,
                schedule.published_at,
                schedule.completed_at,
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, schedule_id: &str) -> RepositoryResult<Option<Schedule>> {
        let sql = format!(
            "SELECT {} FROM slitting_schedule s WHERE s.schedule_id = ?1",
            SCHEDULE_COLUMNS
        );
        let schedule = self
            .conn
            .query_row(&sql, params![schedule_id], map_schedule_row)
            .optional()?;
        Ok(schedule)
    }

    /// 当日下一个排程序号
    pub fn next_seq_for_date(&self, date: NaiveDate) -> RepositoryResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM slitting_schedule WHERE scheduled_date = ?1",
            params![date],
            |row| row.get(0),
        )?;
        Ok(count + 1)
    }

    /// DRAFT → PUBLISHED
    pub fn mark_published(
        &self,
        schedule_id: &str,
        actor: &str,
        now: NaiveDateTime,
    ) -> RepositoryResult<usize> {
        let affected = self.conn.execute(
            r#"
            UPDATE slitting_schedule
            SET status = ?2, published_by = ?3, published_at = ?4
            WHERE schedule_id = ?1 AND status = ?5
            "#,
            params![
                schedule_id,
                ScheduleStatus::Published,
                actor,
                now,
                ScheduleStatus::Draft
            ],
        )?;
        Ok(affected)
    }

    /// PUBLISHED → IN_PROGRESS
    pub fn mark_in_progress(&self, schedule_id: &str) -> RepositoryResult<usize> {
        let affected = self.conn.execute(
            "UPDATE slitting_schedule SET status = ?2 WHERE schedule_id = ?1 AND status = ?3",
            params![
                schedule_id,
                ScheduleStatus::InProgress,
                ScheduleStatus::Published
            ],
        )?;
        Ok(affected)
    }

    /// PUBLISHED / IN_PROGRESS → COMPLETED
    pub fn mark_completed(&self, schedule_id: &str, now: NaiveDateTime) -> RepositoryResult<usize> {
        let affected = self.conn.execute(
            r#"
            UPDATE slitting_schedule SET status = ?2, completed_at = ?3
            WHERE schedule_id = ?1 AND status IN (?4, ?5)
            "#,
            params![
                schedule_id,
                ScheduleStatus::Completed,
                now,
                ScheduleStatus::Published,
                ScheduleStatus::InProgress
            ],
        )?;
        Ok(affected)
    }

    /// 分页查询排程（含作业计数）
    ///
    /// # 返回
    /// - (当前页, 总数)
    pub fn list(&self, query: &ScheduleQuery) -> RepositoryResult<(Vec<ScheduleListRow>, i64)> {
        let select = format!(
            r#"
            SELECT {},
                (SELECT COUNT(*) FROM slitting_job j WHERE j.schedule_id = s.schedule_id) AS total_jobs,
                (SELECT COUNT(*) FROM slitting_job j
                    WHERE j.schedule_id = s.schedule_id AND j.status = '{}') AS approved_jobs
            FROM slitting_schedule s
            "#,
            SCHEDULE_COLUMNS,
            JobStatus::Approved.as_db_str()
        );

        let builder = ListQueryBuilder::new(&select)
            .and_where("s.scheduled_date >= ?", query.date_from.map(|d| d.to_string()))
            .and_where("s.scheduled_date <= ?", query.date_to.map(|d| d.to_string()))
            .and_where("s.status = ?", query.status.map(|s| s.as_db_str().to_string()))
            .and_where_repeated(
                "s.schedule_no LIKE ? ESCAPE '\\' OR s.memo LIKE ? ESCAPE '\\'",
                query
                    .keyword
                    .as_deref()
                    .filter(|k| !k.trim().is_empty())
                    .map(like_pattern),
            )
            .order_by("s.scheduled_date DESC, s.schedule_no DESC");

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
                    Ok(ScheduleListRow {
                        schedule: map_schedule_row(row)?,
                        total_jobs: row.get(10)?,
                        approved_jobs: row.get(11)?,
                    })
                },
            )?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok((rows, total))
    }
}

fn map_schedule_row(row: &Row) -> SqliteResult<Schedule> {
    Ok(Schedule {
        schedule_id: row.get(0)?,
        schedule_no: row.get(1)?,
        scheduled_date: row.get(2)?,
        status: row.get(3)?,
        memo: row.get(4)?,
        created_by: row.get(5)?,
        created_at: row.get(6)?,
        published_by: row.get(7)?,
        published_at: row.get(8)?,
        completed_at: row.get(9)?,
    })
}
