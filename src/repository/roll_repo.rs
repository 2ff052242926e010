// ==========================================
// 纸卷分切生产系统 - 作业卷数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 并发: "每作业至多一个 IN_PROGRESS 卷" 由条件更新 + 部分唯一索引保证
// ==========================================

use crate::domain::roll::JobRoll;
use crate::domain::types::RollStatus;
use crate::repository::error::RepositoryResult;
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};

const ROLL_COLUMNS: &str = r#"
    roll_id, job_id, seq_no, stock_id, status, notes,
    registered_by, registered_at, started_by, started_at,
    completed_by, completed_at, cancelled_by, cancelled_at
"#;

/// 作业卷数量统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RollCounts {
    pub registered: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub cancelled: i64,
}

impl RollCounts {
    /// 计入计划卷数的卷（含已取消的卷）
    pub fn total(&self) -> i64 {
        self.registered + self.in_progress + self.completed + self.cancelled
    }
}

// ==========================================
// JobRollRepository - 作业卷表访问
// ==========================================
pub struct JobRollRepository<'c> {
    conn: &'c Connection,
}

impl<'c> JobRollRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn insert(&self, roll: &JobRoll) -> RepositoryResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO slitting_job_roll (
                roll_id, job_id, seq_no, stock_id, status, notes,
                registered_by, registered_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                roll.roll_id,
                roll.job_id,
                roll.seq_no,
                roll.stock_id,
                roll.status,
                roll.notes,
                roll.registered_by,
                roll.registered_at,
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, roll_id: &str) -> RepositoryResult<Option<JobRoll>> {
        let sql = format!("SELECT {} FROM slitting_job_roll WHERE roll_id = ?1", ROLL_COLUMNS);
        let roll = self
            .conn
            .query_row(&sql, params![roll_id], map_roll_row)
            .optional()?;
        Ok(roll)
    }

    pub fn find_by_job(&self, job_id: &str) -> RepositoryResult<Vec<JobRoll>> {
        let sql = format!(
            "SELECT {} FROM slitting_job_roll WHERE job_id = ?1 ORDER BY seq_no ASC",
            ROLL_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rolls = stmt
            .query_map(params![job_id], map_roll_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rolls)
    }

    /// 占用该库存的未结束卷（REGISTERED / IN_PROGRESS）
    pub fn find_open_by_stock(&self, stock_id: &str) -> RepositoryResult<Option<JobRoll>> {
        let sql = format!(
            r#"
            SELECT {} FROM slitting_job_roll
            WHERE stock_id = ?1 AND status IN (?2, ?3)
            LIMIT 1
            "#,
            ROLL_COLUMNS
        );
        let roll = self
            .conn
            .query_row(
                &sql,
                params![stock_id, RollStatus::Registered, RollStatus::InProgress],
                map_roll_row,
            )
            .optional()?;
        Ok(roll)
    }

    /// 作业内 IN_PROGRESS 的卷
    pub fn find_in_progress(&self, job_id: &str) -> RepositoryResult<Option<JobRoll>> {
        let sql = format!(
            "SELECT {} FROM slitting_job_roll WHERE job_id = ?1 AND status = ?2 LIMIT 1",
            ROLL_COLUMNS
        );
        let roll = self
            .conn
            .query_row(&sql, params![job_id, RollStatus::InProgress], map_roll_row)
            .optional()?;
        Ok(roll)
    }

    pub fn count_by_job(&self, job_id: &str) -> RepositoryResult<RollCounts> {
        let mut stmt = self.conn.prepare(
            "SELECT status, COUNT(*) FROM slitting_job_roll WHERE job_id = ?1 GROUP BY status",
        )?;
        let rows = stmt
            .query_map(params![job_id], |row| {
                Ok((row.get::<_, RollStatus>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<SqliteResult<Vec<_>>>()?;

        let mut counts = RollCounts::default();
        for (status, n) in rows {
            match status {
                RollStatus::Registered => counts.registered = n,
                RollStatus::InProgress => counts.in_progress = n,
                RollStatus::Completed => counts.completed = n,
                RollStatus::Cancelled => counts.cancelled = n,
            }
        }
        Ok(counts)
    }

    /// 作业内下一个卷序号（含已取消的卷，序号不复用）
    pub fn next_seq_in_job(&self, job_id: &str) -> RepositoryResult<i32> {
        let max: Option<i32> = self.conn.query_row(
            "SELECT MAX(seq_no) FROM slitting_job_roll WHERE job_id = ?1",
            params![job_id],
            |row| row.get(0),
        )?;
        Ok(max.unwrap_or(0) + 1)
    }

    /// REGISTERED → IN_PROGRESS
    ///
    /// 条件: 该卷仍为 REGISTERED，且同作业内不存在 IN_PROGRESS 卷。
    /// # 返回
    /// - 受影响行数（0 表示条件不成立）
    pub fn mark_started(
        &self,
        roll_id: &str,
        actor: &str,
        now: NaiveDateTime,
    ) -> RepositoryResult<usize> {
        let affected = self.conn.execute(
            r#"
            UPDATE slitting_job_roll
            SET status = ?2, started_by = ?3, started_at = ?4
            WHERE roll_id = ?1 AND status = ?5
              AND NOT EXISTS (
                  SELECT 1 FROM slitting_job_roll other
                  WHERE other.job_id = slitting_job_roll.job_id AND other.status = ?2
              )
            "#,
            params![
                roll_id,
                RollStatus::InProgress,
                actor,
                now,
                RollStatus::Registered
            ],
        )?;
        Ok(affected)
    }

    /// IN_PROGRESS → COMPLETED
    pub fn mark_completed(
        &self,
        roll_id: &str,
        actor: &str,
        now: NaiveDateTime,
        notes: Option<&str>,
    ) -> RepositoryResult<usize> {
        let affected = self.conn.execute(
            r#"
            UPDATE slitting_job_roll
            SET status = ?2, completed_by = ?3, completed_at = ?4,
                notes = COALESCE(?5, notes)
            WHERE roll_id = ?1 AND status = ?6
            "#,
            params![
                roll_id,
                RollStatus::Completed,
                actor,
                now,
                notes,
                RollStatus::InProgress
            ],
        )?;
        Ok(affected)
    }

    /// 非终态 → CANCELLED（expected 为调用方读到的当前状态）
    pub fn mark_cancelled(
        &self,
        roll_id: &str,
        expected: RollStatus,
        actor: &str,
        now: NaiveDateTime,
        notes: Option<&str>,
    ) -> RepositoryResult<usize> {
        let affected = self.conn.execute(
            r#"
            UPDATE slitting_job_roll
            SET status = ?2, cancelled_by = ?3, cancelled_at = ?4,
                notes = COALESCE(?5, notes)
            WHERE roll_id = ?1 AND status = ?6
            "#,
            params![
                roll_id,
                RollStatus::Cancelled,
                actor,
                now,
                notes,
                expected
            ],
        )?;
        Ok(affected)
    }
}

fn map_roll_row(row: &Row) -> SqliteResult<JobRoll> {
    Ok(JobRoll {
        roll_id: row.get(0)?,
        job_id: row.get(1)?,
        seq_no: row.get(2)?,
        stock_id: row.get(3)?,
        status: row.get(4)?,
        notes: row.get(5)?,
        registered_by: row.get(6)?,
        registered_at: row.get(7)?,
        started_by: row.get(8)?,
        started_at: row.get(9)?,
        completed_by: row.get(10)?,
        completed_at: row.get(11)?,
        cancelled_by: row.get(12)?,
        cancelled_at: row.get(13)?,
    })
}
