// ==========================================
// 纸卷分切生产系统 - 实际产出数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::output::ActualOutput;
use crate::domain::types::RollStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult, Row};

const OUTPUT_COLUMNS: &str = r#"
    o.output_id, o.job_id, o.roll_id, o.planned_output_id, o.item_id, o.width_mm,
    o.quantity, o.length_m, o.weight_kg, o.is_loss, o.notes, o.created_stock_id,
    o.recorded_by, o.recorded_at
"#;

// ==========================================
// ActualOutputRepository - 实际产出表访问
// ==========================================
pub struct ActualOutputRepository<'c> {
    conn: &'c Connection,
}

impl<'c> ActualOutputRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn insert(&self, output: &ActualOutput) -> RepositoryResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO slitting_actual_output (
                output_id, job_id, roll_id, planned_output_id, item_id, width_mm,
                quantity, length_m, weight_kg, is_loss, notes, created_stock_id,
                recorded_by, recorded_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
            params![
                output.output_id,
                output.job_id,
                output.roll_id,
                output.planned_output_id,
                output.item_id,
                output.width_mm,
                output.quantity,
                output.length_m,
                output.weight_kg,
                output.is_loss,
                output.notes,
                output.created_stock_id,
                output.recorded_by,
                output.recorded_at,
            ],
        )?;
        Ok(())
    }

    /// 作业的全部产出（含已取消卷上的产出）
    pub fn find_by_job(&self, job_id: &str) -> RepositoryResult<Vec<ActualOutput>> {
        let sql = format!(
            r#"
            SELECT {} FROM slitting_actual_output o
            WHERE o.job_id = ?1
            ORDER BY o.recorded_at ASC, o.output_id ASC
            "#,
            OUTPUT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let outputs = stmt
            .query_map(params![job_id], map_output_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(outputs)
    }

    /// 作业的有效产出: 不在已取消卷上的产出（含旧版无卷产出）
    pub fn find_effective_by_job(&self, job_id: &str) -> RepositoryResult<Vec<ActualOutput>> {
        let sql = format!(
            r#"
            SELECT {} FROM slitting_actual_output o
            LEFT JOIN slitting_job_roll r ON r.roll_id = o.roll_id
            WHERE o.job_id = ?1 AND (o.roll_id IS NULL OR r.status <> ?2)
            ORDER BY o.recorded_at ASC, o.output_id ASC
            "#,
            OUTPUT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let outputs = stmt
            .query_map(params![job_id, RollStatus::Cancelled], map_output_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(outputs)
    }

    pub fn find_by_roll(&self, roll_id: &str) -> RepositoryResult<Vec<ActualOutput>> {
        let sql = format!(
            r#"
            SELECT {} FROM slitting_actual_output o
            WHERE o.roll_id = ?1
            ORDER BY o.recorded_at ASC, o.output_id ASC
            "#,
            OUTPUT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let outputs = stmt
            .query_map(params![roll_id], map_output_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(outputs)
    }

    /// 回写审批入库生成的库存ID（仅允许写一次）
    pub fn link_created_stock(&self, output_id: &str, stock_id: &str) -> RepositoryResult<()> {
        let affected = self.conn.execute(
            r#"
            UPDATE slitting_actual_output SET created_stock_id = ?2
            WHERE output_id = ?1 AND created_stock_id IS NULL
            "#,
            params![output_id, stock_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::conflict(
                "ActualOutput",
                output_id,
                "产出已关联入库库存",
            ));
        }
        Ok(())
    }
}

fn map_output_row(row: &Row) -> SqliteResult<ActualOutput> {
    Ok(ActualOutput {
        output_id: row.get(0)?,
        job_id: row.get(1)?,
        roll_id: row.get(2)?,
        planned_output_id: row.get(3)?,
        item_id: row.get(4)?,
        width_mm: row.get(5)?,
        quantity: row.get(6)?,
        length_m: row.get(7)?,
        weight_kg: row.get(8)?,
        is_loss: row.get(9)?,
        notes: row.get(10)?,
        created_stock_id: row.get(11)?,
        recorded_by: row.get(12)?,
        recorded_at: row.get(13)?,
    })
}
