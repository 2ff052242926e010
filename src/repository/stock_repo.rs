// ==========================================
// 纸卷分切生产系统 - 库存数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 说明: 状态变更一律为条件更新 (WHERE status = 期望状态)
// ==========================================

use crate::domain::stock::{NewStock, Stock};
use crate::domain::types::{StockCondition, StockStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::ledger::StockLedger;
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};

const STOCK_COLUMNS: &str = r#"
    stock_id, item_id, width_mm, quantity, weight_kg, length_m,
    condition, status, source_job_id, source_roll_id, created_at, updated_at
"#;

// ==========================================
// StockRepository - 库存表访问
// ==========================================
pub struct StockRepository<'c> {
    conn: &'c Connection,
}

impl<'c> StockRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// 新建库存
    pub fn insert(&self, new_stock: &NewStock, now: NaiveDateTime) -> RepositoryResult<Stock> {
        let stock = Stock {
            stock_id: uuid::Uuid::new_v4().to_string(),
            item_id: new_stock.item_id.clone(),
            width_mm: new_stock.width_mm,
            quantity: new_stock.quantity,
            weight_kg: new_stock.weight_kg,
            length_m: new_stock.length_m,
            condition: new_stock.condition,
            status: StockStatus::Available,
            source_job_id: new_stock.source_job_id.clone(),
            source_roll_id: new_stock.source_roll_id.clone(),
            created_at: now,
            updated_at: now,
        };

        self.conn.execute(
            r#"
            INSERT INTO stock (
                stock_id, item_id, width_mm, quantity, weight_kg, length_m,
                condition, status, source_job_id, source_roll_id, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                stock.stock_id,
                stock.item_id,
                stock.width_mm,
                stock.quantity,
                stock.weight_kg,
                stock.length_m,
                stock.condition,
                stock.status,
                stock.source_job_id,
                stock.source_roll_id,
                stock.created_at,
                stock.updated_at,
            ],
        )?;
        Ok(stock)
    }

    pub fn find_by_id(&self, stock_id: &str) -> RepositoryResult<Option<Stock>> {
        let sql = format!("SELECT {} FROM stock WHERE stock_id = ?1", STOCK_COLUMNS);
        let stock = self
            .conn
            .query_row(&sql, params![stock_id], map_stock_row)
            .optional()?;
        Ok(stock)
    }

    /// 查询可用母卷
    ///
    /// # 参数
    /// - item_id: 品目过滤（None 表示不过滤）
    /// - width_mm: 名义宽度过滤（None 表示不过滤）
    /// - width_tolerance_mm: 宽度容差（绝对值）
    pub fn find_available_parent(
        &self,
        item_id: Option<&str>,
        width_mm: Option<i32>,
        width_tolerance_mm: i32,
    ) -> RepositoryResult<Vec<Stock>> {
        let sql = format!(
            r#"
            SELECT {} FROM stock
            WHERE condition = ?1 AND status = ?2
              AND (?3 IS NULL OR item_id = ?3)
              AND (?4 IS NULL OR ABS(width_mm - ?4) <= ?5)
            ORDER BY created_at ASC, stock_id ASC
            "#,
            STOCK_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let stocks = stmt
            .query_map(
                params![
                    StockCondition::Parent,
                    StockStatus::Available,
                    item_id,
                    width_mm,
                    width_tolerance_mm.max(0),
                ],
                map_stock_row,
            )?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(stocks)
    }

    /// 查询某作业产出的库存
    pub fn find_by_source_job(&self, job_id: &str) -> RepositoryResult<Vec<Stock>> {
        let sql = format!(
            "SELECT {} FROM stock WHERE source_job_id = ?1 ORDER BY created_at ASC, stock_id ASC",
            STOCK_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let stocks = stmt
            .query_map(params![job_id], map_stock_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(stocks)
    }

    /// 条件状态更新
    ///
    /// # 返回
    /// - Ok(()): 更新成功
    /// - Err(NotFound): 库存不存在
    /// - Err(Conflict): 当前状态不是 expected
    pub fn transition_status(
        &self,
        stock_id: &str,
        expected: StockStatus,
        next: StockStatus,
        now: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let affected = self.conn.execute(
            r#"
            UPDATE stock SET status = ?3, updated_at = ?4
            WHERE stock_id = ?1 AND status = ?2
            "#,
            params![stock_id, expected, next, now],
        )?;

        if affected == 1 {
            return Ok(());
        }

        match self.find_by_id(stock_id)? {
            None => Err(RepositoryError::not_found("Stock", stock_id)),
            Some(actual) => Err(RepositoryError::conflict(
                "Stock",
                stock_id,
                format!(
                    "期望状态{}，实际状态{}，无法变更为{}",
                    expected, actual.status, next
                ),
            )),
        }
    }
}

fn map_stock_row(row: &Row) -> SqliteResult<Stock> {
    Ok(Stock {
        stock_id: row.get(0)?,
        item_id: row.get(1)?,
        width_mm: row.get(2)?,
        quantity: row.get(3)?,
        weight_kg: row.get(4)?,
        length_m: row.get(5)?,
        condition: row.get(6)?,
        status: row.get(7)?,
        source_job_id: row.get(8)?,
        source_roll_id: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

// ==========================================
// SqliteStockLedger - 基于本库 stock 表的库存台账实现
// ==========================================
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteStockLedger;

impl SqliteStockLedger {
    fn now() -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

impl StockLedger for SqliteStockLedger {
    fn find_stock(&self, conn: &Connection, stock_id: &str) -> RepositoryResult<Option<Stock>> {
        StockRepository::new(conn).find_by_id(stock_id)
    }

    fn find_available_parent_stock(
        &self,
        conn: &Connection,
        item_id: Option<&str>,
        width_mm: Option<i32>,
        width_tolerance_mm: i32,
    ) -> RepositoryResult<Vec<Stock>> {
        StockRepository::new(conn).find_available_parent(item_id, width_mm, width_tolerance_mm)
    }

    fn reserve_stock(&self, conn: &Connection, stock_id: &str) -> RepositoryResult<()> {
        StockRepository::new(conn).transition_status(
            stock_id,
            StockStatus::Available,
            StockStatus::Reserved,
            Self::now(),
        )
    }

    fn release_stock(&self, conn: &Connection, stock_id: &str) -> RepositoryResult<()> {
        StockRepository::new(conn).transition_status(
            stock_id,
            StockStatus::Reserved,
            StockStatus::Available,
            Self::now(),
        )
    }

    fn consume_stock(&self, conn: &Connection, stock_id: &str) -> RepositoryResult<()> {
        StockRepository::new(conn).transition_status(
            stock_id,
            StockStatus::Reserved,
            StockStatus::Consumed,
            Self::now(),
        )
    }

    fn create_stock(&self, conn: &Connection, new_stock: &NewStock) -> RepositoryResult<Stock> {
        StockRepository::new(conn).insert(new_stock, Self::now())
    }
}
