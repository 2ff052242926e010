// ==========================================
// 纸卷分切生产系统 - 外部协作方接口
// ==========================================
// 职责: 库存台账 / 机台登记 的调用边界
// 说明: 方法接收调用方的连接（事务），使协作方写入与作业状态转换
//       处于同一个工作单元内，失败时整体回滚
// ==========================================

use crate::domain::machine::Machine;
use crate::domain::stock::{NewStock, Stock};
use crate::domain::types::MachineStatus;
use crate::repository::error::RepositoryResult;
use rusqlite::Connection;

// ==========================================
// StockLedger - 库存台账
// ==========================================
pub trait StockLedger: Send + Sync {
    /// 按ID查询库存
    fn find_stock(&self, conn: &Connection, stock_id: &str) -> RepositoryResult<Option<Stock>>;

    /// 查询可用母卷（品目/宽度可选过滤，宽度按容差匹配）
    fn find_available_parent_stock(
        &self,
        conn: &Connection,
        item_id: Option<&str>,
        width_mm: Option<i32>,
        width_tolerance_mm: i32,
    ) -> RepositoryResult<Vec<Stock>>;

    /// 预留母卷: AVAILABLE → RESERVED，状态不符返回 Conflict
    fn reserve_stock(&self, conn: &Connection, stock_id: &str) -> RepositoryResult<()>;

    /// 释放预留: RESERVED → AVAILABLE
    fn release_stock(&self, conn: &Connection, stock_id: &str) -> RepositoryResult<()>;

    /// 消耗母卷: RESERVED → CONSUMED
    fn consume_stock(&self, conn: &Connection, stock_id: &str) -> RepositoryResult<()>;

    /// 新建库存记录（分切成品入库）
    fn create_stock(&self, conn: &Connection, new_stock: &NewStock) -> RepositoryResult<Stock>;
}

// ==========================================
// MachineRegistry - 机台登记
// ==========================================
pub trait MachineRegistry: Send + Sync {
    fn find_machine(&self, conn: &Connection, machine_id: &str)
        -> RepositoryResult<Option<Machine>>;

    fn set_status(
        &self,
        conn: &Connection,
        machine_id: &str,
        status: MachineStatus,
    ) -> RepositoryResult<()>;
}
