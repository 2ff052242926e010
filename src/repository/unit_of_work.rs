// ==========================================
// 纸卷分切生产系统 - 工作单元（事务边界）
// ==========================================
// 职责: 一次状态转换及其引发的库存台账变更在同一事务内提交或整体回滚
// 说明: 使用 IMMEDIATE 事务，写锁在事务开始时获取，
//       多个无状态请求处理器（多连接）之间由 SQLite 串行化写入
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::sync::{Arc, Mutex, MutexGuard};

/// 工作单元
pub struct UnitOfWork {
    conn: Arc<Mutex<Connection>>,
}

impl UnitOfWork {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 在事务内执行写操作
    ///
    /// 闭包返回 Err 时事务随 Transaction 析构回滚，不会留下部分写入。
    pub fn execute<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let value = f(&tx)?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(value)
    }

    /// 只读查询（不开启事务，允许读到并发写入前后的快照）
    pub fn read<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let conn = self.get_conn()?;
        f(&conn)
    }
}
