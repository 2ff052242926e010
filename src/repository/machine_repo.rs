// ==========================================
// 纸卷分切生产系统 - 机台数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::machine::Machine;
use crate::domain::types::MachineStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::ledger::MachineRegistry;
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};

// ==========================================
// MachineRepository - 机台表访问
// ==========================================
pub struct MachineRepository<'c> {
    conn: &'c Connection,
}

impl<'c> MachineRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn insert(&self, machine: &Machine) -> RepositoryResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO machine (machine_id, machine_code, name, status, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                machine.machine_id,
                machine.machine_code,
                machine.name,
                machine.status,
                machine.updated_at,
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, machine_id: &str) -> RepositoryResult<Option<Machine>> {
        let machine = self
            .conn
            .query_row(
                r#"
                SELECT machine_id, machine_code, name, status, updated_at
                FROM machine WHERE machine_id = ?1
                "#,
                params![machine_id],
                map_machine_row,
            )
            .optional()?;
        Ok(machine)
    }

    pub fn find_by_code(&self, machine_code: &str) -> RepositoryResult<Option<Machine>> {
        let machine = self
            .conn
            .query_row(
                r#"
                SELECT machine_id, machine_code, name, status, updated_at
                FROM machine WHERE machine_code = ?1
                "#,
                params![machine_code],
                map_machine_row,
            )
            .optional()?;
        Ok(machine)
    }

    pub fn list_all(&self) -> RepositoryResult<Vec<Machine>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT machine_id, machine_code, name, status, updated_at
            FROM machine ORDER BY machine_code ASC
            "#,
        )?;
        let machines = stmt
            .query_map([], map_machine_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(machines)
    }

    pub fn update_status(
        &self,
        machine_id: &str,
        status: MachineStatus,
        now: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let affected = self.conn.execute(
            "UPDATE machine SET status = ?2, updated_at = ?3 WHERE machine_id = ?1",
            params![machine_id, status, now],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("Machine", machine_id));
        }
        Ok(())
    }
}

fn map_machine_row(row: &Row) -> SqliteResult<Machine> {
    Ok(Machine {
        machine_id: row.get(0)?,
        machine_code: row.get(1)?,
        name: row.get(2)?,
        status: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

// ==========================================
// SqliteMachineRegistry - 基于本库 machine 表的机台登记实现
// ==========================================
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteMachineRegistry;

impl MachineRegistry for SqliteMachineRegistry {
    fn find_machine(
        &self,
        conn: &Connection,
        machine_id: &str,
    ) -> RepositoryResult<Option<Machine>> {
        MachineRepository::new(conn).find_by_id(machine_id)
    }

    fn set_status(
        &self,
        conn: &Connection,
        machine_id: &str,
        status: MachineStatus,
    ) -> RepositoryResult<()> {
        MachineRepository::new(conn).update_status(
            machine_id,
            status,
            chrono::Local::now().naive_local(),
        )
    }
}
