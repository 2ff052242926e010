// ==========================================
// 纸卷分切生产系统 - SQLite 连接初始化与建表
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键/ busy_timeout）
// - 统一建表脚本，存储层约束兜底业务不变量
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 建表（幂等）
///
/// 存储层不变量:
/// - 每个作业同一时刻至多一个 IN_PROGRESS 卷（部分唯一索引）
/// - 一个库存单元至多支撑一个未结束的卷（部分唯一索引）
/// - 作业寻址列与 job_kind 判别列一致（CHECK 约束）
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    let version = read_schema_version(conn)?;
    if version != Some(CURRENT_SCHEMA_VERSION) {
        tracing::warn!(
            expected = CURRENT_SCHEMA_VERSION,
            actual = ?version,
            "数据库 schema_version 与代码期望不一致"
        );
    }
    Ok(())
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL DEFAULT 'global',
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

CREATE TABLE IF NOT EXISTS machine (
    machine_id TEXT PRIMARY KEY,
    machine_code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'IDLE',
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS stock (
    stock_id TEXT PRIMARY KEY,
    item_id TEXT NOT NULL,
    width_mm INTEGER NOT NULL,
    quantity INTEGER NOT NULL,
    weight_kg REAL,
    length_m REAL,
    condition TEXT NOT NULL,
    status TEXT NOT NULL,
    source_job_id TEXT,
    source_roll_id TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_stock_parent_lookup
    ON stock(condition, status, item_id, width_mm);
CREATE INDEX IF NOT EXISTS idx_stock_source_job ON stock(source_job_id);

CREATE TABLE IF NOT EXISTS slitting_schedule (
    schedule_id TEXT PRIMARY KEY,
    schedule_no TEXT NOT NULL UNIQUE,
    scheduled_date TEXT NOT NULL,
    status TEXT NOT NULL,
    memo TEXT,
    created_by TEXT NOT NULL,
    created_at TEXT NOT NULL,
    published_by TEXT,
    published_at TEXT,
    completed_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_schedule_date ON slitting_schedule(scheduled_date);

CREATE TABLE IF NOT EXISTS slitting_job (
    job_id TEXT PRIMARY KEY,
    schedule_id TEXT NOT NULL REFERENCES slitting_schedule(schedule_id),
    seq_no INTEGER NOT NULL,
    machine_id TEXT NOT NULL REFERENCES machine(machine_id),
    operator_id TEXT,
    job_kind TEXT NOT NULL,
    parent_stock_id TEXT REFERENCES stock(stock_id),
    item_id TEXT,
    parent_width_mm INTEGER,
    planned_roll_count INTEGER,
    status TEXT NOT NULL,
    memo TEXT,
    completion_memo TEXT,
    created_by TEXT NOT NULL,
    created_at TEXT NOT NULL,
    started_by TEXT,
    started_at TEXT,
    completed_by TEXT,
    completed_at TEXT,
    approved_by TEXT,
    approved_at TEXT,
    UNIQUE (schedule_id, seq_no),
    CHECK (
        (job_kind = 'STOCK' AND parent_stock_id IS NOT NULL
            AND item_id IS NULL AND parent_width_mm IS NULL AND planned_roll_count IS NULL)
        OR
        (job_kind = 'ITEM' AND parent_stock_id IS NULL
            AND item_id IS NOT NULL AND parent_width_mm IS NOT NULL AND planned_roll_count >= 1)
    )
);
CREATE INDEX IF NOT EXISTS idx_job_schedule ON slitting_job(schedule_id);
CREATE INDEX IF NOT EXISTS idx_job_machine_status ON slitting_job(machine_id, status);

CREATE TABLE IF NOT EXISTS slitting_planned_output (
    planned_output_id TEXT PRIMARY KEY,
    job_id TEXT NOT NULL REFERENCES slitting_job(job_id) ON DELETE CASCADE,
    seq_no INTEGER NOT NULL,
    item_id TEXT NOT NULL,
    width_mm INTEGER NOT NULL,
    quantity INTEGER NOT NULL CHECK (quantity > 0),
    notes TEXT,
    UNIQUE (job_id, seq_no)
);

CREATE TABLE IF NOT EXISTS slitting_job_roll (
    roll_id TEXT PRIMARY KEY,
    job_id TEXT NOT NULL REFERENCES slitting_job(job_id),
    seq_no INTEGER NOT NULL,
    stock_id TEXT NOT NULL REFERENCES stock(stock_id),
    status TEXT NOT NULL,
    notes TEXT,
    registered_by TEXT NOT NULL,
    registered_at TEXT NOT NULL,
    started_by TEXT,
    started_at TEXT,
    completed_by TEXT,
    completed_at TEXT,
    cancelled_by TEXT,
    cancelled_at TEXT,
    UNIQUE (job_id, seq_no)
);
CREATE UNIQUE INDEX IF NOT EXISTS ux_roll_one_in_progress_per_job
    ON slitting_job_roll(job_id) WHERE status = 'IN_PROGRESS';
CREATE UNIQUE INDEX IF NOT EXISTS ux_roll_open_stock
    ON slitting_job_roll(stock_id) WHERE status IN ('REGISTERED', 'IN_PROGRESS');

CREATE TABLE IF NOT EXISTS slitting_actual_output (
    output_id TEXT PRIMARY KEY,
    job_id TEXT NOT NULL REFERENCES slitting_job(job_id),
    roll_id TEXT REFERENCES slitting_job_roll(roll_id),
    planned_output_id TEXT REFERENCES slitting_planned_output(planned_output_id),
    item_id TEXT NOT NULL,
    width_mm INTEGER NOT NULL,
    quantity INTEGER NOT NULL CHECK (quantity > 0),
    length_m REAL,
    weight_kg REAL,
    is_loss INTEGER NOT NULL DEFAULT 0,
    notes TEXT,
    created_stock_id TEXT REFERENCES stock(stock_id),
    recorded_by TEXT NOT NULL,
    recorded_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_output_job ON slitting_actual_output(job_id);
CREATE INDEX IF NOT EXISTS idx_output_roll ON slitting_actual_output(roll_id);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);

        ensure_schema(&conn).unwrap();
        ensure_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }
}
