// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、测试数据生成等功能
// ==========================================

#![allow(dead_code)]

use chrono::NaiveDate;
use paper_slitting::app::AppState;
use paper_slitting::db::{ensure_schema, open_sqlite_connection};
use paper_slitting::domain::{
    Machine, NewActualOutput, NewJob, NewJobKind, NewPlannedOutput, NewStock, Stock,
};
use paper_slitting::repository::StockRepository;
use std::error::Error;
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    paper_slitting::logging::init_test();

    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().ok_or("临时路径非UTF-8")?.to_string();

    let conn = open_sqlite_connection(&db_path)?;
    ensure_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 创建临时数据库并组装 AppState
pub fn setup_app() -> (NamedTempFile, String, AppState) {
    let (temp_file, db_path) = create_test_db().unwrap();
    let state = AppState::new(db_path.clone()).unwrap();
    (temp_file, db_path, state)
}

/// 生产日期 2024-06-01
pub fn production_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

/// 写入一个可用母卷
pub fn seed_parent_stock(db_path: &str, item_id: &str, width_mm: i32) -> Stock {
    let conn = open_sqlite_connection(db_path).unwrap();
    StockRepository::new(&conn)
        .insert(
            &NewStock::parent(item_id, width_mm, Some(1_850.0)),
            chrono::Local::now().naive_local(),
        )
        .unwrap()
}

/// 直接读取库存（绕过 API 的只读校验）
pub fn load_stock(db_path: &str, stock_id: &str) -> Stock {
    let conn = open_sqlite_connection(db_path).unwrap();
    StockRepository::new(&conn)
        .find_by_id(stock_id)
        .unwrap()
        .unwrap()
}

/// 某作业产出的库存
pub fn stock_created_by_job(db_path: &str, job_id: &str) -> Vec<Stock> {
    let conn = open_sqlite_connection(db_path).unwrap();
    StockRepository::new(&conn).find_by_source_job(job_id).unwrap()
}

pub fn seed_machine(state: &AppState, code: &str) -> Machine {
    state
        .machine_api
        .register_machine(code, &format!("分切机{}", code))
        .unwrap()
}

/// 品目/宽度寻址作业
///
/// planned: (品目, 宽度, 数量)
pub fn item_job(
    machine_id: &str,
    item_id: &str,
    parent_width_mm: i32,
    planned_roll_count: i32,
    planned: &[(&str, i32, i64)],
) -> NewJob {
    NewJob {
        machine_id: machine_id.to_string(),
        operator_id: Some("op-01".to_string()),
        kind: NewJobKind::ItemAddressed {
            item_id: item_id.to_string(),
            parent_width_mm,
            planned_roll_count,
            planned_outputs: planned
                .iter()
                .map(|(item, width, qty)| NewPlannedOutput {
                    item_id: item.to_string(),
                    width_mm: *width,
                    quantity: *qty,
                    notes: None,
                })
                .collect(),
        },
        memo: None,
    }
}

/// 母卷寻址（旧版）作业
pub fn stock_job(machine_id: &str, parent_stock_id: &str) -> NewJob {
    NewJob {
        machine_id: machine_id.to_string(),
        operator_id: None,
        kind: NewJobKind::StockAddressed {
            parent_stock_id: parent_stock_id.to_string(),
        },
        memo: Some("旧版母卷作业".to_string()),
    }
}

pub fn output(item_id: &str, width_mm: i32, quantity: i64, planned: Option<&str>) -> NewActualOutput {
    NewActualOutput {
        item_id: item_id.to_string(),
        width_mm,
        quantity,
        weight_kg: Some(quantity as f64 * 120.0),
        planned_output_id: planned.map(str::to_string),
        ..Default::default()
    }
}

pub fn loss(item_id: &str, width_mm: i32, quantity: i64) -> NewActualOutput {
    NewActualOutput {
        is_loss: true,
        notes: Some("边丝".to_string()),
        ..output(item_id, width_mm, quantity, None)
    }
}

/// 创建排程 → 编入一个品目作业 → 发布 → 就绪 → 开工
///
/// # 返回
/// - (schedule_id, job_id, machine_id)
pub fn running_item_job(
    state: &AppState,
    planned_roll_count: i32,
    planned: &[(&str, i32, i64)],
) -> (String, String, String) {
    let machine = seed_machine(state, "M1");
    let schedule = state
        .schedule_api
        .create_schedule(production_date(), None, "planner")
        .unwrap();
    let job = state
        .schedule_api
        .add_job(
            &schedule.schedule_id,
            item_job(&machine.machine_id, "I1", 1200, planned_roll_count, planned),
            "planner",
        )
        .unwrap();
    state
        .schedule_api
        .publish_schedule(&schedule.schedule_id, "planner")
        .unwrap();
    state.job_api.mark_ready(&job.job_id, "op-01").unwrap();
    state.job_api.start_job(&job.job_id, "op-01").unwrap();
    (schedule.schedule_id, job.job_id, machine.machine_id)
}
