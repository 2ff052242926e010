// ==========================================
// 纸卷分切生产系统 - 主入口
// ==========================================
// 职责: 初始化日志与数据库，输出当前生产概况
// ==========================================

use std::process::ExitCode;

use paper_slitting::api::{JobFilter, ScheduleFilter};
use paper_slitting::app::{get_default_db_path, AppState};
use paper_slitting::{logging, JobStatus, ScheduleStatus};

fn main() -> ExitCode {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", paper_slitting::APP_NAME);
    tracing::info!("系统版本: {}", paper_slitting::VERSION);
    tracing::info!("==================================================");

    let db_path = std::env::args()
        .nth(1)
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(get_default_db_path);
    tracing::info!("使用数据库: {}", db_path);

    let state = match AppState::new(db_path) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("无法初始化AppState: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run_overview(&state) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("读取生产概况失败: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// 输出机台、排程、作业状态概况
fn run_overview(state: &AppState) -> anyhow::Result<()> {
    let machines = state.machine_api.list_machines()?;
    tracing::info!("已登记机台: {}", machines.len());
    for machine in &machines {
        tracing::info!("  {} {} [{}]", machine.machine_code, machine.name, machine.status);
    }

    for status in [
        ScheduleStatus::Draft,
        ScheduleStatus::Published,
        ScheduleStatus::InProgress,
    ] {
        let page = state.schedule_api.list_schedules(&ScheduleFilter {
            status: Some(status),
            limit: Some(1),
            ..Default::default()
        })?;
        tracing::info!("排程[{}]: {}", status, page.total);
    }

    for status in [JobStatus::InProgress, JobStatus::Completed] {
        let page = state.job_api.list_jobs(&JobFilter {
            status: Some(status),
            limit: Some(1),
            ..Default::default()
        })?;
        tracing::info!("作业[{}]: {}", status, page.total);
    }

    let snapshot = state
        .config_manager
        .get_config_snapshot()
        .map_err(|e| anyhow::anyhow!("读取配置快照失败: {}", e))?;
    tracing::info!("配置快照: {}", snapshot);
    Ok(())
}
