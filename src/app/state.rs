// ==========================================
// 纸卷分切生产系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::{JobApi, MachineApi, OutputApi, RollApi, ScheduleApi};
use crate::config::{ConfigManager, SlittingConfigReader};
use crate::db::{ensure_schema, open_sqlite_connection};
use crate::repository::ledger::{MachineRegistry, StockLedger};
use crate::repository::machine_repo::SqliteMachineRegistry;
use crate::repository::stock_repo::SqliteStockLedger;
use crate::repository::unit_of_work::UnitOfWork;

/// 应用状态
///
/// 包含所有API实例和共享资源，所有API共享同一个连接
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 机台登记API
    pub machine_api: Arc<MachineApi>,

    /// 排程管理API
    pub schedule_api: Arc<ScheduleApi>,

    /// 作业状态机API
    pub job_api: Arc<JobApi>,

    /// 作业卷台账API
    pub roll_api: Arc<RollApi>,

    /// 实际产出API
    pub output_api: Arc<OutputApi>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误
    ///
    /// # 说明
    /// 库存台账与机台登记使用本库实现（stock / machine 表）
    pub fn new(db_path: String) -> Result<Self, String> {
        Self::with_collaborators(
            db_path,
            Arc::new(SqliteStockLedger),
            Arc::new(SqliteMachineRegistry),
        )
    }

    /// 注入外部协作方创建实例
    pub fn with_collaborators(
        db_path: String,
        stock_ledger: Arc<dyn StockLedger>,
        machine_registry: Arc<dyn MachineRegistry>,
    ) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn =
            open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        ensure_schema(&conn).map_err(|e| format!("数据库建表失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let config: Arc<dyn SlittingConfigReader> = config_manager.clone();

        Ok(Self::assemble(
            db_path,
            conn,
            config_manager,
            config,
            stock_ledger,
            machine_registry,
        ))
    }

    fn assemble(
        db_path: String,
        conn: Arc<Mutex<Connection>>,
        config_manager: Arc<ConfigManager>,
        config: Arc<dyn SlittingConfigReader>,
        stock_ledger: Arc<dyn StockLedger>,
        machine_registry: Arc<dyn MachineRegistry>,
    ) -> Self {
        let uow = Arc::new(UnitOfWork::new(conn));

        let machine_api = Arc::new(MachineApi::new(uow.clone()));
        let schedule_api = Arc::new(ScheduleApi::new(
            uow.clone(),
            config.clone(),
            stock_ledger.clone(),
            machine_registry.clone(),
        ));
        let job_api = Arc::new(JobApi::new(
            uow.clone(),
            config.clone(),
            stock_ledger.clone(),
            machine_registry,
        ));
        let roll_api = Arc::new(RollApi::new(uow.clone(), config, stock_ledger));
        let output_api = Arc::new(OutputApi::new(uow));

        tracing::info!("AppState初始化完成");

        Self {
            db_path,
            config_manager,
            machine_api,
            schedule_api,
            job_api,
            roll_api,
            output_api,
        }
    }
}

/// 获取默认数据库路径
///
/// 优先级: 环境变量 PAPER_SLITTING_DB_PATH > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("PAPER_SLITTING_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./paper_slitting.db");

    if let Some(data_dir) = dirs::data_dir() {
        // 开发环境使用独立目录，避免污染生产数据
        #[cfg(debug_assertions)]
        {
            path = data_dir.join("paper-slitting-dev");
        }

        #[cfg(not(debug_assertions))]
        {
            path = data_dir.join("paper-slitting");
        }

        // 目录创建失败时由打开数据库时报错
        std::fs::create_dir_all(&path).ok();
        path = path.join("paper_slitting.db");
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(path.ends_with(".db"));
    }

    #[test]
    fn test_app_state_initializes_schema() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        let db_path = temp.path().to_string_lossy().to_string();

        let state = AppState::new(db_path.clone()).unwrap();
        assert_eq!(state.db_path, db_path);
        assert!(state.machine_api.list_machines().unwrap().is_empty());
    }
}
