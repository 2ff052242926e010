// ==========================================
// 纸卷分切生产系统 - 应用层
// ==========================================
// 职责: 组装数据库连接、配置、协作方与各 API
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
