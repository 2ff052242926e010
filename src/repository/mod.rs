// ==========================================
// 纸卷分切生产系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// 说明: 仓储借用 &Connection，事务内外复用同一份访问代码
// ==========================================

pub mod error;
pub mod job_repo;
pub mod ledger;
pub mod machine_repo;
pub mod output_repo;
pub mod query_builder;
pub mod roll_repo;
pub mod schedule_repo;
pub mod sql_types;
pub mod stock_repo;
pub mod unit_of_work;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use job_repo::{JobListRow, JobQuery, JobRepository};
pub use ledger::{MachineRegistry, StockLedger};
pub use machine_repo::{MachineRepository, SqliteMachineRegistry};
pub use output_repo::ActualOutputRepository;
pub use roll_repo::{JobRollRepository, RollCounts};
pub use schedule_repo::{ScheduleListRow, ScheduleQuery, ScheduleRepository};
pub use stock_repo::{SqliteStockLedger, StockRepository};
pub use unit_of_work::UnitOfWork;
