// ==========================================
// 纸卷分切生产系统 - 核心库
// ==========================================
// 范围: 排程 → 作业 → 作业卷 → 实际产出 的生命周期，
//       审批入库与计划/实际差异分析
// 技术栈: Rust + SQLite
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 状态组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    JobStatus, MachineStatus, RollStatus, ScheduleStatus, StockCondition, StockStatus,
};

// 领域实体
pub use domain::{
    ActualOutput, Job, JobKind, JobRoll, Machine, NewActualOutput, NewJob, NewJobKind,
    NewPlannedOutput, NewStock, PlannedOutput, Schedule, Stock,
};

// 引擎
pub use engine::{ApprovalPlanner, JobCompletion, VarianceAnalyzer, VarianceReport};

// API
pub use api::{ApiError, ApiResult, JobApi, MachineApi, OutputApi, RollApi, ScheduleApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "纸卷分切生产系统";
