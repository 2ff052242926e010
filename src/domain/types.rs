// ==========================================
// 纸卷分切生产系统 - 领域类型定义
// ==========================================
// 职责: 排程/作业/卷/机台/库存的状态枚举
// 存储格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 排程状态 (Schedule Status)
// ==========================================
// 状态只前进，不回退: DRAFT → PUBLISHED → IN_PROGRESS → COMPLETED
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleStatus {
    Draft,      // 草稿
    Published,  // 已发布
    InProgress, // 生产中
    Completed,  // 已完成
}

impl ScheduleStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            ScheduleStatus::Draft => "DRAFT",
            ScheduleStatus::Published => "PUBLISHED",
            ScheduleStatus::InProgress => "IN_PROGRESS",
            ScheduleStatus::Completed => "COMPLETED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "DRAFT" => Some(ScheduleStatus::Draft),
            "PUBLISHED" => Some(ScheduleStatus::Published),
            "IN_PROGRESS" => Some(ScheduleStatus::InProgress),
            "COMPLETED" => Some(ScheduleStatus::Completed),
            _ => None,
        }
    }

    /// 作业是否可执行（排程已发布）
    pub fn is_executable(&self) -> bool {
        matches!(self, ScheduleStatus::Published | ScheduleStatus::InProgress)
    }
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_str())
    }
}

// ==========================================
// 作业状态 (Job Status)
// ==========================================
// PENDING → READY → IN_PROGRESS → COMPLETED → APPROVED
// APPROVED 为唯一终态
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,    // 待准备
    Ready,      // 就绪
    InProgress, // 执行中
    Completed,  // 已完工
    Approved,   // 已审批（入库）
}

impl JobStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Ready => "READY",
            JobStatus::InProgress => "IN_PROGRESS",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Approved => "APPROVED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Some(JobStatus::Pending),
            "READY" => Some(JobStatus::Ready),
            "IN_PROGRESS" => Some(JobStatus::InProgress),
            "COMPLETED" => Some(JobStatus::Completed),
            "APPROVED" => Some(JobStatus::Approved),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Approved)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_str())
    }
}

// ==========================================
// 作业卷状态 (Job Roll Status)
// ==========================================
// REGISTERED → IN_PROGRESS → COMPLETED，非终态可 → CANCELLED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RollStatus {
    Registered, // 已登记（母卷已预留）
    InProgress, // 分切中
    Completed,  // 已完成
    Cancelled,  // 已取消
}

impl RollStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            RollStatus::Registered => "REGISTERED",
            RollStatus::InProgress => "IN_PROGRESS",
            RollStatus::Completed => "COMPLETED",
            RollStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "REGISTERED" => Some(RollStatus::Registered),
            "IN_PROGRESS" => Some(RollStatus::InProgress),
            "COMPLETED" => Some(RollStatus::Completed),
            "CANCELLED" => Some(RollStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RollStatus::Completed | RollStatus::Cancelled)
    }

    /// 是否占用母卷（未取消且未完成）
    pub fn is_open(&self) -> bool {
        matches!(self, RollStatus::Registered | RollStatus::InProgress)
    }
}

impl fmt::Display for RollStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_str())
    }
}

// ==========================================
// 机台状态 (Machine Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MachineStatus {
    Idle,        // 空闲
    Running,     // 运行中
    Maintenance, // 维护中
}

impl MachineStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            MachineStatus::Idle => "IDLE",
            MachineStatus::Running => "RUNNING",
            MachineStatus::Maintenance => "MAINTENANCE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "IDLE" => Some(MachineStatus::Idle),
            "RUNNING" => Some(MachineStatus::Running),
            "MAINTENANCE" => Some(MachineStatus::Maintenance),
            _ => None,
        }
    }
}

impl fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_str())
    }
}

// ==========================================
// 库存形态 (Stock Condition)
// ==========================================
// PARENT: 母卷（分切输入）; SLITTED: 分切成品
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockCondition {
    Parent,
    Slitted,
}

impl StockCondition {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            StockCondition::Parent => "PARENT",
            StockCondition::Slitted => "SLITTED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PARENT" => Some(StockCondition::Parent),
            "SLITTED" => Some(StockCondition::Slitted),
            _ => None,
        }
    }
}

impl fmt::Display for StockCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_str())
    }
}

// ==========================================
// 库存状态 (Stock Status)
// ==========================================
// AVAILABLE → RESERVED (卷登记) → CONSUMED (作业审批)
// RESERVED → AVAILABLE (卷取消，释放预留)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockStatus {
    Available,
    Reserved,
    Consumed,
}

impl StockStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            StockStatus::Available => "AVAILABLE",
            StockStatus::Reserved => "RESERVED",
            StockStatus::Consumed => "CONSUMED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "AVAILABLE" => Some(StockStatus::Available),
            "RESERVED" => Some(StockStatus::Reserved),
            "CONSUMED" => Some(StockStatus::Consumed),
            _ => None,
        }
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_str())
    }
}
