// ==========================================
// 纸卷分切生产系统 - 状态转换表
// ==========================================
// 职责: 排程/作业/作业卷的合法转换判定（纯函数）
// 红线: 只判定不落库；非相邻状态一律拒绝，当前状态不变
// ==========================================

use crate::domain::types::{JobStatus, RollStatus, ScheduleStatus};
use std::fmt;
use thiserror::Error;

/// 转换被拒绝（当前状态 + 尝试的动作）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("当前状态{current}不允许执行{action}")]
pub struct TransitionRejected {
    pub current: String,
    pub action: &'static str,
}

// ==========================================
// 作业动作
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobAction {
    MarkReady, // PENDING → READY
    Start,     // READY → IN_PROGRESS
    Complete,  // IN_PROGRESS → COMPLETED
    Approve,   // COMPLETED → APPROVED
}

impl JobAction {
    pub fn name(&self) -> &'static str {
        match self {
            JobAction::MarkReady => "mark_ready",
            JobAction::Start => "start",
            JobAction::Complete => "complete",
            JobAction::Approve => "approve",
        }
    }

    pub fn source(&self) -> JobStatus {
        match self {
            JobAction::MarkReady => JobStatus::Pending,
            JobAction::Start => JobStatus::Ready,
            JobAction::Complete => JobStatus::InProgress,
            JobAction::Approve => JobStatus::Completed,
        }
    }

    pub fn target(&self) -> JobStatus {
        match self {
            JobAction::MarkReady => JobStatus::Ready,
            JobAction::Start => JobStatus::InProgress,
            JobAction::Complete => JobStatus::Completed,
            JobAction::Approve => JobStatus::Approved,
        }
    }
}

impl fmt::Display for JobAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 作业转换判定
pub fn next_job_status(current: JobStatus, action: JobAction) -> Result<JobStatus, TransitionRejected> {
    if current == action.source() {
        Ok(action.target())
    } else {
        Err(TransitionRejected {
            current: current.to_string(),
            action: action.name(),
        })
    }
}

// ==========================================
// 作业卷动作
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollAction {
    Start,    // REGISTERED → IN_PROGRESS
    Complete, // IN_PROGRESS → COMPLETED
    Cancel,   // REGISTERED / IN_PROGRESS → CANCELLED
}

impl RollAction {
    pub fn name(&self) -> &'static str {
        match self {
            RollAction::Start => "start_roll",
            RollAction::Complete => "complete_roll",
            RollAction::Cancel => "cancel_roll",
        }
    }
}

impl fmt::Display for RollAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 作业卷转换判定
pub fn next_roll_status(current: RollStatus, action: RollAction) -> Result<RollStatus, TransitionRejected> {
    let next = match (current, action) {
        (RollStatus::Registered, RollAction::Start) => Some(RollStatus::InProgress),
        (RollStatus::InProgress, RollAction::Complete) => Some(RollStatus::Completed),
        (RollStatus::Registered | RollStatus::InProgress, RollAction::Cancel) => {
            Some(RollStatus::Cancelled)
        }
        _ => None,
    };
    next.ok_or_else(|| TransitionRejected {
        current: current.to_string(),
        action: action.name(),
    })
}

// ==========================================
// 排程动作
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleAction {
    Publish,  // DRAFT → PUBLISHED
    Begin,    // PUBLISHED → IN_PROGRESS（首个作业开工时派生）
    Complete, // PUBLISHED / IN_PROGRESS → COMPLETED
}

impl ScheduleAction {
    pub fn name(&self) -> &'static str {
        match self {
            ScheduleAction::Publish => "publish",
            ScheduleAction::Begin => "begin",
            ScheduleAction::Complete => "complete_schedule",
        }
    }
}

/// 排程转换判定（状态只前进）
pub fn next_schedule_status(
    current: ScheduleStatus,
    action: ScheduleAction,
) -> Result<ScheduleStatus, TransitionRejected> {
    let next = match (current, action) {
        (ScheduleStatus::Draft, ScheduleAction::Publish) => Some(ScheduleStatus::Published),
        (ScheduleStatus::Published, ScheduleAction::Begin) => Some(ScheduleStatus::InProgress),
        (ScheduleStatus::Published | ScheduleStatus::InProgress, ScheduleAction::Complete) => {
            Some(ScheduleStatus::Completed)
        }
        _ => None,
    };
    next.ok_or_else(|| TransitionRejected {
        current: current.to_string(),
        action: action.name(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_happy_path() {
        let mut status = JobStatus::Pending;
        for action in [
            JobAction::MarkReady,
            JobAction::Start,
            JobAction::Complete,
            JobAction::Approve,
        ] {
            status = next_job_status(status, action).unwrap();
        }
        assert_eq!(status, JobStatus::Approved);
    }

    #[test]
    fn test_job_rejects_non_adjacent_and_repeat() {
        let err = next_job_status(JobStatus::Pending, JobAction::Start).unwrap_err();
        assert_eq!(err.current, "PENDING");
        assert_eq!(err.action, "start");

        // 已审批不可再次审批
        assert!(next_job_status(JobStatus::Approved, JobAction::Approve).is_err());
        // 没有回退
        assert!(next_job_status(JobStatus::Completed, JobAction::Start).is_err());
    }

    #[test]
    fn test_roll_transitions() {
        assert_eq!(
            next_roll_status(RollStatus::Registered, RollAction::Start),
            Ok(RollStatus::InProgress)
        );
        assert_eq!(
            next_roll_status(RollStatus::InProgress, RollAction::Cancel),
            Ok(RollStatus::Cancelled)
        );
        assert!(next_roll_status(RollStatus::Registered, RollAction::Complete).is_err());
        assert!(next_roll_status(RollStatus::Completed, RollAction::Cancel).is_err());
        assert!(next_roll_status(RollStatus::Cancelled, RollAction::Start).is_err());
    }

    #[test]
    fn test_schedule_only_moves_forward() {
        assert_eq!(
            next_schedule_status(ScheduleStatus::Draft, ScheduleAction::Publish),
            Ok(ScheduleStatus::Published)
        );
        assert!(next_schedule_status(ScheduleStatus::Published, ScheduleAction::Publish).is_err());
        assert_eq!(
            next_schedule_status(ScheduleStatus::Published, ScheduleAction::Begin),
            Ok(ScheduleStatus::InProgress)
        );
        assert!(next_schedule_status(ScheduleStatus::InProgress, ScheduleAction::Begin).is_err());
        assert!(next_schedule_status(ScheduleStatus::Draft, ScheduleAction::Complete).is_err());
        assert!(next_schedule_status(ScheduleStatus::Completed, ScheduleAction::Begin).is_err());
    }
}
