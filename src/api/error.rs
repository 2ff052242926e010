// ==========================================
// 纸卷分切生产系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换Repository错误为用户友好的错误消息
// 要求: 错误信息必须带上作业/卷ID与尝试的动作，便于现场定位
// ==========================================

use crate::engine::stock_match::StockRejection;
use crate::engine::transitions::TransitionRejected;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    /// 输入非法或前置条件不满足（未发生任何状态变更）
    #[error("数据验证失败: {0}")]
    ValidationError(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    /// 当前状态不允许该动作（状态保持不变）
    #[error("无效的状态转换: {entity}(id={id}) 当前状态={from}, 动作={action}")]
    InvalidStateTransition {
        entity: String,
        id: String,
        from: String,
        action: String,
    },

    // ==========================================
    // 并发控制错误
    // ==========================================
    /// 并发请求竞争失败，调用方应重新读取状态后重试
    #[error("并发冲突: {0}")]
    Conflict(String),

    // ==========================================
    // 协作方错误
    // ==========================================
    /// 库存台账/机台登记调用失败，整个操作已回滚
    #[error("依赖调用失败: {dependency}.{operation} ({context}): {message}")]
    DependencyFailure {
        dependency: String,
        operation: String,
        context: String,
        message: String,
    },

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 状态转换被拒绝（附带实体与ID）
    pub fn invalid_transition(entity: &str, id: &str, rejected: TransitionRejected) -> Self {
        ApiError::InvalidStateTransition {
            entity: entity.to_string(),
            id: id.to_string(),
            from: rejected.current,
            action: rejected.action.to_string(),
        }
    }

    /// 协作方调用失败
    ///
    /// 协作方返回的 Conflict 保持为 Conflict（可重试），其余归为 DependencyFailure
    pub fn dependency(
        dependency: &str,
        operation: &str,
        context: impl Into<String>,
        err: RepositoryError,
    ) -> Self {
        match err {
            RepositoryError::Conflict { .. } | RepositoryError::UniqueConstraintViolation(_) => {
                ApiError::Conflict(format!("{}.{} ({}): {}", dependency, operation, context.into(), err))
            }
            other => ApiError::DependencyFailure {
                dependency: dependency.to_string(),
                operation: operation.to_string(),
                context: context.into(),
                message: other.to_string(),
            },
        }
    }

    /// 母卷判定被拒绝
    ///
    /// 库存已被预留/消耗归为 Conflict，不符合作业归为 ValidationError
    pub fn stock_rejected(job_id: &str, rejection: StockRejection) -> Self {
        match rejection {
            StockRejection::Unavailable(msg) => {
                ApiError::Conflict(format!("作业{}: {}", job_id, msg))
            }
            StockRejection::Mismatch(msg) => {
                ApiError::ValidationError(format!("作业{}: {}", job_id, msg))
            }
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ApiError::Conflict(_))
    }

    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, ApiError::InvalidStateTransition { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ApiError::ValidationError(_))
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            // 并发控制错误
            RepositoryError::Conflict {
                entity,
                id,
                message,
            } => ApiError::Conflict(format!("{}(id={}) {}", entity, id, message)),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::Conflict(format!("唯一约束违反: {}", msg))
            }

            // 数据库错误
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::ValidationError(format!("引用的记录不存在: {}", msg))
            }
            RepositoryError::CheckConstraintViolation(msg) => {
                ApiError::ValidationError(format!("检查约束违反: {}", msg))
            }

            // 数据质量错误
            RepositoryError::FieldValueError { field, message } => {
                ApiError::ValidationError(format!("字段{}错误: {}", field, message))
            }

            // 通用错误
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
