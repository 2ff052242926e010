// ==========================================
// 纸卷分切生产系统 - 请求参数校验
// ==========================================
// 职责: API 入口的通用参数校验与分页归一化
// 红线: 校验失败时不得产生任何状态变更
// ==========================================

use chrono::NaiveDate;

use crate::api::error::{ApiError, ApiResult};
use crate::config::SlittingConfigReader;

/// 必填字符串参数
pub fn require_non_empty(value: &str, label: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::ValidationError(format!("{}不能为空", label)));
    }
    Ok(())
}

/// 操作人必填（身份由上游认证，这里只校验存在）
pub fn require_actor(actor: &str) -> ApiResult<()> {
    require_non_empty(actor, "操作人")
}

/// 日期区间校验
pub fn check_date_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> ApiResult<()> {
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(ApiError::ValidationError(format!(
                "日期区间非法: {} > {}",
                from, to
            )));
        }
    }
    Ok(())
}

/// 分页参数归一化
///
/// # 返回
/// - (limit, offset)
///
/// # 规则
/// - limit 缺省取配置的默认分页大小，超出上限时截断
/// - limit/offset 为负数视为输入错误
pub fn normalize_page(
    config: &dyn SlittingConfigReader,
    limit: Option<i64>,
    offset: Option<i64>,
) -> ApiResult<(i64, i64)> {
    let default_size = config.get_default_page_size().map_err(config_error)?;
    let max_size = config.get_max_page_size().map_err(config_error)?;

    let limit = limit.unwrap_or(default_size);
    let offset = offset.unwrap_or(0);
    if limit <= 0 {
        return Err(ApiError::ValidationError(format!("分页大小必须大于0: {}", limit)));
    }
    if offset < 0 {
        return Err(ApiError::ValidationError(format!("分页偏移不能为负: {}", offset)));
    }
    Ok((limit.min(max_size), offset))
}

/// 配置读取失败
pub fn config_error(err: Box<dyn std::error::Error>) -> ApiError {
    ApiError::InternalError(format!("读取配置失败: {}", err))
}
