// ==========================================
// 纸卷分切生产系统 - 分切配置读取 Trait
// ==========================================
// 职责: 定义作业/排程 API 所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use std::error::Error;

// ==========================================
// SlittingConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
pub trait SlittingConfigReader: Send + Sync {
    /// 母卷宽度匹配容差（mm）
    ///
    /// # 默认值
    /// - 0（宽度必须完全一致）
    fn get_parent_width_tolerance_mm(&self) -> Result<i32, Box<dyn Error>>;

    /// 排程号前缀
    ///
    /// # 默认值
    /// - "SL"
    fn get_schedule_no_prefix(&self) -> Result<String, Box<dyn Error>>;

    /// 列表查询默认分页大小
    fn get_default_page_size(&self) -> Result<i64, Box<dyn Error>>;

    /// 列表查询最大分页大小
    fn get_max_page_size(&self) -> Result<i64, Box<dyn Error>>;
}
