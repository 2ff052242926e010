// ==========================================
// 纸卷分切生产系统 - 库存领域模型
// ==========================================
// 职责: 库存台账记录（母卷/分切成品）
// 说明: 库存台账属于外部协作方，本核心只依赖其接口
// ==========================================

use crate::domain::types::{StockCondition, StockStatus};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// Stock - 库存单元
// ==========================================
// 对齐: stock 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stock {
    pub stock_id: String,
    pub item_id: String,
    pub width_mm: i32,
    pub quantity: i64,
    pub weight_kg: Option<f64>,
    pub length_m: Option<f64>,
    pub condition: StockCondition,
    pub status: StockStatus,

    // ===== 来源追溯 (分切成品) =====
    pub source_job_id: Option<String>,
    pub source_roll_id: Option<String>,

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Stock {
    /// 是否为可用母卷
    pub fn is_available_parent(&self) -> bool {
        self.condition == StockCondition::Parent && self.status == StockStatus::Available
    }
}

// ==========================================
// NewStock - 新建库存请求
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStock {
    pub item_id: String,
    pub width_mm: i32,
    pub quantity: i64,
    pub weight_kg: Option<f64>,
    pub length_m: Option<f64>,
    pub condition: StockCondition,
    pub source_job_id: Option<String>,
    pub source_roll_id: Option<String>,
}

impl NewStock {
    /// 母卷入库请求（测试/初始化数据使用）
    pub fn parent(item_id: &str, width_mm: i32, weight_kg: Option<f64>) -> Self {
        Self {
            item_id: item_id.to_string(),
            width_mm,
            quantity: 1,
            weight_kg,
            length_m: None,
            condition: StockCondition::Parent,
            source_job_id: None,
            source_roll_id: None,
        }
    }
}
