// ==========================================
// 纸卷分切生产系统 - 实际产出领域模型
// ==========================================
// 职责: 记录一卷分切的实际结果（成品或损耗）
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// ActualOutput - 实际产出
// ==========================================
// 对齐: slitting_actual_output 表
// 说明: roll_id 为空表示旧版作业完工时一次性提交的产出
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActualOutput {
    pub output_id: String,
    pub job_id: String,
    pub roll_id: Option<String>,
    pub planned_output_id: Option<String>,
    pub item_id: String,
    pub width_mm: i32,
    pub quantity: i64,
    pub length_m: Option<f64>,
    pub weight_kg: Option<f64>,
    pub is_loss: bool,
    pub notes: Option<String>,
    pub created_stock_id: Option<String>, // 审批入库后生成的库存
    pub recorded_by: String,
    pub recorded_at: NaiveDateTime,
}

// ==========================================
// NewActualOutput - 产出登记请求
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewActualOutput {
    pub item_id: String,
    pub width_mm: i32,
    pub quantity: i64,
    pub length_m: Option<f64>,
    pub weight_kg: Option<f64>,
    pub is_loss: bool,
    pub planned_output_id: Option<String>,
    pub notes: Option<String>,
}

impl NewActualOutput {
    /// 输入校验（不访问数据库）
    pub fn validate(&self) -> Result<(), String> {
        if self.item_id.trim().is_empty() {
            return Err("产出品目ID不能为空".to_string());
        }
        if self.width_mm <= 0 {
            return Err(format!("产出宽度必须大于0: {}", self.width_mm));
        }
        if self.quantity <= 0 {
            return Err(format!("产出数量必须大于0: {}", self.quantity));
        }
        if let Some(w) = self.weight_kg {
            if !w.is_finite() || w < 0.0 {
                return Err(format!("产出重量非法: {}", w));
            }
        }
        if let Some(l) = self.length_m {
            if !l.is_finite() || l < 0.0 {
                return Err(format!("产出长度非法: {}", l));
            }
        }
        Ok(())
    }
}
