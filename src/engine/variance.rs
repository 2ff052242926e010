// ==========================================
// 纸卷分切生产系统 - 计划/实际差异分析
// ==========================================
// 职责: 按计划产出行汇总实际产出，计算数量差异与差异率
// 口径:
// - 实际数量只统计非损耗产出；损耗单独汇总
// - 差异率 = 差异 / 计划数量 × 100；计划数量为0时记为0
// - 未关联计划行的产出进入"计划外"汇总，计入实际总量，
//   不参与逐行差异与作业级差异
// 红线: 纯计算，无副作用，结果确定（按计划行序号输出）
// ==========================================

use crate::domain::job::PlannedOutput;
use crate::domain::output::ActualOutput;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 单个计划行的差异
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarianceLine {
    pub planned_output_id: String,
    pub seq_no: i32,
    pub item_id: String,
    pub width_mm: i32,
    pub planned_quantity: i64,
    pub actual_quantity: i64,
    pub actual_weight_kg: f64,
    pub loss_quantity: i64,
    pub quantity_variance: i64,
    pub variance_percent: f64,
}

/// 作业级汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarianceSummary {
    pub planned_quantity: i64,
    /// 关联到计划行的非损耗实际数量
    pub matched_actual_quantity: i64,
    pub loss_quantity: i64,
    /// 未关联计划行的非损耗实际数量
    pub unplanned_quantity: i64,
    pub unplanned_weight_kg: f64,
    /// matched + unplanned
    pub total_actual_quantity: i64,
    pub quantity_variance: i64,
    pub variance_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarianceReport {
    pub job_id: String,
    pub lines: Vec<VarianceLine>,
    pub summary: VarianceSummary,
}

#[derive(Default)]
struct Bucket {
    quantity: i64,
    weight_kg: f64,
    loss_quantity: i64,
}

impl Bucket {
    fn add(&mut self, output: &ActualOutput) {
        if output.is_loss {
            self.loss_quantity += output.quantity;
        } else {
            self.quantity += output.quantity;
            self.weight_kg += output.weight_kg.unwrap_or(0.0);
        }
    }
}

/// 差异率（计划为0时返回0）
pub fn variance_percent(variance: i64, planned: i64) -> f64 {
    if planned == 0 {
        0.0
    } else {
        variance as f64 * 100.0 / planned as f64
    }
}

// ==========================================
// VarianceAnalyzer
// ==========================================
pub struct VarianceAnalyzer;

impl VarianceAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(
        &self,
        job_id: &str,
        planned: &[PlannedOutput],
        actuals: &[ActualOutput],
    ) -> VarianceReport {
        let mut by_plan: HashMap<&str, Bucket> = HashMap::new();
        let mut unplanned = Bucket::default();

        for output in actuals {
            let matched = output
                .planned_output_id
                .as_deref()
                .filter(|id| planned.iter().any(|p| p.planned_output_id == *id));
            match matched {
                Some(id) => by_plan.entry(id).or_default().add(output),
                None => unplanned.add(output),
            }
        }

        let mut sorted: Vec<&PlannedOutput> = planned.iter().collect();
        sorted.sort_by_key(|p| p.seq_no);

        let lines: Vec<VarianceLine> = sorted
            .into_iter()
            .map(|p| {
                let bucket = by_plan.get(p.planned_output_id.as_str());
                let actual_quantity = bucket.map_or(0, |b| b.quantity);
                let quantity_variance = actual_quantity - p.quantity;
                VarianceLine {
                    planned_output_id: p.planned_output_id.clone(),
                    seq_no: p.seq_no,
                    item_id: p.item_id.clone(),
                    width_mm: p.width_mm,
                    planned_quantity: p.quantity,
                    actual_quantity,
                    actual_weight_kg: bucket.map_or(0.0, |b| b.weight_kg),
                    loss_quantity: bucket.map_or(0, |b| b.loss_quantity),
                    quantity_variance,
                    variance_percent: variance_percent(quantity_variance, p.quantity),
                }
            })
            .collect();

        let planned_quantity: i64 = lines.iter().map(|l| l.planned_quantity).sum();
        let matched_actual_quantity: i64 = lines.iter().map(|l| l.actual_quantity).sum();
        let quantity_variance = matched_actual_quantity - planned_quantity;

        let summary = VarianceSummary {
            planned_quantity,
            matched_actual_quantity,
            loss_quantity: lines.iter().map(|l| l.loss_quantity).sum::<i64>()
                + unplanned.loss_quantity,
            unplanned_quantity: unplanned.quantity,
            unplanned_weight_kg: unplanned.weight_kg,
            total_actual_quantity: matched_actual_quantity + unplanned.quantity,
            quantity_variance,
            variance_percent: variance_percent(quantity_variance, planned_quantity),
        };

        VarianceReport {
            job_id: job_id.to_string(),
            lines,
            summary,
        }
    }
}

impl Default for VarianceAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
