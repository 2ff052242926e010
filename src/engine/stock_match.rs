// ==========================================
// 纸卷分切生产系统 - 母卷匹配规则
// ==========================================
// 职责: 判定一个库存单元能否作为作业的母卷（纯函数）
// ==========================================

use crate::domain::job::JobKind;
use crate::domain::stock::Stock;
use crate::domain::types::StockCondition;
use thiserror::Error;

/// 母卷判定的拒绝原因
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StockRejection {
    /// 库存本身不符合作业（形态/品目/宽度）
    #[error("{0}")]
    Mismatch(String),

    /// 库存已被预留或消耗
    #[error("{0}")]
    Unavailable(String),
}

impl StockRejection {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StockRejection::Unavailable(_))
    }
}

/// 母卷可用性判定
///
/// # 规则
/// 1. 形态必须为 PARENT，否则 Mismatch
/// 2. 状态必须为 AVAILABLE，否则 Unavailable
/// 3. 品目/宽度寻址作业: 品目一致，宽度差不超过容差，否则 Mismatch
pub fn check_parent_stock(
    kind: &JobKind,
    stock: &Stock,
    width_tolerance_mm: i32,
) -> Result<(), StockRejection> {
    if !stock.is_available_parent() {
        if stock.condition != StockCondition::Parent {
            return Err(StockRejection::Mismatch(format!(
                "库存{}形态为{}，不是母卷",
                stock.stock_id, stock.condition
            )));
        }
        return Err(StockRejection::Unavailable(format!(
            "库存{}状态为{}，不可用",
            stock.stock_id, stock.status
        )));
    }

    if let JobKind::ItemAddressed {
        item_id,
        parent_width_mm,
        ..
    } = kind
    {
        if &stock.item_id != item_id {
            return Err(StockRejection::Mismatch(format!(
                "库存{}品目{}与作业母卷品目{}不一致",
                stock.stock_id, stock.item_id, item_id
            )));
        }
        let diff = (stock.width_mm - parent_width_mm).abs();
        if diff > width_tolerance_mm.max(0) {
            return Err(StockRejection::Mismatch(format!(
                "库存{}宽度{}mm与作业母卷宽度{}mm不一致（容差{}mm）",
                stock.stock_id, stock.width_mm, parent_width_mm, width_tolerance_mm
            )));
        }
    }
    Ok(())
}
