// ==========================================
// 纸卷分切生产系统 - 状态枚举与 SQLite 文本列互转
// ==========================================

use crate::domain::types::{
    JobStatus, MachineStatus, RollStatus, ScheduleStatus, StockCondition, StockStatus,
};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};

macro_rules! impl_sql_text_enum {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ToSql for $ty {
                fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                    Ok(ToSqlOutput::from(self.as_db_str()))
                }
            }

            impl FromSql for $ty {
                fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                    let raw = value.as_str()?;
                    <$ty>::parse(raw).ok_or_else(|| {
                        FromSqlError::Other(
                            format!("未知的{}取值: {}", stringify!($ty), raw).into(),
                        )
                    })
                }
            }
        )*
    };
}

impl_sql_text_enum!(
    ScheduleStatus,
    JobStatus,
    RollStatus,
    MachineStatus,
    StockCondition,
    StockStatus,
);
