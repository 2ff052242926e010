// ==========================================
// 纸卷分切生产系统 - 列表查询构建器
// ==========================================
// 职责: 动态 WHERE 条件 + 分页，所有条件值走参数绑定
// ==========================================

use rusqlite::types::Value;

/// 列表查询构建器（流式 API）
///
/// # 示例
/// ```
/// use paper_slitting::repository::query_builder::ListQueryBuilder;
///
/// let q = ListQueryBuilder::new("SELECT * FROM slitting_schedule s")
///     .and_where("s.status = ?", Some("DRAFT".to_string()))
///     .and_where("s.memo LIKE ?", None::<String>)
///     .order_by("s.scheduled_date DESC");
///
/// assert_eq!(
///     q.build_page(),
///     "SELECT * FROM slitting_schedule s WHERE s.status = ? ORDER BY s.scheduled_date DESC LIMIT ? OFFSET ?"
/// );
/// assert_eq!(q.values().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct ListQueryBuilder {
    select_clause: String,
    where_clauses: Vec<String>,
    values: Vec<Value>,
    order_by_clause: Option<String>,
}

impl ListQueryBuilder {
    pub fn new(select: &str) -> Self {
        Self {
            select_clause: select.to_string(),
            where_clauses: Vec::new(),
            values: Vec::new(),
            order_by_clause: None,
        }
    }

    /// 值存在时追加一个单参数条件
    pub fn and_where<V: Into<Value>>(mut self, condition: &str, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.where_clauses.push(condition.to_string());
            self.values.push(v.into());
        }
        self
    }

    /// 值存在时追加一个多参数条件（同一个值绑定到每个占位符）
    pub fn and_where_repeated<V: Into<Value> + Clone>(
        mut self,
        condition: &str,
        value: Option<V>,
    ) -> Self {
        if let Some(v) = value {
            let placeholders = condition.matches('?').count();
            self.where_clauses.push(format!("({})", condition));
            for _ in 0..placeholders {
                self.values.push(v.clone().into());
            }
        }
        self
    }

    pub fn order_by(mut self, order: &str) -> Self {
        self.order_by_clause = Some(order.to_string());
        self
    }

    fn where_sql(&self) -> String {
        if self.where_clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.where_clauses.join(" AND "))
        }
    }

    /// 计数语句: SELECT COUNT(*) FROM (...)
    pub fn build_count(&self) -> String {
        format!(
            "SELECT COUNT(*) FROM ({}{})",
            self.select_clause,
            self.where_sql()
        )
    }

    /// 分页语句，末尾两个占位符为 LIMIT/OFFSET
    pub fn build_page(&self) -> String {
        let mut sql = format!("{}{}", self.select_clause, self.where_sql());
        if let Some(order) = &self.order_by_clause {
            sql.push_str(" ORDER BY ");
            sql.push_str(order);
        }
        sql.push_str(" LIMIT ? OFFSET ?");
        sql
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// 分页参数: 条件值 + limit + offset
    pub fn page_values(&self, limit: i64, offset: i64) -> Vec<Value> {
        let mut values = self.values.clone();
        values.push(Value::Integer(limit));
        values.push(Value::Integer(offset));
        values
    }
}

/// LIKE 关键字（两端通配）
pub fn like_pattern(keyword: &str) -> String {
    let escaped = keyword
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_without_conditions() {
        let q = ListQueryBuilder::new("SELECT * FROM t");
        assert_eq!(q.build_count(), "SELECT COUNT(*) FROM (SELECT * FROM t)");
        assert_eq!(q.build_page(), "SELECT * FROM t LIMIT ? OFFSET ?");
        assert_eq!(q.page_values(10, 20).len(), 2);
    }

    #[test]
    fn test_repeated_condition_binds_each_placeholder() {
        let q = ListQueryBuilder::new("SELECT * FROM t").and_where_repeated(
            "a LIKE ? ESCAPE '\\' OR b LIKE ? ESCAPE '\\'",
            Some(like_pattern("SL")),
        );
        assert_eq!(q.values().len(), 2);
        assert!(q.build_page().contains("WHERE (a LIKE ?"));
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" 50%_x "), "%50\\%\\_x%");
    }
}
