use serde_json::Value;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{FilterData, FilterOrderInfo, SqlResult};
use super::validate_column;

/// Client query shape: projection, conditions, ordering and pagination.
///
/// A `Filter` never renders a complete statement on its own; callers combine its
/// pieces with a tenant scope predicate (see `database::scoped_query`).
#[derive(Debug, Clone, Default)]
pub struct Filter {
    select_columns: Vec<String>,
    where_data: Option<Value>,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<i32>,
    offset: Option<i32>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_data(data: FilterData) -> Result<Self, FilterError> {
        let mut filter = Self::new();
        filter.assign(data)?;
        Ok(filter)
    }

    pub fn assign(&mut self, data: FilterData) -> Result<&mut Self, FilterError> {
        if let Some(select) = data.select { self.select(select)?; }
        if let Some(where_clause) = data.where_clause { self.where_clause(where_clause)?; }
        if let Some(order) = data.order { self.order(order)?; }
        if let Some(limit) = data.limit { self.limit(limit)?; }
        if let Some(offset) = data.offset { self.offset(offset)?; }
        Ok(self)
    }

    pub fn select(&mut self, columns: Vec<String>) -> Result<&mut Self, FilterError> {
        for column in &columns {
            if column != "*" {
                validate_column(column)?;
            }
        }
        self.select_columns = columns;
        Ok(self)
    }

    pub fn where_clause(&mut self, conditions: Value) -> Result<&mut Self, FilterError> {
        FilterWhere::validate(&conditions)?;
        self.where_data = Some(conditions);
        Ok(self)
    }

    pub fn order(&mut self, order_spec: Value) -> Result<&mut Self, FilterError> {
        self.order_data = FilterOrder::validate_and_parse(&order_spec)?;
        Ok(self)
    }

    /// Capped to `filter.max_limit`
    pub fn limit(&mut self, limit: i32) -> Result<&mut Self, FilterError> {
        if limit < 0 {
            return Err(FilterError::NegativePagination("limit", limit));
        }

        let max_limit = crate::config::CONFIG.filter.max_limit.unwrap_or(i32::MAX);
        let applied_limit = if limit > max_limit {
            if crate::config::CONFIG.filter.debug_logging {
                tracing::warn!("Limit {} exceeds max {}, capping to max", limit, max_limit);
            }
            max_limit
        } else {
            limit
        };

        self.limit = Some(applied_limit);
        Ok(self)
    }

    /// Applies with or without a limit
    pub fn offset(&mut self, offset: i32) -> Result<&mut Self, FilterError> {
        if offset < 0 {
            return Err(FilterError::NegativePagination("offset", offset));
        }
        self.offset = Some(offset);
        Ok(self)
    }

    pub fn select_clause(&self) -> String {
        if self.select_columns.is_empty() || self.select_columns.iter().any(|c| c == "*") {
            "*".to_string()
        } else {
            self.select_columns.iter().map(|c| format!("\"{}\"", c)).collect::<Vec<_>>().join(", ")
        }
    }

    /// Condition with placeholders numbered from `starting_param_index + 1`
    pub fn where_sql(&self, starting_param_index: usize) -> Result<SqlResult, FilterError> {
        let (query, params) = match &self.where_data {
            Some(where_data) => FilterWhere::generate(where_data, starting_param_index)?,
            None => ("TRUE".to_string(), vec![]),
        };
        Ok(SqlResult { query, params })
    }

    pub fn order_clause(&self) -> String {
        FilterOrder::generate(&self.order_data)
    }

    pub fn limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            (None, Some(o)) => format!("OFFSET {}", o),
            (None, None) => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn assigns_all_parts() {
        let data: FilterData = serde_json::from_value(json!({
            "select": ["id", "title"],
            "where": { "status": "open" },
            "order": "created_at desc",
            "limit": 10,
            "offset": 20
        }))
        .unwrap();
        let filter = Filter::from_data(data).unwrap();
        assert_eq!(filter.select_clause(), "\"id\", \"title\"");
        assert_eq!(filter.where_sql(1).unwrap().query, "\"status\" = $2");
        assert_eq!(filter.order_clause(), "ORDER BY \"created_at\" DESC");
        assert_eq!(filter.limit_clause(), "LIMIT 10 OFFSET 20");
    }

    #[test]
    fn rejects_negative_limit() {
        assert_eq!(Filter::new().limit(-1).unwrap_err(), FilterError::NegativePagination("limit", -1));
        assert_eq!(Filter::new().offset(-2).unwrap_err(), FilterError::NegativePagination("offset", -2));
    }

    #[test]
    fn offset_without_limit_is_kept() {
        let data: FilterData = serde_json::from_value(json!({ "offset": 40 })).unwrap();
        let filter = Filter::from_data(data).unwrap();
        assert_eq!(filter.limit_clause(), "OFFSET 40");
    }

    #[test]
    fn empty_filter_is_unconstrained() {
        let filter = Filter::new();
        assert_eq!(filter.select_clause(), "*");
        assert_eq!(filter.where_sql(0).unwrap(), SqlResult { query: "TRUE".to_string(), params: vec![] });
        assert!(filter.limit_clause().is_empty());
    }
}
