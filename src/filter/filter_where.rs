use serde_json::Value;

use super::error::FilterError;
use super::types::{FilterOp, FilterWhereInfo};
use super::validate_column;

/// Renders a JSON where-object into a parameterised SQL condition.
///
/// Placeholders continue from `starting_param_index`, so the condition can be
/// appended after other already-numbered fragments such as the tenant scope.
pub struct FilterWhere {
    param_values: Vec<Value>,
    param_index: usize,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self { param_values: vec![], param_index: starting_param_index }
    }

    pub fn generate(where_data: &Value, starting_param_index: usize) -> Result<(String, Vec<Value>), FilterError> {
        let mut filter_where = Self::new(starting_param_index);
        let sql = filter_where.build(where_data)?;
        Ok((sql, filter_where.param_values))
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null | Value::Object(_) => Ok(()),
            Value::String(_) => Err(FilterError::RawSql),
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    fn build(&mut self, where_data: &Value) -> Result<String, FilterError> {
        let obj = match where_data {
            Value::Null => return Ok("TRUE".to_string()),
            Value::Object(obj) => obj,
            _ => return Err(FilterError::InvalidWhereClause("Unsupported WHERE format".to_string())),
        };

        let mut sql_conditions = vec![];
        for (key, value) in obj {
            if key.starts_with('$') {
                sql_conditions.push(self.build_logical(key, value)?);
            } else {
                validate_column(key)?;
                for condition in Self::parse_field_condition(key, value)? {
                    sql_conditions.push(self.build_sql_condition(&condition)?);
                }
            }
        }

        Ok(if sql_conditions.is_empty() { "TRUE".to_string() } else { sql_conditions.join(" AND ") })
    }

    fn build_logical(&mut self, op: &str, value: &Value) -> Result<String, FilterError> {
        match op {
            "$and" | "$or" => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))?;
                if arr.is_empty() {
                    return Ok(if op == "$and" { "TRUE" } else { "FALSE" }.to_string());
                }
                let mut parts = Vec::with_capacity(arr.len());
                for v in arr {
                    parts.push(format!("({})", self.build(v)?));
                }
                let joiner = if op == "$and" { " AND " } else { " OR " };
                Ok(format!("({})", parts.join(joiner)))
            }
            "$not" => Ok(format!("NOT ({})", self.build(value)?)),
            _ => Err(FilterError::UnsupportedOperator(op.to_string())),
        }
    }

    fn parse_field_condition(field: &str, value: &Value) -> Result<Vec<FilterWhereInfo>, FilterError> {
        match value {
            Value::Object(obj) => obj
                .iter()
                .map(|(op_key, op_val)| {
                    let operator = FilterOp::parse(op_key).ok_or_else(|| FilterError::UnsupportedOperator(op_key.clone()))?;
                    Ok(FilterWhereInfo { column: field.to_string(), operator, data: op_val.clone() })
                })
                .collect(),
            // Implicit equality: { field: value }
            _ => Ok(vec![FilterWhereInfo { column: field.to_string(), operator: FilterOp::Eq, data: value.clone() }]),
        }
    }

    fn build_sql_condition(&mut self, condition: &FilterWhereInfo) -> Result<String, FilterError> {
        let quoted_column = format!("\"{}\"", condition.column);
        let data = &condition.data;
        Ok(match condition.operator {
            FilterOp::Eq if data.is_null() => format!("{} IS NULL", quoted_column),
            FilterOp::Eq => format!("{} = {}", quoted_column, self.param(data)?),
            FilterOp::Ne if data.is_null() => format!("{} IS NOT NULL", quoted_column),
            FilterOp::Ne => format!("{} <> {}", quoted_column, self.param(data)?),
            FilterOp::Gt => format!("{} > {}", quoted_column, self.param(data)?),
            FilterOp::Gte => format!("{} >= {}", quoted_column, self.param(data)?),
            FilterOp::Lt => format!("{} < {}", quoted_column, self.param(data)?),
            FilterOp::Lte => format!("{} <= {}", quoted_column, self.param(data)?),
            FilterOp::Like => format!("{} LIKE {}", quoted_column, self.param(data)?),
            FilterOp::ILike => format!("{} ILIKE {}", quoted_column, self.param(data)?),
            FilterOp::In | FilterOp::NIn => {
                let values = match data {
                    Value::Array(values) => values.as_slice(),
                    other => std::slice::from_ref(other),
                };
                let negate = condition.operator == FilterOp::NIn;
                if values.is_empty() {
                    return Ok(if negate { "TRUE" } else { "FALSE" }.to_string());
                }
                let params = values.iter().map(|v| self.param(v)).collect::<Result<Vec<_>, _>>()?;
                let keyword = if negate { "NOT IN" } else { "IN" };
                format!("{} {} ({})", quoted_column, keyword, params.join(", "))
            }
            FilterOp::Between => match data {
                Value::Array(values) if values.len() == 2 => {
                    let low = self.param(&values[0])?;
                    let high = self.param(&values[1])?;
                    format!("{} BETWEEN {} AND {}", quoted_column, low, high)
                }
                _ => return Err(FilterError::InvalidOperatorData("$between requires exactly 2 values".to_string())),
            },
            FilterOp::Null => match data {
                Value::Bool(true) => format!("{} IS NULL", quoted_column),
                Value::Bool(false) => format!("{} IS NOT NULL", quoted_column),
                _ => return Err(FilterError::InvalidOperatorData("$null requires a boolean".to_string())),
            },
        })
    }

    fn param(&mut self, value: &Value) -> Result<String, FilterError> {
        if matches!(value, Value::Array(_) | Value::Object(_)) {
            return Err(FilterError::InvalidOperatorData(format!("Unsupported parameter value: {}", value)));
        }
        self.param_values.push(value.clone());
        self.param_index += 1;
        Ok(format!("${}", self.param_index))
    }
}
