use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{self, FromRow, PgPool, Row};
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::filter::{Filter, FilterData, SqlResult};
use crate::scope::{CrossTenantScope, EntityScope, Predicate, TenantQueryScope};

/// Select over one tenant-scoped table with the scope predicate always applied
/// underneath the client filter.
pub struct ScopedQuery<T> {
    entity: &'static EntityScope,
    scope: Predicate,
    filter: Filter,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> ScopedQuery<T> {
    pub fn new(entity: &'static EntityScope, scope: &TenantQueryScope) -> Self {
        Self::with_predicate(entity, scope.predicate())
    }

    pub fn cross_tenant(entity: &'static EntityScope, scope: &CrossTenantScope) -> Self {
        Self::with_predicate(entity, scope.predicate())
    }

    fn with_predicate(entity: &'static EntityScope, scope: Predicate) -> Self {
        Self { entity, scope, filter: Filter::new(), _phantom: std::marker::PhantomData }
    }

    pub fn filter(mut self, filter_data: FilterData) -> Result<Self, DatabaseError> {
        self.filter = Filter::from_data(filter_data).map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        Ok(self)
    }

    /// `(scope) AND (filter)` with scope parameters numbered first
    fn condition(&self, id: Option<Uuid>) -> Result<SqlResult, DatabaseError> {
        let mut params = vec![];
        let scope_sql = self.scope.to_sql(self.entity, &mut params);

        let filter_sql = self
            .filter
            .where_sql(params.len())
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        params.extend(filter_sql.params);

        let mut query = format!("({}) AND ({})", scope_sql, filter_sql.query);
        if let Some(id) = id {
            params.push(Value::String(id.to_string()));
            query.push_str(&format!(
                " AND {}.{} = ${}::uuid",
                DatabaseManager::quote_identifier(self.entity.table),
                DatabaseManager::quote_identifier(self.entity.id_column),
                params.len()
            ));
        }
        Ok(SqlResult { query, params })
    }

    fn select_sql(&self, id: Option<Uuid>) -> Result<SqlResult, DatabaseError> {
        let condition = self.condition(id)?;
        let query = [
            format!("SELECT {}", self.filter.select_clause()),
            format!("FROM {}", DatabaseManager::quote_identifier(self.entity.table)),
            format!("WHERE {}", condition.query),
            self.filter.order_clause(),
            self.filter.limit_clause(),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
        Ok(SqlResult { query, params: condition.params })
    }

    pub fn to_sql(&self) -> Result<SqlResult, DatabaseError> {
        self.select_sql(None)
    }

    pub fn to_count_sql(&self) -> Result<SqlResult, DatabaseError> {
        let condition = self.condition(None)?;
        Ok(SqlResult {
            query: format!(
                "SELECT COUNT(*) as count FROM {} WHERE {}",
                DatabaseManager::quote_identifier(self.entity.table),
                condition.query
            ),
            params: condition.params,
        })
    }
}

impl<T> ScopedQuery<T>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    pub async fn select_all(self, pool: &PgPool) -> Result<Vec<T>, DatabaseError> {
        let sql_result = self.to_sql()?;
        let mut q = sqlx::query_as::<_, T>(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query_as(q, p);
        }
        Ok(q.fetch_all(pool).await?)
    }

    /// Absent and out-of-scope rows are indistinguishable: both are `None`
    pub async fn find_by_id(self, pool: &PgPool, id: Uuid) -> Result<Option<T>, DatabaseError> {
        let sql_result = self.select_sql(Some(id))?;
        let mut q = sqlx::query_as::<_, T>(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query_as(q, p);
        }
        Ok(q.fetch_optional(pool).await?)
    }

    pub async fn count(self, pool: &PgPool) -> Result<i64, DatabaseError> {
        let sql_result = self.to_count_sql()?;
        let mut q = sqlx::query(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query(q, p);
        }
        let row = q.fetch_one(pool).await?;
        let count: i64 = row.try_get("count")?;
        Ok(count)
    }
}

fn bind_param_query<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s.as_str()),
        Value::Array(_) | Value::Object(_) => q.bind(v.clone()),
    }
}

fn bind_param_query_as<'q, O>(
    q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>,
    v: &'q Value,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, PgRow>,
{
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s.as_str()),
        Value::Array(_) | Value::Object(_) => q.bind(v.clone()),
    }
}
