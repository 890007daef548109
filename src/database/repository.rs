use sqlx::{self, postgres::PgRow, FromRow, PgPool};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::scoped_query::ScopedQuery;
use crate::filter::FilterData;
use crate::scope::{EntityScope, TenantQueryScope};

/// Typed access to one tenant-scoped table under a request's scope
pub struct TenantRepository<T> {
    entity: &'static EntityScope,
    pool: PgPool,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> TenantRepository<T>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    pub fn new(entity: &'static EntityScope, pool: PgPool) -> Self {
        Self { entity, pool, _phantom: std::marker::PhantomData }
    }

    pub async fn select_any(&self, scope: &TenantQueryScope, filter_data: FilterData) -> Result<Vec<T>, DatabaseError> {
        ScopedQuery::<T>::new(self.entity, scope)
            .filter(filter_data)?
            .select_all(&self.pool)
            .await
    }

    /// Same error whether the row is absent or belongs to another tenant
    pub async fn select_404(&self, scope: &TenantQueryScope, id: Uuid) -> Result<T, DatabaseError> {
        ScopedQuery::<T>::new(self.entity, scope)
            .find_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("{} not found", self.entity.name)))
    }

    pub async fn count(&self, scope: &TenantQueryScope, filter_data: FilterData) -> Result<i64, DatabaseError> {
        ScopedQuery::<T>::new(self.entity, scope)
            .filter(filter_data)?
            .count(&self.pool)
            .await
    }
}
