pub mod types;
pub mod filter;
pub mod filter_where;
pub mod filter_order;
pub mod error;

pub use types::*;
pub use error::FilterError;
pub use filter::Filter;

use crate::database::manager::DatabaseManager;

pub(crate) fn validate_column(column: &str) -> Result<(), FilterError> {
    if DatabaseManager::is_valid_identifier(column) {
        Ok(())
    } else {
        Err(FilterError::InvalidColumn(column.to_string()))
    }
}
