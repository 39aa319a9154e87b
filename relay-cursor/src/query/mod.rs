//! Query-layer abstraction the pagination scope is applied to
//!
//! The scope never talks to a store directly. It composes a query through
//! [`QueryBuilder`] and the caller executes it through [`FetchRows`].
//!
//! - [`SelectBuilder`]: PostgreSQL statement builder, executed through sqlx
//! - [`MemoryTable`]: in-process rows, for tests and small fixed data sets

mod filter;
mod memory;
mod sql;

use std::future::Future;

pub use filter::{FilterCondition, FilterOperator, FilterValue, OrderDirection};
pub use memory::{Columns, MemoryQuery, MemoryTable};
pub use sql::{validate_column, PgSelect, SelectBuilder};

use crate::error::Error;

/// Compositional query construction
///
/// Each call consumes the builder and returns the extended one, so scopes
/// can be applied to builders by value.
pub trait QueryBuilder: Sized {
    /// Add a `column <op> value` condition, ANDed with existing ones
    fn filter(self, condition: FilterCondition) -> Self;

    /// Cap the number of returned rows
    fn limit(self, limit: u64) -> Self;

    /// Append an ordering clause
    fn order_by(self, column: &str, direction: OrderDirection) -> Self;
}

/// Execution of a built query into records of type `T`
///
/// `Error` is the executor's own error type. Scope errors are converted into
/// it so that [`paginate`](crate::paginate) can return execution failures
/// unchanged.
pub trait FetchRows<T>: QueryBuilder {
    /// Error produced by the underlying store
    type Error: From<Error>;

    /// Run the query and map every row into `T`
    fn fetch_rows(self) -> impl Future<Output = Result<Vec<T>, Self::Error>> + Send;
}
