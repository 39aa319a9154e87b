//! PostgreSQL `SELECT` builder
//!
//! [`SelectBuilder`] collects the table, conditions, ordering and limit of a
//! statement and renders them through [`sqlx::QueryBuilder`], which numbers
//! the `$n` placeholders and carries the bound values. [`SelectBuilder::on`]
//! binds it to a pool so it can be executed.
//!
//! # Example
//!
//! ```rust
//! use relay_cursor::query::{FilterCondition, OrderDirection, QueryBuilder, SelectBuilder};
//!
//! let query = SelectBuilder::new("posts")
//!     .columns(["id", "title"])
//!     .filter(FilterCondition::eq("status", "published"))
//!     .filter(FilterCondition::gt("id", 10_i64))
//!     .order_by("id", OrderDirection::Ascending)
//!     .limit(6);
//!
//! assert_eq!(
//!     query.to_sql(),
//!     "SELECT id, title FROM posts WHERE status = $1 AND id > $2 ORDER BY id ASC LIMIT 6"
//! );
//! ```

use sqlx::postgres::{PgPool, PgRow};
use sqlx::{FromRow, Postgres};

use super::filter::{FilterCondition, FilterOperator, FilterValue, OrderDirection};
use super::{FetchRows, QueryBuilder};
use crate::error::{Error, Result};

/// Check that `name` can be spliced into SQL as a column or table name
///
/// Accepts `column` and `table.column` forms.
///
/// # Errors
///
/// [`Error::InvalidColumn`] when the name could carry anything but an
/// identifier.
pub fn validate_column(name: &str) -> Result<()> {
    paginator_sqlx::validate_field_name(name)
        .map(|_| ())
        .map_err(|e| Error::invalid_column(name, e.to_string()))
}

/// Composable `SELECT` statement
#[derive(Debug, Clone, PartialEq)]
pub struct SelectBuilder {
    table: String,
    columns: Vec<String>,
    conditions: Vec<FilterCondition>,
    order: Vec<(String, OrderDirection)>,
    limit: Option<u64>,
}

impl SelectBuilder {
    /// Select every column from `table`
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            conditions: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    /// Restrict the selected columns
    #[must_use]
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Render the statement into an sqlx query builder with every value bound
    pub fn to_query_builder(&self) -> sqlx::QueryBuilder<'static, Postgres> {
        let mut query = sqlx::QueryBuilder::<Postgres>::new("SELECT ");

        if self.columns.is_empty() {
            query.push("*");
        } else {
            let mut columns = query.separated(", ");
            for column in &self.columns {
                columns.push(column);
            }
        }
        query.push(" FROM ").push(&self.table);

        for (i, condition) in self.conditions.iter().enumerate() {
            query.push(if i == 0 { " WHERE " } else { " AND " });
            push_condition(&mut query, condition);
        }

        if !self.order.is_empty() {
            query.push(" ORDER BY ");
            let mut clauses = query.separated(", ");
            for (column, direction) in &self.order {
                clauses.push(format_args!("{} {}", column, direction.as_sql()));
            }
        }

        if let Some(limit) = self.limit {
            query.push(" LIMIT ").push(limit);
        }

        query
    }

    /// The rendered SQL text
    pub fn to_sql(&self) -> String {
        self.to_query_builder().into_sql()
    }

    /// Bind this statement to a pool for execution
    pub fn on(self, pool: &PgPool) -> PgSelect<'_> {
        PgSelect {
            builder: self,
            pool,
        }
    }
}

impl QueryBuilder for SelectBuilder {
    fn filter(mut self, condition: FilterCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    fn order_by(mut self, column: &str, direction: OrderDirection) -> Self {
        self.order.push((column.to_string(), direction));
        self
    }
}

fn push_value(query: &mut sqlx::QueryBuilder<'static, Postgres>, value: &FilterValue) {
    match value {
        FilterValue::String(s) => query.push_bind(s.clone()),
        FilterValue::Integer(n) => query.push_bind(*n),
        FilterValue::Float(f) => query.push_bind(*f),
        FilterValue::Boolean(b) => query.push_bind(*b),
        FilterValue::StringList(list) => query.push_bind(list.clone()),
        FilterValue::IntegerList(list) => query.push_bind(list.clone()),
        FilterValue::Null => query.push_bind(None::<i64>),
    };
}

fn push_condition(query: &mut sqlx::QueryBuilder<'static, Postgres>, condition: &FilterCondition) {
    let field = condition.field.as_str();

    match (condition.operator, &condition.value) {
        (FilterOperator::IsNull | FilterOperator::IsNotNull, _) => {
            query.push(field).push(" ").push(condition.operator);
        }
        (FilterOperator::In, FilterValue::IntegerList(list)) if list.is_empty() => {
            query.push("FALSE");
        }
        (FilterOperator::In, FilterValue::StringList(list)) if list.is_empty() => {
            query.push("FALSE");
        }
        (FilterOperator::In, FilterValue::IntegerList(list)) => {
            query.push(field).push(" IN (");
            let mut items = query.separated(", ");
            for n in list {
                items.push_bind(*n);
            }
            items.push_unseparated(")");
        }
        (FilterOperator::In, FilterValue::StringList(list)) => {
            query.push(field).push(" IN (");
            let mut items = query.separated(", ");
            for s in list {
                items.push_bind(s.clone());
            }
            items.push_unseparated(")");
        }
        (FilterOperator::In, scalar) => {
            query.push(field).push(" IN (");
            push_value(query, scalar);
            query.push(")");
        }
        (op, value) => {
            query.push(field).push(" ").push(op).push(" ");
            push_value(query, value);
        }
    }
}

/// A [`SelectBuilder`] bound to a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgSelect<'p> {
    builder: SelectBuilder,
    pool: &'p PgPool,
}

impl QueryBuilder for PgSelect<'_> {
    fn filter(mut self, condition: FilterCondition) -> Self {
        self.builder = self.builder.filter(condition);
        self
    }

    fn limit(mut self, limit: u64) -> Self {
        self.builder = self.builder.limit(limit);
        self
    }

    fn order_by(mut self, column: &str, direction: OrderDirection) -> Self {
        self.builder = self.builder.order_by(column, direction);
        self
    }
}

impl<T> FetchRows<T> for PgSelect<'_>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    type Error = Error;

    async fn fetch_rows(self) -> Result<Vec<T>> {
        let mut query = self.builder.to_query_builder();
        tracing::trace!(sql = %query.sql(), "Executing paginated query");

        Ok(query.build_query_as::<T>().fetch_all(self.pool).await?)
    }
}
