//! Pagination scope: normalized paging intent and its translation into a query
//!
//! A [`Scope`] is built once per request from raw Relay arguments. Applying it
//! to a [`QueryBuilder`] validates the arguments and produces a bounded,
//! ordered keyset query that over-fetches by one row so the assembler can tell
//! whether another page exists.
//!
//! # Example
//!
//! ```rust
//! use relay_cursor::{apply_scope, encode_cursor, ConnectionArguments, Scope};
//! use relay_cursor::query::SelectBuilder;
//!
//! let args = ConnectionArguments::default()
//!     .with_after(encode_cursor(3))
//!     .with_first(3);
//! let scope = Scope::new(args);
//!
//! let query = apply_scope(SelectBuilder::new("graphql_records"), &scope).unwrap();
//! assert_eq!(
//!     query.to_sql(),
//!     "SELECT * FROM graphql_records WHERE id > $1 ORDER BY id ASC LIMIT 4"
//! );
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::config::PaginationConfig;
use crate::cursor::{decode_cursor, ConnectionCursor, CursorKey};
use crate::error::{Error, Result};
use crate::query::{validate_column, FilterCondition, FilterValue, OrderDirection, QueryBuilder};

/// Column name for ordering by creation time
pub const ORDER_ON_CREATED_AT: &str = "created_at";

/// Keys of an argument map that drive pagination rather than filtering
const CONNECTION_ARGUMENT_KEYS: [&str; 4] = ["first", "last", "before", "after"];

/// Raw Relay connection arguments
///
/// An absent count is `None` and an absent cursor is `None` or empty.
/// Counts that are negative or not integers (Relay's `-1` "unset") read as
/// `None` whether they come through serde or [`ConnectionArguments::from_args`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionArguments {
    /// Take the first N records after `after`
    #[serde(deserialize_with = "deserialize_count")]
    pub first: Option<u64>,
    /// Take the last N records before `before`
    #[serde(deserialize_with = "deserialize_count")]
    pub last: Option<u64>,
    /// Upper exclusive bound
    pub before: Option<ConnectionCursor>,
    /// Lower exclusive bound
    pub after: Option<ConnectionCursor>,
}

fn deserialize_count<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Value::as_u64))
}

impl ConnectionArguments {
    /// Read arguments out of a GraphQL-style argument map
    ///
    /// Counts that are not non-negative integers and cursors that are not
    /// strings are treated as absent, matching how Relay servers read them.
    pub fn from_args(args: &Map<String, Value>) -> Self {
        let count = |key: &str| args.get(key).and_then(Value::as_u64);
        let cursor = |key: &str| {
            args.get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(ConnectionCursor::from)
        };

        Self {
            first: count("first"),
            last: count("last"),
            before: cursor("before"),
            after: cursor("after"),
        }
    }

    /// Set `first`
    #[must_use]
    pub fn with_first(mut self, first: u64) -> Self {
        self.first = Some(first);
        self
    }

    /// Set `last`
    #[must_use]
    pub fn with_last(mut self, last: u64) -> Self {
        self.last = Some(last);
        self
    }

    /// Set `before`
    #[must_use]
    pub fn with_before(mut self, before: impl Into<ConnectionCursor>) -> Self {
        self.before = Some(before.into());
        self
    }

    /// Set `after`
    #[must_use]
    pub fn with_after(mut self, after: impl Into<ConnectionCursor>) -> Self {
        self.after = Some(after.into());
        self
    }

    /// The `before` cursor, if one was supplied and is non-empty
    pub fn before(&self) -> Option<&ConnectionCursor> {
        self.before.as_ref().filter(|c| !c.is_empty())
    }

    /// The `after` cursor, if one was supplied and is non-empty
    pub fn after(&self) -> Option<&ConnectionCursor> {
        self.after.as_ref().filter(|c| !c.is_empty())
    }

    /// Whether this request pages backward
    pub fn is_backward(&self) -> bool {
        self.before().is_some() || self.last.is_some()
    }
}

/// Row limit requested by a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Limit {
    /// At most this many rows per page
    Bounded(u64),
    /// Pagination disabled, every matching row is returned
    Unlimited,
}

impl Limit {
    /// The bound, if any
    pub const fn bound(self) -> Option<u64> {
        match self {
            Self::Bounded(n) => Some(n),
            Self::Unlimited => None,
        }
    }
}

/// Normalized pagination intent for a single request
#[derive(Debug, Clone, PartialEq)]
pub struct Scope {
    /// Raw connection arguments
    pub args: ConnectionArguments,
    /// The argument map the scope was built from, if any
    pub arguments: Map<String, Value>,
    /// Extra conditions applied before the keyset bounds
    pub filters: Vec<FilterCondition>,
    /// Page size when neither `first` nor `last` is given
    pub limit: Limit,
    /// Column the result set is ordered by
    pub order_by: String,
    /// Column holding the cursor key, used for the keyset bounds
    pub key_column: String,
    /// Safety bound the assembler applies to fetched rows
    pub default_limit: u64,
}

impl Default for Scope {
    fn default() -> Self {
        Self::new(ConnectionArguments::default())
    }
}

impl Scope {
    /// Build a scope from raw arguments using the default configuration
    pub fn new(args: ConnectionArguments) -> Self {
        Self::with_config(args, &PaginationConfig::default())
    }

    /// Build a scope from raw arguments and an explicit configuration
    pub fn with_config(args: ConnectionArguments, config: &PaginationConfig) -> Self {
        Self {
            args,
            arguments: Map::new(),
            filters: Vec::new(),
            limit: Limit::Bounded(config.default_limit),
            order_by: config.key_column.clone(),
            key_column: config.key_column.clone(),
            default_limit: config.default_limit,
        }
    }

    /// Build a scope from a GraphQL-style argument map
    ///
    /// `first`, `last`, `before` and `after` become connection arguments. The
    /// whole map is kept in [`Scope::arguments`] and does not filter the
    /// query unless [`Scope::filter_on`] is called.
    pub fn with_filters(args: &Map<String, Value>, config: &PaginationConfig) -> Self {
        let mut scope = Self::with_config(ConnectionArguments::from_args(args), config);
        scope.arguments = args.clone();
        scope
    }

    /// Filter on the argument map entries named by `columns`
    ///
    /// Each listed column present in [`Scope::arguments`] becomes an equality
    /// filter (a list becomes `IN`, `null` becomes `IS NULL`). Entries with no
    /// column equivalent are skipped, as are the connection arguments.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidColumn`] when a listed column is not a plain column name.
    pub fn filter_on(mut self, columns: &[&str]) -> Result<Self> {
        for &column in columns {
            validate_column(column)?;
            if CONNECTION_ARGUMENT_KEYS.contains(&column) {
                continue;
            }
            let Some(value) = self.arguments.get(column) else {
                continue;
            };
            let condition = match FilterValue::from_json(value) {
                Some(FilterValue::Null) => FilterCondition::is_null(column),
                Some(list @ (FilterValue::IntegerList(_) | FilterValue::StringList(_))) => {
                    FilterCondition::is_in(column, list)
                }
                Some(scalar) => FilterCondition::eq(column, scalar),
                None => {
                    tracing::warn!(column, "Ignoring argument with no column equivalent");
                    continue;
                }
            };
            self.filters.push(condition);
        }
        Ok(self)
    }

    /// Order by another column
    ///
    /// The keyset bounds still compare against the key column.
    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.order_by = column.into();
        self
    }

    /// Replace the default page size
    #[must_use]
    pub fn with_limit(mut self, limit: Limit) -> Self {
        self.limit = limit;
        self
    }

    /// Disable pagination
    #[must_use]
    pub fn unlimited(self) -> Self {
        self.with_limit(Limit::Unlimited)
    }

    /// Add an extra condition
    #[must_use]
    pub fn filter(mut self, condition: FilterCondition) -> Self {
        self.filters.push(condition);
        self
    }

    /// Physical query order
    ///
    /// Backward pages (`before` or `last`) are fetched in descending order.
    pub fn direction(&self) -> OrderDirection {
        if self.args.is_backward() {
            OrderDirection::Descending
        } else {
            OrderDirection::Ascending
        }
    }

    /// Page size after `first`/`last` override the default
    pub fn effective_limit(&self) -> Limit {
        match (self.args.first, self.args.last) {
            (Some(n), _) | (None, Some(n)) => Limit::Bounded(n),
            (None, None) => self.limit,
        }
    }

    /// Rows to request from the store: the page size plus one sentinel row
    pub fn fetch_limit(&self) -> Option<u64> {
        self.effective_limit().bound().map(|n| n.saturating_add(1))
    }

    /// Check that the arguments are not mutually exclusive
    pub fn validate(&self) -> Result<()> {
        if self.args.before().is_some() && self.args.after().is_some() {
            return Err(Error::ConflictingBounds);
        }
        if self.args.first.is_some() && self.args.last.is_some() {
            return Err(Error::ConflictingLimits);
        }
        Ok(())
    }
}

fn decode_bound(cursor: &ConnectionCursor, bound: &'static str) -> Result<CursorKey> {
    decode_cursor(cursor.as_str()).inspect_err(|e| {
        tracing::warn!(bound, error = %e, "Rejecting pagination request with malformed cursor");
    })
}

/// Apply a scope to a query builder
///
/// Adds the scope's filters, the keyset bound from `after` or `before`, a
/// `limit + 1` row limit (unless unlimited) and the ordering clause.
///
/// # Errors
///
/// - [`Error::ConflictingBounds`] when both `before` and `after` are set
/// - [`Error::ConflictingLimits`] when both `first` and `last` are set
/// - [`Error::MalformedCursor`] when a cursor fails to decode
pub fn apply_scope<B: QueryBuilder>(builder: B, scope: &Scope) -> Result<B> {
    scope.validate()?;

    let mut builder = scope
        .filters
        .iter()
        .cloned()
        .fold(builder, B::filter);

    if let Some(after) = scope.args.after() {
        let key = decode_bound(after, "after")?;
        builder = builder.filter(FilterCondition::gt(scope.key_column.as_str(), key));
    }

    if let Some(before) = scope.args.before() {
        let key = decode_bound(before, "before")?;
        builder = builder.filter(FilterCondition::lt(scope.key_column.as_str(), key));
    }

    let fetch_limit = scope.fetch_limit();
    if let Some(rows) = fetch_limit {
        builder = builder.limit(rows);
    }

    tracing::debug!(
        first = ?scope.args.first,
        last = ?scope.args.last,
        after = scope.args.after().is_some(),
        before = scope.args.before().is_some(),
        fetch_limit = ?fetch_limit,
        order_by = %scope.order_by,
        direction = %scope.direction(),
        "Applied pagination scope"
    );

    Ok(apply_order(builder, scope))
}

/// Apply the scope's ordering clause
///
/// Nothing is added when the scope has no order column.
pub fn apply_order<B: QueryBuilder>(builder: B, scope: &Scope) -> B {
    if scope.order_by.is_empty() {
        return builder;
    }
    builder.order_by(&scope.order_by, scope.direction())
}
