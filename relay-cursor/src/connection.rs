//! Relay connection assembly
//!
//! Turns the over-fetched rows of a scoped query into a [`Connection`]. The
//! sentinel row a scope requests beyond its limit is dropped from the edges and
//! only used to fill in page info.

use serde::{Deserialize, Serialize};

use crate::cursor::{ConnectionCursor, CursorRecord};
use crate::query::FetchRows;
use crate::scope::{apply_scope, Limit, Scope};

/// A record paired with its cursor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge<T> {
    /// Cursor pointing at `node`
    pub cursor: ConnectionCursor,
    /// The record
    pub node: T,
}

impl<T: CursorRecord> Edge<T> {
    /// Wrap a record, deriving its cursor
    pub fn new(node: T) -> Self {
        Self {
            cursor: node.cursor(),
            node,
        }
    }
}

/// Page metadata of a connection
///
/// Empty cursors mean "none"; the page flags are derived from them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Cursor of the row just past the start of a backward page
    pub start_cursor: ConnectionCursor,
    /// Cursor of the row just past the end of a forward page
    pub end_cursor: ConnectionCursor,
    /// Whether rows exist before this page
    pub has_previous_page: bool,
    /// Whether rows exist after this page
    pub has_next_page: bool,
}

/// A page of records in Relay connection shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    /// The page, in fetch order
    pub edges: Vec<Edge<T>>,
    /// Page metadata
    pub page_info: PageInfo,
}

impl<T> Default for Connection<T> {
    fn default() -> Self {
        Self {
            edges: Vec::new(),
            page_info: PageInfo::default(),
        }
    }
}

/// Assemble fetched rows into a connection
///
/// `records` must be the rows returned by a query built with
/// [`apply_scope`] for the same `scope`, in the order they were fetched.
///
/// An unlimited scope returns every row with empty page info. Otherwise the
/// rows are first capped at `scope.default_limit`; when the row count is one
/// more than `first` (or `last`), the extra row is dropped and its cursor
/// becomes the end (or start) cursor. Backward pages keep their descending
/// fetch order.
pub fn build_connection<T: CursorRecord>(records: Vec<T>, scope: &Scope) -> Connection<T> {
    if scope.limit == Limit::Unlimited {
        let edges: Vec<Edge<T>> = records.into_iter().map(Edge::new).collect();
        tracing::debug!(edges = edges.len(), "Assembled unlimited connection");
        return Connection {
            edges,
            page_info: PageInfo::default(),
        };
    }

    let fetched = records.len();
    let mut start_cursor = ConnectionCursor::default();
    let mut end_cursor = ConnectionCursor::default();

    // The default limit caps the page even when first/last ask for more.
    let bound = usize::try_from(scope.default_limit).unwrap_or(usize::MAX);
    let mut end = bound.min(fetched);

    if let Some(sentinel) = sentinel_index(scope.args.first, fetched) {
        end = end.saturating_sub(1);
        end_cursor = records[sentinel].cursor();
    }

    if let Some(sentinel) = sentinel_index(scope.args.last, fetched) {
        end = sentinel;
        start_cursor = records[sentinel].cursor();
    }

    let edges: Vec<Edge<T>> = records.into_iter().take(end).map(Edge::new).collect();
    let page_info = PageInfo {
        has_previous_page: !start_cursor.is_empty(),
        has_next_page: !end_cursor.is_empty(),
        start_cursor,
        end_cursor,
    };

    tracing::debug!(
        fetched,
        edges = edges.len(),
        has_previous_page = page_info.has_previous_page,
        has_next_page = page_info.has_next_page,
        "Assembled connection"
    );

    Connection { edges, page_info }
}

/// Index of the sentinel row when exactly `count + 1` rows were fetched
fn sentinel_index(count: Option<u64>, fetched: usize) -> Option<usize> {
    let count = usize::try_from(count?).ok()?;
    (count.checked_add(1)? == fetched).then_some(count)
}

/// Apply a scope, execute the query and assemble the connection
///
/// Scope errors are converted into the executor's error type before anything
/// runs. Execution errors are returned unchanged.
///
/// # Example
///
/// ```rust
/// use relay_cursor::query::{Columns, FilterValue, MemoryTable};
/// use relay_cursor::{paginate, ConnectionArguments, CursorKey, CursorRecord, Scope};
///
/// #[derive(Clone)]
/// struct Row(i64);
///
/// impl CursorRecord for Row {
///     fn cursor_key(&self) -> CursorKey {
///         self.0
///     }
/// }
///
/// impl Columns for Row {
///     fn column(&self, name: &str) -> Option<FilterValue> {
///         (name == "id").then(|| FilterValue::Integer(self.0))
///     }
/// }
///
/// # tokio_test_block(async {
/// let table: MemoryTable<Row> = (1..=20).map(Row).collect();
/// let scope = Scope::new(ConnectionArguments::default().with_first(5));
///
/// let page = paginate(table.select(), &scope).await.unwrap();
/// assert_eq!(page.edges.len(), 5);
/// assert!(page.page_info.has_next_page);
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
pub async fn paginate<B, T>(builder: B, scope: &Scope) -> Result<Connection<T>, B::Error>
where
    B: FetchRows<T>,
    T: CursorRecord,
{
    let query = apply_scope(builder, scope)?;
    let records = query.fetch_rows().await?;
    Ok(build_connection(records, scope))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PaginationConfig;
    use crate::cursor::{encode_cursor, CursorKey};
    use crate::error::Error;
    use crate::query::{Columns, FilterCondition, FilterValue, MemoryTable};
    use crate::scope::ConnectionArguments;

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    struct GraphqlRecord {
        id: i64,
    }

    impl CursorRecord for GraphqlRecord {
        fn cursor_key(&self) -> CursorKey {
            self.id
        }
    }

    impl Columns for GraphqlRecord {
        fn column(&self, name: &str) -> Option<FilterValue> {
            match name {
                "id" => Some(FilterValue::Integer(self.id)),
                "parity" => Some(FilterValue::from(if self.id % 2 == 0 { "even" } else { "odd" })),
                _ => None,
            }
        }
    }

    fn records(ids: impl IntoIterator<Item = i64>) -> Vec<GraphqlRecord> {
        ids.into_iter().map(|id| GraphqlRecord { id }).collect()
    }

    fn fixtures() -> MemoryTable<GraphqlRecord> {
        records(1..=20).into_iter().collect()
    }

    fn fetch(args: ConnectionArguments) -> Result<Vec<GraphqlRecord>, Error> {
        let table = fixtures();
        let query = apply_scope(table.select(), &Scope::new(args))?;
        Ok(query.collect())
    }

    fn ids(connection: &Connection<GraphqlRecord>) -> Vec<i64> {
        connection.edges.iter().map(|edge| edge.node.id).collect()
    }

    #[test]
    fn test_records_after_first() {
        let args = ConnectionArguments::default()
            .with_after(encode_cursor(3))
            .with_first(3);
        assert_eq!(fetch(args).unwrap(), records([4, 5, 6, 7]));
    }

    #[test]
    fn test_records_after() {
        let args = ConnectionArguments::default().with_after(encode_cursor(15));
        assert_eq!(fetch(args).unwrap(), records(16..=20));
    }

    #[test]
    fn test_records_first() {
        let args = ConnectionArguments::default().with_first(5);
        assert_eq!(fetch(args).unwrap(), records(1..=6));
    }

    #[test]
    fn test_records_before_last() {
        let args = ConnectionArguments::default()
            .with_before(encode_cursor(20))
            .with_last(3);
        assert_eq!(fetch(args).unwrap(), records([19, 18, 17, 16]));
    }

    #[test]
    fn test_records_before() {
        let args = ConnectionArguments::default().with_before(encode_cursor(5));
        assert_eq!(fetch(args).unwrap(), records([4, 3, 2, 1]));
    }

    #[test]
    fn test_records_last() {
        let args = ConnectionArguments::default().with_last(5);
        assert_eq!(fetch(args).unwrap(), records([20, 19, 18, 17, 16, 15]));
    }

    #[test]
    fn test_first_page_drops_sentinel() {
        let scope = Scope::new(ConnectionArguments::default().with_first(5));
        let connection = build_connection(records(1..=6), &scope);

        assert_eq!(ids(&connection), vec![1, 2, 3, 4, 5]);
        assert_eq!(connection.page_info.end_cursor, encode_cursor(6));
        assert!(connection.page_info.has_next_page);
        assert!(!connection.page_info.has_previous_page);
        assert!(connection.page_info.start_cursor.is_empty());
    }

    #[test]
    fn test_short_first_page_has_no_next() {
        let scope = Scope::new(ConnectionArguments::default().with_first(5));
        let connection = build_connection(records(1..=3), &scope);

        assert_eq!(ids(&connection), vec![1, 2, 3]);
        assert!(!connection.page_info.has_next_page);
        assert!(connection.page_info.end_cursor.is_empty());
    }

    #[test]
    fn test_last_page_drops_sentinel_in_fetch_order() {
        let scope = Scope::new(
            ConnectionArguments::default()
                .with_before(encode_cursor(20))
                .with_last(3),
        );
        let connection = build_connection(records([19, 18, 17, 16]), &scope);

        assert_eq!(ids(&connection), vec![19, 18, 17]);
        assert_eq!(connection.page_info.start_cursor, encode_cursor(16));
        assert!(connection.page_info.has_previous_page);
        assert!(!connection.page_info.has_next_page);
    }

    #[test]
    fn test_edges_carry_record_cursors() {
        let scope = Scope::new(ConnectionArguments::default().with_first(2));
        let connection = build_connection(records([7, 8]), &scope);
        let cursors: Vec<_> = connection.edges.iter().map(|e| e.cursor.clone()).collect();
        assert_eq!(cursors, vec![encode_cursor(7), encode_cursor(8)]);
    }

    #[test]
    fn test_empty_input_yields_empty_connection() {
        let scope = Scope::new(ConnectionArguments::default().with_first(5));
        let connection = build_connection(Vec::<GraphqlRecord>::new(), &scope);
        assert_eq!(connection, Connection::default());
    }

    #[test]
    fn test_zero_first_with_one_row() {
        let scope = Scope::new(ConnectionArguments::default().with_first(0));
        let connection = build_connection(records([1]), &scope);
        assert!(connection.edges.is_empty());
        assert!(connection.page_info.has_next_page);
        assert_eq!(connection.page_info.end_cursor, encode_cursor(1));
    }

    #[test]
    fn test_unlimited_returns_everything() {
        let scope = Scope::new(ConnectionArguments::default().with_first(2)).unlimited();
        let connection = build_connection(records(1..=60), &scope);

        assert_eq!(connection.edges.len(), 60);
        assert_eq!(connection.page_info, PageInfo::default());
        assert!(!connection.page_info.has_next_page);
        assert!(!connection.page_info.has_previous_page);
    }

    #[test]
    fn test_default_limit_caps_edges() {
        let config = PaginationConfig {
            default_limit: 3,
            ..PaginationConfig::default()
        };
        let scope = Scope::with_config(ConnectionArguments::default(), &config);
        let connection = build_connection(records(1..=4), &scope);
        assert_eq!(ids(&connection), vec![1, 2, 3]);
        assert!(!connection.page_info.has_next_page);
    }

    #[test]
    fn test_first_above_default_limit_is_double_bounded() {
        let config = PaginationConfig {
            default_limit: 3,
            ..PaginationConfig::default()
        };
        let scope = Scope::with_config(ConnectionArguments::default().with_first(5), &config);
        let connection = build_connection(records(1..=6), &scope);

        assert_eq!(ids(&connection), vec![1, 2]);
        assert_eq!(connection.page_info.end_cursor, encode_cursor(6));
    }

    #[test]
    fn test_connection_json_shape() {
        let scope = Scope::new(ConnectionArguments::default().with_first(1));
        let connection = build_connection(records([1, 2]), &scope);
        let json = serde_json::to_value(&connection).unwrap();

        assert_eq!(json["edges"][0]["node"]["id"], 1);
        assert_eq!(json["edges"][0]["cursor"], encode_cursor(1).as_str());
        assert_eq!(json["pageInfo"]["hasNextPage"], true);
        assert_eq!(json["pageInfo"]["hasPreviousPage"], false);
        assert_eq!(json["pageInfo"]["endCursor"], encode_cursor(2).as_str());
        assert_eq!(json["pageInfo"]["startCursor"], "");
    }

    #[tokio::test]
    async fn test_paginate_forward_then_next_page() {
        let table = fixtures();

        let scope = Scope::new(ConnectionArguments::default().with_first(5));
        let page = paginate(table.select(), &scope).await.unwrap();
        assert_eq!(ids(&page), vec![1, 2, 3, 4, 5]);
        assert!(page.page_info.has_next_page);

        let last_edge = page.edges.last().unwrap().cursor.clone();
        let scope = Scope::new(
            ConnectionArguments::default()
                .with_after(last_edge)
                .with_first(5),
        );
        let page = paginate(table.select(), &scope).await.unwrap();
        assert_eq!(ids(&page), vec![6, 7, 8, 9, 10]);
    }

    #[tokio::test]
    async fn test_paginate_final_page() {
        let table = fixtures();
        let scope = Scope::new(
            ConnectionArguments::default()
                .with_after(encode_cursor(17))
                .with_first(5),
        );
        let page = paginate(table.select(), &scope).await.unwrap();
        assert_eq!(ids(&page), vec![18, 19, 20]);
        assert!(!page.page_info.has_next_page);
    }

    #[tokio::test]
    async fn test_paginate_last_page() {
        let table = fixtures();
        let scope = Scope::new(ConnectionArguments::default().with_last(5));
        let page = paginate(table.select(), &scope).await.unwrap();
        assert_eq!(ids(&page), vec![20, 19, 18, 17, 16]);
        assert_eq!(page.page_info.start_cursor, encode_cursor(15));
        assert!(page.page_info.has_previous_page);
    }

    #[tokio::test]
    async fn test_paginate_with_filters() {
        let table = fixtures();
        let scope = Scope::new(ConnectionArguments::default().with_first(3))
            .filter(FilterCondition::eq("parity", "even"));
        let page = paginate(table.select(), &scope).await.unwrap();
        assert_eq!(ids(&page), vec![2, 4, 6]);
        assert_eq!(page.page_info.end_cursor, encode_cursor(8));
    }

    #[tokio::test]
    async fn test_paginate_rejects_before_query_runs() {
        let table = fixtures();
        let scope = Scope::new(ConnectionArguments::default().with_first(1).with_last(1));
        let err = paginate(table.select(), &scope).await.unwrap_err();
        assert!(matches!(err, Error::ConflictingLimits));

        let scope = Scope::new(ConnectionArguments::default().with_after("garbage"));
        let err = paginate(table.select(), &scope).await.unwrap_err();
        assert!(matches!(err, Error::MalformedCursor { .. }));
    }

    #[derive(Debug, PartialEq)]
    enum StoreError {
        Scope(String),
        Unavailable,
    }

    impl From<Error> for StoreError {
        fn from(err: Error) -> Self {
            StoreError::Scope(err.to_string())
        }
    }

    struct FailingQuery;

    impl crate::query::QueryBuilder for FailingQuery {
        fn filter(self, _condition: FilterCondition) -> Self {
            self
        }

        fn limit(self, _limit: u64) -> Self {
            self
        }

        fn order_by(self, _column: &str, _direction: crate::query::OrderDirection) -> Self {
            self
        }
    }

    impl FetchRows<GraphqlRecord> for FailingQuery {
        type Error = StoreError;

        async fn fetch_rows(self) -> Result<Vec<GraphqlRecord>, StoreError> {
            Err(StoreError::Unavailable)
        }
    }

    #[tokio::test]
    async fn test_paginate_passes_execution_errors_through() {
        let scope = Scope::new(ConnectionArguments::default().with_first(2));
        let err = paginate::<_, GraphqlRecord>(FailingQuery, &scope)
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::Unavailable);

        let scope = Scope::new(ConnectionArguments::default().with_before("a").with_after("b"));
        let err = paginate::<_, GraphqlRecord>(FailingQuery, &scope)
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::Scope(Error::ConflictingBounds.to_string()));
    }
}
