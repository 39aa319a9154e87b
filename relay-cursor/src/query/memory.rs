//! In-process query execution over a vector of rows

use std::cmp::Ordering;
use std::future::{ready, Future};

use super::filter::{FilterCondition, FilterValue, OrderDirection};
use super::{FetchRows, QueryBuilder};
use crate::error::Error;

/// Column access for rows held in a [`MemoryTable`]
pub trait Columns {
    /// Value of `name`, or `None` when the column is unknown or NULL
    fn column(&self, name: &str) -> Option<FilterValue>;
}

/// A table of rows held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryTable<T> {
    rows: Vec<T>,
}

impl<T> MemoryTable<T> {
    /// Create a table from rows in insertion order
    pub fn new(rows: Vec<T>) -> Self {
        Self { rows }
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Start a query over every row
    pub fn select(&self) -> MemoryQuery<'_, T> {
        MemoryQuery {
            rows: &self.rows,
            conditions: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }
}

impl<T> FromIterator<T> for MemoryTable<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// A query over a [`MemoryTable`]
///
/// Semantics follow SQL: conditions are ANDed, NULL never satisfies a
/// comparison, and NULLs sort last ascending and first descending.
#[derive(Debug, Clone)]
pub struct MemoryQuery<'a, T> {
    rows: &'a [T],
    conditions: Vec<FilterCondition>,
    order: Vec<(String, OrderDirection)>,
    limit: Option<u64>,
}

impl<T: Columns + Clone> MemoryQuery<'_, T> {
    /// Execute the query synchronously
    pub fn collect(&self) -> Vec<T> {
        let mut matched: Vec<&T> = self
            .rows
            .iter()
            .filter(|row| {
                self.conditions
                    .iter()
                    .all(|c| c.matches(row.column(&c.field).as_ref()))
            })
            .collect();

        matched.sort_by(|a, b| {
            self.order
                .iter()
                .map(|(column, direction)| {
                    let ordering = compare_nullable(a.column(column), b.column(column));
                    match direction {
                        OrderDirection::Ascending => ordering,
                        OrderDirection::Descending => ordering.reverse(),
                    }
                })
                .find(|ordering| ordering.is_ne())
                .unwrap_or(Ordering::Equal)
        });

        let take = self
            .limit
            .map_or(usize::MAX, |n| usize::try_from(n).unwrap_or(usize::MAX));
        matched.into_iter().take(take).cloned().collect()
    }
}

fn compare_nullable(a: Option<FilterValue>, b: Option<FilterValue>) -> Ordering {
    let a = a.filter(|v| *v != FilterValue::Null);
    let b = b.filter(|v| *v != FilterValue::Null);
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => a.compare(&b).unwrap_or(Ordering::Equal),
    }
}

impl<T> QueryBuilder for MemoryQuery<'_, T> {
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

impl<T> FetchRows<T> for MemoryQuery<'_, T>
where
    T: Columns + Clone + Send,
{
    type Error = Error;

    fn fetch_rows(self) -> impl Future<Output = Result<Vec<T>, Error>> + Send {
        ready(Ok(self.collect()))
    }
}
