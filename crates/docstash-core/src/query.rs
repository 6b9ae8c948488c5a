//! Query engine
//!
//! A [`Query`] is an immutable description of a read over one collection:
//! a conjunction of filters, at most one ordering, an offset and a limit.
//! Every chaining call returns a new `Query`, so a base query can be
//! branched freely:
//!
//! ```ignore
//! let active = store.collection("users").where_field("active", FilterOp::Equal, true);
//! let newest = active.order_by("createdAt", Direction::Descending).limit(10);
//! let total = active.count().get().await.data().count;
//! ```
//!
//! Execution runs the fixed pipeline filter -> sort -> offset -> limit
//! against the current bucket contents and copies out only the survivors.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use tracing::trace;

use crate::error::{StoreError, StoreResult};
use crate::reference::DocumentReference;
use crate::snapshot::{DocumentSnapshot, QuerySnapshot};
use crate::store::{Bucket, Store};
use crate::value::{self, compare_values, values_equal, DocumentData};

/// Comparison applied by a filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    /// `==`
    Equal,
    /// `!=`; a missing field counts as not equal
    NotEqual,
    /// `<`
    LessThan,
    /// `<=`
    LessThanOrEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanOrEqual,
    /// `in`: field equals one of the listed values
    In,
    /// `not-in`: field is present and equals none of the listed values
    NotIn,
    /// `array-contains`: field is an array holding the value
    ArrayContains,
    /// `array-contains-any`: field is an array holding any listed value
    ArrayContainsAny,
}

impl FilterOp {
    /// Operator spelling as accepted by [`FromStr`]
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Equal => "==",
            FilterOp::NotEqual => "!=",
            FilterOp::LessThan => "<",
            FilterOp::LessThanOrEqual => "<=",
            FilterOp::GreaterThan => ">",
            FilterOp::GreaterThanOrEqual => ">=",
            FilterOp::In => "in",
            FilterOp::NotIn => "not-in",
            FilterOp::ArrayContains => "array-contains",
            FilterOp::ArrayContainsAny => "array-contains-any",
        }
    }
}

impl FromStr for FilterOp {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "==" => Ok(FilterOp::Equal),
            "!=" => Ok(FilterOp::NotEqual),
            "<" => Ok(FilterOp::LessThan),
            "<=" => Ok(FilterOp::LessThanOrEqual),
            ">" => Ok(FilterOp::GreaterThan),
            ">=" => Ok(FilterOp::GreaterThanOrEqual),
            "in" => Ok(FilterOp::In),
            "not-in" => Ok(FilterOp::NotIn),
            "array-contains" => Ok(FilterOp::ArrayContains),
            "array-contains-any" => Ok(FilterOp::ArrayContainsAny),
            other => Err(StoreError::UnsupportedOperator(other.to_string())),
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort direction for `order_by`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

impl FromStr for Direction {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Direction::Ascending),
            "desc" | "descending" => Ok(Direction::Descending),
            other => Err(StoreError::InvalidArgument(format!(
                "unknown sort direction '{}'",
                other
            ))),
        }
    }
}

/// A single `(field, operator, value)` condition
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    /// Check a document against this condition
    pub fn matches(&self, data: &DocumentData) -> bool {
        let field = value::resolve(data, &self.field);

        match self.op {
            FilterOp::Equal => field.is_some_and(|v| values_equal(v, &self.value)),
            FilterOp::NotEqual => !field.is_some_and(|v| values_equal(v, &self.value)),
            FilterOp::LessThan => self.ordered(field, Ordering::is_lt),
            FilterOp::LessThanOrEqual => self.ordered(field, Ordering::is_le),
            FilterOp::GreaterThan => self.ordered(field, Ordering::is_gt),
            FilterOp::GreaterThanOrEqual => self.ordered(field, Ordering::is_ge),
            FilterOp::In => match (field, &self.value) {
                (Some(v), Value::Array(candidates)) => {
                    candidates.iter().any(|c| values_equal(v, c))
                }
                _ => false,
            },
            FilterOp::NotIn => match (field, &self.value) {
                (Some(v), Value::Array(candidates)) => {
                    !candidates.iter().any(|c| values_equal(v, c))
                }
                _ => false,
            },
            FilterOp::ArrayContains => match field {
                Some(Value::Array(items)) => items.iter().any(|i| values_equal(i, &self.value)),
                _ => false,
            },
            FilterOp::ArrayContainsAny => match (field, &self.value) {
                (Some(Value::Array(items)), Value::Array(candidates)) => items
                    .iter()
                    .any(|i| candidates.iter().any(|c| values_equal(i, c))),
                _ => false,
            },
        }
    }

    // Range operators are only meaningful for comparable values of one kind
    fn ordered(&self, field: Option<&Value>, accept: fn(Ordering) -> bool) -> bool {
        field
            .and_then(|v| compare_values(v, &self.value))
            .is_some_and(accept)
    }
}

/// Ordering clause
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    /// Compare two documents; null or missing values always sort last
    fn compare(&self, a: &DocumentData, b: &DocumentData) -> Ordering {
        let left = defined(value::resolve(a, &self.field));
        let right = defined(value::resolve(b, &self.field));

        match (left, right) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(x), Some(y)) => {
                let ordering = value::sort_order(x, y);
                match self.direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            }
        }
    }
}

fn defined(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

/// Immutable, chainable query over one collection
#[derive(Clone)]
pub struct Query {
    store: Store,
    path: String,
    filters: Vec<Filter>,
    order: Option<OrderBy>,
    limit: Option<usize>,
    offset: usize,
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("path", &self.path)
            .field("filters", &self.filters)
            .field("order", &self.order)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .finish()
    }
}

impl Query {
    pub(crate) fn new(store: Store, path: String) -> Self {
        Self {
            store,
            path,
            filters: Vec::new(),
            order: None,
            limit: None,
            offset: 0,
        }
    }

    /// Collection path this query reads
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn ordering(&self) -> Option<&OrderBy> {
        self.order.as_ref()
    }

    pub(crate) fn store(&self) -> &Store {
        &self.store
    }

    /// Add a filter; all filters must hold for a document to match
    pub fn where_field(
        &self,
        field: impl Into<String>,
        op: FilterOp,
        value: impl Into<Value>,
    ) -> Query {
        let mut next = self.clone();
        next.filters.push(Filter {
            field: field.into(),
            op,
            value: value.into(),
        });
        next
    }

    /// Add a filter with the operator given in its text form (`">="`, `"in"`, ...)
    ///
    /// Unknown operators are rejected with `UnsupportedOperator`.
    pub fn where_op(
        &self,
        field: impl Into<String>,
        op: &str,
        value: impl Into<Value>,
    ) -> StoreResult<Query> {
        Ok(self.where_field(field, op.parse()?, value))
    }

    /// Sort by a field, replacing any previous ordering
    pub fn order_by(&self, field: impl Into<String>, direction: Direction) -> Query {
        let mut next = self.clone();
        next.order = Some(OrderBy {
            field: field.into(),
            direction,
        });
        next
    }

    /// Keep at most `count` documents
    pub fn limit(&self, count: usize) -> Query {
        let mut next = self.clone();
        next.limit = Some(count);
        next
    }

    /// Skip the first `count` documents
    pub fn offset(&self, count: usize) -> Query {
        let mut next = self.clone();
        next.offset = count;
        next
    }

    /// Run the query
    pub async fn get(&self) -> QuerySnapshot {
        let collections = self.store.read().await;
        let docs: Vec<DocumentSnapshot> = self
            .run(collections.bucket(&self.path))
            .into_iter()
            .map(|(id, data)| DocumentSnapshot::new(self.doc_ref(id), Some(data.clone())))
            .collect();

        trace!("Query on {} returned {} documents", self.path, docs.len());
        QuerySnapshot::new(docs)
    }

    /// Aggregate over the same pipeline as [`Query::get`]
    pub fn count(&self) -> AggregateQuery {
        AggregateQuery {
            query: self.clone(),
        }
    }

    fn doc_ref(&self, id: &str) -> DocumentReference {
        DocumentReference::new(self.store.clone(), self.path.clone(), id.to_string())
    }

    fn matches(&self, data: &DocumentData) -> bool {
        self.filters.iter().all(|filter| filter.matches(data))
    }

    fn run<'a>(&self, bucket: Option<&'a Bucket>) -> Vec<(&'a str, &'a DocumentData)> {
        let Some(bucket) = bucket else {
            return Vec::new();
        };

        let mut matched: Vec<(&str, &DocumentData)> = bucket
            .iter()
            .filter(|(_, data)| self.matches(data))
            .map(|(id, data)| (id.as_str(), data))
            .collect();

        // sort_by is stable
        if let Some(order) = &self.order {
            matched.sort_by(|a, b| order.compare(a.1, b.1));
        }

        matched
            .into_iter()
            .skip(self.offset)
            .take(self.limit.unwrap_or(usize::MAX))
            .collect()
    }

    fn count_matches(&self, bucket: Option<&Bucket>) -> usize {
        let matched = bucket.map_or(0, |bucket| {
            bucket.values().filter(|data| self.matches(data)).count()
        });
        let remaining = matched.saturating_sub(self.offset);
        self.limit.map_or(remaining, |limit| remaining.min(limit))
    }
}

/// Count aggregation over a query
#[derive(Debug, Clone)]
pub struct AggregateQuery {
    query: Query,
}

impl AggregateQuery {
    /// Count matching documents without copying them
    pub async fn get(&self) -> AggregateQuerySnapshot {
        let collections = self.query.store.read().await;
        let count = self.query.count_matches(collections.bucket(&self.query.path));
        AggregateQuerySnapshot { count }
    }
}

/// Result of an [`AggregateQuery`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateQuerySnapshot {
    count: usize,
}

impl AggregateQuerySnapshot {
    pub fn data(&self) -> AggregateData {
        AggregateData { count: self.count }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateData {
    pub count: usize,
}
