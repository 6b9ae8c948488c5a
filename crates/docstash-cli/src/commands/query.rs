//! Query command handler

use anyhow::{bail, Context, Result};
use serde_json::Value;

use docstash_core::{Direction, FilterOp, Query, Store};

use crate::output::Output;
use crate::seed::collection_at;

/// Query clauses collected from the command line
#[derive(Debug, Default)]
pub struct QueryArgs {
    pub collection: String,
    pub filters: Vec<String>,
    pub order_by: Option<String>,
    pub descending: bool,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub count: bool,
}

/// Run a query and print the matching documents (or their count)
pub async fn run(store: &Store, args: QueryArgs, output: &Output) -> Result<()> {
    let query = build_query(store, &args)?;

    if args.count {
        let count = query.count().get().await.data().count;
        output.print_count(count);
        return Ok(());
    }

    let snapshot = query.get().await;
    output.print_documents(&snapshot)
}

/// Translate command-line clauses into a query
pub fn build_query(store: &Store, args: &QueryArgs) -> Result<Query> {
    let mut query = collection_at(store, &args.collection)?.query();

    for expr in &args.filters {
        let (field, op, value) = parse_filter(expr)?;
        query = query.where_field(field, op, value);
    }

    if let Some(order) = &args.order_by {
        let (field, direction) = parse_order(order, args.descending)?;
        query = query.order_by(field, direction);
    }

    if let Some(offset) = args.offset {
        query = query.offset(offset);
    }
    if let Some(limit) = args.limit {
        query = query.limit(limit);
    }

    Ok(query)
}

/// Parse an `--order-by` value: `FIELD` or `FIELD:asc|desc`
///
/// A bare field sorts ascending unless `descending` is set.
pub fn parse_order(order: &str, descending: bool) -> Result<(String, Direction)> {
    let Some((field, suffix)) = order.rsplit_once(':') else {
        let direction = if descending {
            Direction::Descending
        } else {
            Direction::Ascending
        };
        return Ok((order.to_string(), direction));
    };

    let direction: Direction = suffix
        .parse()
        .with_context(|| format!("Invalid ordering '{}'", order))?;
    if descending && direction == Direction::Ascending {
        bail!("Ordering '{}' conflicts with --desc", order);
    }
    Ok((field.to_string(), direction))
}

/// Parse a `field op value` filter expression
///
/// The value is read as JSON when possible (`30`, `true`, `["a","b"]`)
/// and as a plain string otherwise.
pub fn parse_filter(expr: &str) -> Result<(String, FilterOp, Value)> {
    let expr = expr.trim();
    let mut words = expr.split_whitespace();
    let (Some(field), Some(op)) = (words.next(), words.next()) else {
        bail!("Filter '{}' must look like 'field op value'", expr);
    };
    // The operand keeps its inner spacing (`city == New  York`)
    let raw = expr[field.len()..].trim_start()[op.len()..].trim();
    if raw.is_empty() {
        bail!("Filter '{}' must look like 'field op value'", expr);
    }

    let op: FilterOp = op
        .parse()
        .with_context(|| format!("Invalid filter '{}'", expr))?;
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));

    Ok((field.to_string(), op, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_filter() {
        let (field, op, value) = parse_filter("age >= 30").unwrap();
        assert_eq!(field, "age");
        assert_eq!(op, FilterOp::GreaterThanOrEqual);
        assert_eq!(value, json!(30));

        let (_, op, value) = parse_filter("tags array-contains-any [\"a\", \"b\"]").unwrap();
        assert_eq!(op, FilterOp::ArrayContainsAny);
        assert_eq!(value, json!(["a", "b"]));

        let (field, _, value) = parse_filter("profile.city == New York").unwrap();
        assert_eq!(field, "profile.city");
        assert_eq!(value, json!("New York"));
    }

    #[test]
    fn test_parse_filter_extra_whitespace() {
        let (field, op, value) = parse_filter("age  >=   30").unwrap();
        assert_eq!(field, "age");
        assert_eq!(op, FilterOp::GreaterThanOrEqual);
        assert_eq!(value, json!(30));

        let (field, op, value) = parse_filter("  city\t==  New  York ").unwrap();
        assert_eq!(field, "city");
        assert_eq!(op, FilterOp::Equal);
        assert_eq!(value, json!("New  York"));
    }

    #[test]
    fn test_parse_filter_errors() {
        assert!(parse_filter("age").is_err());
        assert!(parse_filter("age >=").is_err());
        assert!(parse_filter("age >=   ").is_err());
        assert!(parse_filter("age ~ 3").is_err());
    }

    #[test]
    fn test_parse_order() {
        assert_eq!(
            parse_order("age", false).unwrap(),
            ("age".to_string(), Direction::Ascending)
        );
        assert_eq!(
            parse_order("age", true).unwrap(),
            ("age".to_string(), Direction::Descending)
        );
        assert_eq!(
            parse_order("usage.credits:DESC", false).unwrap(),
            ("usage.credits".to_string(), Direction::Descending)
        );
        assert_eq!(
            parse_order("age:desc", true).unwrap(),
            ("age".to_string(), Direction::Descending)
        );
        assert!(parse_order("age:sideways", false).is_err());
        assert!(parse_order("age:asc", true).is_err());
    }

    #[tokio::test]
    async fn test_build_query() {
        let store = Store::new();
        let people = store.collection("people");
        for (id, age) in [("a", 20), ("b", 35), ("c", 50), ("d", 41)] {
            people.doc(id).set(&json!({"age": age})).await.unwrap();
        }

        let args = QueryArgs {
            collection: "people".to_string(),
            filters: vec!["age > 30".to_string()],
            order_by: Some("age".to_string()),
            descending: true,
            limit: Some(2),
            ..QueryArgs::default()
        };

        let query = build_query(&store, &args).unwrap();
        let ids: Vec<String> = query
            .get()
            .await
            .iter()
            .map(|doc| doc.id().to_string())
            .collect();
        assert_eq!(ids, vec!["c", "d"]);
        assert_eq!(query.count().get().await.data().count, 2);
    }
}
