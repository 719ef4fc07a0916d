//! Unit tests for rivven-dbconnect types module

use chrono::NaiveDate;
use rivven_dbconnect::types::{ColumnInfo, Row, RowBatch, Value, ValueKind};
use std::sync::Arc;

fn columns(names: &[&str]) -> Arc<[String]> {
    names.iter().map(|n| n.to_string()).collect()
}

#[test]
fn test_value_null() {
    let v = Value::Null;
    assert!(v.is_null());
    assert_eq!(v.as_str(), None);
    assert_eq!(v.as_i64(), None);
    assert_eq!(v.as_f64(), None);
    assert_eq!(v.as_bool(), None);
}

#[test]
fn test_value_kinds() {
    assert_eq!(Value::Integer(1).kind(), ValueKind::Integer);
    assert_eq!(Value::Float(1.0).kind(), ValueKind::Float);
    assert_eq!(Value::Text("a".into()).kind(), ValueKind::Text);
    assert_eq!(Value::Bool(true).kind(), ValueKind::Bool);
    assert_eq!(Value::Binary(vec![1]).kind(), ValueKind::Binary);
    let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    assert_eq!(Value::Date(d).kind(), ValueKind::Date);
    assert_eq!(
        Value::Timestamp(d.and_hms_opt(1, 2, 3).unwrap()).kind(),
        ValueKind::Timestamp
    );
}

#[test]
fn test_value_from() {
    assert_eq!(Value::from(42_i32), Value::Integer(42));
    assert_eq!(Value::from(42_i64), Value::Integer(42));
    assert_eq!(Value::from("x"), Value::Text("x".into()));
    assert_eq!(Value::from(vec![1_u8, 2]), Value::Binary(vec![1, 2]));
    assert_eq!(Value::from(None::<i64>), Value::Null);
    assert_eq!(Value::from(Some(true)), Value::Bool(true));
}

#[test]
fn test_value_accessors() {
    assert_eq!(Value::Text("hello".into()).as_str(), Some("hello"));
    assert_eq!(Value::Binary(vec![7]).as_bytes(), Some(&[7_u8][..]));
    assert_eq!(Value::Integer(3).as_f64(), Some(3.0));

    let ts = NaiveDate::from_ymd_opt(2024, 2, 29)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    assert_eq!(
        Value::Timestamp(ts).as_date(),
        NaiveDate::from_ymd_opt(2024, 2, 29)
    );
}

#[test]
fn test_value_serde() {
    let json = serde_json::to_string(&Value::Integer(5)).unwrap();
    let back: Value = serde_json::from_str(&json).unwrap();
    assert_eq!(back, Value::Integer(5));
}

#[test]
fn test_column_info() {
    let col = ColumnInfo::new("created", "TIMESTAMP", ValueKind::Timestamp);
    assert_eq!(col.name, "created");
    assert_eq!(col.type_name, "TIMESTAMP");
    assert_eq!(col.kind, ValueKind::Timestamp);
}

#[test]
fn test_row_lookup() {
    let row = Row::new(
        columns(&["id", "name"]),
        vec![Value::Integer(1), Value::Text("Alice".into())],
    );

    assert_eq!(row.len(), 2);
    assert!(!row.is_empty());
    assert_eq!(row.columns(), &["id".to_string(), "name".to_string()]);
    assert_eq!(row.get(0), Some(&Value::Integer(1)));
    assert_eq!(row.get(2), None);
    assert_eq!(row.get_by_name("Name"), Some(&Value::Text("Alice".into())));
    assert_eq!(row.get_by_name("missing"), None);

    let map = row.into_map();
    assert_eq!(map.get("id"), Some(&Value::Integer(1)));
}

#[test]
fn test_rows_share_column_names() {
    let names = columns(&["a"]);
    let first = Row::new(Arc::clone(&names), vec![Value::Integer(1)]);
    let second = Row::new(Arc::clone(&names), vec![Value::Integer(2)]);
    assert_eq!(Arc::strong_count(&names), 3);
    assert_eq!(first.columns(), second.columns());
}

#[test]
fn test_row_batch() {
    let names = columns(&["a"]);
    let batch = RowBatch::new(vec![
        Row::new(Arc::clone(&names), vec![Value::Integer(1)]),
        Row::new(Arc::clone(&names), vec![Value::Integer(2)]),
    ]);

    assert_eq!(batch.len(), 2);
    assert!(!batch.is_empty());
    assert_eq!(batch.rows()[1].get(0), Some(&Value::Integer(2)));

    let values: Vec<i64> = batch
        .into_iter()
        .filter_map(|row| row.get(0).and_then(Value::as_i64))
        .collect();
    assert_eq!(values, vec![1, 2]);
    assert!(RowBatch::empty().is_empty());
}
