use std::cmp::Ordering;

use chrono::DateTime;
use serde_json::Value;

use super::definition::{ColumnDefinition, DataKind, SortDirection};
use super::Row;

/// Sorts the rows by the column in place.
///
/// The sort is stable, and descending order is produced by reversing the comparator, so rows with equal keys keep
/// their relative order in both directions.
pub fn sort_rows(rows: &mut [Row], column: &ColumnDefinition, direction: SortDirection) {
    sort_rows_by(rows, |row| row, column, direction);
}

/// Sorts items that carry a row, see [sort_rows].
pub fn sort_rows_by<T>(items: &mut [T], row: impl Fn(&T) -> &Row, column: &ColumnDefinition, direction: SortDirection) {
    items.sort_by(|a, b| {
        let ordering = compare_by_column(row(a), row(b), column);
        match direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    });
}

/// Compares two rows in ascending order of the column's value.
pub fn compare_by_column(a: &Row, b: &Row, column: &ColumnDefinition) -> Ordering {
    let a = a.get(&column.data_property);
    let b = b.get(&column.data_property);

    match column.kind {
        DataKind::String => lowercase_text(a).cmp(&lowercase_text(b)),
        // Missing timestamps sort before everything else
        DataKind::Time => match (timestamp(a), timestamp(b)) {
            (Some(a), Some(b)) => a.total_cmp(&b),
            (a, b) => a.is_some().cmp(&b.is_some()),
        },
        DataKind::Number | DataKind::Percent | DataKind::Status | DataKind::Select => compare_raw(a, b),
    }
}

/// Returns the textual representation of a cell, if it has one.
pub(crate) fn cell_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Returns the numeric value of a cell, parsing strings if needed.
pub(crate) fn cell_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lowercase_text(value: Option<&Value>) -> String {
    cell_text(value).map(|s| s.to_lowercase()).unwrap_or_default()
}

/// Converts a cell into milliseconds since the epoch.
///
/// Accepts numbers, numeric strings and RFC 3339 strings.
fn timestamp(value: Option<&Value>) -> Option<f64> {
    if let Some(number) = cell_number(value) {
        return Some(number);
    }

    match value? {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|datetime| datetime.timestamp_millis() as f64),
        _ => None,
    }
}

/// Orders JSON values of the same type naturally and values of different types by type.
fn compare_raw(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(Value::Array(_)) => 4,
            Some(Value::Object(_)) => 5,
        }
    }

    match (a, b) {
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a.total_cmp(&b),
            _ => Ordering::Equal,
        },
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn rows(values: Value) -> Vec<Row> {
        serde_json::from_value(values).unwrap()
    }

    fn names(rows: &[Row]) -> Vec<&str> {
        rows.iter().map(|row| row["name"].as_str().unwrap()).collect()
    }

    #[test]
    fn strings_sort_case_insensitively() {
        let mut data = rows(json!([{ "name": "beta" }, { "name": "Alpha" }, { "name": "alpha2" }]));
        let column = ColumnDefinition::new("name", "Name", DataKind::String);

        sort_rows(&mut data, &column, SortDirection::Ascending);

        assert_eq!(names(&data), vec!["Alpha", "alpha2", "beta"]);
    }

    #[test]
    fn descending_is_the_exact_reverse_without_ties() {
        let mut data = rows(json!([
            { "name": "b", "count": 2 },
            { "name": "c", "count": 10 },
            { "name": "a", "count": 1 },
        ]));
        let column = ColumnDefinition::new("count", "Count", DataKind::Number);

        sort_rows(&mut data, &column, SortDirection::Ascending);
        let ascending = names(&data).into_iter().map(String::from).collect::<Vec<_>>();
        sort_rows(&mut data, &column, SortDirection::Descending);
        let mut descending = names(&data).into_iter().map(String::from).collect::<Vec<_>>();
        descending.reverse();

        assert_eq!(ascending, vec!["a", "b", "c"]);
        assert_eq!(descending, ascending);
    }

    #[test]
    fn equal_keys_keep_their_relative_order() {
        let mut data = rows(json!([
            { "name": "first", "group": 1 },
            { "name": "second", "group": 0 },
            { "name": "third", "group": 1 },
            { "name": "fourth", "group": 0 },
        ]));
        let column = ColumnDefinition::new("group", "Group", DataKind::Number);

        sort_rows(&mut data, &column, SortDirection::Ascending);
        assert_eq!(names(&data), vec!["second", "fourth", "first", "third"]);

        sort_rows(&mut data, &column, SortDirection::Descending);
        assert_eq!(names(&data), vec!["first", "third", "second", "fourth"]);
    }

    #[test]
    fn missing_timestamps_sort_first_when_ascending() {
        let mut data = rows(json!([
            { "name": "late", "at": "2024-03-01T00:00:00Z" },
            { "name": "missing" },
            { "name": "early", "at": 1_000 },
            { "name": "null", "at": null },
            { "name": "middle", "at": "2024-01-01T00:00:00+02:00" },
        ]));
        let column = ColumnDefinition::new("at", "At", DataKind::Time);

        sort_rows(&mut data, &column, SortDirection::Ascending);
        assert_eq!(names(&data), vec!["missing", "null", "early", "middle", "late"]);

        sort_rows(&mut data, &column, SortDirection::Descending);
        assert_eq!(names(&data), vec!["late", "middle", "early", "missing", "null"]);
    }

    #[test]
    fn mixed_raw_values_are_ordered_by_type() {
        let mut data = rows(json!([
            { "name": "text", "v": "x" },
            { "name": "number", "v": 3 },
            { "name": "none" },
            { "name": "flag", "v": true },
        ]));
        let column = ColumnDefinition::new("v", "V", DataKind::Select);

        sort_rows(&mut data, &column, SortDirection::Ascending);

        assert_eq!(names(&data), vec!["none", "flag", "number", "text"]);
    }
}
