//! Sample rows and pages for controller and renderer tests.

use meterdesk_core::{PageResult, Query, Row, RowId};
use serde_json::{Map, Value, json};

/// Build a row from an id and a JSON object; non-object values yield an empty field map.
#[must_use]
pub fn row(id: impl Into<RowId>, fields: Value) -> Row {
    let fields = match fields {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    Row::new(id.into(), fields)
}

/// `count` meter rows with ids `1..=count`, alternating between two schemes.
#[must_use]
pub fn sample_rows(count: u32) -> Vec<Row> {
    (1..=count)
        .map(|index| {
            let scheme = if index % 2 == 0 { "KIA" } else { "MUR" };
            row(
                index,
                json!({
                    "id": index,
                    "meterNumber": format!("MTR-{index:04}"),
                    "customerName": format!("Customer {index}"),
                    "schemeId": scheme,
                    "status": "ACTIVE",
                }),
            )
        })
        .collect()
}

/// Slice `rows` for `query`, matching the search term against string fields
/// and filters against exact field values.
#[must_use]
pub fn page_of(rows: &[Row], query: &Query) -> PageResult {
    let matching: Vec<&Row> = rows
        .iter()
        .filter(|row| matches_search(row, query.search_term()))
        .filter(|row| {
            query
                .filters
                .iter()
                .all(|(key, value)| row.display_field(key) == value.as_str())
        })
        .collect();
    let total = u64::try_from(matching.len()).unwrap_or(u64::MAX);
    let start = usize::try_from(query.offset()).unwrap_or(usize::MAX);
    let size = usize::try_from(query.page_size).unwrap_or(usize::MAX);
    let page = matching
        .into_iter()
        .skip(start)
        .take(size)
        .cloned()
        .collect();
    PageResult::new(page, total)
}

fn matches_search(row: &Row, term: Option<&str>) -> bool {
    let Some(term) = term else {
        return true;
    };
    let needle = term.to_lowercase();
    row.fields.values().any(|value| {
        value
            .as_str()
            .is_some_and(|text| text.to_lowercase().contains(&needle))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_of_slices_and_counts_matches() {
        let rows = sample_rows(7);
        let mut query = Query::new(3);
        query.page_index = 2;
        let page = page_of(&rows, &query);
        assert_eq!(page.total_count, 7);
        assert_eq!(page.rows.len(), 1);
        assert_eq!(page.rows[0].id, RowId::from(7_u32));
    }

    #[test]
    fn page_of_applies_search_and_filters() {
        let rows = sample_rows(6);
        let mut query = Query::new(10);
        query.filters.insert("schemeId".into(), "KIA".into());
        assert_eq!(page_of(&rows, &query).total_count, 3);
        query.search_text = "mtr-0004".into();
        let page = page_of(&rows, &query);
        assert_eq!(page.total_count, 1);
        assert_eq!(page.rows[0].display_field("customerName"), "Customer 4");
    }
}
