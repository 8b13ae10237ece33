//! Pure query transformations shared by the controller and its callers.
//!
//! # Design
//! - Every mutation other than paging resets `page_index` to zero.
//! - Changing a parent filter's value clears its transitive dependents.
//! - Paging clamps against the last known total when one exists.

use crate::error::{CoreError, CoreResult};
use crate::filters::FilterDependencies;
use crate::model::{FilterValue, Query, Sort, SortDirection};

/// Replace the search text and return to the first page.
pub fn apply_search(query: &mut Query, text: impl Into<String>) {
    query.search_text = text.into();
    query.page_index = 0;
}

/// Select a filter value and return to the first page.
///
/// Dependents of `key` are cleared only when its value actually changes.
pub fn apply_filter(
    query: &mut Query,
    dependencies: &FilterDependencies,
    key: impl Into<String>,
    value: impl Into<FilterValue>,
) {
    let key = key.into();
    let value = value.into();
    if query.filters.get(&key) != Some(&value) {
        clear_dependents(query, dependencies, &key);
    }
    query.filters.insert(key, value);
    query.page_index = 0;
}

/// Unset a filter, clearing dependents of `key` and returning to the first page.
pub fn remove_filter(query: &mut Query, dependencies: &FilterDependencies, key: &str) {
    clear_dependents(query, dependencies, key);
    query.filters.remove(key);
    query.page_index = 0;
}

/// Replace (or clear) the sort order and return to the first page.
pub fn apply_sort(query: &mut Query, sort: Option<(String, SortDirection)>) {
    query.sort = sort.map(|(field, direction)| Sort { field, direction });
    query.page_index = 0;
}

/// Move to `index`, clamped to the last page of `known_total` when known.
pub fn apply_page(query: &mut Query, index: u32, known_total: Option<u64>) {
    query.page_index = known_total.map_or(index, |total| {
        index.min(last_page_index(total, query.page_size))
    });
}

/// Change the page size and return to the first page.
///
/// # Errors
///
/// Returns [`CoreError::InvalidPageSize`] when `size` is zero; the query is left untouched.
pub fn apply_page_size(query: &mut Query, size: u32) -> CoreResult<()> {
    if size == 0 {
        return Err(CoreError::InvalidPageSize);
    }
    query.page_size = size;
    query.page_index = 0;
    Ok(())
}

/// Zero-based index of the last page holding `total` rows; zero when empty.
#[must_use]
pub fn last_page_index(total: u64, page_size: u32) -> u32 {
    if total == 0 || page_size == 0 {
        return 0;
    }
    let last = (total - 1) / u64::from(page_size);
    u32::try_from(last).unwrap_or(u32::MAX)
}

/// Whether the query's page lies outside a result set of `total` rows.
#[must_use]
pub fn page_out_of_range(query: &Query, total: u64) -> bool {
    query.page_index > last_page_index(total, query.page_size)
}

fn clear_dependents(query: &mut Query, dependencies: &FilterDependencies, key: &str) {
    for dependent in dependencies.dependents_of(key) {
        query.filters.remove(&dependent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region_chain() -> FilterDependencies {
        FilterDependencies::chain(["schemeId", "zoneId", "routeId"])
    }

    #[test]
    fn filter_change_resets_page() {
        let mut query = Query::new(20);
        query.page_index = 3;
        apply_filter(&mut query, &FilterDependencies::new(), "schemeId", 7);
        assert_eq!(query.page_index, 0);
        assert_eq!(query.filter("schemeId").map(FilterValue::as_str), Some("7"));
    }

    #[test]
    fn changing_parent_clears_dependent_filters() {
        let deps = region_chain();
        let mut query = Query::new(20);
        apply_filter(&mut query, &deps, "schemeId", "A");
        apply_filter(&mut query, &deps, "zoneId", "Z1");
        apply_filter(&mut query, &deps, "routeId", "R4");
        apply_filter(&mut query, &deps, "status", "active");

        apply_filter(&mut query, &deps, "schemeId", "B");

        assert_eq!(query.filter("schemeId").map(FilterValue::as_str), Some("B"));
        assert!(query.filter("zoneId").is_none());
        assert!(query.filter("routeId").is_none());
        assert_eq!(
            query.filter("status").map(FilterValue::as_str),
            Some("active")
        );
    }

    #[test]
    fn reselecting_same_parent_value_keeps_dependents() {
        let deps = region_chain();
        let mut query = Query::new(20);
        apply_filter(&mut query, &deps, "schemeId", "A");
        apply_filter(&mut query, &deps, "zoneId", "Z1");
        apply_filter(&mut query, &deps, "routeId", "R4");
        query.page_index = 2;

        apply_filter(&mut query, &deps, "schemeId", "A");

        assert_eq!(query.filter("zoneId").map(FilterValue::as_str), Some("Z1"));
        assert_eq!(query.filter("routeId").map(FilterValue::as_str), Some("R4"));
        assert_eq!(query.page_index, 0);
    }

    #[test]
    fn changing_middle_filter_keeps_parent() {
        let deps = region_chain();
        let mut query = Query::new(20);
        apply_filter(&mut query, &deps, "schemeId", "A");
        apply_filter(&mut query, &deps, "zoneId", "Z1");
        apply_filter(&mut query, &deps, "routeId", "R4");

        remove_filter(&mut query, &deps, "zoneId");

        assert_eq!(query.filter("schemeId").map(FilterValue::as_str), Some("A"));
        assert!(query.filter("zoneId").is_none());
        assert!(query.filter("routeId").is_none());
    }

    #[test]
    fn search_and_sort_reset_page() {
        let mut query = Query::new(10);
        query.page_index = 4;
        apply_search(&mut query, "kariuki");
        assert_eq!(query.page_index, 0);
        assert_eq!(query.search_text, "kariuki");

        query.page_index = 2;
        apply_sort(
            &mut query,
            Some(("createdAt".to_string(), SortDirection::Descending)),
        );
        assert_eq!(query.page_index, 0);
        assert_eq!(
            query.sort,
            Some(Sort {
                field: "createdAt".into(),
                direction: SortDirection::Descending
            })
        );
        apply_sort(&mut query, None);
        assert!(query.sort.is_none());
    }

    #[test]
    fn page_is_clamped_to_known_total() {
        let mut query = Query::new(10);
        apply_page(&mut query, 9, Some(35));
        assert_eq!(query.page_index, 3);
        apply_page(&mut query, 9, None);
        assert_eq!(query.page_index, 9);
        apply_page(&mut query, 2, Some(0));
        assert_eq!(query.page_index, 0);
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let mut query = Query::new(10);
        query.page_index = 2;
        assert_eq!(
            apply_page_size(&mut query, 0),
            Err(CoreError::InvalidPageSize)
        );
        assert_eq!(query.page_size, 10);
        assert_eq!(query.page_index, 2);
        apply_page_size(&mut query, 50).expect("valid size");
        assert_eq!(query.page_size, 50);
        assert_eq!(query.page_index, 0);
    }

    #[test]
    fn last_page_index_boundaries() {
        assert_eq!(last_page_index(0, 10), 0);
        assert_eq!(last_page_index(10, 10), 0);
        assert_eq!(last_page_index(11, 10), 1);
        let mut query = Query::new(10);
        query.page_index = 2;
        assert!(page_out_of_range(&query, 20));
        assert!(!page_out_of_range(&query, 21));
    }
}
