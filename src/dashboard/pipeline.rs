//! Pure derivation of the visible rows: filter, then sort.
//!
//! Filters match case-insensitively by substring against the text a column
//! displays (`price` as `12.50`, `publishedAt` as `1965-06-01`). A row must
//! match every active filter.
//!
//! Sorting is stable. Text compares case-insensitively, price numerically and
//! dates chronologically. `descending` reverses the comparison only, so rows
//! with equal keys keep their store order in both directions.

use std::cmp::Ordering;

use crate::dashboard::{Column, QueryState, SortEntry};
use crate::modules::books::models::Book;
use crate::utils::cell_text;

pub fn matches_filters(state: &QueryState, book: &Book) -> bool {
    state.filters().all(|(column, needle)| {
        cell_text(book, column)
            .to_lowercase()
            .contains(&needle.to_lowercase())
    })
}

fn compare_column(column: Column, a: &Book, b: &Book) -> Ordering {
    match column {
        Column::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        Column::Author => a.author.to_lowercase().cmp(&b.author.to_lowercase()),
        Column::Price => a.price.total_cmp(&b.price),
        Column::PublishedAt => a.published_at.cmp(&b.published_at),
    }
}

/// Compare two rows by every sort entry, primary first.
pub fn compare(sorting: &[SortEntry], a: &Book, b: &Book) -> Ordering {
    sorting
        .iter()
        .map(|entry| {
            let ordering = compare_column(entry.column, a, b);
            if entry.descending {
                ordering.reverse()
            } else {
                ordering
            }
        })
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Visible rows for `state` over the full record set, in display order.
pub fn derive_visible(state: &QueryState, records: &[Book]) -> Vec<Book> {
    let mut rows: Vec<Book> = records
        .iter()
        .filter(|book| matches_filters(state, book))
        .cloned()
        .collect();

    // `sort_by` is stable; ties keep the store order.
    if !state.sorting().is_empty() {
        rows.sort_by(|a, b| compare(state.sorting(), a, b));
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use time::OffsetDateTime;

    fn book(id: &str, title: &str, author: &str, price: f64) -> Book {
        let at = datetime!(2024-01-01 0:00 UTC);
        Book {
            id: id.to_string(),
            owner_id: "alice".to_string(),
            title: title.to_string(),
            author: author.to_string(),
            description: None,
            price,
            published_at: at,
            created_at: at,
            updated_at: at,
        }
    }

    fn ids(rows: &[Book]) -> Vec<&str> {
        rows.iter().map(|b| b.id.as_str()).collect()
    }

    fn titles(rows: &[Book]) -> Vec<&str> {
        rows.iter().map(|b| b.title.as_str()).collect()
    }

    #[test]
    fn title_filter_scenario() {
        let records = vec![book("1", "Dune", "Herbert", 12.5), book("2", "1984", "Orwell", 9.0)];
        let mut state = QueryState::new();
        state.set_filter(Column::Title, Some("Dun"));

        assert_eq!(titles(&derive_visible(&state, &records)), ["Dune"]);
    }

    #[test]
    fn filters_ignore_case() {
        let records = vec![book("1", "Dune", "Herbert", 12.5)];
        let mut state = QueryState::new();
        state.set_filter(Column::Title, Some("dUN"));
        assert_eq!(derive_visible(&state, &records).len(), 1);
    }

    #[test]
    fn filters_are_conjunctive() {
        let records = vec![
            book("1", "Dune", "Herbert", 12.5),
            book("2", "Dune Messiah", "Herbert", 14.0),
            book("3", "Dune (graphic novel)", "Abnett", 30.0),
            book("4", "Children of Dune", "Herbert", 15.0),
        ];
        let mut state = QueryState::new();
        state.set_filter(Column::Title, Some("dune"));
        state.set_filter(Column::Author, Some("herb"));
        state.set_filter(Column::Price, Some("1"));

        assert_eq!(ids(&derive_visible(&state, &records)), ["1", "2", "4"]);

        state.set_filter(Column::Price, Some(".50"));
        assert_eq!(ids(&derive_visible(&state, &records)), ["1"]);
    }

    #[test]
    fn published_at_filter_uses_calendar_date() {
        let mut dune = book("1", "Dune", "Herbert", 12.5);
        dune.published_at = datetime!(1965-06-01 0:00 UTC);
        let records = vec![dune, book("2", "1984", "Orwell", 9.0)];
        let mut state = QueryState::new();
        state.set_filter(Column::PublishedAt, Some("1965-06"));
        assert_eq!(ids(&derive_visible(&state, &records)), ["1"]);
    }

    #[test]
    fn toggling_price_sort_twice_reverses_order() {
        let records = vec![
            book("a", "A", "x", 20.0),
            book("b", "B", "x", 5.0),
            book("c", "C", "x", 12.0),
        ];
        let mut state = QueryState::new();

        state.set_sort(Column::Price);
        let ascending = derive_visible(&state, &records);
        assert_eq!(ids(&ascending), ["b", "c", "a"]);

        state.set_sort(Column::Price);
        let descending = derive_visible(&state, &records);
        let mut reversed = ids(&ascending);
        reversed.reverse();
        assert_eq!(ids(&descending), reversed);
    }

    #[test]
    fn equal_keys_keep_store_order_in_both_directions() {
        let records = vec![
            book("1", "T", "x", 10.0),
            book("2", "T", "x", 5.0),
            book("3", "T", "x", 10.0),
            book("4", "T", "x", 5.0),
        ];
        let mut state = QueryState::new();

        state.set_sort(Column::Price);
        assert_eq!(ids(&derive_visible(&state, &records)), ["2", "4", "1", "3"]);

        state.set_sort(Column::Price);
        assert_eq!(ids(&derive_visible(&state, &records)), ["1", "3", "2", "4"]);
    }

    #[test]
    fn secondary_sort_breaks_ties() {
        let records = vec![
            book("1", "b", "Same", 1.0),
            book("2", "A", "Same", 1.0),
            book("3", "c", "Other", 1.0),
        ];
        let mut state = QueryState::new();
        state.add_sort(Column::Title);
        state.add_sort(Column::Author);

        assert_eq!(ids(&derive_visible(&state, &records)), ["3", "2", "1"]);
    }

    #[test]
    fn dates_sort_chronologically() {
        let mut old = book("old", "Old", "x", 1.0);
        old.published_at = OffsetDateTime::UNIX_EPOCH;
        let records = vec![book("new", "New", "x", 1.0), old];

        let mut state = QueryState::new();
        state.set_sort(Column::PublishedAt);
        assert_eq!(ids(&derive_visible(&state, &records)), ["old", "new"]);
    }

    #[test]
    fn no_sort_keeps_store_order() {
        let records = vec![book("2", "B", "x", 1.0), book("1", "A", "x", 2.0)];
        assert_eq!(
            ids(&derive_visible(&QueryState::new(), &records)),
            ["2", "1"]
        );
    }

    mod properties {
        use super::*;
        use proptest::collection::vec;
        use proptest::prelude::*;

        fn records() -> impl Strategy<Value = Vec<Book>> {
            vec(("[a-cA-C]{0,3}", "[xyz]{1,2}", 1u32..6), 0..24).prop_map(|rows| {
                rows.into_iter()
                    .enumerate()
                    .map(|(i, (title, author, price))| {
                        book(&i.to_string(), &title, &author, f64::from(price))
                    })
                    .collect()
            })
        }

        fn state() -> impl Strategy<Value = QueryState> {
            (
                vec((0usize..4, any::<bool>()), 0..3),
                proptest::option::of("[a-c]{1,2}"),
                proptest::option::of("[xyz]"),
            )
                .prop_map(|(sorts, title, author)| {
                    let mut state = QueryState::new();
                    for (column, twice) in sorts {
                        state.add_sort(Column::ALL[column]);
                        if twice {
                            state.add_sort(Column::ALL[column]);
                        }
                    }
                    state.set_filter(Column::Title, title.as_deref());
                    state.set_filter(Column::Author, author.as_deref());
                    state
                })
        }

        proptest! {
            #[test]
            fn derivation_is_idempotent(records in records(), state in state()) {
                let once = derive_visible(&state, &records);
                prop_assert_eq!(derive_visible(&state, &once), once);
            }

            #[test]
            fn visible_rows_match_every_filter(records in records(), state in state()) {
                let visible = derive_visible(&state, &records);
                prop_assert!(visible.iter().all(|b| matches_filters(&state, b)));
                let expected = records.iter().filter(|b| matches_filters(&state, b)).count();
                prop_assert_eq!(visible.len(), expected);
            }

            #[test]
            fn ties_keep_store_order(records in records(), state in state()) {
                let visible = derive_visible(&state, &records);
                for pair in visible.windows(2) {
                    let ordering = compare(state.sorting(), &pair[0], &pair[1]);
                    prop_assert_ne!(ordering, Ordering::Greater);
                    if ordering == Ordering::Equal {
                        let a: usize = pair[0].id.parse().unwrap();
                        let b: usize = pair[1].id.parse().unwrap();
                        prop_assert!(a < b);
                    }
                }
            }
        }
    }
}
