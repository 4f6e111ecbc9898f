//! Sorting, column filters and view mode as one shareable value.
//!
//! The state round-trips through a URL query string:
//!
//! ```text
//! sort=-price,title&title=Dun&view=grid
//! ```
//!
//! `sort` lists columns in priority order, `-` marks descending. Each active
//! filter is a parameter named after its column. `view` is omitted for the
//! default table view, and the default state encodes to the empty string.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Error)]
pub enum QueryStateError {
    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("unknown view mode '{0}'; expected table or grid")]
    UnknownViewMode(String),

    #[error("malformed query string")]
    Malformed(#[from] serde_urlencoded::de::Error),
}

/// Sortable and filterable book columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Column {
    Title,
    Author,
    Price,
    PublishedAt,
}

impl Column {
    pub const ALL: [Column; 4] = [
        Column::Title,
        Column::Author,
        Column::Price,
        Column::PublishedAt,
    ];

    /// Key used in the shareable representation.
    pub fn key(self) -> &'static str {
        match self {
            Column::Title => "title",
            Column::Author => "author",
            Column::Price => "price",
            Column::PublishedAt => "publishedAt",
        }
    }

    /// Header label shown by the table view.
    pub fn label(self) -> &'static str {
        match self {
            Column::Title => "Title",
            Column::Author => "Author",
            Column::Price => "Price",
            Column::PublishedAt => "Published At",
        }
    }
}

impl FromStr for Column {
    type Err = QueryStateError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        Column::ALL
            .into_iter()
            .find(|column| column.key() == key)
            .ok_or_else(|| QueryStateError::UnknownColumn(key.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SortEntry {
    pub column: Column,
    pub descending: bool,
}

impl SortEntry {
    pub fn ascending(column: Column) -> Self {
        Self {
            column,
            descending: false,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Table,
    Grid,
}

impl ViewMode {
    pub fn key(self) -> &'static str {
        match self {
            ViewMode::Table => "table",
            ViewMode::Grid => "grid",
        }
    }
}

impl FromStr for ViewMode {
    type Err = QueryStateError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        match key {
            "table" => Ok(ViewMode::Table),
            "grid" => Ok(ViewMode::Grid),
            other => Err(QueryStateError::UnknownViewMode(other.to_string())),
        }
    }
}

/// Query state of the books dashboard.
///
/// Invariants: no column appears twice in `sorting`; filter values are never
/// empty. Both hold because the fields only change through the transitions
/// below or through parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryState {
    sorting: Vec<SortEntry>,
    column_filters: BTreeMap<Column, String>,
    view_mode: ViewMode,
}

impl QueryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sort entries, primary first.
    pub fn sorting(&self) -> &[SortEntry] {
        &self.sorting
    }

    pub fn sort_for(&self, column: Column) -> Option<SortEntry> {
        self.sorting.iter().copied().find(|s| s.column == column)
    }

    pub fn filter(&self, column: Column) -> Option<&str> {
        self.column_filters.get(&column).map(String::as_str)
    }

    /// Active filters in column order.
    pub fn filters(&self) -> impl Iterator<Item = (Column, &str)> {
        self.column_filters
            .iter()
            .map(|(column, value)| (*column, value.as_str()))
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    /// Single-column sort toggle.
    ///
    /// Clicking the primary sort column flips its direction; any other column
    /// replaces the whole sort with itself, ascending.
    pub fn set_sort(&mut self, column: Column) {
        match self.sorting.first() {
            Some(primary) if primary.column == column => {
                self.sorting = vec![SortEntry {
                    column,
                    descending: !primary.descending,
                }];
            }
            _ => self.sorting = vec![SortEntry::ascending(column)],
        }
    }

    /// Multi-column sort toggle.
    ///
    /// The primary column flips direction in place; any other column becomes
    /// the new ascending primary and the remaining entries shift down.
    pub fn add_sort(&mut self, column: Column) {
        if let Some(primary) = self.sorting.first_mut() {
            if primary.column == column {
                primary.descending = !primary.descending;
                return;
            }
        }
        self.sorting.retain(|s| s.column != column);
        self.sorting.insert(0, SortEntry::ascending(column));
    }

    pub fn clear_sort(&mut self) {
        self.sorting.clear();
    }

    /// Replace the filter for `column`; `None` or an empty value removes it.
    pub fn set_filter(&mut self, column: Column, value: Option<&str>) {
        match value {
            Some(value) if !value.is_empty() => {
                self.column_filters.insert(column, value.to_string());
            }
            _ => {
                self.column_filters.remove(&column);
            }
        }
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.view_mode = mode;
    }

    pub fn to_query_string(&self) -> String {
        self.to_string()
    }

    /// Rebuild a state from its shareable form. A leading `?` is accepted
    /// and unknown parameters are ignored.
    pub fn from_query_str(query: &str) -> Result<Self, QueryStateError> {
        let query = query.strip_prefix('?').unwrap_or(query);
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)?;

        let mut state = QueryState::default();
        for (key, value) in pairs {
            match key.as_str() {
                "sort" => state.sorting = parse_sorting(&value)?,
                "view" => state.view_mode = value.parse()?,
                other => {
                    if let Ok(column) = other.parse::<Column>() {
                        state.set_filter(column, Some(&value));
                    }
                }
            }
        }
        Ok(state)
    }

    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();

        if !self.sorting.is_empty() {
            let sort = self
                .sorting
                .iter()
                .map(|entry| {
                    let prefix = if entry.descending { "-" } else { "" };
                    format!("{prefix}{}", entry.column.key())
                })
                .collect::<Vec<_>>()
                .join(",");
            pairs.push(("sort", sort));
        }

        for (column, value) in &self.column_filters {
            pairs.push((column.key(), value.clone()));
        }

        if self.view_mode != ViewMode::default() {
            pairs.push(("view", self.view_mode.key().to_string()));
        }

        pairs
    }
}

fn parse_sorting(raw: &str) -> Result<Vec<SortEntry>, QueryStateError> {
    let mut sorting: Vec<SortEntry> = Vec::new();
    for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let (descending, key) = match token.strip_prefix('-') {
            Some(key) => (true, key),
            None => (false, token),
        };
        let column: Column = key.parse()?;
        if sorting.iter().all(|s| s.column != column) {
            sorting.push(SortEntry { column, descending });
        }
    }
    Ok(sorting)
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = serde_urlencoded::to_string(self.query_pairs()).map_err(|_| fmt::Error)?;
        f.write_str(&encoded)
    }
}

impl FromStr for QueryState {
    type Err = QueryStateError;

    fn from_str(query: &str) -> Result<Self, Self::Err> {
        Self::from_query_str(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_sort_toggles_primary_and_replaces_others() {
        let mut state = QueryState::new();
        state.set_sort(Column::Price);
        assert_eq!(state.sorting(), [SortEntry::ascending(Column::Price)]);

        state.set_sort(Column::Price);
        assert_eq!(
            state.sorting(),
            [SortEntry {
                column: Column::Price,
                descending: true
            }]
        );

        state.set_sort(Column::Price);
        assert_eq!(state.sorting(), [SortEntry::ascending(Column::Price)]);

        state.set_sort(Column::Title);
        assert_eq!(state.sorting(), [SortEntry::ascending(Column::Title)]);
    }

    #[test]
    fn add_sort_pushes_new_primary() {
        let mut state = QueryState::new();
        state.add_sort(Column::Author);
        state.add_sort(Column::Price);
        state.add_sort(Column::Price);
        assert_eq!(
            state.sorting(),
            [
                SortEntry {
                    column: Column::Price,
                    descending: true
                },
                SortEntry::ascending(Column::Author),
            ]
        );

        // Re-adding a secondary column moves it to the front, ascending.
        state.add_sort(Column::Author);
        assert_eq!(
            state.sorting(),
            [
                SortEntry::ascending(Column::Author),
                SortEntry {
                    column: Column::Price,
                    descending: true
                },
            ]
        );
    }

    #[test]
    fn empty_filter_value_removes_the_filter() {
        let mut state = QueryState::new();
        state.set_filter(Column::Title, Some("Dun"));
        assert_eq!(state.filter(Column::Title), Some("Dun"));
        state.set_filter(Column::Title, Some(""));
        assert_eq!(state.filter(Column::Title), None);
        state.set_filter(Column::Title, Some("Dun"));
        state.set_filter(Column::Title, None);
        assert_eq!(state, QueryState::new());
    }

    #[test]
    fn view_mode_leaves_sort_and_filters_alone() {
        let mut state = QueryState::new();
        state.set_sort(Column::PublishedAt);
        state.set_filter(Column::Author, Some("her"));
        let before = state.clone();

        state.set_view_mode(ViewMode::Grid);
        assert_eq!(state.sorting(), before.sorting());
        assert_eq!(state.filter(Column::Author), Some("her"));
        assert_eq!(state.view_mode(), ViewMode::Grid);
    }

    #[test]
    fn default_state_encodes_to_empty_string() {
        assert_eq!(QueryState::new().to_query_string(), "");
        assert_eq!(QueryState::from_query_str("").unwrap(), QueryState::new());
        assert_eq!(QueryState::from_query_str("?view=table").unwrap(), QueryState::new());
    }

    #[test]
    fn canonical_encoding() {
        let mut state = QueryState::new();
        state.add_sort(Column::Title);
        state.add_sort(Column::Price);
        state.add_sort(Column::Price);
        state.set_filter(Column::Title, Some("Dune & co"));
        state.set_view_mode(ViewMode::Grid);

        let encoded = state.to_query_string();
        assert_eq!(encoded, "sort=-price%2Ctitle&title=Dune+%26+co&view=grid");
        assert_eq!(encoded.parse::<QueryState>().unwrap(), state);
    }

    #[test]
    fn parsing_rules() {
        let state =
            QueryState::from_query_str("sort=price,-price,,author&utm_source=x&title=a&title=b")
                .unwrap();
        assert_eq!(
            state.sorting(),
            [
                SortEntry::ascending(Column::Price),
                SortEntry::ascending(Column::Author)
            ]
        );
        assert_eq!(state.filter(Column::Title), Some("b"));

        let cleared = QueryState::from_query_str("title=a&title=").unwrap();
        assert_eq!(cleared.filter(Column::Title), None);
    }

    #[test]
    fn unknown_sort_column_or_view_is_rejected() {
        assert!(matches!(
            QueryState::from_query_str("sort=isbn"),
            Err(QueryStateError::UnknownColumn(c)) if c == "isbn"
        ));
        assert!(matches!(
            QueryState::from_query_str("view=list"),
            Err(QueryStateError::UnknownViewMode(v)) if v == "list"
        ));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;
        use proptest::test_runner::Config;

        fn column() -> impl Strategy<Value = Column> {
            (0usize..4).prop_map(|i| Column::ALL[i])
        }

        proptest! {
            #![proptest_config(Config::with_cases(128))]
            #[test]
            fn query_string_round_trips(
                sorts in proptest::collection::vec((column(), any::<bool>()), 0..6),
                filters in proptest::collection::vec((column(), "[ -~]{0,8}"), 0..6),
                grid in any::<bool>()
            ) {
                let mut state = QueryState::new();
                for (column, multi) in sorts {
                    if multi {
                        state.add_sort(column);
                    } else {
                        state.set_sort(column);
                    }
                }
                for (column, value) in &filters {
                    state.set_filter(*column, Some(value.as_str()));
                }
                if grid {
                    state.set_view_mode(ViewMode::Grid);
                }

                let encoded = state.to_query_string();
                let decoded = QueryState::from_query_str(&encoded).unwrap();
                prop_assert_eq!(&decoded, &state);
                prop_assert_eq!(decoded.to_query_string(), encoded);
            }
        }
    }
}
