//! Query-state controller for the books dashboard.

mod pipeline;
mod query_state;
mod session;
mod view;

pub use pipeline::{compare, derive_visible, matches_filters};
pub use query_state::{Column, QueryState, QueryStateError, SortEntry, ViewMode};
pub use session::{BooksApi, CallerBooks, Dashboard, FetchTicket};
pub use view::{view_for, BookView, GridView, TableView, EMPTY_STATE};
