//! Display formatting shared by the dashboard filters and views.

use std::borrow::Cow;

use time::OffsetDateTime;

use crate::dashboard::Column;
use crate::modules::books::models::Book;

pub fn format_price(price: f64) -> String {
    format!("{price:.2}")
}

/// Calendar date of a timestamp, `YYYY-MM-DD`.
pub fn format_date(at: OffsetDateTime) -> String {
    at.date().to_string()
}

/// Text of a book's cell in `column`, as shown by the table view.
pub fn cell_text(book: &Book, column: Column) -> Cow<'_, str> {
    match column {
        Column::Title => Cow::Borrowed(&book.title),
        Column::Author => Cow::Borrowed(&book.author),
        Column::Price => Cow::Owned(format_price(book.price)),
        Column::PublishedAt => Cow::Owned(format_date(book.published_at)),
    }
}
