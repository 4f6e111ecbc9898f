//! Text renderings of the derived rows.

use time::macros::format_description;

use crate::dashboard::{Column, QueryState, ViewMode};
use crate::modules::books::models::Book;
use crate::utils::{cell_text, format_date, format_price};

pub const EMPTY_STATE: &str = "No results.";

/// A presentation of the visible rows. Views only read the state.
pub trait BookView: Send + Sync {
    fn render(&self, state: &QueryState, rows: &[Book]) -> String;
}

/// Aligned columns, the active sort marked in the header.
pub struct TableView;

/// One card per book.
pub struct GridView;

pub fn view_for(mode: ViewMode) -> &'static dyn BookView {
    match mode {
        ViewMode::Table => &TableView,
        ViewMode::Grid => &GridView,
    }
}

impl TableView {
    fn header(state: &QueryState, column: Column) -> String {
        match state.sort_for(column) {
            Some(entry) if entry.descending => format!("{} ↓", column.label()),
            Some(_) => format!("{} ↑", column.label()),
            None => column.label().to_string(),
        }
    }
}

impl BookView for TableView {
    fn render(&self, state: &QueryState, rows: &[Book]) -> String {
        let headers: Vec<String> = Column::ALL
            .iter()
            .map(|column| Self::header(state, *column))
            .collect();
        let cells: Vec<Vec<String>> = rows
            .iter()
            .map(|book| {
                Column::ALL
                    .iter()
                    .map(|column| cell_text(book, *column).into_owned())
                    .collect()
            })
            .collect();

        let widths: Vec<usize> = (0..Column::ALL.len())
            .map(|i| {
                cells
                    .iter()
                    .map(|row| row[i].chars().count())
                    .chain(std::iter::once(headers[i].chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let line = |values: &[String]| {
            values
                .iter()
                .zip(&widths)
                .map(|(value, width)| format!("{value:<width$}"))
                .collect::<Vec<_>>()
                .join(" | ")
                .trim_end()
                .to_string()
        };

        let mut out = vec![line(&headers)];
        out.push(
            widths
                .iter()
                .map(|width| "-".repeat(*width))
                .collect::<Vec<_>>()
                .join("-+-"),
        );
        if cells.is_empty() {
            out.push(EMPTY_STATE.to_string());
        } else {
            out.extend(cells.iter().map(|row| line(row)));
        }
        out.join("\n")
    }
}

impl BookView for GridView {
    fn render(&self, _state: &QueryState, rows: &[Book]) -> String {
        if rows.is_empty() {
            return EMPTY_STATE.to_string();
        }

        let long_date = format_description!("[month repr:long] [day padding:none], [year]");
        rows.iter()
            .map(|book| {
                let published = book
                    .published_at
                    .date()
                    .format(&long_date)
                    .unwrap_or_else(|_| format_date(book.published_at));
                let mut card = format!(
                    "{}\nby {}\n${} · {}",
                    book.title,
                    book.author,
                    format_price(book.price),
                    published
                );
                if let Some(description) = &book.description {
                    card.push('\n');
                    card.push_str(description);
                }
                card
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
