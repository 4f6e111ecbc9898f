use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A stored book document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookRecord {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub price: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    /// Store-wide write counter at the time of the last write.
    pub revision: u64,
}

/// Fields of a record about to be inserted; the store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBookRecord {
    pub owner_id: String,
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub price: f64,
    pub published_at: OffsetDateTime,
}

/// Field replacements for an update. `None` leaves a field untouched;
/// `description: Some(None)` clears the description.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookChanges {
    pub title: Option<String>,
    pub author: Option<String>,
    pub description: Option<Option<String>>,
    pub price: Option<f64>,
    pub published_at: Option<OffsetDateTime>,
}

impl BookChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.published_at.is_none()
    }

    /// Apply the changes in place. `id` and `owner_id` are never touched.
    pub(crate) fn apply_to(self, record: &mut BookRecord) {
        if let Some(title) = self.title {
            record.title = title;
        }
        if let Some(author) = self.author {
            record.author = author;
        }
        if let Some(description) = self.description {
            record.description = description;
        }
        if let Some(price) = self.price {
            record.price = price;
        }
        if let Some(published_at) = self.published_at {
            record.published_at = published_at;
        }
    }
}
