use serde::{Deserialize, Serialize};
use shelf_db::{BookChanges, BookRecord};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime,
};
use utoipa::ToSchema;

/// A book as returned by the books API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Unique identifier for the book
    pub id: String,
    /// User who created the record
    pub owner_id: String,
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub price: f64,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub published_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: OffsetDateTime,
}

impl From<BookRecord> for Book {
    fn from(record: BookRecord) -> Self {
        Self {
            id: record.id,
            owner_id: record.owner_id,
            title: record.title,
            author: record.author,
            description: record.description,
            price: record.price,
            published_at: record.published_at,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Request model for creating a new book.
///
/// Every field defaults so that missing fields surface as field errors
/// instead of a body rejection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBook {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    /// `YYYY-MM-DD` or an RFC 3339 timestamp
    #[serde(default)]
    pub published_at: String,
}

/// Partial update: absent fields stay untouched, `description: null` clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
}

/// One rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

impl FieldError {
    const fn new(field: &'static str, message: &'static str) -> Self {
        Self { field, message }
    }
}

/// Create input after validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidBook {
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub price: f64,
    pub published_at: OffsetDateTime,
}

impl CreateBook {
    /// Check every field, reporting all failures at once.
    pub fn validate(self) -> Result<ValidBook, Vec<FieldError>> {
        let mut errors = Vec::new();

        let title = required_text(self.title, "title", "Title is required", &mut errors);
        let author = required_text(self.author, "author", "Author is required", &mut errors);
        let price = match self.price {
            Some(price) => check_price(price, &mut errors),
            None => {
                errors.push(FieldError::new("price", "Price is required"));
                None
            }
        };
        let published_at = match parse_published_at(&self.published_at) {
            Ok(date) => Some(date),
            Err(err) => {
                errors.push(err);
                None
            }
        };

        match (title, author, price, published_at) {
            (Some(title), Some(author), Some(price), Some(published_at)) if errors.is_empty() => {
                Ok(ValidBook {
                    title,
                    author,
                    description: normalize_description(self.description),
                    price,
                    published_at,
                })
            }
            _ => Err(errors),
        }
    }
}

impl BookPatch {
    /// Validate the supplied fields and turn them into store changes.
    pub fn validate(self) -> Result<BookChanges, Vec<FieldError>> {
        let mut errors = Vec::new();

        let title = self
            .title
            .and_then(|t| required_text(t, "title", "Title is required", &mut errors));
        let author = self
            .author
            .and_then(|a| required_text(a, "author", "Author is required", &mut errors));
        let price = self.price.and_then(|p| check_price(p, &mut errors));
        let published_at = match self.published_at.as_deref().map(parse_published_at) {
            Some(Ok(date)) => Some(date),
            Some(Err(err)) => {
                errors.push(err);
                None
            }
            None => None,
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(BookChanges {
            title,
            author,
            description: self.description.map(normalize_description),
            price,
            published_at,
        })
    }
}

fn required_text(
    value: String,
    field: &'static str,
    message: &'static str,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    if value.trim().is_empty() {
        errors.push(FieldError::new(field, message));
        None
    } else {
        Some(value)
    }
}

fn check_price(price: f64, errors: &mut Vec<FieldError>) -> Option<f64> {
    if price.is_finite() && price >= 1.0 {
        Some(price)
    } else {
        errors.push(FieldError::new("price", "Price must be at least 1"));
        None
    }
}

/// Blank descriptions are stored as absent.
fn normalize_description(description: Option<String>) -> Option<String> {
    description.filter(|d| !d.trim().is_empty())
}

/// Parse a publication date: `YYYY-MM-DD` (midnight UTC) or RFC 3339.
pub fn parse_published_at(raw: &str) -> Result<OffsetDateTime, FieldError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(FieldError::new("publishedAt", "Published date is required"));
    }

    let calendar_date = format_description!("[year]-[month]-[day]");
    if let Ok(date) = Date::parse(raw, &calendar_date) {
        return Ok(date.midnight().assume_utc());
    }

    OffsetDateTime::parse(raw, &Rfc3339)
        .map_err(|_| FieldError::new("publishedAt", "Published date must be a valid date"))
}
