//! Owner-scoped CRUD over the book store.
//!
//! Every operation takes the caller explicitly. A record that exists but
//! belongs to another user produces exactly the same [`BookError::NotFound`]
//! as an id that was never issued.

use std::sync::Arc;

use shelf_authz::UserId;
use shelf_db::{BookStore, NewBookRecord, StoreError};
use shelf_http::AppError;
use thiserror::Error;

use super::models::{Book, BookPatch, CreateBook, FieldError};

#[derive(Debug, Error)]
pub enum BookError {
    #[error("invalid book input")]
    Validation(Vec<FieldError>),

    #[error("Book not found")]
    NotFound,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<BookError> for AppError {
    fn from(err: BookError) -> Self {
        match err {
            BookError::Validation(fields) => {
                let details = fields
                    .iter()
                    .map(|f| serde_json::json!({ "field": f.field, "message": f.message }))
                    .collect();
                AppError::validation(details, "Invalid book input")
            }
            BookError::NotFound => AppError::not_found("Book not found"),
            BookError::Store(err) => AppError::Internal(anyhow::Error::new(err)),
        }
    }
}

pub struct BookService {
    store: Arc<dyn BookStore>,
}

impl BookService {
    pub fn new(store: Arc<dyn BookStore>) -> Self {
        Self { store }
    }

    /// The caller's books, most recently updated first.
    pub async fn list_mine(&self, caller: &UserId) -> Result<Vec<Book>, BookError> {
        let records = self.store.find_many_by_owner(caller.as_str()).await?;
        Ok(records.into_iter().map(Book::from).collect())
    }

    pub async fn get_one(&self, caller: &UserId, id: &str) -> Result<Book, BookError> {
        match self.store.find_one(id, caller.as_str()).await? {
            Some(record) => Ok(record.into()),
            None => {
                tracing::debug!(owner = %caller, book_id = id, "book lookup missed");
                Err(BookError::NotFound)
            }
        }
    }

    pub async fn create(&self, caller: &UserId, input: CreateBook) -> Result<Book, BookError> {
        let valid = input.validate().map_err(BookError::Validation)?;

        let record = self
            .store
            .create(NewBookRecord {
                owner_id: caller.as_str().to_string(),
                title: valid.title,
                author: valid.author,
                description: valid.description,
                price: valid.price,
                published_at: valid.published_at,
            })
            .await?;

        tracing::info!(owner = %caller, book_id = %record.id, "book created");
        Ok(record.into())
    }

    /// Ownership is checked before the input is validated, so a foreign id
    /// never reveals anything about its record through validation errors.
    pub async fn update(
        &self,
        caller: &UserId,
        id: &str,
        patch: BookPatch,
    ) -> Result<Book, BookError> {
        self.get_one(caller, id).await?;

        let changes = patch.validate().map_err(BookError::Validation)?;

        // The record may have been deleted since the ownership check.
        let record = self
            .store
            .update(id, caller.as_str(), changes)
            .await?
            .ok_or(BookError::NotFound)?;

        tracing::info!(owner = %caller, book_id = id, "book updated");
        Ok(record.into())
    }

    pub async fn delete(&self, caller: &UserId, id: &str) -> Result<(), BookError> {
        if !self.store.delete(id, caller.as_str()).await? {
            tracing::debug!(owner = %caller, book_id = id, "book delete missed");
            return Err(BookError::NotFound);
        }

        tracing::info!(owner = %caller, book_id = id, "book deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelf_db::InMemoryBookStore;

    fn service() -> BookService {
        BookService::new(Arc::new(InMemoryBookStore::in_memory()))
    }

    fn alice() -> UserId {
        UserId::new("alice")
    }

    fn bob() -> UserId {
        UserId::new("bob")
    }

    fn dune() -> CreateBook {
        CreateBook {
            title: "Dune".to_string(),
            author: "Herbert".to_string(),
            description: None,
            price: Some(12.5),
            published_at: "1965-06-01".to_string(),
        }
    }

    #[tokio::test]
    async fn created_book_is_listed_for_its_owner_only() {
        let books = service();
        let created = books.create(&alice(), dune()).await.unwrap();
        assert_eq!(created.owner_id, "alice");

        let mine = books.list_mine(&alice()).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].title, "Dune");
        assert!(books.list_mine(&bob()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn foreign_missing_and_malformed_ids_are_all_not_found() {
        let books = service();
        let created = books.create(&alice(), dune()).await.unwrap();

        for id in [created.id.as_str(), "0190b3c0-0000-7000-8000-000000000000", "not-an-id"] {
            assert!(matches!(
                books.get_one(&bob(), id).await,
                Err(BookError::NotFound)
            ));
            assert!(matches!(
                books.update(&bob(), id, BookPatch::default()).await,
                Err(BookError::NotFound)
            ));
            assert!(matches!(
                books.delete(&bob(), id).await,
                Err(BookError::NotFound)
            ));
        }

        // Still intact for the owner.
        assert_eq!(books.get_one(&alice(), &created.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn foreign_update_with_invalid_input_is_still_not_found() {
        let books = service();
        let created = books.create(&alice(), dune()).await.unwrap();
        let bad = BookPatch {
            price: Some(0.0),
            ..Default::default()
        };
        assert!(matches!(
            books.update(&bob(), &created.id, bad).await,
            Err(BookError::NotFound)
        ));
    }

    #[tokio::test]
    async fn partial_update_keeps_unspecified_fields() {
        let books = service();
        let created = books
            .create(
                &alice(),
                CreateBook {
                    description: Some("Spice".to_string()),
                    ..dune()
                },
            )
            .await
            .unwrap();

        let updated = books
            .update(
                &alice(),
                &created.id,
                BookPatch {
                    price: Some(15.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.price, 15.0);
        assert_eq!(updated.title, created.title);
        assert_eq!(updated.author, created.author);
        assert_eq!(updated.description.as_deref(), Some("Spice"));
        assert_eq!(updated.published_at, created.published_at);
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.owner_id, created.owner_id);
    }

    #[tokio::test]
    async fn invalid_create_touches_nothing() {
        let books = service();
        let err = books
            .create(
                &alice(),
                CreateBook {
                    title: String::new(),
                    ..dune()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BookError::Validation(ref fields) if fields[0].field == "title"));
        assert!(books.list_mine(&alice()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleted_book_is_not_found() {
        let books = service();
        let created = books.create(&alice(), dune()).await.unwrap();
        books.delete(&alice(), &created.id).await.unwrap();

        assert!(matches!(
            books.get_one(&alice(), &created.id).await,
            Err(BookError::NotFound)
        ));
        assert!(matches!(
            books.delete(&alice(), &created.id).await,
            Err(BookError::NotFound)
        ));
    }

    #[test]
    fn errors_map_to_http_statuses() {
        use axum::http::StatusCode;

        let validation: AppError = BookError::Validation(vec![]).into();
        assert_eq!(validation.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let missing: AppError = BookError::NotFound.into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        let store: AppError = BookError::Store(StoreError::Io {
            path: std::path::PathBuf::from("books.json"),
            source: std::io::Error::other("disk full"),
        })
        .into();
        assert_eq!(store.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
