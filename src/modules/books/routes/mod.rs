//! HTTP handlers for `/api/books`.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, FromRef, Path, RawQuery, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use shelf_authz::{CurrentUser, SessionResolver};
use shelf_http::AppError;
use utoipa::ToSchema;

use super::models::{Book, BookPatch, CreateBook};
use super::service::BookService;
use crate::dashboard::{derive_visible, view_for, QueryState, ViewMode};

/// Shared state of the books routes.
#[derive(Clone)]
pub struct BooksState {
    pub service: Arc<BookService>,
    pub sessions: Arc<dyn SessionResolver>,
}

impl FromRef<BooksState> for Arc<dyn SessionResolver> {
    fn from_ref(state: &BooksState) -> Self {
        state.sessions.clone()
    }
}

/// Dashboard payload: the caller's visible rows for one query state.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardPage {
    /// Canonical shareable query string
    pub query: String,
    pub view_mode: ViewMode,
    /// Number of the caller's books before filtering
    pub total: usize,
    pub books: Vec<Book>,
    /// Text rendering in the selected view
    pub rendered: String,
}

pub fn router(state: BooksState) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/health", get(health_check))
        .route("/dashboard", get(dashboard))
        .route(
            "/{id}",
            get(get_book).patch(update_book).delete(delete_book),
        )
        .with_state(state)
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AppError::bad_request(rejection.body_text()))
}

async fn health_check() -> &'static str {
    "books module is healthy"
}

async fn list_books(
    State(state): State<BooksState>,
    CurrentUser(caller): CurrentUser,
) -> Result<Json<Vec<Book>>, AppError> {
    Ok(Json(state.service.list_mine(&caller).await?))
}

async fn get_book(
    State(state): State<BooksState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Book>, AppError> {
    Ok(Json(state.service.get_one(&caller, &id).await?))
}

async fn create_book(
    State(state): State<BooksState>,
    CurrentUser(caller): CurrentUser,
    payload: Result<Json<CreateBook>, JsonRejection>,
) -> Result<(StatusCode, Json<Book>), AppError> {
    let input = json_body(payload)?;
    let book = state.service.create(&caller, input).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

async fn update_book(
    State(state): State<BooksState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<String>,
    payload: Result<Json<BookPatch>, JsonRejection>,
) -> Result<Json<Book>, AppError> {
    let patch = json_body(payload)?;
    Ok(Json(state.service.update(&caller, &id, patch).await?))
}

async fn delete_book(
    State(state): State<BooksState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.service.delete(&caller, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn dashboard(
    State(state): State<BooksState>,
    CurrentUser(caller): CurrentUser,
    RawQuery(query): RawQuery,
) -> Result<Json<DashboardPage>, AppError> {
    let query_state = QueryState::from_query_str(query.as_deref().unwrap_or_default())
        .map_err(|err| AppError::bad_request(err.to_string()))?;

    let records = state.service.list_mine(&caller).await?;
    let books = derive_visible(&query_state, &records);
    let rendered = view_for(query_state.view_mode()).render(&query_state, &books);

    Ok(Json(DashboardPage {
        query: query_state.to_query_string(),
        view_mode: query_state.view_mode(),
        total: records.len(),
        books,
        rendered,
    }))
}
