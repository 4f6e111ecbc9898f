//! A caller's dashboard: query state bound to their record set.

use std::sync::Arc;

use async_trait::async_trait;
use shelf_authz::UserId;

use crate::dashboard::{derive_visible, view_for, Column, QueryState, ViewMode};
use crate::modules::books::models::{Book, BookPatch, CreateBook};
use crate::modules::books::service::{BookError, BookService};

/// Book operations already scoped to one caller.
#[async_trait]
pub trait BooksApi: Send + Sync {
    async fn list(&self) -> Result<Vec<Book>, BookError>;
    async fn create(&self, input: CreateBook) -> Result<Book, BookError>;
    async fn update(&self, id: &str, patch: BookPatch) -> Result<Book, BookError>;
    async fn delete(&self, id: &str) -> Result<(), BookError>;
}

/// [`BookService`] with a fixed caller.
pub struct CallerBooks {
    service: Arc<BookService>,
    caller: UserId,
}

impl CallerBooks {
    pub fn new(service: Arc<BookService>, caller: UserId) -> Self {
        Self { service, caller }
    }

    pub fn caller(&self) -> &UserId {
        &self.caller
    }
}

#[async_trait]
impl BooksApi for CallerBooks {
    async fn list(&self) -> Result<Vec<Book>, BookError> {
        self.service.list_mine(&self.caller).await
    }

    async fn create(&self, input: CreateBook) -> Result<Book, BookError> {
        self.service.create(&self.caller, input).await
    }

    async fn update(&self, id: &str, patch: BookPatch) -> Result<Book, BookError> {
        self.service.update(&self.caller, id, patch).await
    }

    async fn delete(&self, id: &str) -> Result<(), BookError> {
        self.service.delete(&self.caller, id).await
    }
}

/// Identifies one fetch. Only the most recently issued ticket is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket(u64);

pub struct Dashboard<A> {
    api: A,
    state: QueryState,
    records: Vec<Book>,
    visible: Vec<Book>,
    latest_ticket: u64,
    loading: bool,
    closed: bool,
}

impl<A: BooksApi> Dashboard<A> {
    pub fn new(api: A, state: QueryState) -> Self {
        Self {
            api,
            state,
            records: Vec::new(),
            visible: Vec::new(),
            latest_ticket: 0,
            loading: false,
            closed: false,
        }
    }

    pub fn state(&self) -> &QueryState {
        &self.state
    }

    /// The last fetched record set, in store order.
    pub fn records(&self) -> &[Book] {
        &self.records
    }

    pub fn visible(&self) -> &[Book] {
        &self.visible
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn share_link(&self) -> String {
        self.state.to_query_string()
    }

    pub fn render(&self) -> String {
        view_for(self.state.view_mode()).render(&self.state, &self.visible)
    }

    pub fn set_sort(&mut self, column: Column) {
        self.state.set_sort(column);
        self.rederive();
    }

    pub fn add_sort(&mut self, column: Column) {
        self.state.add_sort(column);
        self.rederive();
    }

    pub fn clear_sort(&mut self) {
        self.state.clear_sort();
        self.rederive();
    }

    pub fn set_filter(&mut self, column: Column, value: Option<&str>) {
        self.state.set_filter(column, value);
        self.rederive();
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.state.set_view_mode(mode);
    }

    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.latest_ticket += 1;
        self.loading = true;
        FetchTicket(self.latest_ticket)
    }

    /// Apply a fetch result. Returns `false` when the result was discarded
    /// because a newer fetch started or the dashboard was closed.
    pub fn finish_fetch(&mut self, ticket: FetchTicket, records: Vec<Book>) -> bool {
        if self.closed || ticket.0 != self.latest_ticket {
            tracing::debug!(ticket = ticket.0, latest = self.latest_ticket, "stale fetch discarded");
            return false;
        }
        self.loading = false;
        self.records = records;
        self.rederive();
        true
    }

    pub async fn refresh(&mut self) -> Result<(), BookError> {
        let ticket = self.begin_fetch();
        match self.api.list().await {
            Ok(records) => {
                self.finish_fetch(ticket, records);
                Ok(())
            }
            Err(err) => {
                if ticket.0 == self.latest_ticket {
                    self.loading = false;
                }
                Err(err)
            }
        }
    }

    /// The result is the mutation's own; a failed refetch afterwards only
    /// leaves the previous rows on screen.
    pub async fn create(&mut self, input: CreateBook) -> Result<Book, BookError> {
        let book = self.api.create(input).await?;
        self.refresh_after_mutation().await;
        Ok(book)
    }

    pub async fn update(&mut self, id: &str, patch: BookPatch) -> Result<Book, BookError> {
        let book = self.api.update(id, patch).await?;
        self.refresh_after_mutation().await;
        Ok(book)
    }

    pub async fn delete(&mut self, id: &str) -> Result<(), BookError> {
        self.api.delete(id).await?;
        self.refresh_after_mutation().await;
        Ok(())
    }

    async fn refresh_after_mutation(&mut self) {
        if let Err(err) = self.refresh().await {
            tracing::warn!(error = %err, "refetch after mutation failed; rows are stale");
        }
    }

    /// Stop accepting fetch results.
    pub fn close(&mut self) {
        self.closed = true;
        self.loading = false;
    }

    fn rederive(&mut self) {
        self.visible = derive_visible(&self.state, &self.records);
    }
}
