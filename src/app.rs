//! Application bootstrap: wires the store, sessions and modules together.

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use shelf_authz::{AuthzModule, SessionResolver, StaticSessions};
use shelf_db::{InMemoryBookStore, StoreModule};
use shelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

use crate::dashboard::{CallerBooks, Dashboard, QueryState};
use crate::modules::{self, books::routes::BooksState, books::service::BookService};

pub struct Application {
    registry: ModuleRegistry,
    books: Arc<BookService>,
    sessions: Arc<StaticSessions>,
}

impl Application {
    /// Open the store and register every module. Nothing is started yet.
    pub async fn build(settings: &Settings) -> anyhow::Result<Self> {
        let store: Arc<InMemoryBookStore> = Arc::new(
            shelf_db::open(&settings.database)
                .await
                .context("failed to open the book store")?,
        );
        let sessions = Arc::new(StaticSessions::from_settings(&settings.auth));
        let books = Arc::new(BookService::new(store.clone()));

        let mut registry = ModuleRegistry::new();
        registry.register_core(Arc::new(StoreModule::new(store)));
        registry.register_core(Arc::new(AuthzModule::new(sessions.clone())));
        modules::register_all(
            &mut registry,
            BooksState {
                service: books.clone(),
                sessions: sessions.clone(),
            },
        );

        Ok(Self {
            registry,
            books,
            sessions,
        })
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn books(&self) -> Arc<BookService> {
        self.books.clone()
    }

    pub fn router(&self, settings: &Settings) -> Router {
        shelf_http::build_router(&self.registry, settings)
    }

    /// Load the dashboard of the user behind `token`.
    pub async fn dashboard(
        &self,
        token: &str,
        state: QueryState,
    ) -> anyhow::Result<Dashboard<CallerBooks>> {
        let caller = self
            .sessions
            .resolve(token)
            .await
            .context("session token was not accepted")?;

        let mut dashboard = Dashboard::new(CallerBooks::new(self.books(), caller), state);
        dashboard
            .refresh()
            .await
            .context("failed to load the caller's books")?;
        Ok(dashboard)
    }

    /// Run the module lifecycle around the HTTP server until Ctrl-C.
    pub async fn serve(&self, settings: &Settings) -> anyhow::Result<()> {
        let ctx = InitCtx::new(settings);
        self.registry.init_all(&ctx).await?;
        self.registry.start_all(&ctx).await?;

        let served = shelf_http::start_server(&self.registry, settings, shutdown_signal()).await;

        self.registry.stop_all().await?;
        served
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(err) => tracing::error!(error = %err, "failed to listen for the shutdown signal"),
    }
}
