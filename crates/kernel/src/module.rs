use async_trait::async_trait;
use axum::Router;

use crate::settings::Settings;

/// What a module sees while it is initialized and started.
pub struct InitCtx<'a> {
    pub settings: &'a Settings,
}

impl<'a> InitCtx<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }
}

/// A unit of the application with its own lifecycle, routes and API docs.
///
/// Lifecycle: every module is `init`ed, then every module is `start`ed, then
/// the HTTP server runs; `stop` runs in reverse registration order on
/// shutdown. A failing `init` or `start` aborts the boot.
#[async_trait]
pub trait Module: Sync + Send {
    /// Unique name; also the route prefix `/api/{name}`.
    fn name(&self) -> &'static str;

    /// Check configuration and prepare resources. Nothing is served yet.
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Routes served under `/api/{name}`. Modules without routes are not mounted.
    fn routes(&self) -> Router {
        Router::new()
    }

    /// OpenAPI fragment (`paths` relative to the module prefix, plus
    /// `components.schemas`) merged into the service document.
    fn openapi(&self) -> Option<serde_json::Value> {
        None
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Release resources; persistent state must be flushed here.
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
