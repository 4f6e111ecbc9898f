pub mod models;
pub mod routes;
pub mod service;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use serde_json::{json, Value};
use shelf_kernel::{InitCtx, Module};
use utoipa::{PartialSchema, ToSchema};

use self::models::{Book, BookPatch, CreateBook};
use self::routes::{BooksState, DashboardPage};
use crate::dashboard::ViewMode;

/// The user's personal book catalog: CRUD plus the dashboard view.
pub struct BooksModule {
    state: BooksState,
}

impl BooksModule {
    pub fn new(state: BooksState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.state.clone())
    }

    fn openapi(&self) -> Option<Value> {
        Some(json!({
            "paths": {
                "/": {
                    "get": operation("List the caller's books", None, json!({
                        "200": json_response("The caller's books", json!({
                            "type": "array",
                            "items": schema_ref("Book")
                        }))
                    })),
                    "post": operation("Create a book owned by the caller", Some("CreateBook"), json!({
                        "201": json_response("Created book", schema_ref("Book")),
                        "422": error_response("Invalid book input")
                    }))
                },
                "/{id}": {
                    "parameters": [id_parameter()],
                    "get": operation("Fetch one of the caller's books", None, json!({
                        "200": json_response("The book", schema_ref("Book")),
                        "404": error_response("Book not found")
                    })),
                    "patch": operation("Partially update one of the caller's books", Some("BookPatch"), json!({
                        "200": json_response("Updated book", schema_ref("Book")),
                        "404": error_response("Book not found"),
                        "422": error_response("Invalid book input")
                    })),
                    "delete": operation("Delete one of the caller's books", None, json!({
                        "204": { "description": "Deleted" },
                        "404": error_response("Book not found")
                    }))
                },
                "/dashboard": {
                    "get": operation("Filtered, sorted and rendered view of the caller's books", None, json!({
                        "200": json_response("Dashboard page", schema_ref("DashboardPage")),
                        "400": error_response("Malformed query state")
                    }))
                },
                "/health": {
                    "get": {
                        "summary": "Books health check",
                        "tags": ["Books"],
                        "security": [],
                        "responses": {
                            "200": {
                                "description": "OK",
                                "content": { "text/plain": { "schema": { "type": "string" } } }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": schema::<Book>(),
                    "CreateBook": schema::<CreateBook>(),
                    "BookPatch": schema::<BookPatch>(),
                    "DashboardPage": schema::<DashboardPage>(),
                    "ViewMode": schema::<ViewMode>()
                }
            }
        }))
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

fn schema<T: ToSchema>() -> Value {
    serde_json::to_value(<T as PartialSchema>::schema()).unwrap_or_default()
}

fn schema_ref(name: &str) -> Value {
    json!({ "$ref": format!("#/components/schemas/{name}") })
}

fn json_response(description: &str, schema: Value) -> Value {
    json!({
        "description": description,
        "content": { "application/json": { "schema": schema } }
    })
}

fn error_response(description: &str) -> Value {
    json_response(description, schema_ref("ErrorResponse"))
}

fn id_parameter() -> Value {
    json!({
        "name": "id",
        "in": "path",
        "required": true,
        "schema": { "type": "string" }
    })
}

/// An authenticated books operation; every one of them may answer 401.
fn operation(summary: &str, body: Option<&str>, mut responses: Value) -> Value {
    responses["401"] = error_response("Missing or unknown session");
    let mut op = json!({
        "summary": summary,
        "tags": ["Books"],
        "responses": responses
    });
    if let Some(body) = body {
        op["requestBody"] = json!({
            "required": true,
            "content": { "application/json": { "schema": schema_ref(body) } }
        });
    }
    op
}

/// Create the books module around its route state.
pub fn create_module(state: BooksState) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(state))
}
