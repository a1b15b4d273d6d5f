pub mod fine;
pub mod models;
pub mod routes;
pub mod store;

use async_trait::async_trait;
use axum::Router;
use libris_kernel::{InitCtx, Migration, Module};
use once_cell::sync::OnceCell;

use fine::FinePolicy;
use store::CatalogStore;

/// Table backing the catalog.
pub const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS books (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        title       TEXT NOT NULL,
        author      TEXT NOT NULL,
        year        INTEGER,
        borrow_date TEXT,
        return_date TEXT,
        fine        REAL NOT NULL DEFAULT 0.0 CHECK (fine >= 0)
    );
"#;

/// Book inventory, loans and fines
pub struct BooksModule {
    store: OnceCell<CatalogStore>,
}

impl BooksModule {
    pub const fn new() -> Self {
        Self {
            store: OnceCell::new(),
        }
    }

    /// The catalog store, available once the module is initialized
    pub fn store(&self) -> Option<&CatalogStore> {
        self.store.get()
    }
}

impl Default for BooksModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let policy = FinePolicy::from(&ctx.settings.fines);
        self.store
            .set(CatalogStore::new(ctx.db.clone(), policy))
            .map_err(|_| anyhow::anyhow!("books module initialized twice"))?;

        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            rate_per_day = policy.rate_per_day,
            grace_days = policy.grace_days,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        match self.store.get() {
            Some(store) => routes::router(store.clone()),
            None => {
                tracing::warn!(module = self.name(), "routes requested before init");
                Router::new()
            }
        }
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi_fragment())
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_init",
            up: SCHEMA,
        }]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        if let Some(store) = self.store.get() {
            let books = store.count().await?;
            tracing::info!(module = self.name(), books, "books module started");
        }
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create a new instance of the books module
pub fn create_module() -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(BooksModule::new())
}

fn openapi_fragment() -> serde_json::Value {
    let error = |description: &str| {
        serde_json::json!({
            "description": description,
            "content": {
                "application/json": {
                    "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                }
            }
        })
    };
    let book = |description: &str| {
        serde_json::json!({
            "description": description,
            "content": {
                "application/json": {
                    "schema": { "$ref": "#/components/schemas/Book" }
                }
            }
        })
    };
    let id_param = serde_json::json!([{
        "name": "id",
        "in": "path",
        "required": true,
        "schema": { "type": "integer", "format": "int64" }
    }]);
    let body = |schema: &str| {
        serde_json::json!({
            "required": true,
            "content": {
                "application/json": {
                    "schema": { "$ref": format!("#/components/schemas/{schema}") }
                }
            }
        })
    };

    serde_json::json!({
        "paths": {
            "/": {
                "get": {
                    "summary": "List books in insertion order",
                    "tags": ["Books"],
                    "responses": {
                        "200": {
                            "description": "All books",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "array",
                                        "items": { "$ref": "#/components/schemas/Book" }
                                    }
                                }
                            }
                        },
                        "500": error("Internal server error")
                    }
                },
                "post": {
                    "summary": "Add a book",
                    "tags": ["Books"],
                    "requestBody": body("BookForm"),
                    "responses": {
                        "201": book("Book created"),
                        "422": error("Title or author missing")
                    }
                }
            },
            "/{id}": {
                "parameters": id_param.clone(),
                "get": {
                    "summary": "Get a book",
                    "tags": ["Books"],
                    "responses": {
                        "200": book("The book"),
                        "404": error("Book not found")
                    }
                },
                "put": {
                    "summary": "Edit title, author and year",
                    "tags": ["Books"],
                    "requestBody": body("BookForm"),
                    "responses": {
                        "200": book("Book updated"),
                        "404": error("Book not found"),
                        "422": error("Title or author missing")
                    }
                },
                "delete": {
                    "summary": "Delete a book (no-op if absent)",
                    "tags": ["Books"],
                    "responses": {
                        "204": { "description": "Deleted" }
                    }
                }
            },
            "/{id}/borrow": {
                "parameters": id_param.clone(),
                "post": {
                    "summary": "Start a loan; clears fine and return date",
                    "tags": ["Books"],
                    "requestBody": body("BorrowRequest"),
                    "responses": {
                        "200": book("Book on loan"),
                        "404": error("Book not found"),
                        "422": error("Malformed date")
                    }
                }
            },
            "/{id}/return": {
                "parameters": id_param.clone(),
                "post": {
                    "summary": "End the loan and charge the overdue fine",
                    "tags": ["Books"],
                    "requestBody": body("ReturnRequest"),
                    "responses": {
                        "200": book("Book returned"),
                        "404": error("Book not found"),
                        "422": error("Malformed date")
                    }
                }
            },
            "/{id}/pay": {
                "parameters": id_param,
                "post": {
                    "summary": "Settle the outstanding fine",
                    "tags": ["Books"],
                    "responses": {
                        "200": book("Fine cleared"),
                        "404": error("Book not found")
                    }
                }
            },
            "/health": {
                "get": {
                    "summary": "Books health check",
                    "tags": ["Books"],
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
                "Book": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "integer", "format": "int64" },
                        "title": { "type": "string" },
                        "author": { "type": "string" },
                        "year": { "type": "integer", "nullable": true },
                        "borrow_date": { "type": "string", "format": "date", "nullable": true },
                        "return_date": { "type": "string", "format": "date", "nullable": true },
                        "fine": { "type": "number", "minimum": 0 },
                        "status": {
                            "type": "string",
                            "enum": ["available", "on_loan", "returned"]
                        }
                    },
                    "required": ["id", "title", "author", "fine", "status"]
                },
                "BookForm": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string", "minLength": 1 },
                        "author": { "type": "string", "minLength": 1 },
                        "year": { "type": "integer", "nullable": true }
                    },
                    "required": ["title", "author"]
                },
                "BorrowRequest": {
                    "type": "object",
                    "properties": {
                        "borrow_date": { "type": "string", "format": "date" }
                    },
                    "required": ["borrow_date"]
                },
                "ReturnRequest": {
                    "type": "object",
                    "properties": {
                        "return_date": { "type": "string", "format": "date" }
                    },
                    "required": ["return_date"]
                }
            }
        }
    })
}
