//! Libris application library
//!
//! Wires the catalog modules onto the kernel, database, and HTTP crates.

pub mod modules;

use anyhow::Context;
use sqlx::SqlitePool;

use libris_kernel::{settings::Settings, InitCtx, ModuleRegistry};

/// Modules registered and initialized against an open database
pub struct App {
    pub settings: Settings,
    pub db: SqlitePool,
    pub registry: ModuleRegistry,
}

impl App {
    /// Open the database, apply every module's schema and initialize modules
    pub async fn bootstrap(settings: Settings) -> anyhow::Result<Self> {
        let db = libris_db::connect(&settings.database)
            .await
            .context("failed to connect to database")?;

        let mut registry = ModuleRegistry::new();
        modules::register_all(&mut registry)?;

        libris_db::apply_migrations(&db, &registry.collect_migrations())
            .await
            .context("failed to apply schema")?;

        let ctx = InitCtx {
            settings: &settings,
            db: &db,
        };
        registry.init_modules(&ctx).await?;

        Ok(Self {
            settings,
            db,
            registry,
        })
    }

    /// Router with every module mounted, as served by [`App::serve`]
    pub fn router(&self) -> axum::Router {
        libris_http::build_router(&self.registry, &self.settings)
    }

    /// Start modules, serve HTTP until shutdown, then stop modules
    pub async fn serve(self) -> anyhow::Result<()> {
        let ctx = InitCtx {
            settings: &self.settings,
            db: &self.db,
        };
        self.registry.start_modules(&ctx).await?;

        let served = libris_http::start_server(&self.registry, &self.settings).await;

        self.registry.stop_modules().await?;
        self.db.close().await;
        served
    }
}

/// Bootstrap and serve until shutdown
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.url,
        "libris bootstrap starting"
    );

    let app = App::bootstrap(settings).await?;
    tracing::info!(modules = app.registry.len(), "libris bootstrap complete");

    app.serve().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    fn memory_settings() -> Settings {
        let mut settings = Settings::default();
        settings.database.url = "sqlite::memory:".to_string();
        settings
    }

    #[tokio::test]
    async fn books_are_served_under_api_prefix() {
        let app = App::bootstrap(memory_settings()).await.unwrap();
        let router = app.router();

        let response = router
            .clone()
            .oneshot(
                Request::post("/api/books")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"title":"Dune","author":"Frank Herbert"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(response.headers().contains_key("x-request-id"));

        let response = router
            .oneshot(Request::get("/api/books/1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn collection_is_served_on_bare_mount_path() {
        let app = App::bootstrap(memory_settings()).await.unwrap();
        let router = app.router();

        let response = router
            .clone()
            .oneshot(
                Request::post("/api/books")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"title":"Emma","author":"Jane Austen"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = router
            .clone()
            .oneshot(Request::get("/api/books").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let books: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(books[0]["title"], "Emma");

        let response = router
            .oneshot(Request::get("/api/books/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn openapi_lists_book_routes() {
        let app = App::bootstrap(memory_settings()).await.unwrap();

        let response = app
            .router()
            .oneshot(Request::get("/docs/openapi.json").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let spec: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert!(spec["paths"]["/api/books"]["post"].is_object());
        assert!(spec["paths"]["/api/books/{id}/return"]["post"].is_object());
    }
}
