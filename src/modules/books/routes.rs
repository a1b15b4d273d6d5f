//! HTTP handlers for the catalog, one store operation per request.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use libris_http::error::AppError;
use libris_http::extract::{AppJson, AppPath};

use super::models::{BookForm, BookView, BorrowRequest, ReturnRequest};
use super::store::{CatalogError, CatalogStore};

type ApiResult<T> = Result<T, AppError>;

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        let message = err.to_string();
        match err {
            CatalogError::NotFound { .. } => AppError::not_found(message),
            CatalogError::Validation { field, message: reason } => AppError::validation(
                vec![json!({ "field": field, "error": reason })],
                message,
            ),
            CatalogError::Database(e) => AppError::Internal(anyhow::Error::new(e)),
        }
    }
}

/// Catalog routes, relative to the module mount point.
pub fn router(store: CatalogStore) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/health", get(health_check))
        .route(
            "/{id}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .route("/{id}/borrow", post(borrow_book))
        .route("/{id}/return", post(return_book))
        .route("/{id}/pay", post(pay_fine))
        .with_state(store)
}

async fn health_check() -> &'static str {
    "books module is healthy"
}

async fn list_books(State(store): State<CatalogStore>) -> ApiResult<Json<Vec<BookView>>> {
    let books = store.list().await?;
    Ok(Json(books.into_iter().map(BookView::from).collect()))
}

async fn create_book(
    State(store): State<CatalogStore>,
    AppJson(form): AppJson<BookForm>,
) -> ApiResult<(StatusCode, Json<BookView>)> {
    let book = store.create(&form).await?;
    Ok((StatusCode::CREATED, Json(book.into())))
}

async fn get_book(
    State(store): State<CatalogStore>,
    AppPath(id): AppPath<i64>,
) -> ApiResult<Json<BookView>> {
    Ok(Json(store.get(id).await?.into()))
}

async fn update_book(
    State(store): State<CatalogStore>,
    AppPath(id): AppPath<i64>,
    AppJson(form): AppJson<BookForm>,
) -> ApiResult<Json<BookView>> {
    Ok(Json(store.update(id, &form).await?.into()))
}

async fn delete_book(
    State(store): State<CatalogStore>,
    AppPath(id): AppPath<i64>,
) -> ApiResult<StatusCode> {
    store.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn borrow_book(
    State(store): State<CatalogStore>,
    AppPath(id): AppPath<i64>,
    AppJson(request): AppJson<BorrowRequest>,
) -> ApiResult<Json<BookView>> {
    Ok(Json(store.borrow(id, &request.borrow_date).await?.into()))
}

async fn return_book(
    State(store): State<CatalogStore>,
    AppPath(id): AppPath<i64>,
    AppJson(request): AppJson<ReturnRequest>,
) -> ApiResult<Json<BookView>> {
    Ok(Json(store.return_book(id, &request.return_date).await?.into()))
}

async fn pay_fine(
    State(store): State<CatalogStore>,
    AppPath(id): AppPath<i64>,
) -> ApiResult<Json<BookView>> {
    Ok(Json(store.pay_fine(id).await?.into()))
}
