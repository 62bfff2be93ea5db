//! HTTP handlers for the books module, mounted under `/api/books`.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    routing::get,
    Json, Router,
};
use bookshelf_http::error::AppError;
use serde_json::{json, Map, Value};

use super::models::{Book, BookId, BookPatch, CreateBook, ListQuery};
use super::service::BookService;

type JsonBody = Result<Json<Map<String, Value>>, JsonRejection>;

pub fn router(service: Arc<BookService>) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/health", get(health_check))
        .route("/{book_id}", axum::routing::put(update_book).delete(delete_book))
        .with_state(service)
}

async fn health_check() -> &'static str {
    "books module is healthy"
}

async fn list_books(
    State(service): State<Arc<BookService>>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Json<Vec<Book>>, AppError> {
    let query = ListQuery::from_params(params)?;
    let books = service.list(&query).await?;
    Ok(Json(books))
}

async fn create_book(
    State(service): State<Arc<BookService>>,
    payload: JsonBody,
) -> Result<Json<Book>, AppError> {
    let Json(body) = payload.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;

    let new_book = CreateBook::from_body(&body)?;
    let book = service.create(new_book).await?;
    Ok(Json(book))
}

async fn update_book(
    State(service): State<Arc<BookService>>,
    Path(book_id): Path<String>,
    payload: JsonBody,
) -> Result<Json<Book>, AppError> {
    let Json(body) = payload.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;

    let patch = BookPatch::from_body(body)?;
    let book = service.update(&BookId::from(book_id), patch).await?;
    Ok(Json(book))
}

async fn delete_book(
    State(service): State<Arc<BookService>>,
    Path(book_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    service.delete(&BookId::from(book_id)).await?;
    Ok(Json(json!({})))
}
