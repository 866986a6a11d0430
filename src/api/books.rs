//! Catalog endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::book::{BookQuery, BookView},
    AppState,
};

/// Search the catalog
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(BookQuery),
    responses(
        (status = 200, description = "Matching books with availability", body = Vec<BookView>)
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<BookQuery>,
) -> AppResult<Json<Vec<BookView>>> {
    let books = state.services.catalog.search_views(&query).await?;
    Ok(Json(books))
}

/// Get a book by id
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book details", body = BookView),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<BookView>> {
    let book = state.services.catalog.get_view(id).await?;
    Ok(Json(book))
}

/// Look a book up by barcode or ISBN
#[utoipa::path(
    get,
    path = "/books/barcode/{code}",
    tag = "books",
    params(
        ("code" = String, Path, description = "Barcode or ISBN, dashes allowed")
    ),
    responses(
        (status = 200, description = "Book details", body = BookView),
        (status = 404, description = "No book with this code", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_book_by_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<BookView>> {
    let book = state.services.catalog.get_view_by_code(&code).await?;
    Ok(Json(book))
}
