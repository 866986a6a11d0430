//! Catalog book model

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Immutable catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub genre: String,
    pub barcode: String,
    pub published_year: Option<i32>,
    pub description: Option<String>,
}

/// Book with availability derived from the loan ledger
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookView {
    #[serde(flatten)]
    pub book: Book,
    pub available: bool,
    /// Name of the active student holding the book, if any
    pub borrowed_by: Option<String>,
}

/// Catalog search parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    /// Matches title, author or genre (case-insensitive) or ISBN
    pub q: Option<String>,
    /// Only return books nobody is holding
    pub available_only: Option<bool>,
}
