//! Recommendation output

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::book::Book;

/// Book suggested to a reader, with the strongest reason that applied
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Recommendation {
    #[serde(flatten)]
    pub book: Book,
    pub reason: String,
    /// Heuristic match percentage, capped at 95
    pub match_score: u32,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct RecommendationQuery {
    pub email: String,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct PredictionQuery {
    pub email: String,
    pub book_id: i32,
}

/// Likelihood in `[0, 0.95]` that a reader enjoys a book; 0 when either is unknown
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Prediction {
    pub email: String,
    pub book_id: i32,
    pub score: f64,
}
