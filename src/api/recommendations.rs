use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::recommendation::{Prediction, PredictionQuery, Recommendation, RecommendationQuery},
    AppState,
};

/// Reading suggestions for a student
#[utoipa::path(
    get,
    path = "/recommendations",
    tag = "recommendations",
    params(RecommendationQuery),
    responses(
        (status = 200, description = "Up to five available books, best match first", body = Vec<Recommendation>)
    )
)]
pub async fn get_recommendations(
    State(state): State<AppState>,
    Query(query): Query<RecommendationQuery>,
) -> AppResult<Json<Vec<Recommendation>>> {
    let recommendations = state.services.recommendations.recommend(&query.email).await?;
    Ok(Json(recommendations))
}

/// Preference score of one reader for one book
#[utoipa::path(
    get,
    path = "/recommendations/predict",
    tag = "recommendations",
    params(PredictionQuery),
    responses(
        (status = 200, description = "Preference score", body = Prediction)
    )
)]
pub async fn predict_preference(
    State(state): State<AppState>,
    Query(query): Query<PredictionQuery>,
) -> Json<Prediction> {
    let score = state
        .services
        .recommendations
        .predict(&query.email, query.book_id);
    Json(Prediction {
        email: query.email,
        book_id: query.book_id,
        score,
    })
}
