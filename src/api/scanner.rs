//! Barcode scanning endpoints

use axum::{extract::State, Json};

use crate::{
    error::AppResult,
    models::scan::{ManualScanRequest, ScanOutcome, ScanRecord},
    AppState,
};

/// Open the camera and wait for one barcode
#[utoipa::path(
    post,
    path = "/scanner/scan",
    tag = "scanner",
    responses(
        (status = 200, description = "Detected code and matching book", body = ScanOutcome),
        (status = 400, description = "Camera unavailable or no code detected", body = crate::error::ErrorResponse)
    )
)]
pub async fn scan(State(state): State<AppState>) -> AppResult<Json<ScanOutcome>> {
    let outcome = state.services.scanner.scan_once().await?;
    Ok(Json(outcome))
}

/// Typed barcode entry
#[utoipa::path(
    post,
    path = "/scanner/manual",
    tag = "scanner",
    request_body = ManualScanRequest,
    responses(
        (status = 200, description = "Entered code and matching book", body = ScanOutcome),
        (status = 400, description = "Empty code", body = crate::error::ErrorResponse)
    )
)]
pub async fn manual_entry(
    State(state): State<AppState>,
    Json(request): Json<ManualScanRequest>,
) -> AppResult<Json<ScanOutcome>> {
    let outcome = state.services.scanner.manual(&request.code).await?;
    Ok(Json(outcome))
}

#[utoipa::path(
    get,
    path = "/scanner/history",
    tag = "scanner",
    responses(
        (status = 200, description = "Scanned codes, newest first", body = Vec<ScanRecord>)
    )
)]
pub async fn scan_history(State(state): State<AppState>) -> AppResult<Json<Vec<ScanRecord>>> {
    Ok(Json(state.services.scanner.history().await))
}
