//! Librarian dashboard endpoints: students and overdue tracking

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{
        loan::OverdueEntry,
        user::{RegisteredStudent, Student},
    },
    services::sweep::SweepReport,
    AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct OverdueAlertRequest {
    pub email: String,
    pub title: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OverdueAlertResponse {
    /// False when the student has no mobile number on file
    pub queued: bool,
}

/// Students with an active desk session
#[utoipa::path(
    get,
    path = "/students",
    tag = "students",
    responses(
        (status = 200, description = "Active students", body = Vec<Student>)
    )
)]
pub async fn list_students(State(state): State<AppState>) -> AppResult<Json<Vec<Student>>> {
    let students = state.services.loans.active_students().await?;
    Ok(Json(students))
}

/// Every student who has registered an account
#[utoipa::path(
    get,
    path = "/students/registered",
    tag = "students",
    responses(
        (status = 200, description = "Registered students", body = Vec<RegisteredStudent>)
    )
)]
pub async fn list_registered(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<RegisteredStudent>>> {
    let students = state.services.accounts.registered_students().await?;
    Ok(Json(students))
}

/// Overdue report
#[utoipa::path(
    get,
    path = "/overdue",
    tag = "students",
    responses(
        (status = 200, description = "Overdue loans of active students", body = Vec<OverdueEntry>)
    )
)]
pub async fn overdue_report(State(state): State<AppState>) -> AppResult<Json<Vec<OverdueEntry>>> {
    let entries = state.services.loans.overdue_report().await?;
    Ok(Json(entries))
}

/// Run the overdue sweep now
#[utoipa::path(
    post,
    path = "/overdue/check",
    tag = "students",
    responses(
        (status = 200, description = "Sweep summary", body = SweepReport)
    )
)]
pub async fn run_overdue_check(State(state): State<AppState>) -> AppResult<Json<SweepReport>> {
    let report = state.services.sweep.run().await?;
    Ok(Json(report))
}

/// Send an overdue reminder for one loan
#[utoipa::path(
    post,
    path = "/overdue/alert",
    tag = "students",
    request_body = OverdueAlertRequest,
    responses(
        (status = 200, description = "Reminder queued or skipped", body = OverdueAlertResponse),
        (status = 404, description = "No session for this email", body = crate::error::ErrorResponse)
    )
)]
pub async fn send_overdue_alert(
    State(state): State<AppState>,
    Json(request): Json<OverdueAlertRequest>,
) -> AppResult<Json<OverdueAlertResponse>> {
    let queued = state
        .services
        .loans
        .send_overdue_alert(&request.email, &request.title)
        .await?;
    Ok(Json(OverdueAlertResponse { queued }))
}
