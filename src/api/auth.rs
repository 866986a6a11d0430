//! Registration, login and session endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::user::{CurrentUser, LoginRequest, RegisterLibrarian, RegisterStudent, RegisteredStudent},
    AppState,
};

/// Plain acknowledgement
#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Register a student account
#[utoipa::path(
    post,
    path = "/auth/students/register",
    tag = "auth",
    request_body = RegisterStudent,
    responses(
        (status = 201, description = "Account created", body = RegisteredStudent),
        (status = 400, description = "Invalid form", body = crate::error::ErrorResponse)
    )
)]
pub async fn register_student(
    State(state): State<AppState>,
    Json(form): Json<RegisterStudent>,
) -> AppResult<(StatusCode, Json<RegisteredStudent>)> {
    let student = state.services.accounts.register_student(form).await?;
    Ok((StatusCode::CREATED, Json(student)))
}

/// Log a student in and add them to the desk's session list
#[utoipa::path(
    post,
    path = "/auth/students/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = CurrentUser),
        (status = 401, description = "Invalid email or password", body = crate::error::ErrorResponse)
    )
)]
pub async fn login_student(
    State(state): State<AppState>,
    Json(form): Json<LoginRequest>,
) -> AppResult<Json<CurrentUser>> {
    let user = state.services.accounts.login_student(form).await?;
    Ok(Json(user))
}

/// Register a librarian account
#[utoipa::path(
    post,
    path = "/auth/librarians/register",
    tag = "auth",
    request_body = RegisterLibrarian,
    responses(
        (status = 201, description = "Account created", body = MessageResponse),
        (status = 400, description = "Invalid form", body = crate::error::ErrorResponse)
    )
)]
pub async fn register_librarian(
    State(state): State<AppState>,
    Json(form): Json<RegisterLibrarian>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    state.services.accounts.register_librarian(form).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Librarian account created".to_string(),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/auth/librarians/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = CurrentUser),
        (status = 401, description = "Invalid email or password", body = crate::error::ErrorResponse)
    )
)]
pub async fn login_librarian(
    State(state): State<AppState>,
    Json(form): Json<LoginRequest>,
) -> AppResult<Json<CurrentUser>> {
    let user = state.services.accounts.login_librarian(form).await?;
    Ok(Json(user))
}

/// Clear the current session
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    responses(
        (status = 204, description = "Logged out")
    )
)]
pub async fn logout(State(state): State<AppState>) -> AppResult<StatusCode> {
    state.services.accounts.logout().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Current session
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current session", body = CurrentUser),
        (status = 401, description = "Not logged in", body = crate::error::ErrorResponse)
    )
)]
pub async fn me(State(state): State<AppState>) -> AppResult<Json<CurrentUser>> {
    let user = state.services.accounts.current_user().await?;
    Ok(Json(user))
}
