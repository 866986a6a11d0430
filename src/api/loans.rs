//! Borrow and return endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        loan::{CreateLoan, LoanDetails, ReturnLoan},
        user::Student,
    },
    AppState,
};

/// Borrow a book for a logged-in student
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    request_body = CreateLoan,
    responses(
        (status = 201, description = "Loan created", body = LoanDetails),
        (status = 404, description = "Student or book not found", body = crate::error::ErrorResponse),
        (status = 422, description = "Book is already borrowed", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_loan(
    State(state): State<AppState>,
    Json(loan): Json<CreateLoan>,
) -> AppResult<(StatusCode, Json<LoanDetails>)> {
    let details = state
        .services
        .loans
        .borrow(loan.student_id, loan.book_id)
        .await?;
    Ok((StatusCode::CREATED, Json(details)))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/loans/return",
    tag = "loans",
    request_body = ReturnLoan,
    responses(
        (status = 200, description = "Book returned", body = Student),
        (status = 404, description = "Student or loan not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_loan(
    State(state): State<AppState>,
    Json(request): Json<ReturnLoan>,
) -> AppResult<Json<Student>> {
    let student = state
        .services
        .loans
        .return_book(request.student_id, &request.title)
        .await?;
    Ok(Json(student))
}

/// Loans of a student
#[utoipa::path(
    get,
    path = "/students/{id}/loans",
    tag = "loans",
    params(
        ("id" = i64, Path, description = "Student ID")
    ),
    responses(
        (status = 200, description = "Loans with their due status", body = Vec<LoanDetails>),
        (status = 404, description = "Student not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_student_loans(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state.services.loans.student_loans(id).await?;
    Ok(Json(loans))
}
