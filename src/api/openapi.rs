//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, health, loans, recommendations, scanner, sms, students};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Libris API",
        version = "0.3.0",
        description = "Library desk REST API: loans, overdue tracking, SMS notices and barcode scanning",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::register_student,
        auth::login_student,
        auth::register_librarian,
        auth::login_librarian,
        auth::logout,
        auth::me,
        // Books
        books::list_books,
        books::get_book,
        books::get_book_by_code,
        // Loans
        loans::create_loan,
        loans::return_loan,
        loans::get_student_loans,
        // Students
        students::list_students,
        students::list_registered,
        students::overdue_report,
        students::run_overdue_check,
        students::send_overdue_alert,
        // SMS
        sms::send_sms,
        sms::sms_history,
        sms::dead_letters,
        // Recommendations
        recommendations::get_recommendations,
        recommendations::predict_preference,
        // Scanner
        scanner::scan,
        scanner::manual_entry,
        scanner::scan_history,
    ),
    components(
        schemas(
            // Auth
            auth::MessageResponse,
            crate::models::user::UserType,
            crate::models::user::Student,
            crate::models::user::RegisteredStudent,
            crate::models::user::CurrentUser,
            crate::models::user::RegisterStudent,
            crate::models::user::RegisterLibrarian,
            crate::models::user::LoginRequest,
            // Books
            crate::models::book::Book,
            crate::models::book::BookView,
            crate::models::book::BookQuery,
            // Loans
            crate::models::loan::BorrowRecord,
            crate::models::loan::BorrowedBook,
            crate::models::loan::LoanStatus,
            crate::models::loan::LoanDetails,
            crate::models::loan::OverdueEntry,
            crate::models::loan::CreateLoan,
            crate::models::loan::ReturnLoan,
            // Students
            students::OverdueAlertRequest,
            students::OverdueAlertResponse,
            crate::services::sweep::SweepReport,
            // SMS
            crate::models::notification::DeliveryStatus,
            crate::models::notification::DeliveryChannel,
            crate::models::notification::SmsRecord,
            crate::models::notification::DeadLetter,
            crate::models::notification::RelayRequest,
            crate::models::notification::RelaySuccess,
            crate::models::notification::RelayFailure,
            // Recommendations
            crate::models::recommendation::Recommendation,
            crate::models::recommendation::RecommendationQuery,
            crate::models::recommendation::PredictionQuery,
            crate::models::recommendation::Prediction,
            // Scanner
            crate::models::scan::BarcodeFormat,
            crate::models::scan::ScanSource,
            crate::models::scan::ScanRecord,
            crate::models::scan::ScanOutcome,
            crate::models::scan::ManualScanRequest,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Student and librarian accounts"),
        (name = "books", description = "Catalog search"),
        (name = "loans", description = "Borrowing and returns"),
        (name = "students", description = "Librarian dashboard and overdue tracking"),
        (name = "sms", description = "SMS relay and delivery history"),
        (name = "recommendations", description = "Reading suggestions"),
        (name = "scanner", description = "Barcode scanning")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
