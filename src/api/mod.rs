//! API handlers for Libris REST endpoints

pub mod auth;
pub mod books;
pub mod health;
pub mod loans;
pub mod openapi;
pub mod recommendations;
pub mod scanner;
pub mod sms;
pub mod students;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
        routing::{get, post},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::{
        config::AppConfig,
        repository::Repository,
        services::{
            clock::SystemClock,
            sms::{transport::MockSmsTransport, SmsDispatcher},
            Services,
        },
        AppState,
    };

    fn app() -> Router {
        let config = AppConfig::default();
        let dispatcher = SmsDispatcher::new(
            Arc::new(MockSmsTransport::new()),
            Arc::new(MockSmsTransport::new()),
            &config.sms,
        );
        let services = Services::with_parts(
            Repository::in_memory(),
            &config,
            dispatcher,
            Arc::new(SystemClock),
        );
        let state = AppState {
            config: Arc::new(config),
            services: Arc::new(services),
        };

        Router::new()
            .route("/auth/students/register", post(super::auth::register_student))
            .route("/auth/students/login", post(super::auth::login_student))
            .route("/auth/me", get(super::auth::me))
            .route("/books/:id", get(super::books::get_book))
            .route("/loans", post(super::loans::create_loan))
            .route("/sms/send", post(super::sms::send_sms))
            .route("/scanner/manual", post(super::scanner::manual_entry))
            .route(
                "/recommendations/predict",
                get(super::recommendations::predict_preference),
            )
            .with_state(state)
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn logged_in_student(app: &Router) -> i64 {
        let (status, _) = call(
            app,
            "POST",
            "/auth/students/register",
            Some(json!({
                "first_name": "Asha",
                "last_name": "Rao",
                "roll_no": "CS-7",
                "mobile_no": "9876543210",
                "class_name": "BSc",
                "year": "2",
                "email": "asha@example.com",
                "password": "secret1",
                "confirm_password": "secret1"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = call(
            app,
            "POST",
            "/auth/students/login",
            Some(json!({ "email": "asha@example.com", "password": "secret1" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["studentId"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn test_borrow_marks_book_unavailable() {
        let app = app();
        let student_id = logged_in_student(&app).await;

        let (status, body) = call(&app, "GET", "/books/3", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "1984");
        assert_eq!(body["available"], true);

        let (status, body) = call(
            &app,
            "POST",
            "/loans",
            Some(json!({ "student_id": student_id, "book_id": 3 })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["title"], "1984");

        let (_, body) = call(&app, "GET", "/books/3", None).await;
        assert_eq!(body["available"], false);
        assert_eq!(body["borrowed_by"], "Asha Rao");

        let (status, body) = call(
            &app,
            "POST",
            "/loans",
            Some(json!({ "student_id": student_id, "book_id": 3 })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let app = app();

        let (status, _) = call(&app, "GET", "/auth/me", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call(&app, "GET", "/books/42", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(
            &app,
            "POST",
            "/loans",
            Some(json!({ "student_id": 1, "book_id": 3 })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&app, "POST", "/scanner/manual", Some(json!({ "code": "  " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_relay_rejects_missing_fields() {
        let app = app();

        let (status, body) = call(&app, "POST", "/sms/send", Some(json!({ "message": "hi" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Phone number and message are required");
    }

    #[tokio::test]
    async fn test_predict_scores_known_reader() {
        let app = app();

        let (status, body) = call(
            &app,
            "GET",
            "/recommendations/predict?email=john@example.com&book_id=3",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["book_id"], 3);
        assert!((body["score"].as_f64().unwrap() - 0.95).abs() < 1e-9);

        let (_, body) = call(
            &app,
            "GET",
            "/recommendations/predict?email=nobody@example.com&book_id=3",
            None,
        )
        .await;
        assert_eq!(body["score"].as_f64(), Some(0.0));

        let (status, _) = call(&app, "GET", "/recommendations/predict?email=x@y.z", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
