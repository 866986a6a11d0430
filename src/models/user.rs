//! Student, librarian and session models

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use super::loan::{BorrowedBook, Loan};
use crate::services::sms::phone::is_valid_e164;

/// Kind of account a session belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Student,
    Librarian,
}

/// Logged-in student entry of the loan ledger (`loggedInStudents`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub roll_no: String,
    pub email: String,
    #[serde(default)]
    pub mobile_no: Option<String>,
    #[serde(rename = "class", default)]
    pub class_name: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub borrowed_books: Vec<BorrowedBook>,
    #[serde(default, deserialize_with = "non_negative_count")]
    pub overdue_books: u32,
    /// Absent on entries written without a login time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_active: bool,
}

impl Student {
    /// Normalized loans of this student
    pub fn loans(&self) -> Vec<Loan> {
        self.borrowed_books
            .iter()
            .map(|b| b.to_loan(self.login_time))
            .collect()
    }

    pub fn holds(&self, title: &str) -> bool {
        self.borrowed_books.iter().any(|b| b.title() == title)
    }

    /// Mobile number if one was recorded
    pub fn mobile(&self) -> Option<&str> {
        self.mobile_no.as_deref().filter(|m| !m.trim().is_empty())
    }
}

/// Counters written by older clients could go negative; read them as zero.
fn non_negative_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<i64>::deserialize(deserializer)?.unwrap_or(0);
    Ok(value.clamp(0, u32::MAX as i64) as u32)
}

/// Saved student credentials (`studentUser`, keyed by email)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAccount {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub roll_no: String,
    pub mobile_no: String,
    #[serde(rename = "class")]
    pub class_name: String,
    pub year: String,
}

pub type StudentAccounts = BTreeMap<String, StudentAccount>;

/// Saved librarian credentials (`librarianUser`, keyed by email)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibrarianAccount {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub employee_id: String,
}

pub type LibrarianAccounts = BTreeMap<String, LibrarianAccount>;

/// Registry entry of every registered student (`allStudents`)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredStudent {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub roll_no: String,
    pub mobile_no: String,
    #[serde(rename = "class")]
    pub class_name: String,
    pub year: String,
    pub registered_at: DateTime<Utc>,
}

/// Active session (`currentUser`)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub email: String,
    pub user_type: UserType,
    pub is_logged_in: bool,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub roll_no: Option<String>,
    pub mobile_no: Option<String>,
    pub student_id: Option<i64>,
    pub login_time: DateTime<Utc>,
}

fn validate_mobile(value: &str) -> Result<(), ValidationError> {
    let digits = value.chars().filter(|c| c.is_ascii_digit()).count();
    if digits >= 10 && (!value.starts_with('+') || is_valid_e164(value)) {
        Ok(())
    } else {
        let mut err = ValidationError::new("mobile");
        err.message = Some(
            "Please enter a valid mobile number (e.g., +919876543210 or 9876543210)".into(),
        );
        Err(err)
    }
}

/// Student registration form
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterStudent {
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    #[validate(length(min = 1, message = "Roll number is required"))]
    pub roll_no: String,
    #[validate(custom(function = "validate_mobile"))]
    pub mobile_no: String,
    #[validate(length(min = 1, message = "Class is required"))]
    pub class_name: String,
    #[validate(length(min = 1, message = "Year is required"))]
    pub year: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub confirm_password: String,
}

/// Librarian registration form
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterLibrarian {
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    #[validate(length(min = 1, message = "Employee ID is required"))]
    pub employee_id: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub confirm_password: String,
}

/// Login form shared by students and librarians
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_student_parses_stored_shape() {
        let json = r#"{
            "id": 1717171717171,
            "name": "John Doe",
            "rollNo": "CS-42",
            "email": "john@example.com",
            "mobileNo": "+919876543210",
            "class": "BSc",
            "year": "2",
            "borrowedBooks": ["Dune"],
            "overdueBooks": -1,
            "loginTime": "2024-03-01T09:00:00Z",
            "isActive": true
        }"#;
        let student: Student = serde_json::from_str(json).unwrap();

        assert_eq!(student.overdue_books, 0);
        assert_eq!(student.class_name, "BSc");
        assert!(student.holds("Dune"));
        assert_eq!(student.mobile(), Some("+919876543210"));
    }

    #[test]
    fn test_blank_mobile_is_absent() {
        let json = r#"{"id": 1, "name": "A", "email": "a@b.c", "mobileNo": "  "}"#;
        let student: Student = serde_json::from_str(json).unwrap();
        assert_eq!(student.mobile(), None);
        assert!(!student.is_active);
    }

    #[test]
    fn test_missing_login_time_stays_undated() {
        let json = r#"{"id": 1, "name": "A", "email": "a@b.c", "borrowedBooks": ["Dune"]}"#;
        let student: Student = serde_json::from_str(json).unwrap();

        assert!(student.login_time.is_none());
        assert_eq!(student.loans()[0].borrow_date, None);

        // Reading twice gives the same undated loan
        let again: Student = serde_json::from_str(&serde_json::to_string(&student).unwrap()).unwrap();
        assert_eq!(again, student);
    }

    #[test]
    fn test_registration_validation() {
        let form = RegisterStudent {
            first_name: "Jane".into(),
            last_name: "Roe".into(),
            roll_no: "R1".into(),
            mobile_no: "98765".into(),
            class_name: "BA".into(),
            year: "1".into(),
            email: "not-an-email".into(),
            password: "secret1".into(),
            confirm_password: "secret2".into(),
        };
        let errors = form.validate().unwrap_err();
        let fields = errors.field_errors();

        assert!(fields.contains_key("mobile_no"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("confirm_password"));
    }
}
