//! Loan (borrow) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Borrow record as persisted in a student's `borrowedBooks` list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BorrowRecord {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub borrow_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
}

/// One entry of a student's borrowed list.
///
/// Older ledgers stored bare titles; both shapes are accepted on read and
/// preserved on write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum BorrowedBook {
    Record(BorrowRecord),
    Legacy(String),
}

impl BorrowedBook {
    pub fn title(&self) -> &str {
        match self {
            BorrowedBook::Record(record) => &record.title,
            BorrowedBook::Legacy(title) => title,
        }
    }

    /// Normalize into a [`Loan`]. A legacy title is dated from the owning
    /// student's last login, and stays undated when that is unknown.
    pub fn to_loan(&self, login_time: Option<DateTime<Utc>>) -> Loan {
        match self {
            BorrowedBook::Record(record) => Loan {
                title: record.title.clone(),
                borrow_date: record.borrow_date,
                due_date: record.due_date,
                legacy: false,
            },
            BorrowedBook::Legacy(title) => Loan {
                title: title.clone(),
                borrow_date: login_time,
                due_date: None,
                legacy: true,
            },
        }
    }
}

impl From<BorrowRecord> for BorrowedBook {
    fn from(record: BorrowRecord) -> Self {
        BorrowedBook::Record(record)
    }
}

/// Normalized view of a borrowed book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Loan {
    pub title: String,
    pub borrow_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    /// True when the stored entry was a bare title
    pub legacy: bool,
}

/// Classification of an outstanding loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum LoanStatus {
    Normal,
    DueSoon { days_left: i64 },
    Overdue { days_overdue: i64 },
}

impl LoanStatus {
    pub fn is_overdue(&self) -> bool {
        matches!(self, LoanStatus::Overdue { .. })
    }

    /// Short status line shown next to a loan
    pub fn message(&self) -> String {
        match self {
            LoanStatus::Normal => String::new(),
            LoanStatus::DueSoon { days_left } => format!("Due in {} day(s)", days_left),
            LoanStatus::Overdue { days_overdue } => format!("{} days overdue", days_overdue),
        }
    }
}

/// Loan with its classification, for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanDetails {
    pub title: String,
    pub borrow_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub status: LoanStatus,
    pub message: String,
}

/// Row of the librarian overdue report
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OverdueEntry {
    pub student_id: i64,
    pub student_name: String,
    pub student_email: String,
    pub student_mobile: Option<String>,
    pub book_title: String,
    pub days_overdue: i64,
    pub borrow_date: DateTime<Utc>,
}

/// Borrow request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateLoan {
    pub student_id: i64,
    pub book_id: i32,
}

/// Return request
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReturnLoan {
    pub student_id: i64,
    pub title: String,
}
