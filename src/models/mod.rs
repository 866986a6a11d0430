//! Data models for Libris

pub mod book;
pub mod loan;
pub mod notification;
pub mod recommendation;
pub mod scan;
pub mod user;

// Re-export commonly used types
pub use book::{Book, BookView};
pub use loan::{BorrowRecord, BorrowedBook, Loan, LoanDetails, LoanStatus};
pub use notification::{DeliveryChannel, DeliveryStatus, SmsRecord};
pub use user::{CurrentUser, Student, UserType};
