//! Loan age arithmetic and overdue classification

use chrono::{DateTime, Duration, Utc};

use crate::models::loan::LoanStatus;

/// Nominal loan period
pub const LOAN_PERIOD_DAYS: i64 = 14;
/// First day on which a reminder is due
pub const DUE_SOON_FROM_DAYS: i64 = 12;
/// First day on which a loan counts as overdue
pub const OVERDUE_FROM_DAYS: i64 = 15;
/// Overdue notices escalate to a final notice past this many days
pub const FINAL_NOTICE_AFTER_DAYS: i64 = 7;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Whole days from `start` to `end`, floored. Negative when `end` is earlier.
pub fn days_between(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let millis = (end - start).num_milliseconds();
    millis.div_euclid(MILLIS_PER_DAY)
}

/// Due date of a loan starting at `borrowed_at`
pub fn due_date(borrowed_at: DateTime<Utc>) -> DateTime<Utc> {
    borrowed_at + Duration::days(LOAN_PERIOD_DAYS)
}

/// Classify a loan at `now`. Loans without a borrow date are never flagged.
pub fn classify(borrow_date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> LoanStatus {
    let Some(borrowed_at) = borrow_date else {
        return LoanStatus::Normal;
    };

    let days = days_between(borrowed_at, now);
    if days >= OVERDUE_FROM_DAYS {
        LoanStatus::Overdue {
            days_overdue: days - LOAN_PERIOD_DAYS,
        }
    } else if days >= DUE_SOON_FROM_DAYS {
        LoanStatus::DueSoon {
            days_left: LOAN_PERIOD_DAYS - days,
        }
    } else {
        LoanStatus::Normal
    }
}
