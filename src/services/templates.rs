//! SMS message templates

use super::overdue::FINAL_NOTICE_AFTER_DAYS;

/// Notification event and its parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmsTemplate<'a> {
    BookBorrowed { title: &'a str, due_date: &'a str },
    BookReturned { title: &'a str },
    DueReminder { title: &'a str, days_left: i64 },
    OverdueNotice { title: &'a str, days_overdue: i64 },
    FinalNotice { title: &'a str, days_overdue: i64 },
    AccountCreated { name: &'a str },
    ManualOverdue { title: &'a str },
}

impl SmsTemplate<'_> {
    pub fn render(&self) -> String {
        match self {
            SmsTemplate::BookBorrowed { title, due_date } => format!(
                "Library Alert: You have borrowed \"{}\". Please return by {}. Thank you for using our library!",
                title, due_date
            ),
            SmsTemplate::BookReturned { title } => format!(
                "Library Confirmation: You have successfully returned \"{}\". Thank you for using our library!",
                title
            ),
            SmsTemplate::DueReminder { title, days_left } => format!(
                "Library Reminder: \"{}\" is due in {} day(s). Please return on time to avoid late fees.",
                title, days_left
            ),
            SmsTemplate::OverdueNotice { title, days_overdue } => format!(
                "OVERDUE ALERT: \"{}\" was due {} day(s) ago. Please return immediately to avoid additional fees. Contact library for assistance.",
                title, days_overdue
            ),
            SmsTemplate::FinalNotice { title, days_overdue } => format!(
                "FINAL NOTICE: \"{}\" is {} days overdue. Immediate return required. Late fees apply. Contact the library desk.",
                title, days_overdue
            ),
            SmsTemplate::AccountCreated { name } => format!(
                "Welcome {}! Your library account has been created successfully. Happy reading!",
                name
            ),
            SmsTemplate::ManualOverdue { title } => format!(
                "Library Notice: Please return \"{}\" immediately. This book is overdue. Contact the library for assistance.",
                title
            ),
        }
    }
}

/// Overdue template for a loan `days_overdue` days late
pub fn overdue_template(title: &str, days_overdue: i64) -> SmsTemplate<'_> {
    if days_overdue > FINAL_NOTICE_AFTER_DAYS {
        SmsTemplate::FinalNotice { title, days_overdue }
    } else {
        SmsTemplate::OverdueNotice { title, days_overdue }
    }
}
