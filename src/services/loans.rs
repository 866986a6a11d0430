//! Loan management service: sessions, borrow, return and overdue views

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    error::{AppError, AppResult},
    models::{
        loan::{BorrowRecord, BorrowedBook, LoanDetails, LoanStatus, OverdueEntry},
        user::Student,
    },
    repository::{ledger::is_available, Repository},
    services::{
        catalog::CatalogService,
        clock::Clock,
        overdue::{classify, due_date},
        sms::Notifier,
        templates::SmsTemplate,
    },
};

/// Fresh ledger id: the current time in milliseconds, moved past every id
/// already in use. Stays well inside the integer range JSON clients read
/// exactly.
pub fn next_student_id(students: &[Student], now: DateTime<Utc>) -> i64 {
    let taken = students.iter().map(|s| s.id).max().unwrap_or(0);
    now.timestamp_millis().max(taken + 1)
}

/// Date format used in notification texts
pub const DUE_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    catalog: CatalogService,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl LoansService {
    pub fn new(
        repository: Repository,
        catalog: CatalogService,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            catalog,
            notifier,
            clock,
        }
    }

    /// Insert or refresh a ledger session, matched by email.
    ///
    /// An existing entry keeps its id and overdue count, and keeps its
    /// borrowed list unless `borrowed_books` is supplied. A new entry whose
    /// id is unset (zero) or already taken gets a fresh one.
    pub async fn upsert_session(
        &self,
        session: Student,
        borrowed_books: Option<Vec<BorrowedBook>>,
    ) -> AppResult<Student> {
        let now = self.clock.now();
        self.repository
            .ledger
            .update(move |students| {
                if let Some(existing) = students.iter_mut().find(|s| s.email == session.email) {
                    let books = borrowed_books
                        .unwrap_or_else(|| std::mem::take(&mut existing.borrowed_books));
                    *existing = Student {
                        id: existing.id,
                        borrowed_books: books,
                        overdue_books: existing.overdue_books,
                        ..session
                    };
                    return Ok(existing.clone());
                }

                let mut student = session;
                if student.id <= 0 || students.iter().any(|s| s.id == student.id) {
                    student.id = next_student_id(students, now);
                }
                if let Some(books) = borrowed_books {
                    student.borrowed_books = books;
                }
                students.push(student.clone());
                Ok(student)
            })
            .await
    }

    /// Borrow a catalog book for a student
    pub async fn borrow(&self, student_id: i64, book_id: i32) -> AppResult<LoanDetails> {
        let book = self
            .catalog
            .get(book_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;
        let now = self.clock.now();

        let record = BorrowRecord {
            title: book.title.clone(),
            borrow_date: Some(now),
            due_date: Some(due_date(now)),
        };

        let (student, record) = self
            .repository
            .ledger
            .update(move |students| {
                if !is_available(students, &book.title) {
                    return Err(AppError::BusinessRule(format!(
                        "\"{}\" is already borrowed",
                        book.title
                    )));
                }

                let student = find_student(students, student_id)?;
                student.borrowed_books.push(record.clone().into());
                Ok((student.clone(), record))
            })
            .await?;

        tracing::info!("Student {} borrowed \"{}\"", student.email, record.title);

        if let (Some(phone), Some(due)) = (student.mobile(), record.due_date) {
            let due = due.format(DUE_DATE_FORMAT).to_string();
            let message = SmsTemplate::BookBorrowed {
                title: &record.title,
                due_date: &due,
            }
            .render();
            self.notifier.notify(phone, message);
        }

        let status = classify(record.borrow_date, now);
        Ok(LoanDetails {
            title: record.title,
            borrow_date: record.borrow_date,
            due_date: record.due_date,
            message: status.message(),
            status,
        })
    }

    /// Return the first loan of `title` held by a student
    pub async fn return_book(&self, student_id: i64, title: &str) -> AppResult<Student> {
        let now = self.clock.now();
        let wanted = title.to_string();

        let student = self
            .repository
            .ledger
            .update(move |students| {
                let student = find_student(students, student_id)?;
                let position = student
                    .borrowed_books
                    .iter()
                    .position(|b| b.title() == wanted)
                    .ok_or_else(|| {
                        AppError::NotFound(format!("\"{}\" is not borrowed by this student", wanted))
                    })?;

                let removed = student.borrowed_books.remove(position);
                let loan = removed.to_loan(student.login_time);
                if classify(loan.borrow_date, now).is_overdue() {
                    student.overdue_books = student.overdue_books.saturating_sub(1);
                }
                Ok(student.clone())
            })
            .await?;

        tracing::info!("Student {} returned \"{}\"", student.email, title);

        if let Some(phone) = student.mobile() {
            self.notifier
                .notify(phone, SmsTemplate::BookReturned { title }.render());
        }

        Ok(student)
    }

    /// Loans of a student with their classification
    pub async fn student_loans(&self, student_id: i64) -> AppResult<Vec<LoanDetails>> {
        let students = self.repository.ledger.load().await?;
        let student = students
            .iter()
            .find(|s| s.id == student_id)
            .ok_or_else(|| AppError::NotFound(format!("Student with id {} not found", student_id)))?;

        let now = self.clock.now();
        Ok(student
            .loans()
            .into_iter()
            .map(|loan| {
                let status = classify(loan.borrow_date, now);
                LoanDetails {
                    title: loan.title,
                    borrow_date: loan.borrow_date,
                    due_date: loan.due_date,
                    message: status.message(),
                    status,
                }
            })
            .collect())
    }

    /// Every overdue loan held by an active student
    pub async fn overdue_report(&self) -> AppResult<Vec<OverdueEntry>> {
        let students = self.repository.ledger.load().await?;
        let now = self.clock.now();

        let mut entries = Vec::new();
        for student in students.iter().filter(|s| s.is_active) {
            for loan in student.loans() {
                let (Some(borrow_date), LoanStatus::Overdue { days_overdue }) =
                    (loan.borrow_date, classify(loan.borrow_date, now))
                else {
                    continue;
                };
                entries.push(OverdueEntry {
                    student_id: student.id,
                    student_name: student.name.clone(),
                    student_email: student.email.clone(),
                    student_mobile: student.mobile().map(str::to_string),
                    book_title: loan.title,
                    days_overdue,
                    borrow_date,
                });
            }
        }
        Ok(entries)
    }

    /// Librarian-triggered reminder for one loan. Returns false when the
    /// student has no mobile number on file.
    pub async fn send_overdue_alert(&self, email: &str, title: &str) -> AppResult<bool> {
        let students = self.repository.ledger.load().await?;
        let student = students
            .iter()
            .find(|s| s.email == email)
            .ok_or_else(|| AppError::NotFound(format!("No session for {}", email)))?;

        let Some(phone) = student.mobile() else {
            tracing::warn!("Overdue alert for {} skipped: no mobile number", email);
            return Ok(false);
        };

        self.notifier
            .notify(phone, SmsTemplate::ManualOverdue { title }.render());
        tracing::info!("Manual overdue alert queued for {}", student.name);
        Ok(true)
    }

    /// Students currently shown on the librarian dashboard
    pub async fn active_students(&self) -> AppResult<Vec<Student>> {
        let students = self.repository.ledger.load().await?;
        Ok(students.into_iter().filter(|s| s.is_active).collect())
    }
}

fn find_student(students: &mut [Student], student_id: i64) -> AppResult<&mut Student> {
    students
        .iter_mut()
        .find(|s| s.id == student_id)
        .ok_or_else(|| AppError::NotFound(format!("Student with id {} not found", student_id)))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::services::clock::ManualClock;
    use crate::services::sms::queue::RecordingNotifier;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    pub(crate) fn day0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
    }

    pub(crate) fn session(id: i64, email: &str, mobile: Option<&str>) -> Student {
        Student {
            id,
            name: "Asha Rao".to_string(),
            roll_no: "CS-7".to_string(),
            email: email.to_string(),
            mobile_no: mobile.map(str::to_string),
            class_name: "BSc".to_string(),
            year: "2".to_string(),
            borrowed_books: Vec::new(),
            overdue_books: 0,
            login_time: Some(day0()),
            is_active: true,
        }
    }

    pub(crate) struct Fixture {
        pub loans: LoansService,
        pub catalog: CatalogService,
        pub repository: Repository,
        pub notifier: Arc<RecordingNotifier>,
        pub clock: Arc<ManualClock>,
    }

    pub(crate) fn fixture() -> Fixture {
        let repository = Repository::in_memory();
        let catalog = CatalogService::new(repository.clone());
        let notifier = Arc::new(RecordingNotifier::default());
        let clock = Arc::new(ManualClock::new(day0()));
        let loans = LoansService::new(
            repository.clone(),
            catalog.clone(),
            notifier.clone(),
            clock.clone(),
        );
        Fixture {
            loans,
            catalog,
            repository,
            notifier,
            clock,
        }
    }

    #[tokio::test]
    async fn test_borrow_then_return_restores_availability() {
        let f = fixture();
        f.loans
            .upsert_session(session(1, "asha@example.com", Some("9876543210")), None)
            .await
            .unwrap();

        let loan = f.loans.borrow(1, 3).await.unwrap();
        assert_eq!(loan.title, "1984");
        assert_eq!(loan.due_date, Some(day0() + Duration::days(14)));

        let students = f.repository.ledger.load().await.unwrap();
        assert!(!f.catalog.views(&students)[2].available);

        let student = f.loans.return_book(1, "1984").await.unwrap();
        assert!(!student.holds("1984"));

        let students = f.repository.ledger.load().await.unwrap();
        assert!(f.catalog.views(&students)[2].available);

        let sent = f.notifier.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].1.contains("2024-05-15"));
        assert!(sent[1].1.contains("returned \"1984\""));
    }

    #[tokio::test]
    async fn test_double_borrow_is_rejected() {
        let f = fixture();
        f.loans
            .upsert_session(session(1, "a@example.com", None), None)
            .await
            .unwrap();
        f.loans
            .upsert_session(session(2, "b@example.com", None), None)
            .await
            .unwrap();

        f.loans.borrow(1, 9).await.unwrap();
        let second = f.loans.borrow(2, 9).await;

        assert!(matches!(second, Err(AppError::BusinessRule(_))));
        let students = f.repository.ledger.load().await.unwrap();
        assert!(!students[1].holds("The Hobbit"));
    }

    #[tokio::test]
    async fn test_borrow_unknown_student_or_book() {
        let f = fixture();
        assert!(matches!(f.loans.borrow(99, 1).await, Err(AppError::NotFound(_))));

        f.loans
            .upsert_session(session(1, "a@example.com", None), None)
            .await
            .unwrap();
        assert!(matches!(f.loans.borrow(1, 99).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_no_sms_without_mobile() {
        let f = fixture();
        f.loans
            .upsert_session(session(1, "a@example.com", Some("  ")), None)
            .await
            .unwrap();

        f.loans.borrow(1, 1).await.unwrap();
        assert!(f.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_preserves_books_and_counter() {
        let f = fixture();
        let mut first = session(1, "a@example.com", None);
        first.overdue_books = 2;
        f.loans.upsert_session(first, None).await.unwrap();
        f.loans.borrow(1, 4).await.unwrap();

        let mut relogin = session(555, "a@example.com", Some("9876543210"));
        relogin.name = "Asha R.".to_string();
        let merged = f.loans.upsert_session(relogin, None).await.unwrap();

        assert_eq!(merged.id, 1);
        assert_eq!(merged.overdue_books, 2);
        assert_eq!(merged.name, "Asha R.");
        assert!(merged.holds("Pride and Prejudice"));

        let replaced = f
            .loans
            .upsert_session(session(1, "a@example.com", None), Some(Vec::new()))
            .await
            .unwrap();
        assert!(replaced.borrowed_books.is_empty());
        assert_eq!(f.repository.ledger.load().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_return_overdue_decrements_counter_once() {
        let f = fixture();
        let mut student = session(1, "a@example.com", None);
        student.overdue_books = 1;
        f.loans.upsert_session(student, None).await.unwrap();
        f.loans.borrow(1, 3).await.unwrap();
        f.loans.borrow(1, 6).await.unwrap();

        f.clock.advance(Duration::days(20));
        let after_first = f.loans.return_book(1, "1984").await.unwrap();
        assert_eq!(after_first.overdue_books, 0);

        let after_second = f.loans.return_book(1, "Animal Farm").await.unwrap();
        assert_eq!(after_second.overdue_books, 0);
    }

    #[tokio::test]
    async fn test_return_missing_title() {
        let f = fixture();
        f.loans
            .upsert_session(session(1, "a@example.com", None), None)
            .await
            .unwrap();

        let result = f.loans.return_book(1, "Dune").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_student_loans_and_overdue_report() {
        let f = fixture();
        let mut student = session(1, "a@example.com", Some("9876543210"));
        student.borrowed_books.push(BorrowedBook::Legacy("Dune".to_string()));
        f.loans.upsert_session(student, None).await.unwrap();
        f.loans.borrow(1, 3).await.unwrap();

        f.clock.advance(Duration::days(13));
        let loans = f.loans.student_loans(1).await.unwrap();
        assert_eq!(loans.len(), 2);
        assert!(loans
            .iter()
            .all(|l| l.status == LoanStatus::DueSoon { days_left: 1 }));
        assert!(f.loans.overdue_report().await.unwrap().is_empty());

        f.clock.advance(Duration::days(3));
        let report = f.loans.overdue_report().await.unwrap();
        assert_eq!(report.len(), 2);
        assert!(report.iter().all(|e| e.days_overdue == 2));
        assert_eq!(report[0].student_mobile.as_deref(), Some("9876543210"));
    }

    #[tokio::test]
    async fn test_manual_overdue_alert() {
        let f = fixture();
        f.loans
            .upsert_session(session(1, "a@example.com", Some("9876543210")), None)
            .await
            .unwrap();
        f.loans
            .upsert_session(session(2, "b@example.com", None), None)
            .await
            .unwrap();

        assert!(f.loans.send_overdue_alert("a@example.com", "1984").await.unwrap());
        assert!(!f.loans.send_overdue_alert("b@example.com", "1984").await.unwrap());
        assert!(f.loans.send_overdue_alert("c@example.com", "1984").await.is_err());
        assert_eq!(f.notifier.sent().len(), 1);
    }

    const MAX_SAFE_JSON_INTEGER: i64 = (1 << 53) - 1;

    #[tokio::test]
    async fn test_new_sessions_get_time_based_ids() {
        let f = fixture();

        let first = f
            .loans
            .upsert_session(session(0, "a@example.com", None), None)
            .await
            .unwrap();
        assert_eq!(first.id, day0().timestamp_millis());
        assert!(first.id <= MAX_SAFE_JSON_INTEGER);

        // Same instant, and a caller-supplied id that is already taken
        let second = f
            .loans
            .upsert_session(session(first.id, "b@example.com", None), None)
            .await
            .unwrap();
        assert_eq!(second.id, first.id + 1);

        let third = f
            .loans
            .upsert_session(session(0, "c@example.com", None), None)
            .await
            .unwrap();
        assert_eq!(third.id, first.id + 2);
    }

    #[test]
    fn test_next_student_id_moves_past_later_ids() {
        let students = vec![session(day0().timestamp_millis() + 500, "a@example.com", None)];
        assert_eq!(
            next_student_id(&students, day0()),
            day0().timestamp_millis() + 501
        );
        assert_eq!(next_student_id(&[], day0()), day0().timestamp_millis());
    }
}
