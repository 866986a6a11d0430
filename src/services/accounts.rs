//! Registration, login and session handling for students and librarians

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use validator::Validate;

use crate::{
    config::SmsConfig,
    error::{AppError, AppResult},
    models::user::{
        CurrentUser, LibrarianAccount, LoginRequest, RegisterLibrarian, RegisterStudent,
        RegisteredStudent, Student, StudentAccount, UserType,
    },
    repository::Repository,
    services::{
        clock::Clock,
        loans::LoansService,
        sms::{phone::normalize_phone_number, Notifier},
        templates::SmsTemplate,
    },
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Clone)]
pub struct AccountsService {
    repository: Repository,
    loans: LoansService,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    country_code: String,
}

impl AccountsService {
    pub fn new(
        repository: Repository,
        loans: LoansService,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        sms: &SmsConfig,
    ) -> Self {
        Self {
            repository,
            loans,
            notifier,
            clock,
            country_code: sms.default_country_code.clone(),
        }
    }

    /// Save student credentials and add them to the registry.
    ///
    /// Registering an email again replaces the saved credentials; the
    /// registry keeps its first entry.
    pub async fn register_student(&self, form: RegisterStudent) -> AppResult<RegisteredStudent> {
        form.validate()?;

        let email = form.email.trim().to_string();
        let mobile_no = normalize_phone_number(&form.mobile_no, &self.country_code);
        let account = StudentAccount {
            email: email.clone(),
            password_hash: hash_password(&form.password)?,
            first_name: form.first_name.clone(),
            last_name: form.last_name.clone(),
            roll_no: form.roll_no.clone(),
            mobile_no: mobile_no.clone(),
            class_name: form.class_name.clone(),
            year: form.year.clone(),
        };

        let mut accounts = self.repository.accounts.student_accounts_for_update().await?;
        accounts.insert(email.clone(), account);
        self.repository.accounts.save_student_accounts(&accounts).await?;

        let entry = RegisteredStudent {
            email: email.clone(),
            first_name: form.first_name.clone(),
            last_name: form.last_name,
            roll_no: form.roll_no,
            mobile_no: mobile_no.clone(),
            class_name: form.class_name,
            year: form.year,
            registered_at: self.clock.now(),
        };

        let mut registry = self
            .repository
            .accounts
            .registered_students_for_update()
            .await?;
        if !registry.iter().any(|s| s.email == email) {
            registry.push(entry.clone());
            self.repository
                .accounts
                .save_registered_students(&registry)
                .await?;
        }

        tracing::info!("Student registered: {}", email);
        self.notifier.notify(
            &mobile_no,
            SmsTemplate::AccountCreated {
                name: &form.first_name,
            }
            .render(),
        );

        Ok(entry)
    }

    /// Verify student credentials, open a session and join the ledger
    pub async fn login_student(&self, form: LoginRequest) -> AppResult<CurrentUser> {
        form.validate()?;

        let accounts = self.repository.accounts.student_accounts().await?;
        let account = accounts
            .get(form.email.trim())
            .ok_or_else(|| AppError::Authentication(INVALID_CREDENTIALS.to_string()))?;
        if !verify_password(&account.password_hash, &form.password)? {
            return Err(AppError::Authentication(INVALID_CREDENTIALS.to_string()));
        }

        let now = self.clock.now();
        let session = Student {
            id: 0,
            name: format!("{} {}", account.first_name, account.last_name),
            roll_no: account.roll_no.clone(),
            email: account.email.clone(),
            mobile_no: Some(account.mobile_no.clone()),
            class_name: account.class_name.clone(),
            year: account.year.clone(),
            borrowed_books: Vec::new(),
            overdue_books: 0,
            login_time: Some(now),
            is_active: true,
        };
        let student = self.loans.upsert_session(session, None).await?;

        let user = CurrentUser {
            email: account.email.clone(),
            user_type: UserType::Student,
            is_logged_in: true,
            first_name: Some(account.first_name.clone()),
            last_name: Some(account.last_name.clone()),
            roll_no: Some(account.roll_no.clone()),
            mobile_no: Some(account.mobile_no.clone()),
            student_id: Some(student.id),
            login_time: now,
        };
        self.repository.accounts.set_current_user(&user).await?;

        tracing::info!("Student logged in: {} (id {})", user.email, student.id);
        Ok(user)
    }

    pub async fn register_librarian(&self, form: RegisterLibrarian) -> AppResult<()> {
        form.validate()?;

        let email = form.email.trim().to_string();
        let account = LibrarianAccount {
            email: email.clone(),
            password_hash: hash_password(&form.password)?,
            first_name: form.first_name,
            last_name: form.last_name,
            employee_id: form.employee_id,
        };

        let mut accounts = self
            .repository
            .accounts
            .librarian_accounts_for_update()
            .await?;
        accounts.insert(email.clone(), account);
        self.repository
            .accounts
            .save_librarian_accounts(&accounts)
            .await?;

        tracing::info!("Librarian registered: {}", email);
        Ok(())
    }

    pub async fn login_librarian(&self, form: LoginRequest) -> AppResult<CurrentUser> {
        form.validate()?;

        let accounts = self.repository.accounts.librarian_accounts().await?;
        let account = accounts
            .get(form.email.trim())
            .ok_or_else(|| AppError::Authentication(INVALID_CREDENTIALS.to_string()))?;
        if !verify_password(&account.password_hash, &form.password)? {
            return Err(AppError::Authentication(INVALID_CREDENTIALS.to_string()));
        }

        let user = CurrentUser {
            email: account.email.clone(),
            user_type: UserType::Librarian,
            is_logged_in: true,
            first_name: Some(account.first_name.clone()),
            last_name: Some(account.last_name.clone()),
            roll_no: None,
            mobile_no: None,
            student_id: None,
            login_time: self.clock.now(),
        };
        self.repository.accounts.set_current_user(&user).await?;

        tracing::info!("Librarian logged in: {}", user.email);
        Ok(user)
    }

    /// End the current session. Ledger entries stay as they are.
    pub async fn logout(&self) -> AppResult<()> {
        self.repository.accounts.clear_current_user().await
    }

    pub async fn current_user(&self) -> AppResult<CurrentUser> {
        self.repository
            .accounts
            .current_user()
            .await?
            .ok_or_else(|| AppError::Authentication("Not logged in".to_string()))
    }

    pub async fn registered_students(&self) -> AppResult<Vec<RegisteredStudent>> {
        self.repository.accounts.registered_students().await
    }
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

pub fn verify_password(hash: &str, password: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::loans::tests::{fixture, Fixture};

    fn accounts(f: &Fixture) -> AccountsService {
        AccountsService::new(
            f.repository.clone(),
            f.loans.clone(),
            f.notifier.clone(),
            f.clock.clone(),
            &SmsConfig::default(),
        )
    }

    fn registration(email: &str) -> RegisterStudent {
        RegisterStudent {
            first_name: "Asha".to_string(),
            last_name: "Rao".to_string(),
            roll_no: "CS-7".to_string(),
            mobile_no: "98765 43210".to_string(),
            class_name: "BSc".to_string(),
            year: "2".to_string(),
            email: email.to_string(),
            password: "secret1".to_string(),
            confirm_password: "secret1".to_string(),
        }
    }

    fn login(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("secret1").unwrap();
        assert!(verify_password(&hash, "secret1").unwrap());
        assert!(!verify_password(&hash, "secret2").unwrap());
    }

    #[tokio::test]
    async fn test_register_normalizes_mobile_and_welcomes() {
        let f = fixture();
        let service = accounts(&f);

        let entry = service
            .register_student(registration("asha@example.com"))
            .await
            .unwrap();
        assert_eq!(entry.mobile_no, "+919876543210");

        let sent = f.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "+919876543210");
        assert!(sent[0].1.starts_with("Welcome Asha!"));

        // registry keeps one entry per email
        service
            .register_student(registration("asha@example.com"))
            .await
            .unwrap();
        assert_eq!(service.registered_students().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_registration_is_rejected() {
        let f = fixture();
        let mut form = registration("asha@example.com");
        form.confirm_password = "other".to_string();

        let result = accounts(&f).register_student(form).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(f.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_login_keeps_ledger_entry() {
        let f = fixture();
        let service = accounts(&f);
        service
            .register_student(registration("asha@example.com"))
            .await
            .unwrap();

        let first = service
            .login_student(login("asha@example.com", "secret1"))
            .await
            .unwrap();
        let id = first.student_id.unwrap();
        f.loans.borrow(id, 3).await.unwrap();

        let second = service
            .login_student(login("asha@example.com", "secret1"))
            .await
            .unwrap();
        assert_eq!(second.student_id, Some(id));

        let students = f.repository.ledger.load().await.unwrap();
        assert_eq!(students.len(), 1);
        assert!(students[0].holds("1984"));
        assert_eq!(service.current_user().await.unwrap().email, "asha@example.com");

        service.logout().await.unwrap();
        assert!(service.current_user().await.is_err());
        assert!(f.repository.ledger.load().await.unwrap()[0].is_active);
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let f = fixture();
        let service = accounts(&f);
        service
            .register_student(registration("asha@example.com"))
            .await
            .unwrap();

        let result = service
            .login_student(login("asha@example.com", "nope"))
            .await;
        assert!(matches!(result, Err(AppError::Authentication(_))));

        let unknown = service
            .login_student(login("who@example.com", "secret1"))
            .await;
        assert!(matches!(unknown, Err(AppError::Authentication(_))));
    }

    #[tokio::test]
    async fn test_librarian_register_and_login() {
        let f = fixture();
        let service = accounts(&f);
        service
            .register_librarian(RegisterLibrarian {
                first_name: "Lee".to_string(),
                last_name: "Park".to_string(),
                employee_id: "E-1".to_string(),
                email: "lee@library.org".to_string(),
                password: "shelves".to_string(),
                confirm_password: "shelves".to_string(),
            })
            .await
            .unwrap();

        let user = service
            .login_librarian(login("lee@library.org", "shelves"))
            .await
            .unwrap();
        assert_eq!(user.user_type, UserType::Librarian);
        assert!(user.student_id.is_none());
        assert!(service
            .login_librarian(login("lee@library.org", "wrong"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_student_ids_fit_json_numbers() {
        let f = fixture();
        let service = accounts(&f);
        service
            .register_student(registration("asha@example.com"))
            .await
            .unwrap();
        service
            .register_student(registration("ben@example.com"))
            .await
            .unwrap();

        let asha = service
            .login_student(login("asha@example.com", "secret1"))
            .await
            .unwrap()
            .student_id
            .unwrap();
        let ben = service
            .login_student(login("ben@example.com", "secret1"))
            .await
            .unwrap()
            .student_id
            .unwrap();

        assert!(asha <= (1 << 53) - 1);
        assert_ne!(asha, ben);

        // The id survives a JSON number round trip through an f64 reader
        let as_float = serde_json::json!({ "studentId": asha })["studentId"]
            .as_f64()
            .unwrap();
        assert_eq!(as_float as i64, asha);
        f.loans.borrow(as_float as i64, 3).await.unwrap();
    }

    #[tokio::test]
    async fn test_registration_never_overwrites_unreadable_credentials() {
        use crate::repository::store::STUDENT_USER_KEY;

        let f = fixture();
        let service = accounts(&f);
        f.repository
            .store
            .set(STUDENT_USER_KEY, "[broken".to_string())
            .await
            .unwrap();

        let result = service.register_student(registration("asha@example.com")).await;
        assert!(matches!(result, Err(AppError::Storage(_))));
        assert_eq!(
            f.repository.store.get(STUDENT_USER_KEY).await.unwrap().as_deref(),
            Some("[broken")
        );
        assert!(f.notifier.sent().is_empty());
    }
}
