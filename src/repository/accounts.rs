//! Saved credentials, the student registry and the current session

use std::sync::Arc;

use crate::{
    error::AppResult,
    models::user::{CurrentUser, LibrarianAccounts, RegisteredStudent, StudentAccounts},
    repository::store::{
        read_json, read_json_strict, write_json, KeyValueStore, ALL_STUDENTS_KEY, CURRENT_USER_KEY,
        LIBRARIAN_USER_KEY, STUDENT_USER_KEY,
    },
};

#[derive(Clone)]
pub struct AccountsRepository {
    store: Arc<dyn KeyValueStore>,
}

impl AccountsRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn student_accounts(&self) -> AppResult<StudentAccounts> {
        read_json(self.store.as_ref(), STUDENT_USER_KEY).await
    }

    /// Saved student credentials, failing on an unreadable document
    pub async fn student_accounts_for_update(&self) -> AppResult<StudentAccounts> {
        read_json_strict(self.store.as_ref(), STUDENT_USER_KEY).await
    }

    pub async fn save_student_accounts(&self, accounts: &StudentAccounts) -> AppResult<()> {
        write_json(self.store.as_ref(), STUDENT_USER_KEY, accounts).await
    }

    pub async fn librarian_accounts(&self) -> AppResult<LibrarianAccounts> {
        read_json(self.store.as_ref(), LIBRARIAN_USER_KEY).await
    }

    pub async fn librarian_accounts_for_update(&self) -> AppResult<LibrarianAccounts> {
        read_json_strict(self.store.as_ref(), LIBRARIAN_USER_KEY).await
    }

    pub async fn save_librarian_accounts(&self, accounts: &LibrarianAccounts) -> AppResult<()> {
        write_json(self.store.as_ref(), LIBRARIAN_USER_KEY, accounts).await
    }

    pub async fn registered_students(&self) -> AppResult<Vec<RegisteredStudent>> {
        read_json(self.store.as_ref(), ALL_STUDENTS_KEY).await
    }

    pub async fn registered_students_for_update(&self) -> AppResult<Vec<RegisteredStudent>> {
        read_json_strict(self.store.as_ref(), ALL_STUDENTS_KEY).await
    }

    pub async fn save_registered_students(&self, students: &[RegisteredStudent]) -> AppResult<()> {
        write_json(self.store.as_ref(), ALL_STUDENTS_KEY, students).await
    }

    pub async fn current_user(&self) -> AppResult<Option<CurrentUser>> {
        read_json(self.store.as_ref(), CURRENT_USER_KEY).await
    }

    pub async fn set_current_user(&self, user: &CurrentUser) -> AppResult<()> {
        write_json(self.store.as_ref(), CURRENT_USER_KEY, user).await
    }

    pub async fn clear_current_user(&self) -> AppResult<()> {
        self.store.remove(CURRENT_USER_KEY).await
    }
}
