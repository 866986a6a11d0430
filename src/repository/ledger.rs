//! Loan ledger: the persisted list of logged-in students and their loans

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;

use crate::{
    error::{AppError, AppResult},
    models::user::Student,
    repository::store::{write_json, KeyValueStore, LOGGED_IN_STUDENTS_KEY},
};

/// Reads and rewrites the whole `loggedInStudents` collection.
///
/// Every mutation goes through [`LedgerRepository::update`], which holds a
/// process-wide lock from read to write so no other operation observes or
/// clobbers a half-applied change. Writers in other processes sharing the
/// same store are not coordinated (last write wins).
///
/// Entries are decoded one by one. An entry that does not decode is left out
/// of the typed view but written back unchanged by every update.
#[derive(Clone)]
pub struct LedgerRepository {
    store: Arc<dyn KeyValueStore>,
    lock: Arc<Mutex<()>>,
}

impl LedgerRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Current ledger contents. An unreadable document reads as empty.
    pub async fn load(&self) -> AppResult<Vec<Student>> {
        match self.read().await {
            Ok((students, _)) => Ok(students),
            Err(AppError::Storage(e)) => {
                tracing::warn!("Reading ledger as empty: {}", e);
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Apply `f` to the ledger and persist the full collection if it succeeds.
    ///
    /// Fails without writing when the stored document is not a JSON array.
    pub async fn update<F, R>(&self, f: F) -> AppResult<R>
    where
        F: FnOnce(&mut Vec<Student>) -> AppResult<R>,
    {
        let _guard = self.lock.lock().await;

        let (mut students, unreadable) = self.read().await?;
        let result = f(&mut students)?;

        let mut entries = students
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        entries.extend(unreadable);
        write_json(self.store.as_ref(), LOGGED_IN_STUDENTS_KEY, &entries).await?;

        Ok(result)
    }

    /// Decoded students plus the raw entries that did not decode
    async fn read(&self) -> AppResult<(Vec<Student>, Vec<Value>)> {
        let Some(raw) = self.store.get(LOGGED_IN_STUDENTS_KEY).await? else {
            return Ok((Vec::new(), Vec::new()));
        };

        let entries: Vec<Value> = serde_json::from_str(&raw).map_err(|e| {
            AppError::Storage(format!("'{}' is not a JSON array: {}", LOGGED_IN_STUDENTS_KEY, e))
        })?;

        let mut students = Vec::with_capacity(entries.len());
        let mut unreadable = Vec::new();
        for entry in entries {
            match serde_json::from_value::<Student>(entry.clone()) {
                Ok(student) => students.push(student),
                Err(e) => {
                    tracing::warn!("Keeping unreadable ledger entry as is: {}", e);
                    unreadable.push(entry);
                }
            }
        }
        Ok((students, unreadable))
    }
}

/// Active students whose borrowed list holds `title`
pub fn holders_of<'a>(students: &'a [Student], title: &'a str) -> impl Iterator<Item = &'a Student> {
    students
        .iter()
        .filter(move |s| s.is_active && s.holds(title))
}

/// A title is available iff no active student holds it
pub fn is_available(students: &[Student], title: &str) -> bool {
    holders_of(students, title).next().is_none()
}
