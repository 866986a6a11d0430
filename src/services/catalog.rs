//! Static book catalog with availability derived from the loan ledger

use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookQuery, BookView},
        user::Student,
    },
    repository::{ledger::holders_of, Repository},
};

fn book(
    id: i32,
    title: &str,
    author: &str,
    isbn: &str,
    genre: &str,
    year: i32,
    description: &str,
) -> Book {
    Book {
        id,
        title: title.to_string(),
        author: author.to_string(),
        isbn: isbn.to_string(),
        genre: genre.to_string(),
        barcode: isbn.replace('-', ""),
        published_year: Some(year),
        description: Some(description.to_string()),
    }
}

/// The ten titles the desk starts with
pub fn default_books() -> Vec<Book> {
    vec![
        book(1, "The Great Gatsby", "F. Scott Fitzgerald", "978-0-7432-7356-5", "Classic Literature", 1925, "A classic American novel set in the Jazz Age"),
        book(2, "To Kill a Mockingbird", "Harper Lee", "978-0-06-112008-4", "Classic Literature", 1960, "A gripping tale of racial injustice and childhood innocence"),
        book(3, "1984", "George Orwell", "978-0-452-28423-4", "Dystopian Fiction", 1949, "A dystopian social science fiction novel"),
        book(4, "Pride and Prejudice", "Jane Austen", "978-0-14-143951-8", "Romance", 1813, "A romantic novel of manners"),
        book(5, "The Catcher in the Rye", "J.D. Salinger", "978-0-316-76948-0", "Coming of Age", 1951, "A controversial novel about teenage rebellion"),
        book(6, "Animal Farm", "George Orwell", "978-0-452-28424-1", "Political Satire", 1945, "An allegorical novella about farm animals"),
        book(7, "Brave New World", "Aldous Huxley", "978-0-06-085052-4", "Dystopian Fiction", 1932, "A dystopian novel about a technologically advanced future"),
        book(8, "Lord of the Flies", "William Golding", "978-0-571-05686-2", "Adventure Fiction", 1954, "A novel about British boys stranded on an uninhabited island"),
        book(9, "The Hobbit", "J.R.R. Tolkien", "978-0-547-92822-7", "Fantasy", 1937, "A fantasy adventure novel"),
        book(10, "Harry Potter and the Philosopher's Stone", "J.K. Rowling", "978-0-7475-3269-9", "Fantasy", 1997, "The first book in the Harry Potter series"),
    ]
}

/// Case-insensitive match on title, author or genre; ISBN matched as typed
pub fn matches(book: &Book, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    book.title.to_lowercase().contains(&needle)
        || book.author.to_lowercase().contains(&needle)
        || book.genre.to_lowercase().contains(&needle)
        || book.isbn.contains(query.trim())
}

/// Availability and current holder of `book` given the ledger
pub fn view(book: &Book, students: &[Student]) -> BookView {
    let holder = holders_of(students, &book.title).next();
    BookView {
        book: book.clone(),
        available: holder.is_none(),
        borrowed_by: holder.map(|s| s.name.clone()),
    }
}

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    books: Arc<Vec<Book>>,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self::with_books(repository, default_books())
    }

    pub fn with_books(repository: Repository, books: Vec<Book>) -> Self {
        Self {
            repository,
            books: Arc::new(books),
        }
    }

    pub fn books(&self) -> &[Book] {
        &self.books
    }

    /// Book by id
    pub fn get(&self, id: i32) -> Option<&Book> {
        self.books.iter().find(|b| b.id == id)
    }

    /// Book whose barcode or ISBN matches a scanned code. Dashes are
    /// ignored on the second pass.
    pub fn find_by_code(&self, code: &str) -> Option<&Book> {
        let code = code.trim();
        self.books
            .iter()
            .find(|b| b.barcode == code || b.isbn == code)
            .or_else(|| {
                let bare = code.replace('-', "");
                self.books.iter().find(|b| b.isbn.replace('-', "") == bare)
            })
    }

    /// Matching books
    pub fn search(&self, query: &str) -> Vec<&Book> {
        self.books.iter().filter(|b| matches(b, query)).collect()
    }

    /// Every book with its derived availability
    pub fn views(&self, students: &[Student]) -> Vec<BookView> {
        self.books.iter().map(|b| view(b, students)).collect()
    }

    /// Search against the current ledger
    pub async fn search_views(&self, query: &BookQuery) -> AppResult<Vec<BookView>> {
        let students = self.repository.ledger.load().await?;
        let available_only = query.available_only.unwrap_or(false);

        Ok(self
            .search(query.q.as_deref().unwrap_or(""))
            .into_iter()
            .map(|b| view(b, &students))
            .filter(|v| !available_only || v.available)
            .collect())
    }

    pub async fn get_view(&self, id: i32) -> AppResult<BookView> {
        let book = self
            .get(id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;
        let students = self.repository.ledger.load().await?;
        Ok(view(book, &students))
    }

    pub async fn get_view_by_code(&self, code: &str) -> AppResult<BookView> {
        let book = self
            .find_by_code(code)
            .ok_or_else(|| AppError::NotFound(format!("No book with barcode {}", code)))?;
        let students = self.repository.ledger.load().await?;
        Ok(view(book, &students))
    }
}
