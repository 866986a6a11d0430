//! Heuristic book recommendations from static reader profiles

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use rand::Rng;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{book::Book, recommendation::Recommendation},
    repository::Repository,
    services::catalog::{view, CatalogService},
};

const EXACT_GENRE_POINTS: f64 = 40.0;
const RELATED_GENRE_POINTS: f64 = 25.0;
const TRENDING_POINTS: f64 = 20.0;
const KNOWN_AUTHOR_POINTS: f64 = 15.0;
const JITTER_RANGE: f64 = 10.0;
const MIN_SCORE: f64 = 20.0;
const MAX_SCORE: u32 = 95;
const MAX_RESULTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReadingLevel {
    Beginner,
    Intermediate,
    Advanced,
}

/// What the scorer knows about a reader
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReaderProfile {
    pub preferred_genres: Vec<String>,
    pub history: Vec<String>,
    pub reading_level: ReadingLevel,
}

impl Default for ReaderProfile {
    fn default() -> Self {
        Self {
            preferred_genres: vec!["Classic Literature".to_string()],
            history: Vec::new(),
            reading_level: ReadingLevel::Beginner,
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

static PROFILES: Lazy<HashMap<&'static str, ReaderProfile>> = Lazy::new(|| {
    HashMap::from([
        (
            "john@example.com",
            ReaderProfile {
                preferred_genres: strings(&["Classic Literature", "Dystopian Fiction"]),
                history: strings(&["The Great Gatsby", "1984"]),
                reading_level: ReadingLevel::Advanced,
            },
        ),
        (
            "jane@example.com",
            ReaderProfile {
                preferred_genres: strings(&["Classic Literature", "Romance"]),
                history: strings(&["To Kill a Mockingbird"]),
                reading_level: ReadingLevel::Intermediate,
            },
        ),
    ])
});

const TRENDING: [&str; 4] = ["Animal Farm", "Brave New World", "Lord of the Flies", "The Hobbit"];

/// Genres readers of the key genre tend to enjoy
fn related_genres(genre: &str) -> &'static [&'static str] {
    match genre {
        "Classic Literature" => &["Romance", "Coming of Age", "Political Satire"],
        "Dystopian Fiction" => &["Political Satire", "Adventure Fiction"],
        "Romance" => &["Classic Literature", "Coming of Age"],
        "Fantasy" => &["Adventure Fiction"],
        "Adventure Fiction" => &["Fantasy", "Coming of Age"],
        _ => &[],
    }
}

/// Known profile, if any
pub fn profile_for(email: &str) -> Option<&'static ReaderProfile> {
    PROFILES.get(email)
}

fn known_authors<'a>(profile: &ReaderProfile, catalog: &'a [Book]) -> Vec<&'a str> {
    profile
        .history
        .iter()
        .filter_map(|title| catalog.iter().find(|b| &b.title == title))
        .map(|b| b.author.as_str())
        .collect()
}

/// Strongest reason a book was suggested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    Genre,
    RelatedGenre,
    Trending,
    KnownAuthor,
}

impl Reason {
    pub fn describe(self, book: &Book) -> String {
        match self {
            Reason::Genre => format!("matches your interest in {}", book.genre),
            Reason::RelatedGenre => "similar to genres you enjoy".to_string(),
            Reason::Trending => "currently trending among students".to_string(),
            Reason::KnownAuthor => "by an author you've read before".to_string(),
        }
    }
}

/// Score before jitter, with the first reason that applied
pub fn base_score(profile: &ReaderProfile, book: &Book, catalog: &[Book]) -> (f64, Option<Reason>) {
    let mut score = 0.0;
    let mut reasons = Vec::new();

    if profile.preferred_genres.iter().any(|g| g == &book.genre) {
        score += EXACT_GENRE_POINTS;
        reasons.push(Reason::Genre);
    }

    let related = profile
        .preferred_genres
        .iter()
        .flat_map(|g| related_genres(g).iter())
        .any(|g| *g == book.genre);
    if related {
        score += RELATED_GENRE_POINTS;
        reasons.push(Reason::RelatedGenre);
    }

    if TRENDING.contains(&book.title.as_str()) {
        score += TRENDING_POINTS;
        reasons.push(Reason::Trending);
    }

    if known_authors(profile, catalog).contains(&book.author.as_str()) {
        score += KNOWN_AUTHOR_POINTS;
        reasons.push(Reason::KnownAuthor);
    }

    (score, reasons.first().copied())
}

/// Rank `candidates` for `profile`. `catalog` resolves authors of
/// previously read titles.
pub fn recommend_with_rng<R: Rng + ?Sized>(
    profile: &ReaderProfile,
    candidates: &[Book],
    catalog: &[Book],
    rng: &mut R,
) -> Vec<Recommendation> {
    let mut picks: Vec<Recommendation> = candidates
        .iter()
        .filter_map(|book| {
            let (base, reason) = base_score(profile, book, catalog);
            let score = base + rng.gen_range(0.0..JITTER_RANGE);
            if score <= MIN_SCORE {
                return None;
            }

            Some(Recommendation {
                book: book.clone(),
                reason: reason
                    .map(|r| r.describe(book))
                    .unwrap_or_else(|| "recommended for you".to_string()),
                match_score: (score.round() as u32).min(MAX_SCORE),
            })
        })
        .collect();

    picks.sort_by(|a, b| b.match_score.cmp(&a.match_score));
    picks.truncate(MAX_RESULTS);
    picks
}

/// Likelihood that a known reader enjoys a book, in `[0, 0.95]`
pub fn predict_preference(email: &str, book_id: i32, catalog: &[Book]) -> f64 {
    let (Some(profile), Some(book)) = (profile_for(email), catalog.iter().find(|b| b.id == book_id))
    else {
        return 0.0;
    };

    let mut prediction = 0.5;
    if profile.preferred_genres.iter().any(|g| g == &book.genre) {
        prediction += 0.3;
    }
    let read_author = catalog
        .iter()
        .filter(|b| b.author == book.author)
        .any(|b| profile.history.contains(&b.title));
    if read_author {
        prediction += 0.2;
    }
    f64::min(prediction, 0.95)
}

#[derive(Clone)]
pub struct RecommendationService {
    repository: Repository,
    catalog: CatalogService,
    default_profile: Arc<ReaderProfile>,
}

impl RecommendationService {
    pub fn new(repository: Repository, catalog: CatalogService) -> Self {
        Self {
            repository,
            catalog,
            default_profile: Arc::new(ReaderProfile::default()),
        }
    }

    /// Up to five available books for `email`
    pub async fn recommend(&self, email: &str) -> AppResult<Vec<Recommendation>> {
        let students = self.repository.ledger.load().await?;
        let available: Vec<Book> = self
            .catalog
            .books()
            .iter()
            .filter(|b| view(b, &students).available)
            .cloned()
            .collect();

        let profile: &ReaderProfile = match profile_for(email) {
            Some(profile) => profile,
            None => &self.default_profile,
        };
        let picks = recommend_with_rng(
            profile,
            &available,
            self.catalog.books(),
            &mut rand::thread_rng(),
        );
        tracing::debug!("{} recommendation(s) for {}", picks.len(), email);
        Ok(picks)
    }

    pub fn predict(&self, email: &str, book_id: i32) -> f64 {
        predict_preference(email, book_id, self.catalog.books())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::catalog::default_books;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_default_profile_scores_classics_at_least_forty() {
        let books = default_books();
        let profile = ReaderProfile::default();

        let gatsby = books.iter().find(|b| b.title == "The Great Gatsby").unwrap();
        let (score, reason) = base_score(&profile, gatsby, &books);
        assert!(score >= 40.0);
        assert_eq!(reason, Some(Reason::Genre));
        assert_eq!(
            Reason::Genre.describe(gatsby),
            "matches your interest in Classic Literature"
        );
    }

    #[test]
    fn test_recommendations_are_sorted_capped_and_bounded() {
        let books = default_books();
        let profile = profile_for("john@example.com").unwrap();

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let picks = recommend_with_rng(profile, &books, &books, &mut rng);

            assert!(picks.len() <= 5);
            assert!(picks.windows(2).all(|w| w[0].match_score >= w[1].match_score));
            assert!(picks.iter().all(|p| p.match_score >= 20 && p.match_score <= 95));
        }
    }

    #[test]
    fn test_score_is_capped() {
        // exact and related genre, trending title and a known author
        let books = default_books();
        let profile = profile_for("jane@example.com").unwrap();
        let mut candidate = books[8].clone();
        candidate.genre = "Classic Literature".to_string();
        candidate.author = "Harper Lee".to_string();

        let (base, _) = base_score(profile, &candidate, &books);
        assert_eq!(base, 100.0);

        let mut rng = StdRng::seed_from_u64(7);
        let picks = recommend_with_rng(profile, &[candidate], &books, &mut rng);
        assert_eq!(picks[0].match_score, 95);
    }

    #[test]
    fn test_unmatched_books_are_dropped() {
        let books = default_books();
        let profile = ReaderProfile::default();
        let mut rng = StdRng::seed_from_u64(1);

        let picks = recommend_with_rng(&profile, &books, &books, &mut rng);
        assert!(picks
            .iter()
            .all(|p| p.book.title != "Harry Potter and the Philosopher's Stone"));
    }

    #[test]
    fn test_predict_preference() {
        let books = default_books();

        // Dystopian Fiction preferred and Orwell already read
        assert!((predict_preference("john@example.com", 3, &books) - 0.95).abs() < 1e-9);
        assert!((predict_preference("jane@example.com", 9, &books) - 0.5).abs() < 1e-9);
        assert_eq!(predict_preference("nobody@example.com", 1, &books), 0.0);
        assert_eq!(predict_preference("john@example.com", 99, &books), 0.0);
    }

    #[tokio::test]
    async fn test_borrowed_books_are_not_recommended() {
        use crate::models::{loan::BorrowedBook, user::Student};
        use chrono::Utc;

        let repository = Repository::in_memory();
        let service = RecommendationService::new(repository.clone(), CatalogService::new(repository.clone()));
        repository
            .ledger
            .update(|students| {
                students.push(Student {
                    id: 1,
                    name: "Holder".to_string(),
                    roll_no: String::new(),
                    email: "holder@example.com".to_string(),
                    mobile_no: None,
                    class_name: String::new(),
                    year: String::new(),
                    borrowed_books: vec![BorrowedBook::Legacy("The Great Gatsby".to_string())],
                    overdue_books: 0,
                    login_time: Some(Utc::now()),
                    is_active: true,
                });
                Ok(())
            })
            .await
            .unwrap();

        let picks = service.recommend("anyone@example.com").await.unwrap();
        assert!(picks.iter().all(|p| p.book.title != "The Great Gatsby"));
        assert!(picks.iter().any(|p| p.book.title == "To Kill a Mockingbird"));
    }
}
