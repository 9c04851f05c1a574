//! Read-only views over a collection. Every helper takes the slice returned
//! by [`crate::BookStore::list`] and returns owned results, so callers can keep
//! them around while the store keeps changing.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

use crate::models::{Book, MAX_RATING, MIN_RATING};

/// Which fields a text search looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchScope {
    #[default]
    All,
    Title,
    Author,
}

impl SearchScope {
    /// Cycle All → Title → Author → All. Used by the search bar toggle.
    pub fn next(self) -> Self {
        match self {
            SearchScope::All => SearchScope::Title,
            SearchScope::Title => SearchScope::Author,
            SearchScope::Author => SearchScope::All,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SearchScope::All => "All",
            SearchScope::Title => "Title",
            SearchScope::Author => "Author",
        }
    }
}

/// Case-insensitive substring search. A blank term returns everything.
pub fn search_by_text(books: &[Book], term: &str, scope: SearchScope) -> Vec<Book> {
    if term.trim().is_empty() {
        return books.to_vec();
    }

    let needle = term.to_lowercase();
    books
        .iter()
        .filter(|book| {
            let in_title = || book.title.to_lowercase().contains(&needle);
            let in_author = || book.author.to_lowercase().contains(&needle);
            match scope {
                SearchScope::All => in_title() || in_author(),
                SearchScope::Title => in_title(),
                SearchScope::Author => in_author(),
            }
        })
        .cloned()
        .collect()
}

/// Summary line for an author search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorAggregate {
    /// Exact author string of the first matching book. Other spellings that
    /// matched the same term are counted but not named.
    pub author_name: String,
    pub count: usize,
}

/// Result of [`filter_by_author`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorMatches {
    pub books: Vec<Book>,
    pub aggregate: Option<AuthorAggregate>,
}

/// Books whose author contains `term`, ignoring case, plus the aggregate. A
/// blank term matches nothing.
pub fn filter_by_author(books: &[Book], term: &str) -> AuthorMatches {
    if term.trim().is_empty() {
        return AuthorMatches::default();
    }

    let needle = term.to_lowercase();
    let matches: Vec<Book> = books
        .iter()
        .filter(|book| book.author.to_lowercase().contains(&needle))
        .cloned()
        .collect();

    let aggregate = matches.first().map(|first| AuthorAggregate {
        author_name: first.author.clone(),
        count: matches.len(),
    });

    AuthorMatches {
        books: matches,
        aggregate,
    }
}

/// Newest books first, at most `limit` of them. Books added at the same
/// instant keep their collection order.
pub fn recent_first(books: &[Book], limit: usize) -> Vec<Book> {
    let mut sorted = books.to_vec();
    sorted.sort_by_key(|book| Reverse(book.date_added));
    sorted.truncate(limit);
    sorted
}

/// Numbers shown on the statistics screen.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionStats {
    pub total: usize,
    /// `None` for an empty collection.
    pub average_rating: Option<f64>,
    /// Index 0 holds the count of one-star books, index 4 five-star books.
    pub rating_counts: [usize; 5],
    /// Distinct authors, compared case-insensitively.
    pub distinct_authors: usize,
    pub with_notes: usize,
    pub with_cover: usize,
    /// Authors with the most books, by exact spelling. Highest count first,
    /// ties alphabetical.
    pub top_authors: Vec<(String, usize)>,
}

/// How many entries [`CollectionStats::top_authors`] keeps.
pub const TOP_AUTHOR_LIMIT: usize = 5;

pub fn collection_stats(books: &[Book]) -> CollectionStats {
    let total = books.len();

    let mut rating_counts = [0usize; 5];
    for book in books {
        if (MIN_RATING..=MAX_RATING).contains(&book.rating) {
            rating_counts[usize::from(book.rating - MIN_RATING)] += 1;
        }
    }

    let average_rating = if total == 0 {
        None
    } else {
        let sum: u64 = books.iter().map(|book| u64::from(book.rating)).sum();
        Some(sum as f64 / total as f64)
    };

    let distinct_authors = books
        .iter()
        .map(|book| book.author.trim().to_lowercase())
        .collect::<HashSet<_>>()
        .len();

    let mut per_author: HashMap<&str, usize> = HashMap::new();
    for book in books {
        *per_author.entry(book.author.as_str()).or_default() += 1;
    }
    let mut top_authors: Vec<(String, usize)> = per_author
        .into_iter()
        .map(|(name, count)| (name.to_string(), count))
        .collect();
    top_authors.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    top_authors.truncate(TOP_AUTHOR_LIMIT);

    CollectionStats {
        total,
        average_rating,
        rating_counts,
        distinct_authors,
        with_notes: books
            .iter()
            .filter(|book| !book.notes.trim().is_empty())
            .count(),
        with_cover: books
            .iter()
            .filter(|book| book.cover_image.is_some())
            .count(),
        top_authors,
    }
}
