use crate::models::{Book, BookId};
use crate::query::{filter_by_author, recent_first, search_by_text, AuthorMatches, SearchScope};

/// Move `selected` by `offset` inside a list of `len` entries, clamping at
/// both ends.
fn clamp_selection(selected: usize, offset: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let new = selected as isize + offset;
    new.clamp(0, len as isize - 1) as usize
}

/// "Recently added" strip on the home screen.
pub(crate) struct HomeScreen {
    pub(crate) recent: Vec<Book>,
    pub(crate) limit: usize,
    pub(crate) selected: usize,
}

impl HomeScreen {
    pub(crate) fn new(books: &[Book], limit: usize) -> Self {
        let mut screen = Self {
            recent: Vec::new(),
            limit,
            selected: 0,
        };
        screen.set_books(books);
        screen
    }

    pub(crate) fn set_books(&mut self, books: &[Book]) {
        self.recent = recent_first(books, self.limit);
        self.selected = clamp_selection(self.selected, 0, self.recent.len());
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        self.selected = clamp_selection(self.selected, offset, self.recent.len());
    }

    pub(crate) fn current_book(&self) -> Option<&Book> {
        self.recent.get(self.selected)
    }
}

/// The whole collection with the inline text search applied.
pub(crate) struct BrowseScreen {
    pub(crate) books: Vec<Book>,
    pub(crate) filtered_books: Vec<Book>,
    pub(crate) query: String,
    pub(crate) scope: SearchScope,
    pub(crate) selected: usize,
}

impl BrowseScreen {
    pub(crate) fn new(books: &[Book]) -> Self {
        let mut screen = Self {
            books: books.to_vec(),
            filtered_books: Vec::new(),
            query: String::new(),
            scope: SearchScope::All,
            selected: 0,
        };
        screen.apply_filter();
        screen
    }

    pub(crate) fn apply_filter(&mut self) {
        self.filtered_books = search_by_text(&self.books, &self.query, self.scope);
        self.selected = clamp_selection(self.selected, 0, self.filtered_books.len());
    }

    pub(crate) fn set_books(&mut self, books: &[Book]) {
        self.books = books.to_vec();
        self.apply_filter();
    }

    pub(crate) fn set_query(&mut self, query: String) {
        self.query = query;
        self.apply_filter();
    }

    pub(crate) fn cycle_scope(&mut self) -> SearchScope {
        self.scope = self.scope.next();
        self.apply_filter();
        self.scope
    }

    pub(crate) fn clear_search(&mut self) {
        self.query.clear();
        self.scope = SearchScope::All;
        self.apply_filter();
    }

    pub(crate) fn has_search(&self) -> bool {
        !self.query.trim().is_empty()
    }

    pub(crate) fn current_book(&self) -> Option<&Book> {
        self.filtered_books.get(self.selected)
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        self.selected = clamp_selection(self.selected, offset, self.filtered_books.len());
    }

    pub(crate) fn select_first(&mut self) {
        self.selected = 0;
    }

    pub(crate) fn select_last(&mut self) {
        self.selected = self.filtered_books.len().saturating_sub(1);
    }

    /// Put the cursor on `id` if it is visible.
    pub(crate) fn focus(&mut self, id: BookId) {
        if let Some(idx) = self.filtered_books.iter().position(|book| book.id == id) {
            self.selected = idx;
        }
    }
}

/// Author search: the term is typed first and only applied on Enter, so the
/// results describe the last submitted term.
pub(crate) struct AuthorScreen {
    pub(crate) query: String,
    pub(crate) submitted: Option<String>,
    pub(crate) matches: AuthorMatches,
    pub(crate) selected: usize,
}

impl AuthorScreen {
    pub(crate) fn new() -> Self {
        Self {
            query: String::new(),
            submitted: None,
            matches: AuthorMatches::default(),
            selected: 0,
        }
    }

    /// Run the search for the typed term. Blank input is ignored.
    pub(crate) fn submit(&mut self, books: &[Book]) -> bool {
        if self.query.trim().is_empty() {
            return false;
        }
        self.submitted = Some(self.query.clone());
        self.matches = filter_by_author(books, &self.query);
        self.selected = 0;
        true
    }

    /// Re-run the last submitted search after the collection changed.
    pub(crate) fn set_books(&mut self, books: &[Book]) {
        if let Some(term) = &self.submitted {
            self.matches = filter_by_author(books, term);
            self.selected = clamp_selection(self.selected, 0, self.matches.books.len());
        }
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::new();
    }

    pub(crate) fn current_book(&self) -> Option<&Book> {
        self.matches.books.get(self.selected)
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        self.selected = clamp_selection(self.selected, offset, self.matches.books.len());
    }
}

/// Where Esc leaves the detail view.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) enum ReturnTo {
    Home,
    Books,
    Authors,
}

/// One book in full. Only the id is kept; the record is looked up in the store
/// on every draw so edits show immediately.
#[derive(Copy, Clone, Debug)]
pub(crate) struct DetailScreen {
    pub(crate) book_id: BookId,
    pub(crate) return_to: ReturnTo,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn books() -> Vec<Book> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        [
            ("The Hobbit", "J.R.R. Tolkien"),
            ("Dune", "Frank Herbert"),
            ("The Two Towers", "Tolkien, J.R.R."),
            ("Emma", "Jane Austen"),
        ]
        .iter()
        .enumerate()
        .map(|(idx, (title, author))| Book {
            id: BookId::new(),
            title: title.to_string(),
            author: author.to_string(),
            rating: 3,
            notes: String::new(),
            cover_image: None,
            date_added: start + Duration::days(idx as i64),
        })
        .collect()
    }

    #[test]
    fn selection_clamps_at_edges() {
        assert_eq!(clamp_selection(0, -1, 3), 0);
        assert_eq!(clamp_selection(2, 5, 3), 2);
        assert_eq!(clamp_selection(1, 1, 3), 2);
        assert_eq!(clamp_selection(4, 0, 0), 0);
    }

    #[test]
    fn home_shows_newest_first() {
        let home = HomeScreen::new(&books(), 3);
        let titles: Vec<_> = home.recent.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["Emma", "The Two Towers", "Dune"]);
    }

    #[test]
    fn browse_filter_tracks_scope_and_collection() {
        let all = books();
        let mut screen = BrowseScreen::new(&all);
        screen.set_query("the".to_string());
        assert_eq!(screen.filtered_books.len(), 2);

        assert_eq!(screen.cycle_scope(), SearchScope::Title);
        screen.set_query("tolkien".to_string());
        assert!(screen.filtered_books.is_empty());
        assert_eq!(screen.cycle_scope(), SearchScope::Author);
        assert_eq!(screen.filtered_books.len(), 2);

        screen.select_last();
        screen.set_books(&all[..1]);
        assert_eq!(screen.selected, 0);
        assert_eq!(screen.current_book().map(|b| b.title.as_str()), Some("The Hobbit"));

        screen.clear_search();
        assert!(!screen.has_search());
        assert_eq!(screen.scope, SearchScope::All);
    }

    #[test]
    fn author_search_ignores_blank_and_refreshes() {
        let mut all = books();
        let mut screen = AuthorScreen::new();
        screen.query = "  ".to_string();
        assert!(!screen.submit(&all));
        assert!(screen.submitted.is_none());

        screen.query = "tolkien".to_string();
        assert!(screen.submit(&all));
        let aggregate = screen.matches.aggregate.clone().unwrap();
        assert_eq!(aggregate.author_name, "J.R.R. Tolkien");
        assert_eq!(aggregate.count, 2);

        all.remove(0);
        screen.set_books(&all);
        let aggregate = screen.matches.aggregate.clone().unwrap();
        assert_eq!(aggregate.author_name, "Tolkien, J.R.R.");
        assert_eq!(aggregate.count, 1);
    }
}
