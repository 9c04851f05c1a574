use std::cmp::min;
use std::mem;

use chrono::Local;
use crossterm::event::KeyCode;
use log::info;
use open::that as open_link;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

use crate::error::StoreError;
use crate::models::{Book, BookId, MAX_RATING, MIN_RATING};
use crate::query::collection_stats;
use crate::store::BookStore;

use super::forms::{stars, BookField, BookForm, ConfirmBookDelete};
use super::helpers::{book_count, centered_rect, cover_summary, surface_error, truncate_chars};
use super::screens::{AuthorScreen, BrowseScreen, DetailScreen, HomeScreen, ReturnTo};

/// Tab strip at the top of every screen.
const HEADER_HEIGHT: u16 = 1;
/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;
/// Height allocation per book card in list-style views.
const BOOK_CARD_HEIGHT: u16 = 5;
/// Widest bar on the statistics screen.
const STATS_BAR_WIDTH: usize = 30;

/// High-level navigation states. The list screens keep their own state in
/// `App` so a search survives a trip to another tab.
#[derive(Clone, Copy)]
enum Screen {
    Home,
    Books,
    Authors,
    Detail(DetailScreen),
    Stats,
}

impl From<ReturnTo> for Screen {
    fn from(target: ReturnTo) -> Self {
        match target {
            ReturnTo::Home => Screen::Home,
            ReturnTo::Books => Screen::Books,
            ReturnTo::Authors => Screen::Authors,
        }
    }
}

/// Fine-grained modes scoped to the current screen.
enum Mode {
    Normal,
    Searching(SearchTarget),
    AddingBook(BookForm),
    EditingBook { id: BookId, form: BookForm },
    ConfirmDelete(ConfirmBookDelete),
}

/// Which input the keyboard is typing into while searching.
#[derive(Clone, Copy, PartialEq, Eq)]
enum SearchTarget {
    Books,
    Authors,
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
enum StatusKind {
    Info,
    Warning,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Warning => Style::default().fg(Color::Yellow),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Central application state shared across the TUI. Owns the store; every
/// view is refreshed from it after a mutation.
pub struct App {
    store: BookStore,
    home: HomeScreen,
    browse: BrowseScreen,
    authors: AuthorScreen,
    screen: Screen,
    mode: Mode,
    status: Option<StatusMessage>,
}

impl App {
    pub fn new(mut store: BookStore, recent_limit: usize) -> Self {
        let load_error = store.take_load_error();
        let home = HomeScreen::new(store.list(), recent_limit);
        let browse = BrowseScreen::new(store.list());

        let mut app = Self {
            store,
            home,
            browse,
            authors: AuthorScreen::new(),
            screen: Screen::Home,
            mode: Mode::Normal,
            status: None,
        };
        if let Some(err) = load_error {
            app.set_status(surface_error(&err), StatusKind::Warning);
        }
        app
    }

    pub fn store(&self) -> &BookStore {
        &self.store
    }

    /// Process one key press. Returns `true` when the user asked to quit.
    pub fn handle_key(&mut self, code: KeyCode) -> bool {
        let mut exit = false;
        let mode = mem::replace(&mut self.mode, Mode::Normal);

        self.mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit),
            Mode::Searching(target) => self.handle_search(code, target),
            Mode::AddingBook(form) => self.handle_add_book(code, form),
            Mode::EditingBook { id, form } => self.handle_edit_book(code, id, form),
            Mode::ConfirmDelete(confirm) => self.handle_confirm_delete(code, confirm),
        };

        exit
    }

    /// Retry writing the collection after a persistence failure.
    pub(crate) fn handle_ctrl_s(&mut self) {
        match self.store.flush() {
            Ok(()) if self.store.is_durable() => {
                let saved = book_count(self.store.len());
                self.set_status(format!("Saved {saved} to disk."), StatusKind::Info);
            }
            Ok(()) => {
                let kept = book_count(self.store.len());
                self.set_status(
                    format!("Kept {kept} for this session only; storage is memory-only."),
                    StatusKind::Warning,
                );
            }
            Err(err) => self.set_status(surface_error(&err), StatusKind::Warning),
        }
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Mode {
        match code {
            KeyCode::Char('q') => {
                *exit = true;
                return Mode::Normal;
            }
            KeyCode::Char('h') | KeyCode::Char('H') => {
                self.switch_screen(Screen::Home);
                return Mode::Normal;
            }
            KeyCode::Char('b') | KeyCode::Char('B') => {
                self.switch_screen(Screen::Books);
                return Mode::Normal;
            }
            KeyCode::Char('a') | KeyCode::Char('A') => {
                self.switch_screen(Screen::Authors);
                return Mode::Normal;
            }
            KeyCode::Char('t') | KeyCode::Char('T') => {
                self.switch_screen(Screen::Stats);
                return Mode::Normal;
            }
            KeyCode::Char('+') => {
                self.clear_status();
                return Mode::AddingBook(BookForm::default());
            }
            _ => {}
        }

        match self.screen {
            Screen::Home => match code {
                KeyCode::Esc => *exit = true,
                KeyCode::Up => self.home.move_selection(-1),
                KeyCode::Down => self.home.move_selection(1),
                KeyCode::Enter => {
                    let id = self.home.current_book().map(|book| book.id);
                    self.open_detail(id, ReturnTo::Home);
                }
                _ => {}
            },
            Screen::Books => match code {
                KeyCode::Esc => {
                    if self.browse.has_search() {
                        self.browse.clear_search();
                    } else {
                        self.switch_screen(Screen::Home);
                    }
                }
                KeyCode::Up => self.browse.move_selection(-1),
                KeyCode::Down => self.browse.move_selection(1),
                KeyCode::PageUp => self.browse.move_selection(-5),
                KeyCode::PageDown => self.browse.move_selection(5),
                KeyCode::Home => self.browse.select_first(),
                KeyCode::End => self.browse.select_last(),
                KeyCode::Char('/') | KeyCode::Char('f') => {
                    self.clear_status();
                    return Mode::Searching(SearchTarget::Books);
                }
                KeyCode::Enter => {
                    let id = self.browse.current_book().map(|book| book.id);
                    self.open_detail(id, ReturnTo::Books);
                }
                KeyCode::Char('e') | KeyCode::Char('E') => {
                    let book = self.browse.current_book().cloned();
                    return self.begin_edit(book);
                }
                KeyCode::Char('-') => {
                    let book = self.browse.current_book().cloned();
                    return self.begin_delete(book);
                }
                _ => {}
            },
            Screen::Authors => match code {
                KeyCode::Esc => self.switch_screen(Screen::Home),
                KeyCode::Up => self.authors.move_selection(-1),
                KeyCode::Down => self.authors.move_selection(1),
                KeyCode::Char('/') | KeyCode::Char('f') => {
                    self.clear_status();
                    return Mode::Searching(SearchTarget::Authors);
                }
                KeyCode::Char('c') | KeyCode::Char('C') => {
                    self.authors.clear();
                    self.clear_status();
                }
                KeyCode::Enter => {
                    let id = self.authors.current_book().map(|book| book.id);
                    self.open_detail(id, ReturnTo::Authors);
                }
                KeyCode::Char('e') | KeyCode::Char('E') => {
                    let book = self.authors.current_book().cloned();
                    return self.begin_edit(book);
                }
                KeyCode::Char('-') => {
                    let book = self.authors.current_book().cloned();
                    return self.begin_delete(book);
                }
                _ => {}
            },
            Screen::Detail(detail) => {
                let book = self.store.find_by_id(detail.book_id).cloned();
                match code {
                    KeyCode::Esc => self.switch_screen(detail.return_to.into()),
                    KeyCode::Char('e') | KeyCode::Char('E') => return self.begin_edit(book),
                    KeyCode::Char('-') => return self.begin_delete(book),
                    KeyCode::Enter | KeyCode::Char('o') | KeyCode::Char('O') => {
                        self.open_cover(book)
                    }
                    _ => {}
                }
            }
            Screen::Stats => {
                if code == KeyCode::Esc {
                    self.switch_screen(Screen::Home);
                }
            }
        }

        Mode::Normal
    }

    fn handle_search(&mut self, code: KeyCode, target: SearchTarget) -> Mode {
        match target {
            SearchTarget::Books => match code {
                KeyCode::Esc => {
                    self.browse.clear_search();
                    return Mode::Normal;
                }
                KeyCode::Enter => return Mode::Normal,
                KeyCode::Tab | KeyCode::BackTab => {
                    let scope = self.browse.cycle_scope();
                    self.set_status(
                        format!("Searching by {}.", scope.label().to_lowercase()),
                        StatusKind::Info,
                    );
                }
                KeyCode::Up => self.browse.move_selection(-1),
                KeyCode::Down => self.browse.move_selection(1),
                KeyCode::PageUp => self.browse.move_selection(-5),
                KeyCode::PageDown => self.browse.move_selection(5),
                KeyCode::Backspace => {
                    let mut query = self.browse.query.clone();
                    query.pop();
                    self.browse.set_query(query);
                }
                KeyCode::Char(ch) if !ch.is_control() => {
                    let mut query = self.browse.query.clone();
                    query.push(ch);
                    self.browse.set_query(query);
                }
                _ => {}
            },
            SearchTarget::Authors => match code {
                KeyCode::Esc => {
                    self.authors.clear();
                    return Mode::Normal;
                }
                KeyCode::Enter => {
                    if self.authors.submit(self.store.list()) {
                        return Mode::Normal;
                    }
                    self.set_status("Enter an author name to search.", StatusKind::Error);
                }
                KeyCode::Backspace => {
                    self.authors.query.pop();
                }
                KeyCode::Char(ch) if !ch.is_control() => self.authors.query.push(ch),
                _ => {}
            },
        }

        Mode::Searching(target)
    }

    fn handle_add_book(&mut self, code: KeyCode, mut form: BookForm) -> Mode {
        match code {
            KeyCode::Esc => {
                self.set_status("Add book cancelled.", StatusKind::Info);
                return Mode::Normal;
            }
            KeyCode::Enter => match self.store.add(form.to_draft()) {
                Ok(book) => {
                    info!("added {} from the form", book.id);
                    self.refresh_views(Some(book.id));
                    self.set_status(
                        format!("Added {}.", book.display_title()),
                        StatusKind::Info,
                    );
                    return Mode::Normal;
                }
                Err(StoreError::Validation(err)) => form.error = Some(err.to_string()),
                Err(err) => {
                    self.report_store_error(&err);
                    return Mode::Normal;
                }
            },
            _ => edit_form(&mut form, code),
        }

        Mode::AddingBook(form)
    }

    fn handle_edit_book(&mut self, code: KeyCode, id: BookId, mut form: BookForm) -> Mode {
        match code {
            KeyCode::Esc => {
                self.set_status("Edit cancelled.", StatusKind::Info);
                return Mode::Normal;
            }
            KeyCode::Enter => match self.store.update(id, form.to_patch()) {
                Ok(book) => {
                    self.refresh_views(Some(book.id));
                    self.set_status(
                        format!("Updated {}.", book.display_title()),
                        StatusKind::Info,
                    );
                    return Mode::Normal;
                }
                Err(StoreError::Validation(err)) => form.error = Some(err.to_string()),
                Err(err) => {
                    self.report_store_error(&err);
                    return Mode::Normal;
                }
            },
            _ => edit_form(&mut form, code),
        }

        Mode::EditingBook { id, form }
    }

    fn handle_confirm_delete(&mut self, code: KeyCode, confirm: ConfirmBookDelete) -> Mode {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Mode::Normal
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                match self.store.remove(confirm.id) {
                    Ok(book) => {
                        self.refresh_views(None);
                        self.set_status(
                            format!("Deleted {}.", book.display_title()),
                            StatusKind::Info,
                        );
                    }
                    Err(err) => self.report_store_error(&err),
                }
                Mode::Normal
            }
            _ => Mode::ConfirmDelete(confirm),
        }
    }

    /// Surface a failed store call that did not come from form validation. A
    /// persistence failure still changed the collection, so views are
    /// refreshed either way.
    fn report_store_error(&mut self, err: &StoreError) {
        self.refresh_views(None);
        let kind = if err.is_persistence() {
            StatusKind::Warning
        } else {
            StatusKind::Error
        };
        self.set_status(surface_error(err), kind);
    }

    fn begin_edit(&mut self, book: Option<Book>) -> Mode {
        match book {
            Some(book) => {
                self.clear_status();
                Mode::EditingBook {
                    id: book.id,
                    form: BookForm::from_book(&book),
                }
            }
            None => {
                self.set_status("No book selected to edit.", StatusKind::Error);
                Mode::Normal
            }
        }
    }

    fn begin_delete(&mut self, book: Option<Book>) -> Mode {
        match book {
            Some(book) => {
                self.clear_status();
                Mode::ConfirmDelete(ConfirmBookDelete::from(&book))
            }
            None => {
                self.set_status("No book selected to delete.", StatusKind::Error);
                Mode::Normal
            }
        }
    }

    fn open_detail(&mut self, id: Option<BookId>, return_to: ReturnTo) {
        match id {
            Some(book_id) => {
                self.clear_status();
                self.screen = Screen::Detail(DetailScreen { book_id, return_to });
            }
            None => self.set_status("No book selected.", StatusKind::Error),
        }
    }

    fn open_cover(&mut self, book: Option<Book>) {
        let Some(book) = book else {
            return;
        };
        match book.cover_link() {
            None => self.set_status("This book does not have a cover link.", StatusKind::Error),
            Some(link) => match open_link(link) {
                Ok(()) => self.set_status(
                    format!("Opened cover for {}.", book.title),
                    StatusKind::Info,
                ),
                Err(err) => {
                    self.set_status(format!("Failed to open cover: {err}"), StatusKind::Error)
                }
            },
        }
    }

    fn switch_screen(&mut self, screen: Screen) {
        self.clear_status();
        self.screen = screen;
    }

    /// Recompute every derived view from the store. Leaves the detail screen
    /// when its book is gone.
    fn refresh_views(&mut self, focus: Option<BookId>) {
        let books = self.store.list();
        self.home.set_books(books);
        self.browse.set_books(books);
        self.authors.set_books(books);

        if let Some(id) = focus {
            self.browse.focus(id);
        }

        if let Screen::Detail(detail) = self.screen {
            if self.store.find_by_id(detail.book_id).is_none() {
                self.screen = detail.return_to.into();
            }
        }
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(HEADER_HEIGHT),
                Constraint::Min(0),
                Constraint::Length(FOOTER_HEIGHT),
            ])
            .split(area);

        self.draw_header(frame, chunks[0]);
        match self.screen {
            Screen::Home => self.draw_home(frame, chunks[1]),
            Screen::Books => self.draw_books(frame, chunks[1]),
            Screen::Authors => self.draw_authors(frame, chunks[1]),
            Screen::Detail(detail) => self.draw_detail(frame, chunks[1], detail),
            Screen::Stats => self.draw_stats(frame, chunks[1]),
        }
        self.draw_footer(frame, chunks[2]);

        match &self.mode {
            Mode::AddingBook(form) => self.draw_book_form(frame, area, "Add Book", form),
            Mode::EditingBook { form, .. } => self.draw_book_form(frame, area, "Edit Book", form),
            Mode::ConfirmDelete(confirm) => self.draw_confirm_delete(frame, area, confirm),
            Mode::Searching(SearchTarget::Books) => self.draw_search_bar(frame, chunks[1]),
            Mode::Searching(SearchTarget::Authors) | Mode::Normal => {}
        }
    }

    fn draw_header(&self, frame: &mut Frame, area: Rect) {
        let active = match self.screen {
            Screen::Home => 0,
            Screen::Books => 1,
            Screen::Authors => 2,
            Screen::Stats => 3,
            Screen::Detail(detail) => match detail.return_to {
                ReturnTo::Home => 0,
                ReturnTo::Books => 1,
                ReturnTo::Authors => 2,
            },
        };

        let mut spans = vec![Span::styled(
            " Book Tracker ",
            Style::default().add_modifier(Modifier::BOLD),
        )];
        for (idx, label) in ["[h] Home", "[b] Books", "[a] Authors", "[t] Stats"]
            .iter()
            .enumerate()
        {
            spans.push(Span::raw(" │ "));
            let style = if idx == active {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            spans.push(Span::styled(*label, style));
        }
        if !self.store.is_persisted() {
            spans.push(Span::styled(
                "   ● not saved to disk",
                Style::default().fg(Color::Yellow),
            ));
        }

        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn draw_home(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4),
                Constraint::Length(1),
                Constraint::Min(1),
            ])
            .split(area);

        let count = self.store.len();
        let welcome = Paragraph::new(vec![
            Line::from(Span::styled(
                "Welcome back, Reader!",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(format!(
                "Track, rate, and reflect on your reading journey • {} in your collection",
                book_count(count)
            )),
        ])
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(welcome, chunks[0]);

        frame.render_widget(
            Paragraph::new(Span::styled(
                " Recently Added Books",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            chunks[1],
        );

        if self.home.recent.is_empty() {
            let message = Paragraph::new(
                "Your book collection is empty. Press '+' to add your first book.",
            )
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
            frame.render_widget(message, chunks[2]);
            return;
        }

        self.render_book_cards(frame, chunks[2], &self.home.recent, self.home.selected);
    }

    fn draw_books(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(1)])
            .split(area);

        let count = self.store.len();
        let mut header_lines = vec![Line::from(format!(
            "{} in your collection",
            book_count(count)
        ))];
        if self.browse.has_search() {
            header_lines.push(Line::from(vec![
                Span::styled(
                    format!("Search ({}): ", self.browse.scope.label()),
                    Style::default().fg(Color::Cyan),
                ),
                Span::raw(self.browse.query.clone()),
                Span::styled(
                    format!("  • {} found", self.browse.filtered_books.len()),
                    Style::default().fg(Color::Gray),
                ),
            ]));
        }
        let header = Paragraph::new(header_lines)
            .block(Block::default().borders(Borders::ALL).title("My Books"));
        frame.render_widget(header, chunks[0]);

        if self.store.is_empty() {
            let message = Paragraph::new(
                "Your book collection is empty. Press '+' to add your first book.",
            )
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
            frame.render_widget(message, chunks[1]);
            return;
        }

        if self.browse.filtered_books.is_empty() {
            let message = Paragraph::new(format!(
                "No books match your search for \"{}\".",
                self.browse.query
            ))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
            frame.render_widget(message, chunks[1]);
            return;
        }

        self.render_book_cards(
            frame,
            chunks[1],
            &self.browse.filtered_books,
            self.browse.selected,
        );
    }

    fn draw_authors(&self, frame: &mut Frame, area: Rect) {
        let aggregate = self.authors.matches.aggregate.as_ref();
        let summary_height = if aggregate.is_some() { 4 } else { 0 };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(summary_height),
                Constraint::Min(1),
            ])
            .split(area);

        let typing = matches!(self.mode, Mode::Searching(SearchTarget::Authors));
        let input_style = if typing {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        let input_block = Block::default()
            .borders(Borders::ALL)
            .title("Author Search")
            .style(input_style);
        let input = Paragraph::new(format!("Author: {}", self.authors.query))
            .block(input_block.clone());
        frame.render_widget(input, chunks[0]);
        if typing {
            let inner = input_block.inner(chunks[0]);
            let cursor_x =
                inner.x + "Author: ".len() as u16 + self.authors.query.chars().count() as u16;
            frame.set_cursor_position((cursor_x, inner.y));
        }

        if let Some(aggregate) = aggregate {
            let summary = Paragraph::new(vec![
                Line::from(Span::styled(
                    format!("Author: {}", aggregate.author_name),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(vec![
                    Span::raw("Books in your collection: "),
                    Span::styled(
                        aggregate.count.to_string(),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                ]),
            ])
            .block(Block::default().borders(Borders::ALL));
            frame.render_widget(summary, chunks[1]);
        }

        let message = match &self.authors.submitted {
            None => Some("Press '/' and type an author name, then Enter.".to_string()),
            Some(term) if self.authors.matches.books.is_empty() => Some(format!(
                "No books by author matching \"{term}\" in your collection."
            )),
            Some(_) => None,
        };

        match message {
            Some(text) => {
                let paragraph = Paragraph::new(text)
                    .alignment(Alignment::Center)
                    .block(Block::default().borders(Borders::ALL));
                frame.render_widget(paragraph, chunks[2]);
            }
            None => self.render_book_cards(
                frame,
                chunks[2],
                &self.authors.matches.books,
                self.authors.selected,
            ),
        }
    }

    fn draw_detail(&self, frame: &mut Frame, area: Rect, detail: DetailScreen) {
        let block = Block::default().borders(Borders::ALL).title("Book Details");

        let Some(book) = self.store.find_by_id(detail.book_id) else {
            let paragraph = Paragraph::new("This book is no longer in your collection.")
                .alignment(Alignment::Center)
                .block(block);
            frame.render_widget(paragraph, area);
            return;
        };

        let label_style = Style::default().fg(Color::Gray);
        let added = book.date_added.with_timezone(&Local);
        let mut lines = vec![
            Line::from(Span::styled(
                book.title.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(format!("by {}", book.author)),
            Line::from(""),
            Line::from(vec![
                Span::styled("Rating: ", label_style),
                Span::styled(stars(book.rating), Style::default().fg(Color::Yellow)),
                Span::raw(format!("  ({}/{MAX_RATING})", book.rating)),
            ]),
            Line::from(vec![
                Span::styled("Added:  ", label_style),
                Span::raw(added.format("%B %-d, %Y %H:%M").to_string()),
            ]),
            Line::from(vec![
                Span::styled("Cover:  ", label_style),
                Span::raw(cover_summary(book)),
            ]),
            Line::from(""),
            Line::from(Span::styled("Notes", label_style)),
        ];

        if book.notes.trim().is_empty() {
            lines.push(Line::from(Span::styled(
                "No notes yet.",
                Style::default().fg(Color::DarkGray),
            )));
        } else {
            lines.extend(book.notes.lines().map(|line| Line::from(line.to_string())));
        }

        let paragraph = Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);
    }

    fn draw_stats(&self, frame: &mut Frame, area: Rect) {
        let stats = collection_stats(self.store.list());
        let label_style = Style::default().fg(Color::Gray);
        let value_style = Style::default().add_modifier(Modifier::BOLD);

        let average = stats
            .average_rating
            .map(|avg| format!("{avg:.1} / {MAX_RATING}"))
            .unwrap_or_else(|| "–".to_string());

        let mut lines = vec![
            Line::from(vec![
                Span::styled("Total books:      ", label_style),
                Span::styled(stats.total.to_string(), value_style),
            ]),
            Line::from(vec![
                Span::styled("Average rating:   ", label_style),
                Span::styled(average, value_style),
            ]),
            Line::from(vec![
                Span::styled("Authors:          ", label_style),
                Span::styled(stats.distinct_authors.to_string(), value_style),
            ]),
            Line::from(vec![
                Span::styled("With notes:       ", label_style),
                Span::styled(stats.with_notes.to_string(), value_style),
            ]),
            Line::from(vec![
                Span::styled("With covers:      ", label_style),
                Span::styled(stats.with_cover.to_string(), value_style),
            ]),
            Line::from(""),
            Line::from(Span::styled("Ratings", value_style)),
        ];

        let max_count = stats.rating_counts.iter().copied().max().unwrap_or(0);
        for rating in (MIN_RATING..=MAX_RATING).rev() {
            let count = stats.rating_counts[usize::from(rating - MIN_RATING)];
            let bar_len = if max_count == 0 {
                0
            } else {
                (count * STATS_BAR_WIDTH).div_ceil(max_count)
            };
            lines.push(Line::from(vec![
                Span::styled(stars(rating), Style::default().fg(Color::Yellow)),
                Span::raw(format!(" {count:>3} ")),
                Span::styled("█".repeat(bar_len), Style::default().fg(Color::Cyan)),
            ]));
        }

        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("Most-read authors", value_style)));
        if stats.top_authors.is_empty() {
            lines.push(Line::from(Span::styled(
                "No books yet.",
                Style::default().fg(Color::DarkGray),
            )));
        } else {
            for (author, count) in &stats.top_authors {
                lines.push(Line::from(format!("  {author} ({})", book_count(*count))));
            }
        }

        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Reading Stats"))
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let instructions = self.footer_instructions();

        let paragraph = Paragraph::new(vec![status_line, instructions]).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn draw_search_bar(&self, frame: &mut Frame, area: Rect) {
        let height = 3u16.min(area.height);
        let popup_area = Rect {
            x: area.x,
            y: area.y,
            width: area.width,
            height,
        };
        frame.render_widget(Clear, popup_area);

        let prefix = format!("Search [{}]: ", self.browse.scope.label());
        let block = Block::default().borders(Borders::ALL).title("Search");
        let paragraph = Paragraph::new(Span::raw(format!("{prefix}{}", self.browse.query)))
            .block(block.clone())
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, popup_area);

        let inner = block.inner(popup_area);
        let cursor_x = inner.x
            + prefix.chars().count() as u16
            + self.browse.query.chars().count() as u16;
        frame.set_cursor_position((cursor_x, inner.y));
    }

    fn footer_instructions(&self) -> Line<'static> {
        let key_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        let keys = |pairs: &[(&'static str, &'static str)]| {
            let mut spans = Vec::with_capacity(pairs.len() * 2);
            for (idx, (key, label)) in pairs.iter().enumerate() {
                spans.push(Span::styled(*key, key_style));
                let gap = if idx + 1 == pairs.len() { "" } else { "   " };
                spans.push(Span::raw(format!(" {label}{gap}")));
            }
            Line::from(spans)
        };

        match (&self.screen, &self.mode) {
            (_, Mode::AddingBook(_)) | (_, Mode::EditingBook { .. }) => keys(&[
                ("[Tab]", "Next Field"),
                ("[←→]", "Rating"),
                ("[Enter]", "Save"),
                ("[Esc]", "Cancel"),
            ]),
            (_, Mode::ConfirmDelete(_)) => keys(&[("[y]", "Delete"), ("[n]", "Keep")]),
            (_, Mode::Searching(SearchTarget::Books)) => keys(&[
                ("[Tab]", "Scope"),
                ("[↑↓]", "Select"),
                ("[Enter]", "Done"),
                ("[Esc]", "Clear"),
            ]),
            (_, Mode::Searching(SearchTarget::Authors)) => {
                keys(&[("[Enter]", "Search"), ("[Esc]", "Clear")])
            }
            (Screen::Home, _) => keys(&[
                ("[↑↓]", "Select"),
                ("[Enter]", "Open"),
                ("[+]", "Add"),
                ("[q]", "Quit"),
            ]),
            (Screen::Books, _) => keys(&[
                ("[↑↓]", "Select"),
                ("[Enter]", "Open"),
                ("[/]", "Search"),
                ("[+]", "Add"),
                ("[e]", "Edit"),
                ("[-]", "Delete"),
                ("[Esc]", "Back"),
                ("[q]", "Quit"),
            ]),
            (Screen::Authors, _) => keys(&[
                ("[/]", "Author"),
                ("[c]", "Clear"),
                ("[↑↓]", "Select"),
                ("[Enter]", "Open"),
                ("[e]", "Edit"),
                ("[-]", "Delete"),
                ("[q]", "Quit"),
            ]),
            (Screen::Detail(_), _) => keys(&[
                ("[Enter]", "Open Cover"),
                ("[e]", "Edit"),
                ("[-]", "Delete"),
                ("[Esc]", "Back"),
                ("[q]", "Quit"),
            ]),
            (Screen::Stats, _) => keys(&[
                ("[Ctrl-S]", "Save"),
                ("[Esc]", "Back"),
                ("[q]", "Quit"),
            ]),
        }
    }

    fn draw_book_form(&self, frame: &mut Frame, area: Rect, title: &str, form: &BookForm) {
        let popup_area = centered_rect(70, 50, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title(title).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines: Vec<Line> = BookField::ALL
            .iter()
            .map(|field| form.build_line(*field))
            .collect();
        lines.push(Line::from(""));

        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Enter to save • Tab to switch • ←/→ adjust rating • Esc to cancel",
                Style::default().fg(Color::Gray),
            )));
        }

        let paragraph = Paragraph::new(lines);
        frame.render_widget(paragraph, inner);

        let prefix = format!("{}: ", form.active.label()).len() as u16;
        let cursor_x = inner.x + prefix + form.value_len(form.active) as u16;
        let cursor_y = inner.y + form.active.row();
        frame.set_cursor_position((min(cursor_x, inner.right().saturating_sub(1)), cursor_y));
    }

    fn draw_confirm_delete(&self, frame: &mut Frame, area: Rect, confirm: &ConfirmBookDelete) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title("Delete Book").borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let lines = vec![
            Line::from(format!("Delete '{}' permanently?", confirm.title)),
            Line::from("Its rating and notes will be lost."),
            Line::from(""),
            Line::from(Span::styled(
                "Press Y to confirm or N / Esc to cancel.",
                Style::default().fg(Color::Gray),
            )),
        ];

        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn render_book_cards(&self, frame: &mut Frame, area: Rect, books: &[Book], selected: usize) {
        if books.is_empty() || area.height == 0 {
            return;
        }

        let card_height = BOOK_CARD_HEIGHT as usize;
        let capacity = ((area.height as usize) / card_height).max(1);
        let len = books.len();
        let mut start = if selected >= capacity {
            selected + 1 - capacity
        } else {
            0
        };
        if start + capacity > len {
            start = len.saturating_sub(capacity);
        }
        let end = min(start + capacity, len);
        let visible_len = end.saturating_sub(start);
        if visible_len == 0 {
            return;
        }

        let constraints: Vec<Constraint> = (0..visible_len)
            .map(|_| Constraint::Length(BOOK_CARD_HEIGHT))
            .collect();
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        let text_width = area.width.saturating_sub(4) as usize;
        for (idx, chunk) in rows.iter().enumerate() {
            if chunk.height == 0 {
                continue;
            }

            let book_index = start + idx;
            let Some(book) = books.get(book_index) else {
                break;
            };

            let mut block = Block::default().borders(Borders::ALL);
            let mut paragraph_style = Style::default();
            if book_index == selected {
                block = block.style(Style::default().fg(Color::Yellow));
                paragraph_style = Style::default().fg(Color::Yellow);
            }

            let title = if book_index == selected {
                format!("▶ {}", book.title)
            } else {
                book.title.clone()
            };
            let mut lines = vec![
                Line::from(Span::styled(
                    truncate_chars(&title, text_width),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(vec![
                    Span::styled(
                        truncate_chars(&book.author, text_width.saturating_sub(8)),
                        Style::default().fg(Color::Gray),
                    ),
                    Span::raw("  "),
                    Span::styled(stars(book.rating), Style::default().fg(Color::Yellow)),
                ]),
            ];
            let first_note = book.notes.lines().next().unwrap_or("").trim();
            if !first_note.is_empty() {
                lines.push(Line::from(Span::styled(
                    truncate_chars(first_note, text_width),
                    Style::default().fg(Color::DarkGray),
                )));
            }

            let paragraph = Paragraph::new(lines)
                .block(block)
                .alignment(Alignment::Left)
                .style(paragraph_style);

            frame.render_widget(paragraph, *chunk);
        }
    }
}

/// Keystrokes shared by the add and edit forms.
fn edit_form(form: &mut BookForm, code: KeyCode) {
    match code {
        KeyCode::Tab | KeyCode::Down => form.next_field(),
        KeyCode::BackTab | KeyCode::Up => form.previous_field(),
        KeyCode::Left if form.active == BookField::Rating => form.adjust_rating(-1),
        KeyCode::Right if form.active == BookField::Rating => form.adjust_rating(1),
        KeyCode::Backspace => form.backspace(),
        KeyCode::Char(ch) => {
            if form.push_char(ch) {
                form.error = None;
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::models::BookDraft;
    use crate::storage::MemoryStorage;
    use crate::store::DEFAULT_STORAGE_KEY;

    fn app_with(titles: &[(&str, &str)]) -> App {
        let mut store = BookStore::open(MemoryStorage::new(), DEFAULT_STORAGE_KEY);
        for (title, author) in titles {
            store.add(BookDraft::new(*title, *author, 4)).unwrap();
        }
        App::new(store, 3)
    }

    fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            app.handle_key(KeyCode::Char(ch));
        }
    }

    #[test]
    fn adding_through_the_form_updates_every_view() {
        let mut app = app_with(&[]);
        app.handle_key(KeyCode::Char('+'));
        type_text(&mut app, "Dune");
        app.handle_key(KeyCode::Tab);
        type_text(&mut app, "Frank Herbert");
        app.handle_key(KeyCode::Tab);
        type_text(&mut app, "5");
        app.handle_key(KeyCode::Enter);

        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.store().len(), 1);
        assert_eq!(app.home.recent.len(), 1);
        assert_eq!(app.browse.filtered_books.len(), 1);
    }

    #[test]
    fn invalid_form_stays_open_with_message() {
        let mut app = app_with(&[]);
        app.handle_key(KeyCode::Char('+'));
        type_text(&mut app, "Untitled author missing");
        app.handle_key(KeyCode::Enter);

        match &app.mode {
            Mode::AddingBook(form) => {
                assert_eq!(form.error.as_deref(), Some("Author is required."))
            }
            _ => panic!("form should still be open"),
        }
        assert!(app.store().is_empty());
    }

    #[test]
    fn search_keys_filter_the_collection() {
        let mut app = app_with(&[("Dune", "Frank Herbert"), ("Emma", "Jane Austen")]);
        app.handle_key(KeyCode::Char('b'));
        app.handle_key(KeyCode::Char('/'));
        type_text(&mut app, "emm");
        assert_eq!(app.browse.filtered_books.len(), 1);

        app.handle_key(KeyCode::Esc);
        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.browse.filtered_books.len(), 2);
    }

    #[test]
    fn deleting_from_detail_returns_to_list() {
        let mut app = app_with(&[("Dune", "Frank Herbert")]);
        app.handle_key(KeyCode::Char('b'));
        app.handle_key(KeyCode::Enter);
        assert!(matches!(app.screen, Screen::Detail(_)));

        app.handle_key(KeyCode::Char('-'));
        app.handle_key(KeyCode::Char('y'));
        assert!(app.store().is_empty());
        assert!(matches!(app.screen, Screen::Books));
    }

    #[test]
    fn fallback_storage_is_announced_and_never_reported_as_saved() {
        let store = BookStore::open_fallback(
            MemoryStorage::new(),
            DEFAULT_STORAGE_KEY,
            StorageError::NoHomeDirectory,
        );
        let mut app = App::new(store, 3);
        let status = app.status.as_ref().unwrap();
        assert!(matches!(status.kind, StatusKind::Warning));
        assert!(status.text.contains("could not locate home directory"));

        app.handle_key(KeyCode::Char('+'));
        type_text(&mut app, "Dune");
        app.handle_key(KeyCode::Tab);
        type_text(&mut app, "Frank Herbert");
        app.handle_key(KeyCode::Tab);
        type_text(&mut app, "5");
        app.handle_key(KeyCode::Enter);
        assert_eq!(app.store().len(), 1);
        assert!(!app.store().is_persisted());

        app.handle_ctrl_s();
        let status = app.status.as_ref().unwrap();
        assert!(matches!(status.kind, StatusKind::Warning));
        assert_eq!(
            status.text,
            "Kept 1 book for this session only; storage is memory-only."
        );
    }

    #[test]
    fn ctrl_s_reports_singular_count_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let storage = crate::storage::SqliteStorage::open(dir.path()).unwrap();
        let mut store = BookStore::open(storage, DEFAULT_STORAGE_KEY);
        store.add(BookDraft::new("Dune", "Frank Herbert", 5)).unwrap();
        let mut app = App::new(store, 3);

        app.handle_ctrl_s();
        assert_eq!(app.status.as_ref().unwrap().text, "Saved 1 book to disk.");
    }

    #[test]
    fn author_search_runs_on_enter() {
        let mut app = app_with(&[
            ("The Hobbit", "J.R.R. Tolkien"),
            ("Dune", "Frank Herbert"),
        ]);
        app.handle_key(KeyCode::Char('a'));
        app.handle_key(KeyCode::Char('/'));
        type_text(&mut app, "tolk");
        assert!(app.authors.matches.aggregate.is_none());

        app.handle_key(KeyCode::Enter);
        let aggregate = app.authors.matches.aggregate.clone().unwrap();
        assert_eq!(aggregate.author_name, "J.R.R. Tolkien");
        assert_eq!(aggregate.count, 1);
    }
}
