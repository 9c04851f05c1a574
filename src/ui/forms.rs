use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::models::{Book, BookDraft, BookId, BookPatch, MAX_RATING};

/// Internal representation of the add/edit book form. Values are kept as raw
/// text; the store decides whether they are acceptable.
#[derive(Default, Clone)]
pub(crate) struct BookForm {
    pub(crate) title: String,
    pub(crate) author: String,
    pub(crate) rating: String,
    pub(crate) notes: String,
    pub(crate) cover: String,
    pub(crate) active: BookField,
    pub(crate) error: Option<String>,
}

/// Fields available within the book form, in tab order.
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
pub(crate) enum BookField {
    #[default]
    Title,
    Author,
    Rating,
    Notes,
    Cover,
}

impl BookField {
    pub(crate) const ALL: [BookField; 5] = [
        BookField::Title,
        BookField::Author,
        BookField::Rating,
        BookField::Notes,
        BookField::Cover,
    ];

    pub(crate) fn label(self) -> &'static str {
        match self {
            BookField::Title => "Title",
            BookField::Author => "Author",
            BookField::Rating => "Rating",
            BookField::Notes => "Notes",
            BookField::Cover => "Cover",
        }
    }

    fn placeholder(self) -> &'static str {
        match self {
            BookField::Title | BookField::Author => "<required>",
            BookField::Rating => "<1-5>",
            BookField::Notes | BookField::Cover => "<optional>",
        }
    }

    /// Row of the field inside the form body.
    pub(crate) fn row(self) -> u16 {
        match self {
            BookField::Title => 0,
            BookField::Author => 1,
            BookField::Rating => 2,
            BookField::Notes => 3,
            BookField::Cover => 4,
        }
    }
}

impl BookForm {
    /// Populate the form from an existing book when editing.
    pub(crate) fn from_book(book: &Book) -> Self {
        Self {
            title: book.title.clone(),
            author: book.author.clone(),
            rating: book.rating.to_string(),
            notes: book.notes.clone(),
            cover: book.cover_image.clone().unwrap_or_default(),
            active: BookField::Title,
            error: None,
        }
    }

    pub(crate) fn next_field(&mut self) {
        self.active = match self.active {
            BookField::Title => BookField::Author,
            BookField::Author => BookField::Rating,
            BookField::Rating => BookField::Notes,
            BookField::Notes => BookField::Cover,
            BookField::Cover => BookField::Title,
        };
    }

    pub(crate) fn previous_field(&mut self) {
        self.active = match self.active {
            BookField::Title => BookField::Cover,
            BookField::Author => BookField::Title,
            BookField::Rating => BookField::Author,
            BookField::Notes => BookField::Rating,
            BookField::Cover => BookField::Notes,
        };
    }

    /// Append a character to the active field. The rating field holds a single
    /// digit, so typing there replaces the current value.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        match self.active {
            BookField::Rating => {
                if ch.is_ascii_digit() {
                    self.rating = ch.to_string();
                    true
                } else {
                    false
                }
            }
            BookField::Title => {
                self.title.push(ch);
                true
            }
            BookField::Author => {
                self.author.push(ch);
                true
            }
            BookField::Notes => {
                self.notes.push(ch);
                true
            }
            BookField::Cover => {
                self.cover.push(ch);
                true
            }
        }
    }

    pub(crate) fn backspace(&mut self) {
        self.value_mut(self.active).pop();
    }

    /// Step the rating with the arrow keys, staying inside 1..=5.
    pub(crate) fn adjust_rating(&mut self, delta: i8) {
        let current = self.parsed_rating() as i8;
        let next = (current + delta).clamp(1, MAX_RATING as i8);
        self.rating = next.to_string();
    }

    /// Blank rating means "unset", which the store rejects.
    pub(crate) fn parsed_rating(&self) -> u8 {
        self.rating.trim().parse().unwrap_or(0)
    }

    fn trimmed_cover(&self) -> Option<String> {
        let cover = self.cover.trim();
        if cover.is_empty() {
            None
        } else {
            Some(cover.to_string())
        }
    }

    /// Draft for a new book. Title and author are trimmed; notes are kept as
    /// typed.
    pub(crate) fn to_draft(&self) -> BookDraft {
        BookDraft {
            title: self.title.trim().to_string(),
            author: self.author.trim().to_string(),
            rating: self.parsed_rating(),
            notes: self.notes.clone(),
            cover_image: self.trimmed_cover(),
            date_added: None,
        }
    }

    /// Patch replacing every editable field with the form's values.
    pub(crate) fn to_patch(&self) -> BookPatch {
        BookPatch {
            title: Some(self.title.trim().to_string()),
            author: Some(self.author.trim().to_string()),
            rating: Some(self.parsed_rating()),
            notes: Some(self.notes.clone()),
            cover_image: Some(self.trimmed_cover()),
        }
    }

    fn value(&self, field: BookField) -> &String {
        match field {
            BookField::Title => &self.title,
            BookField::Author => &self.author,
            BookField::Rating => &self.rating,
            BookField::Notes => &self.notes,
            BookField::Cover => &self.cover,
        }
    }

    fn value_mut(&mut self, field: BookField) -> &mut String {
        match field {
            BookField::Title => &mut self.title,
            BookField::Author => &mut self.author,
            BookField::Rating => &mut self.rating,
            BookField::Notes => &mut self.notes,
            BookField::Cover => &mut self.cover,
        }
    }

    /// Render a single line for the form widget.
    pub(crate) fn build_line(&self, field: BookField) -> Line<'static> {
        let value = self.value(field);
        let is_active = self.active == field;

        let display = if value.is_empty() {
            field.placeholder().to_string()
        } else if field == BookField::Rating {
            format!("{value}  {}", stars(self.parsed_rating()))
        } else {
            value.clone()
        };

        let style = if is_active {
            Style::default().fg(Color::Yellow)
        } else if value.is_empty() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };

        Line::from(vec![
            Span::raw(format!("{}: ", field.label())),
            Span::styled(display, style),
        ])
    }

    /// Character count for the requested field.
    pub(crate) fn value_len(&self, field: BookField) -> usize {
        self.value(field).chars().count()
    }
}

/// `★★★☆☆` for a rating of three. Out-of-range values are clamped.
pub(crate) fn stars(rating: u8) -> String {
    let filled = usize::from(rating.min(MAX_RATING));
    let empty = usize::from(MAX_RATING) - filled;
    format!("{}{}", "★".repeat(filled), "☆".repeat(empty))
}

/// State for confirming permanent book deletion.
#[derive(Clone)]
pub(crate) struct ConfirmBookDelete {
    pub(crate) id: BookId,
    pub(crate) title: String,
}

impl ConfirmBookDelete {
    pub(crate) fn from(book: &Book) -> Self {
        Self {
            id: book.id,
            title: book.display_title(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(form: &mut BookForm, text: &str) {
        for ch in text.chars() {
            form.push_char(ch);
        }
    }

    #[test]
    fn tab_order_wraps() {
        let mut form = BookForm::default();
        for expected in BookField::ALL.iter().skip(1) {
            form.next_field();
            assert_eq!(form.active, *expected);
        }
        form.next_field();
        assert_eq!(form.active, BookField::Title);
        form.previous_field();
        assert_eq!(form.active, BookField::Cover);
    }

    #[test]
    fn rating_accepts_single_digit() {
        let mut form = BookForm {
            active: BookField::Rating,
            ..BookForm::default()
        };
        assert!(!form.push_char('x'));
        assert!(form.push_char('4'));
        assert!(form.push_char('2'));
        assert_eq!(form.rating, "2");
        assert_eq!(form.parsed_rating(), 2);

        form.adjust_rating(10);
        assert_eq!(form.parsed_rating(), 5);
        form.adjust_rating(-10);
        assert_eq!(form.parsed_rating(), 1);
    }

    #[test]
    fn blank_rating_is_unset() {
        let form = BookForm::default();
        assert_eq!(form.to_draft().rating, 0);
    }

    #[test]
    fn draft_trims_identity_fields() {
        let mut form = BookForm::default();
        typed(&mut form, "  Dune ");
        form.next_field();
        typed(&mut form, "Herbert");
        form.next_field();
        typed(&mut form, "5");
        form.next_field();
        typed(&mut form, " spice ");
        form.next_field();
        typed(&mut form, "   ");

        let draft = form.to_draft();
        assert_eq!(draft.title, "Dune");
        assert_eq!(draft.author, "Herbert");
        assert_eq!(draft.rating, 5);
        assert_eq!(draft.notes, " spice ");
        assert_eq!(draft.cover_image, None);
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn patch_clears_blank_cover() {
        let mut form = BookForm {
            title: "Emma".into(),
            author: "Austen".into(),
            rating: "3".into(),
            ..BookForm::default()
        };
        assert_eq!(form.to_patch().cover_image, Some(None));
        form.cover = "https://example.com/emma.jpg".into();
        assert_eq!(
            form.to_patch().cover_image,
            Some(Some("https://example.com/emma.jpg".to_string()))
        );
    }

    #[test]
    fn star_strip() {
        assert_eq!(stars(3), "★★★☆☆");
        assert_eq!(stars(0), "☆☆☆☆☆");
        assert_eq!(stars(9), "★★★★★");
    }
}
