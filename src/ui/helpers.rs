use std::error::Error;

use ratatui::layout::{Constraint, Direction, Layout, Rect};

use crate::models::Book;

/// Produce a rectangle centered within `area` that spans the requested percent
/// of the width and height. Used for modal dialogs.
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(area);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(horizontal[1]);

    vertical[1]
}

/// Flatten an error and its sources into one footer-friendly line.
pub(crate) fn surface_error(err: &dyn Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Short description of a cover payload. Data URIs can be megabytes long, so
/// only their media type is shown.
pub(crate) fn cover_summary(book: &Book) -> String {
    match book.cover_image.as_deref().map(str::trim) {
        None | Some("") => "No cover".to_string(),
        Some(cover) if cover.starts_with("data:") => {
            let media_type = cover
                .trim_start_matches("data:")
                .split([';', ','])
                .next()
                .filter(|kind| !kind.is_empty())
                .unwrap_or("image");
            format!("Embedded {media_type}")
        }
        Some(cover) => cover.to_string(),
    }
}

/// `1 book`, `3 books`.
pub(crate) fn book_count(count: usize) -> String {
    if count == 1 {
        "1 book".to_string()
    } else {
        format!("{count} books")
    }
}

/// First `max` characters of `text`, with an ellipsis when something was cut.
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
