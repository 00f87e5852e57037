//! Post invariants shared by listings, forms, and page titles.

use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

const HUMAN_DATE: &[BorrowedFormatItem<'static>] =
    format_description!("[day] [month repr:long] [year]");

/// Number of leading characters used when a post is shown in short form.
pub const POST_PREVIEW_CHARS: usize = 15;

/// Short form of a post body: its first [`POST_PREVIEW_CHARS`] characters.
pub fn preview(text: &str) -> String {
    text.chars().take(POST_PREVIEW_CHARS).collect()
}

/// Whether the supplied body counts as present (whitespace does not).
pub fn has_text(text: &str) -> bool {
    !text.trim().is_empty()
}

/// Split a body into display lines; templates join them with `<br>`.
pub fn text_lines(text: &str) -> Vec<String> {
    text.lines().map(str::to_string).collect()
}

/// `05 March 2024`-style rendering used across listings.
pub fn format_human_date(date: Date) -> String {
    date.format(HUMAN_DATE)
        .unwrap_or_else(|_| date.to_string())
}
