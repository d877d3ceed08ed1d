use crate::models::Chapter;
use crate::services::pdf::PageSource;
use crate::services::text::{self, CHAPTER_LINE_RE};
use std::collections::BTreeMap;
use tracing::debug;

/// Only the leading lines of a page are searched for a heading.
pub const HEAD_WINDOW: usize = 12;

pub const UNTITLED: &str = "（無題）";

/// Detects one chapter per distinct chapter number, sorted by number.
pub fn detect_chapters<S: PageSource + ?Sized>(source: &S) -> Vec<Chapter> {
    let mut found = Vec::new();

    for page_index in 0..source.page_count() {
        let raw = source.page_text(page_index);
        let text = text::normalize(Some(&raw));

        if text::is_table_of_contents(&text) {
            debug!("Page {} looks like a table of contents, skipping", page_index);
            continue;
        }

        if let Some((chapter_no, title)) = match_heading(&text) {
            debug!("Page {}: chapter {} \"{}\"", page_index, chapter_no, title);
            found.push(Chapter {
                chapter_no,
                title,
                page_index,
            });
        }
    }

    register_chapters(found)
}

/// Finds the first `第N章` line within the page's head window.
///
/// An empty title is taken from the following line when the window has one.
pub fn match_heading(text: &str) -> Option<(u32, String)> {
    let head = text::content_lines(text)
        .take(HEAD_WINDOW)
        .collect::<Vec<_>>();

    for (idx, line) in head.iter().enumerate() {
        let Some(captures) = CHAPTER_LINE_RE.captures(line) else {
            continue;
        };
        let chapter_no = match captures[1].parse::<u32>() {
            Ok(n) if n > 0 => n,
            _ => continue,
        };

        let mut title = captures
            .get(2)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();
        if title.is_empty() {
            if let Some(next) = head.get(idx + 1) {
                title = next.trim().to_string();
            }
        }
        if title.is_empty() {
            title = UNTITLED.to_string();
        }

        return Some((chapter_no, title));
    }

    None
}

/// Keeps the first candidate seen for each chapter number and orders by number.
pub fn register_chapters(candidates: Vec<Chapter>) -> Vec<Chapter> {
    let mut unique: BTreeMap<u32, Chapter> = BTreeMap::new();
    for chapter in candidates {
        unique.entry(chapter.chapter_no).or_insert(chapter);
    }
    unique.into_values().collect()
}
