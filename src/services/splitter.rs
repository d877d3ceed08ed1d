//! Chapter start adjustment, page range building and zip packaging.

use crate::error::Result;
use crate::models::{AdjustedChapter, Chapter, ChapterRange};
use crate::services::pdf::PageSource;
use crate::services::text;
use regex::Regex;
use std::io::{Cursor, Write};
use std::sync::LazyLock;
use tracing::{debug, info};
use zip::CompressionMethod;
use zip::write::{FileOptions, ZipWriter};

/// How many pages before a detected heading may hold its cover.
pub const COVER_LOOKBACK: usize = 2;

static HOSTILE_CHARS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\\/:*?"<>|]"#).expect("valid filename pattern"));

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// Moves each chapter's start back onto a cover page up to [`COVER_LOOKBACK`] pages earlier.
///
/// Earlier pages are checked nearest first and each qualifying one overwrites the start, so a
/// cover two pages back wins over one directly before the heading.
pub fn adjust_starts<S: PageSource + ?Sized>(
    source: &S,
    chapters: &[Chapter],
) -> Vec<AdjustedChapter> {
    let mut adjusted = chapters
        .iter()
        .map(|ch| {
            let mut start = ch.page_index;
            for back in 1..=COVER_LOOKBACK {
                let Some(prev) = ch.page_index.checked_sub(back) else {
                    continue;
                };
                let prev_text = text::normalize(Some(&source.page_text(prev)));
                if text::is_chapter_cover(&prev_text) {
                    start = prev;
                }
            }
            if start != ch.page_index {
                debug!(
                    "Chapter {} start moved from page {} to cover page {}",
                    ch.chapter_no, ch.page_index, start
                );
            }
            AdjustedChapter {
                chapter_no: ch.chapter_no,
                title: ch.title.clone(),
                page_index: ch.page_index,
                start_index: start,
            }
        })
        .collect::<Vec<_>>();

    adjusted.sort_by_key(|ch| ch.start_index);
    adjusted
}

/// Turns start-sorted chapters into inclusive ranges ending where the next chapter begins.
///
/// Ranges that would end before they start are dropped.
pub fn build_ranges(adjusted: &[AdjustedChapter], total_pages: usize) -> Vec<ChapterRange> {
    adjusted
        .iter()
        .enumerate()
        .filter_map(|(idx, ch)| {
            let end = match adjusted.get(idx + 1) {
                Some(next) => next.start_index.checked_sub(1)?,
                None => total_pages.checked_sub(1)?,
            };
            if ch.start_index > end {
                debug!(
                    "Dropping chapter {}: start {} is past end {}",
                    ch.chapter_no, ch.start_index, end
                );
                return None;
            }
            Some(ChapterRange {
                chapter_no: ch.chapter_no,
                title: ch.title.clone(),
                start_index: ch.start_index,
                end_index: end,
            })
        })
        .collect()
}

/// Adjusts starts against the document and builds its chapter ranges.
pub fn build_chapter_ranges<S: PageSource + ?Sized>(
    source: &S,
    chapters: &[Chapter],
) -> Vec<ChapterRange> {
    let adjusted = adjust_starts(source, chapters);
    build_ranges(&adjusted, source.page_count())
}

/// Replaces characters that are invalid in file names and collapses whitespace.
pub fn safe_filename(name: &str) -> String {
    let replaced = HOSTILE_CHARS_RE.replace_all(name.trim(), "_");
    WHITESPACE_RE.replace_all(&replaced, " ").into_owned()
}

pub fn entry_name(range: &ChapterRange) -> String {
    format!("Chapter {} {}.pdf", range.chapter_no, safe_filename(&range.title))
}

/// Writes each range as a standalone PDF into an in-memory zip archive.
pub fn package_ranges<S: PageSource + ?Sized>(
    source: &S,
    ranges: &[ChapterRange],
) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for range in ranges {
        let bytes = source.extract_range(range.start_index, range.end_index)?;
        let name = entry_name(range);
        debug!("Writing {} ({} pages)", name, range.page_count());
        zip.start_file(name, options)?;
        zip.write_all(&bytes)?;
    }

    let archive = zip.finish()?.into_inner();
    info!(
        "Packaged {} chapters into {} byte archive",
        ranges.len(),
        archive.len()
    );
    Ok(archive)
}

/// Computes ranges for the detected chapters and packages them.
pub fn split_to_zip<S: PageSource + ?Sized>(source: &S, chapters: &[Chapter]) -> Result<Vec<u8>> {
    let ranges = build_chapter_ranges(source, chapters);
    package_ranges(source, &ranges)
}
