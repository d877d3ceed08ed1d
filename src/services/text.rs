//! Page text normalization and page classification.

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

/// `第N章 Title`, matched against a single trimmed line.
pub static CHAPTER_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^第\s*([0-9]+)\s*章\s*(.*)$").expect("valid chapter line pattern"));

static CHAPTER_ANYWHERE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"第\s*[0-9]+\s*章").expect("valid chapter pattern"));

static TITLE_ONLY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^第\s*[0-9]+\s*章$").expect("valid title-only pattern"));

const TOC_MARKER: &str = "目次";

/// Boilerplate that only appears on chapter divider pages of the target textbooks.
pub const COVER_MARKERS: &[&str] = &["本試験出題実績", "学習管理表"];

/// NFKC-normalizes page text so full-width digits and spaces match the heading patterns.
pub fn normalize(text: Option<&str>) -> String {
    text.unwrap_or_default().nfkc().collect()
}

/// Characters that end a line. Extracted page text also carries form feeds, NEL and the
/// Unicode line and paragraph separators.
const LINE_BREAKS: &[char] = &[
    '\n', '\r', '\x0b', '\x0c', '\x1c', '\x1d', '\x1e', '\u{85}', '\u{2028}', '\u{2029}',
];

/// Non-blank lines, trimmed, in page order.
pub fn content_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split(LINE_BREAKS)
        .map(str::trim)
        .filter(|line| !line.is_empty())
}

/// A table-of-contents page says so, or enumerates more than one chapter heading.
pub fn is_table_of_contents(text: &str) -> bool {
    if text.contains(TOC_MARKER) {
        return true;
    }
    CHAPTER_ANYWHERE_RE.find_iter(text).nth(1).is_some()
}

/// Chapter divider pages carry a known marker or open with a bare `第N章` line.
pub fn is_chapter_cover(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    if COVER_MARKERS.iter().any(|marker| text.contains(marker)) {
        return true;
    }
    content_lines(text)
        .next()
        .is_some_and(|first| TITLE_ONLY_RE.is_match(first))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_folds_full_width() {
        assert_eq!(normalize(Some("第１２章　租税法")), "第12章 租税法");
        assert_eq!(normalize(None), "");
    }

    #[test]
    fn test_toc_marker() {
        assert!(is_table_of_contents("目次\n第1章 総論"));
        assert!(is_table_of_contents("はじめに\n目次"));
    }

    #[test]
    fn test_toc_by_repeated_headings() {
        let text = "第1章 総論 ..... 3\n第2章 所得税法 ..... 25";
        assert!(is_table_of_contents(text));
        assert!(is_table_of_contents("第1章と第 2 章を参照"));
        assert!(!is_table_of_contents("第1章 総論\n本文が続く"));
    }

    #[test]
    fn test_cover_markers() {
        assert!(is_chapter_cover("本試験出題実績"));
        assert!(is_chapter_cover("ページ上部\n学習管理表\n1回目 2回目"));
        assert!(!is_chapter_cover(""));
        assert!(!is_chapter_cover("普通の本文ページ"));
    }

    #[test]
    fn test_cover_title_only_first_line() {
        assert!(is_chapter_cover("\n  第 3 章  \n所得税法"));
        assert!(!is_chapter_cover("第3章 所得税法"));
        assert!(!is_chapter_cover("序文\n第3章"));
    }

    #[test]
    fn test_content_lines_split_on_every_line_break() {
        let text = "第1章\r総論\r\n本文\x0c次頁\u{85}a\u{2028}b\u{2029}c\x0bd";
        assert_eq!(
            content_lines(text).collect::<Vec<_>>(),
            vec!["第1章", "総論", "本文", "次頁", "a", "b", "c", "d"]
        );
        assert!(is_chapter_cover("第2章\r所得税法"));
    }

    #[test]
    fn test_only_ascii_digits_count_as_chapter_numbers() {
        // Arabic-Indic three survives NFKC unchanged.
        let text = normalize(Some("第٣章 総論\n第1章 序論"));
        assert!(!CHAPTER_LINE_RE.is_match("第٣章 総論"));
        assert!(!is_table_of_contents(&text));
        assert!(!is_chapter_cover("第٣章"));
    }
}
