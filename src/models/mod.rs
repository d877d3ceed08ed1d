use serde::{Deserialize, Serialize};

/// A chapter heading found in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub chapter_no: u32,
    pub title: String,
    /// Zero-based page on which the heading was first matched.
    pub page_index: usize,
}

/// A chapter after its start page has been moved back onto a cover page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjustedChapter {
    pub chapter_no: u32,
    pub title: String,
    pub page_index: usize,
    pub start_index: usize,
}

/// Inclusive, zero-based page interval assigned to one chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRange {
    pub chapter_no: u32,
    pub title: String,
    pub start_index: usize,
    pub end_index: usize,
}

impl ChapterRange {
    pub fn page_count(&self) -> usize {
        self.end_index - self.start_index + 1
    }
}

/// Preview row; carries one-based page numbers for display.
#[derive(Debug, Clone, Serialize)]
pub struct PreviewChapter {
    pub chapter_no: u32,
    pub title: String,
    pub start_index: usize,
    pub end_index: usize,
    pub start_page: usize,
    pub end_page: usize,
}

impl From<ChapterRange> for PreviewChapter {
    fn from(range: ChapterRange) -> Self {
        Self {
            start_page: range.start_index + 1,
            end_page: range.end_index + 1,
            chapter_no: range.chapter_no,
            title: range.title,
            start_index: range.start_index,
            end_index: range.end_index,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub filename: String,
    pub chapters: Vec<PreviewChapter>,
}

/// Returned by `/upload` when no chapter heading was detected.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub filename: String,
    pub chapters: Vec<PreviewChapter>,
}

#[derive(Debug, Serialize)]
pub struct PageTextResponse {
    pub filename: String,
    pub page: usize,
    pub text: String,
}
