pub mod chapterizer;
pub mod pdf;
pub mod pdf_text;
pub mod render;
pub mod splitter;
pub mod storage;
pub mod text;

#[cfg(test)]
pub(crate) mod testing {
    use crate::error::{Result, SplitError};
    use crate::services::pdf::PageSource;

    /// In-memory pages; extracted ranges serialize as `pages {start}-{end}`.
    pub struct MemorySource {
        pages: Vec<String>,
    }

    impl MemorySource {
        pub fn new(pages: &[&str]) -> Self {
            Self {
                pages: pages.iter().map(|p| p.to_string()).collect(),
            }
        }
    }

    impl PageSource for MemorySource {
        fn page_count(&self) -> usize {
            self.pages.len()
        }

        fn page_text(&self, page_index: usize) -> String {
            self.pages.get(page_index).cloned().unwrap_or_default()
        }

        fn extract_range(&self, start_index: usize, end_index: usize) -> Result<Vec<u8>> {
            if start_index > end_index || end_index >= self.pages.len() {
                return Err(SplitError::InvalidArgument(format!(
                    "{}..={}",
                    start_index, end_index
                )));
            }
            Ok(format!("pages {}-{}", start_index, end_index).into_bytes())
        }
    }
}
