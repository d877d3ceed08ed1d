//! Splits Japanese textbook PDFs into one PDF per chapter (第N章).
//!
//! Detection runs over per-page extracted text: table-of-contents pages are skipped, the
//! first heading in each page's leading lines is taken, chapter starts are moved back onto
//! cover pages, and the resulting page ranges are packaged into a zip archive.

pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
