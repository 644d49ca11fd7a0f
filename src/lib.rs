//! # Broker Report Fixer
//!
//! Normalizes broker-issued report workbooks. The source reports mix free
//! text, paginated tables with repeated headers and merged banner cells on a
//! single worksheet; the fixer recovers the logical structure and writes one
//! clean sheet with a titled, typed table object per section.
//!
//! ## Pipeline
//!
//! - [`spreadsheet`]: reads the first worksheet of an `.xlsx` into a [`spreadsheet::Grid`]
//! - [`report::Segmenter`]: scans the grid into free-text lines and tables
//! - [`report::Renderer`]: lays the segments out in a [`writer::Workbook`]
//! - [`processor`]: file discovery, output naming and per-file isolation
//!
//! ## Example
//!
//! ```no_run
//! use broker_report_fixer::config::Config;
//! use broker_report_fixer::processor;
//!
//! let summary = processor::run(&Config::default()).unwrap();
//! println!("{} fixed, {} failed", summary.processed, summary.failed);
//! ```
pub mod config;
pub mod error;
mod helpers;
pub mod processor;
pub mod report;
pub mod spreadsheet;
pub mod writer;
