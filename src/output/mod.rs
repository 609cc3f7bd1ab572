//! Output module for walk reports
//!
//! This module handles:
//! - Printing a console summary of a finished walk
//! - Writing the markdown history report
//! - Exporting histories to SQLite

mod markdown;
mod schema;
mod sqlite_output;
pub mod stats;
mod traits;

pub use markdown::{format_markdown_report, generate_markdown_report, MarkdownOutputHandler};
pub use sqlite_output::SqliteOutputHandler;
pub use stats::{format_statistics, print_statistics};
pub use traits::{OutputError, OutputHandler, OutputResult, RunContext, RunSummary};
