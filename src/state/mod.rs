//! State module for tracking walk progress
//!
//! # Components
//!
//! - `CrawlPhase`: lifecycle of a walk (init, active, restarting, terminated)
//! - `CrawlState`: current page, step counter and visited set of one walk

mod crawl_state;
mod phase;

// Re-export main types
pub use crawl_state::CrawlState;
pub use phase::CrawlPhase;
