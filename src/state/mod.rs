//! State module for tracking crawl run progress
//!
//! # Components
//!
//! - `CrawlState`: Lifecycle of a run (idle, running, and its terminal outcomes)

mod crawl_state;

pub use crawl_state::CrawlState;
