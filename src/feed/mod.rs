//! Entry feed subsystem.
//!
//! # Data Flow
//! ```text
//! FeedMode (All | Top) + optional caller
//!     → service.rs (get_memes / get_top_memes through the contract binding)
//!     → ordered Vec<Entry> for the presentation layer
//! ```

pub mod service;

pub use service::{EntryFeedService, FeedMode};
