//! Vote status subsystem.
//!
//! # Data Flow
//! ```text
//! (selected account, entry id)
//!     → tracker.rs (fresh has_voted query through the contract binding)
//!     → VoteGate (Allowed | AlreadyVoted | Unknown) for the orchestrator
//! ```

pub mod tracker;

pub use tracker::{VoteGate, VoteStateTracker};
