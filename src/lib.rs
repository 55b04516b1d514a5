//! Meme-vote contract client library.
//!
//! # Architecture Overview
//!
//! ```text
//!   ChainConnection ──┐                 ┌── EntryFeedService
//!                     ├─ ContractBinding ┤── VoteStateTracker
//!   SignerRegistry ───┘                 └── TransactionOrchestrator
//!                                                  │
//!                                           PendingTransaction
//! ```
//!
//! `AppContext` owns one of each and is the entry point for the presentation
//! layer.

// Core subsystems
pub mod chain;
pub mod contract;
pub mod signer;

// Services
pub mod feed;
pub mod transactions;
pub mod votes;

// Cross-cutting concerns
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod observability;

pub use config::schema::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use lifecycle::{AppContext, Shutdown};
