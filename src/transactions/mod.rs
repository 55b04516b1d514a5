//! State-changing operations subsystem.
//!
//! # Data Flow
//! ```text
//! create_entry(title, url) / cast_vote(entry_id)
//!     → validation.rs (local input checks, never reach the chain)
//!     → orchestrator.rs (in-flight guard, vote gate, pre-flight, signer)
//!     → pending.rs (Building → Signing → Submitted → InBlock → Succeeded | Failed)
//!     → settle.rs (fixed delay or confirmation loop) → feed refresh
//! ```
//!
//! # Constraints
//! - Once submitted, a transaction cannot be withdrawn by the client
//! - Only the signer can cancel, by declining to sign
//! - Nothing is retried automatically

pub mod orchestrator;
pub mod pending;
pub mod settle;
pub mod types;
pub mod validation;

pub use orchestrator::{ActionKey, OrchestratorSettings, TransactionOrchestrator, VoteAvailability};
pub use pending::PendingTransaction;
pub use settle::SettleStrategy;
pub use types::{TxFailure, TxKind, TxOutcome, TxPhase, TxReceipt};
pub use validation::ValidationError;
