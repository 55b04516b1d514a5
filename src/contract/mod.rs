//! Contract binding subsystem.
//!
//! # Data Flow
//! ```text
//! contract.metadata_path (ink! metadata.json)
//!     → schema.rs (labels → selectors, required messages)
//!     → codec.rs (selector + SCALE args, LangError / contract error decoding)
//!     → binding.rs (dry-run queries, pre-flight, signed calls)
//! ```
//!
//! # Error Surface
//! - `QueryError::Transport` for the node path
//! - `QueryError::Contract` for typed contract faults
//! - `QueryError::BudgetExceeded` when a dry run outgrows its budget

pub mod binding;
pub mod codec;
pub mod schema;
pub mod types;

pub use binding::{CallBudgets, ContractBinding};
pub use schema::ContractSchema;
pub use types::{ContractFault, Entry, QueryError, QueryResult};
