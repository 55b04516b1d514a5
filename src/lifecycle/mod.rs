//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → schema → connect ∥ discover signer → bind contract → services
//!
//! Shutdown (shutdown.rs):
//!     Ctrl-C or explicit trigger → subscribers stop → context dropped
//! ```
//!
//! # Design Decisions
//! - One `AppContext` per process; it owns the single chain connection
//! - Connection and signer discovery run concurrently and fail independently
//! - Startup failures of either are recorded as state, not returned as errors

pub mod shutdown;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{AppContext, StartupError};
