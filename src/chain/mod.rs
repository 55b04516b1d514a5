//! Chain connectivity subsystem.
//!
//! # Data Flow
//! ```text
//! chain.endpoint (config)
//!     → connection.rs (single connection, Connecting → Ready | Failed)
//!     → transport.rs (NodeApi: dry run, prepare/submit, status subscription)
//!     → substrate.rs (subxt implementation for pallet-contracts nodes)
//! ```
//!
//! # Constraints
//! - Exactly one connection per application context
//! - No automatic reconnect; failures surface as `ConnectionState::Failed`
//! - The client never holds key material; signatures arrive from the signer subsystem

pub mod connection;
pub mod substrate;
pub mod transport;
pub mod types;

pub use connection::ChainConnection;
pub use substrate::SubstrateConnector;
pub use transport::{NodeApi, NodeConnector, PreparedCall, TxSubscription};
pub use types::{AccountAddress, Budget, ChainError, ConnectionState, DispatchFailure};
