//! Signing identities subsystem.
//!
//! # Data Flow
//! ```text
//! signer.provider_url (config)
//!     → remote.rs (HTTP provider: enable, accounts, sign)
//!     → registry.rs (authorization, fresh account lists, selected identity)
//!     → transactions (asks for a TxSigner right before signing)
//! ```
//!
//! # Security Constraints
//! - The client holds zero private key material
//! - Accounts are provider-owned and may disappear between calls
//! - Signing may wait indefinitely on the user; only the provider can cancel it

pub mod registry;
pub mod remote;
pub mod types;

pub use registry::SignerRegistry;
pub use remote::HttpSignerProvider;
pub use types::{AccountIdentity, ProviderError, SignerProvider, TxSigner};
