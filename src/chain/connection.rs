//! The single shared connection to a chain node.
//!
//! # Responsibilities
//! - Connect once to the configured endpoint, bounded by a connect timeout
//! - Publish the connection state (Connecting → Ready | Failed)
//! - Hand out the node handle to the other subsystems
//!
//! # Design Decisions
//! - One transition per lifetime; a failed connection is never retried here
//! - Not `Clone`: the owning context shares it through `Arc`

use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::timeout;

use crate::chain::transport::{NodeApi, NodeConnector};
use crate::chain::types::{ChainError, ChainResult, ConnectionState};
use crate::observability::metrics;

pub struct ChainConnection {
    endpoint: String,
    connect_timeout: Duration,
    state: watch::Sender<ConnectionState>,
    node: OnceLock<Arc<dyn NodeApi>>,
}

impl ChainConnection {
    /// Create a connection in the `Connecting` state. Nothing is dialled yet.
    pub fn new(endpoint: impl Into<String>, connect_timeout: Duration) -> Self {
        let (state, _) = watch::channel(ConnectionState::Connecting);
        Self {
            endpoint: endpoint.into(),
            connect_timeout,
            state,
            node: OnceLock::new(),
        }
    }

    /// Dial the endpoint and resolve to `Ready` or `Failed`.
    ///
    /// Calling this again after resolution returns the settled state without
    /// dialling: the caller decides whether to build a fresh connection.
    pub async fn connect(&self, connector: &dyn NodeConnector) -> ConnectionState {
        let current = self.state();
        if current != ConnectionState::Connecting || self.node.get().is_some() {
            tracing::warn!(
                endpoint = %self.endpoint,
                state = ?current,
                "Connection already resolved, not reconnecting"
            );
            return current;
        }

        tracing::info!(endpoint = %self.endpoint, "Connecting to chain node");

        let result = match timeout(self.connect_timeout, connector.connect(&self.endpoint)).await {
            Ok(Ok(node)) => match timeout(self.connect_timeout, node.chain_id()).await {
                Ok(Ok(chain_id)) => Ok((node, chain_id)),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(ChainError::Timeout(self.connect_timeout.as_secs())),
            },
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ChainError::Timeout(self.connect_timeout.as_secs())),
        };

        let next = match result {
            Ok((node, chain_id)) => {
                let _ = self.node.set(node);
                tracing::info!(
                    endpoint = %self.endpoint,
                    chain_id = %chain_id,
                    "Chain connection ready"
                );
                ConnectionState::Ready
            }
            Err(e) => {
                tracing::error!(endpoint = %self.endpoint, error = %e, "Chain connection failed");
                ConnectionState::Failed(e.to_string())
            }
        };

        metrics::record_connection_state(&next);
        self.state.send_replace(next.clone());
        next
    }

    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// The node handle, only once the connection is `Ready`.
    pub fn node(&self) -> ChainResult<Arc<dyn NodeApi>> {
        match (self.state(), self.node.get()) {
            (ConnectionState::Ready, Some(node)) => Ok(node.clone()),
            (ConnectionState::Failed(reason), _) => Err(ChainError::NotReady(reason)),
            _ => Err(ChainError::NotReady("still connecting".to_string())),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl std::fmt::Debug for ChainConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainConnection")
            .field("endpoint", &self.endpoint)
            .field("connect_timeout", &self.connect_timeout)
            .field("state", &self.state())
            .finish()
    }
}
