//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::chain::types::Budget;
use crate::transactions::settle::SettleStrategy;

/// Root configuration for the meme-vote client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Node connection settings.
    pub chain: ChainConfig,

    /// Deployed contract and its call budgets.
    pub contract: ContractConfig,

    /// External signer provider.
    pub signer: SignerConfig,

    /// Feed listing sizes.
    pub feed: FeedConfig,

    /// Transaction settling and inclusion.
    pub transactions: TransactionConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Node connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainConfig {
    /// WebSocket endpoint of the node (e.g., "ws://127.0.0.1:9944").
    pub endpoint: String,

    /// Connect and handshake timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            endpoint: "ws://127.0.0.1:9944".to_string(),
            connect_timeout_secs: 10,
        }
    }
}

impl ChainConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Compute and proof-size allowance.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct BudgetConfig {
    pub ref_time: u64,
    pub proof_size: u64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        let budget = Budget::default();
        Self {
            ref_time: budget.ref_time,
            proof_size: budget.proof_size,
        }
    }
}

impl From<BudgetConfig> for Budget {
    fn from(config: BudgetConfig) -> Self {
        Budget::new(config.ref_time, config.proof_size)
    }
}

/// Contract configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContractConfig {
    /// Address of the deployed meme-vote contract.
    pub address: String,

    /// Path to the ink! metadata file of the contract.
    pub metadata_path: PathBuf,

    /// Budget for read-only queries.
    pub query_budget: BudgetConfig,

    /// Budget for pre-flight simulation and submitted calls.
    pub call_budget: BudgetConfig,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            metadata_path: PathBuf::from("contract/meme_vote.json"),
            query_budget: BudgetConfig::default(),
            call_budget: BudgetConfig::default(),
        }
    }
}

/// Signer provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SignerConfig {
    /// Base URL of the signer provider. Unset means no provider is installed.
    pub provider_url: Option<String>,

    /// Name shown to the user when authorizing.
    pub app_name: String,

    /// Timeout for enable/accounts requests in seconds. Signing is not bounded.
    pub request_timeout_secs: u64,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            provider_url: None,
            app_name: "MemeVote DApp".to_string(),
            request_timeout_secs: 10,
        }
    }
}

/// Feed configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Entries per page of the unranked view.
    pub page_limit: u32,

    /// Entries in the ranked view.
    pub top_count: u32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_limit: 100,
            top_count: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SettleMode {
    /// Sleep `settle_delay_ms`, then refresh.
    Fixed,
    /// Re-query with backoff until the new state is visible.
    Confirm,
}

/// Transaction configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransactionConfig {
    pub settle_strategy: SettleMode,

    /// Delay before refreshing in `fixed` mode.
    pub settle_delay_ms: u64,

    /// Re-query attempts in `confirm` mode.
    pub confirm_max_attempts: u32,

    pub confirm_base_delay_ms: u64,

    pub confirm_max_delay_ms: u64,

    /// Fail transactions not included after this many seconds. Unset waits forever.
    pub inclusion_timeout_secs: Option<u64>,

    /// Dry-run create/vote calls before asking the signer.
    pub preflight: bool,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            settle_strategy: SettleMode::Fixed,
            settle_delay_ms: 2000,
            confirm_max_attempts: 5,
            confirm_base_delay_ms: 500,
            confirm_max_delay_ms: 4000,
            inclusion_timeout_secs: None,
            preflight: true,
        }
    }
}

impl TransactionConfig {
    pub fn settle(&self) -> SettleStrategy {
        match self.settle_strategy {
            SettleMode::Fixed => SettleStrategy::Fixed(Duration::from_millis(self.settle_delay_ms)),
            SettleMode::Confirm => SettleStrategy::Confirm {
                max_attempts: self.confirm_max_attempts,
                base_delay: Duration::from_millis(self.confirm_base_delay_ms),
                max_delay: Duration::from_millis(self.confirm_max_delay_ms),
            },
        }
    }

    pub fn inclusion_timeout(&self) -> Option<Duration> {
        self.inclusion_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_file_uses_defaults() {
        let config: ClientConfig = toml::from_str(
            r#"
            [contract]
            address = "5FHneW46xGXgs5mUiveU4sbTyGBzmstUspZC92UhjJM694ty"
            "#,
        )
        .unwrap();

        assert_eq!(config.chain.endpoint, "ws://127.0.0.1:9944");
        assert_eq!(config.feed.page_limit, 100);
        assert_eq!(config.contract.query_budget.ref_time, 3_000_000_000);
        assert_eq!(config.contract.call_budget.proof_size, 1_000_000);
        assert_eq!(config.signer.app_name, "MemeVote DApp");
        assert!(config.signer.provider_url.is_none());
        assert!(config.transactions.inclusion_timeout().is_none());
        assert_eq!(
            config.transactions.settle(),
            SettleStrategy::Fixed(Duration::from_secs(2))
        );
    }

    #[test]
    fn test_confirm_strategy() {
        let config: ClientConfig = toml::from_str(
            r#"
            [transactions]
            settle_strategy = "confirm"
            confirm_max_attempts = 3
            inclusion_timeout_secs = 60
            "#,
        )
        .unwrap();

        assert!(matches!(
            config.transactions.settle(),
            SettleStrategy::Confirm { max_attempts: 3, .. }
        ));
        assert_eq!(
            config.transactions.inclusion_timeout(),
            Some(Duration::from_secs(60))
        );
    }
}
