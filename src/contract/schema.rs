//! Contract call schema loaded from ink! metadata.
//!
//! # Responsibilities
//! - Parse the `metadata.json` produced by `cargo contract build`
//! - Map message labels to selectors and argument lists
//! - Verify at startup that every message the client relies on exists
//!
//! # Design Decisions
//! - The schema is immutable once loaded and shared via `Arc`
//! - Only the `spec.messages` section is read; storage layout and types are ignored

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Message labels of the meme-vote contract.
pub mod messages {
    pub const ADD_MEME: &str = "add_meme";
    pub const VOTE_UP: &str = "vote_up";
    pub const GET_MEME: &str = "get_meme";
    pub const GET_MEMES: &str = "get_memes";
    pub const GET_TOP_MEMES: &str = "get_top_memes";
    pub const HAS_VOTED: &str = "has_voted";
    pub const TOTAL_MEMES: &str = "total_memes";

    pub const REQUIRED: [&str; 7] = [
        ADD_MEME,
        VOTE_UP,
        GET_MEME,
        GET_MEMES,
        GET_TOP_MEMES,
        HAS_VOTED,
        TOTAL_MEMES,
    ];
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("could not read contract metadata: {0}")]
    Io(String),

    #[error("could not parse contract metadata: {0}")]
    Parse(String),

    #[error("message {label} has invalid selector {selector}")]
    InvalidSelector { label: String, selector: String },

    #[error("contract metadata has no message {0}")]
    MissingMessage(String),

    /// A read-only message was used for a state-changing call.
    #[error("message {0} does not mutate state and cannot be submitted")]
    ReadOnlyMessage(String),
}

#[derive(Debug, Deserialize)]
struct MetadataFile {
    #[serde(default)]
    contract: Option<ContractInfo>,
    spec: SpecSection,
}

#[derive(Debug, Deserialize)]
struct ContractInfo {
    name: String,
}

#[derive(Debug, Deserialize)]
struct SpecSection {
    messages: Vec<RawMessage>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    label: String,
    selector: String,
    #[serde(default)]
    mutates: bool,
    #[serde(default)]
    args: Vec<RawArg>,
}

#[derive(Debug, Deserialize)]
struct RawArg {
    label: String,
}

/// One callable contract message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSpec {
    pub label: String,
    pub selector: [u8; 4],
    pub mutates: bool,
    pub args: Vec<String>,
}

/// Static call descriptor of the deployed contract.
#[derive(Debug, Clone)]
pub struct ContractSchema {
    name: String,
    messages: HashMap<String, MessageSpec>,
}

impl ContractSchema {
    /// Parse ink! metadata JSON.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let file: MetadataFile =
            serde_json::from_str(json).map_err(|e| SchemaError::Parse(e.to_string()))?;

        let mut messages = HashMap::with_capacity(file.spec.messages.len());
        for raw in file.spec.messages {
            let selector = parse_selector(&raw.selector).ok_or_else(|| SchemaError::InvalidSelector {
                label: raw.label.clone(),
                selector: raw.selector.clone(),
            })?;
            messages.insert(
                raw.label.clone(),
                MessageSpec {
                    label: raw.label,
                    selector,
                    mutates: raw.mutates,
                    args: raw.args.into_iter().map(|a| a.label).collect(),
                },
            );
        }

        Ok(Self {
            name: file.contract.map(|c| c.name).unwrap_or_else(|| "contract".to_string()),
            messages,
        })
    }

    /// Load and verify metadata from disk.
    pub fn load(path: &Path) -> Result<Self, SchemaError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| SchemaError::Io(format!("{}: {}", path.display(), e)))?;
        let schema = Self::from_json(&json)?;
        schema.verify_required()?;

        tracing::info!(
            path = %path.display(),
            contract = %schema.name,
            messages = schema.messages.len(),
            "Contract schema loaded"
        );
        Ok(schema)
    }

    /// Fail on the first message the client needs but the metadata lacks.
    pub fn verify_required(&self) -> Result<(), SchemaError> {
        for label in messages::REQUIRED {
            self.message(label)?;
        }
        Ok(())
    }

    pub fn message(&self, label: &str) -> Result<&MessageSpec, SchemaError> {
        self.messages
            .get(label)
            .ok_or_else(|| SchemaError::MissingMessage(label.to_string()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

fn parse_selector(value: &str) -> Option<[u8; 4]> {
    let raw = value.strip_prefix("0x").unwrap_or(value);
    let bytes = hex::decode(raw).ok()?;
    bytes.try_into().ok()
}
