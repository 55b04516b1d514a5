//! SCALE encoding of contract messages and decoding of their results.
//!
//! Every ink! 4 message returns `Result<T, LangError>`. Messages that can
//! fail return `Result<Result<T, Error>, LangError>`, and the contract sets
//! the REVERT flag when the inner result is `Err`.

use parity_scale_codec::{Decode, Encode};

use crate::chain::types::AccountAddress;
use crate::contract::types::{ContractFault, Entry, QueryError};

/// Meme as laid out by the contract's `Meme` struct.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct MemeRecord {
    pub id: u32,
    pub creator: [u8; 32],
    pub title: String,
    pub url: String,
    pub likes: u32,
}

impl MemeRecord {
    /// Convert into the client-side entry, with the creator already rendered.
    pub fn into_entry(self, creator: AccountAddress) -> Entry {
        Entry {
            id: self.id,
            title: self.title,
            image_url: self.url,
            creator,
            like_count: self.likes,
        }
    }
}

/// ink! dispatch error wrapped around every message result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum LangError {
    #[codec(index = 1)]
    CouldNotReadInput,
}

/// The contract's own error enum, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum ContractErrorCode {
    TitleTooLong,
    EmptyUrl,
    MemeNotFound,
    AlreadyVoted,
}

impl From<ContractErrorCode> for ContractFault {
    fn from(code: ContractErrorCode) -> Self {
        match code {
            ContractErrorCode::TitleTooLong => ContractFault::TitleTooLong,
            ContractErrorCode::EmptyUrl => ContractFault::EmptyUrl,
            ContractErrorCode::MemeNotFound => ContractFault::MemeNotFound,
            ContractErrorCode::AlreadyVoted => ContractFault::AlreadyVoted,
        }
    }
}

/// Selector followed by the encoded arguments.
pub fn encode_call<A: Encode>(selector: [u8; 4], args: &A) -> Vec<u8> {
    let mut input = selector.to_vec();
    args.encode_to(&mut input);
    input
}

/// Decode `Result<T, LangError>`.
pub fn decode_message<T: Decode>(data: &[u8]) -> Result<T, QueryError> {
    let result = <Result<T, LangError>>::decode(&mut &data[..])
        .map_err(|e| QueryError::Decode(e.to_string()))?;
    result.map_err(|_| QueryError::Contract(ContractFault::CouldNotReadInput))
}

/// Decode `Result<Result<T, Error>, LangError>`.
pub fn decode_fallible<T: Decode>(data: &[u8]) -> Result<T, QueryError> {
    let result: Result<T, ContractErrorCode> = decode_message(data)?;
    result.map_err(|code| QueryError::Contract(code.into()))
}
