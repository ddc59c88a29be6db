use opns_core::{AddressError, CovenantError, OutpointError, TxError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Covenant(#[from] CovenantError),

    #[error("domain {0:?} is already registered")]
    AlreadyClaimed(String),

    #[error("domain {0:?} is already fully mined")]
    AlreadyMined(String),

    #[error("character {character:?} is already claimed under {domain:?}")]
    BranchClaimed { domain: String, character: char },

    #[error("mined ancestor {ancestor:?} is not a prefix of {domain:?}")]
    AncestorMismatch { domain: String, ancestor: String },

    #[error("funding queue exhausted, {needed} more satoshis required")]
    FundingExhausted { needed: u64 },

    #[error("broadcast rejected - {status} {message}")]
    BroadcastRejected { status: u16, message: String },

    #[error("invalid funding queue entry {0:?}")]
    QueueEntry(String),

    #[error(transparent)]
    Tx(#[from] TxError),

    #[error(transparent)]
    Address(#[from] AddressError),

    #[error(transparent)]
    Outpoint(#[from] OutpointError),

    #[error("Secp256k1 -> {0}")]
    Signing(#[from] secp256k1::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid base64 script: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failure of a multi-character mining run.
///
/// Characters mined before the failure stay on chain; `last_txid` is the
/// last of them so the caller can resume from that prefix.
#[derive(Debug, Error)]
#[error("mining stopped")]
pub struct MineDomainError {
    pub last_txid: Option<String>,
    pub source: Error,
}

impl MineDomainError {
    pub fn new(last_txid: Option<String>, source: Error) -> Self {
        MineDomainError { last_txid, source }
    }
}

impl From<Error> for MineDomainError {
    fn from(source: Error) -> Self {
        MineDomainError::new(None, source)
    }
}
