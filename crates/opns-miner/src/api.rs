//! Indexer API integration: registration lookups, mined ancestors,
//! broadcast and unspent outputs.

use crate::error::{Error, Result};
use base64::Engine;
use opns_core::Outpoint;
use reqwest::blocking::{Client, Response};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// The deepest on-chain covenant output for a domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AncestorOutput {
    pub outpoint: Outpoint,
    pub script: Vec<u8>,
}

/// An unspent output of an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Txo {
    pub outpoint: Outpoint,
    pub satoshis: u64,
}

/// The queries the miner makes against chain indexing infrastructure.
pub trait Indexer {
    /// Whether `domain` is already registered.
    fn is_registered(&self, domain: &str) -> Result<bool>;

    /// The covenant output of the longest mined prefix of `domain`.
    fn mine_ancestor(&self, domain: &str) -> Result<AncestorOutput>;

    /// Submit a raw transaction. A refusal maps to [`Error::BroadcastRejected`].
    fn broadcast(&self, raw_tx: &[u8]) -> Result<()>;

    /// Unspent outputs held by `address`.
    fn unspent(&self, address: &str) -> Result<Vec<Txo>>;
}

#[derive(Debug, Deserialize)]
struct MineResponse {
    outpoint: String,
    script: String,
}

#[derive(Debug, Deserialize)]
struct TxoResponse {
    outpoint: String,
    satoshis: u64,
}

/// Indexer client over the ordinals HTTP API.
#[derive(Debug, Clone)]
pub struct HttpIndexer {
    /// Base URL for the API
    base_url: Url,
    client: Client,
}

impl HttpIndexer {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| Error::Config(format!("invalid API URL {:?}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!("API URL {} cannot take a path", base_url)));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(HttpIndexer { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Append `segments` to the base URL, each one percent-encoded as a
    /// single path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("API URL {} cannot take a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn fetch_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(url = %url, "GET");
        let response = self.client.get(url).send()?.error_for_status()?;
        Ok(serde_json::from_str(&response.text()?)?)
    }
}

fn rejection(response: Response) -> Error {
    let status = response.status().as_u16();
    let message = response.text().unwrap_or_default();
    Error::BroadcastRejected { status, message }
}

impl Indexer for HttpIndexer {
    fn is_registered(&self, domain: &str) -> Result<bool> {
        let url = self.endpoint(&["opns", domain])?;
        let body = serde_json::json!({ "opns": { "domain": domain, "status": 1 } });
        debug!(url = %url, "POST");

        let response = self.client.post(url).json(&body).send()?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        response.error_for_status()?;
        Ok(true)
    }

    fn mine_ancestor(&self, domain: &str) -> Result<AncestorOutput> {
        let url = self.endpoint(&["opns", domain, "mine"])?;
        let mine: MineResponse = self.fetch_json(url)?;

        Ok(AncestorOutput {
            outpoint: mine.outpoint.parse()?,
            script: base64::engine::general_purpose::STANDARD.decode(mine.script)?,
        })
    }

    fn broadcast(&self, raw_tx: &[u8]) -> Result<()> {
        let url = self.endpoint(&["tx", "bin"])?;
        debug!(url = %url, bytes = raw_tx.len(), "POST");

        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(raw_tx.to_vec())
            .send()?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(rejection(response))
        }
    }

    fn unspent(&self, address: &str) -> Result<Vec<Txo>> {
        let url = self.endpoint(&["txos", "address", address, "unspent"])?;
        let txos: Vec<TxoResponse> = self.fetch_json(url)?;

        txos.into_iter()
            .map(|txo| {
                Ok(Txo { outpoint: txo.outpoint.parse()?, satoshis: txo.satoshis })
            })
            .collect()
    }
}
