//! P2PKH address and WIF private key handling.
//!
//! BSV only uses legacy Base58Check P2PKH addresses, so that is all this
//! module understands:
//! - addresses: `[version][20-byte pubkey hash][4-byte checksum]`
//! - WIF keys: `[version][32-byte secret](0x01 if compressed)[4-byte checksum]`

use alloc::string::String;
use alloc::vec::Vec;
use thiserror::Error;
use crate::hash::hash160;
use crate::network::Network;
use crate::script::{OP_CHECKSIG, OP_DUP, OP_EQUALVERIFY, OP_HASH160};

/// Address and key decoding errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("Invalid address format")]
    InvalidFormat,
    #[error("Invalid Base58 character: {0}")]
    InvalidBase58Char(char),
    #[error("Invalid checksum")]
    InvalidChecksum,
    #[error("Unknown version byte: {0:#04x}")]
    UnknownVersion(u8),
    #[error("Address network mismatch: expected {expected}, got {got}")]
    NetworkMismatch { expected: String, got: String },
    #[error("Invalid WIF private key")]
    InvalidWif,
}

/// A validated P2PKH address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    /// The network this address belongs to.
    pub network: Network,
    /// HASH160 of the public key.
    pub pubkey_hash: [u8; 20],
    /// The Base58Check address string.
    pub display: String,
}

impl Address {
    /// Derive the address of a serialized public key.
    pub fn from_public_key(public_key: &[u8], network: Network) -> Self {
        Self::from_pubkey_hash(hash160(public_key), network)
    }

    /// Build an address from a public key hash.
    pub fn from_pubkey_hash(pubkey_hash: [u8; 20], network: Network) -> Self {
        let mut payload = Vec::with_capacity(21);
        payload.push(network.p2pkh_version());
        payload.extend_from_slice(&pubkey_hash);

        Address {
            network,
            pubkey_hash,
            display: base58check_encode(&payload),
        }
    }

    /// The P2PKH locking script paying to this address.
    pub fn locking_script(&self) -> Vec<u8> {
        p2pkh_locking_script(&self.pubkey_hash)
    }
}

impl core::fmt::Display for Address {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.display)
    }
}

/// OP_DUP OP_HASH160 <20-byte-hash> OP_EQUALVERIFY OP_CHECKSIG
pub fn p2pkh_locking_script(pubkey_hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(25);
    script.push(OP_DUP);
    script.push(OP_HASH160);
    script.push(0x14); // Push 20 bytes
    script.extend_from_slice(pubkey_hash);
    script.push(OP_EQUALVERIFY);
    script.push(OP_CHECKSIG);
    script
}

/// Validate a P2PKH address for the expected network.
pub fn validate_address(address: &str, expected_network: Network) -> Result<Address, AddressError> {
    let payload = base58check_decode(address.trim())?;

    if payload.len() != 21 {
        return Err(AddressError::InvalidFormat);
    }

    let network = match payload[0] {
        0x00 => Network::Mainnet,
        0x6f => Network::Testnet,
        version => return Err(AddressError::UnknownVersion(version)),
    };

    if network != expected_network {
        return Err(AddressError::NetworkMismatch {
            expected: expected_network.name().into(),
            got: network.name().into(),
        });
    }

    let mut pubkey_hash = [0u8; 20];
    pubkey_hash.copy_from_slice(&payload[1..]);

    Ok(Address::from_pubkey_hash(pubkey_hash, network))
}

/// A decoded WIF private key.
#[derive(Clone, PartialEq, Eq)]
pub struct WifKey {
    /// The raw 32-byte secret.
    pub secret: [u8; 32],
    /// Whether the matching public key is serialized compressed.
    pub compressed: bool,
    pub network: Network,
}

impl core::fmt::Debug for WifKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WifKey")
            .field("compressed", &self.compressed)
            .field("network", &self.network)
            .finish_non_exhaustive()
    }
}

/// Decode a WIF private key for the expected network.
pub fn decode_wif(wif: &str, expected_network: Network) -> Result<WifKey, AddressError> {
    let payload = base58check_decode(wif.trim())?;

    let compressed = match payload.len() {
        33 => false,
        34 if payload[33] == 0x01 => true,
        _ => return Err(AddressError::InvalidWif),
    };

    let network = if payload[0] == Network::Mainnet.wif_version() {
        Network::Mainnet
    } else if payload[0] == Network::Testnet.wif_version() {
        Network::Testnet
    } else {
        return Err(AddressError::UnknownVersion(payload[0]));
    };

    if network != expected_network {
        return Err(AddressError::NetworkMismatch {
            expected: expected_network.name().into(),
            got: network.name().into(),
        });
    }

    let mut secret = [0u8; 32];
    secret.copy_from_slice(&payload[1..33]);

    Ok(WifKey { secret, compressed, network })
}

/// Encode a private key as WIF.
pub fn encode_wif(secret: &[u8; 32], network: Network, compressed: bool) -> String {
    let mut payload = Vec::with_capacity(34);
    payload.push(network.wif_version());
    payload.extend_from_slice(secret);
    if compressed {
        payload.push(0x01);
    }
    base58check_encode(&payload)
}

/// Decode Base58Check, verifying and stripping the 4-byte checksum.
pub fn base58check_decode(input: &str) -> Result<Vec<u8>, AddressError> {
    let payload = bs58::decode(input).with_check(None).into_vec()?;
    if payload.is_empty() {
        return Err(AddressError::InvalidFormat);
    }
    Ok(payload)
}

/// Encode a payload as Base58Check.
pub fn base58check_encode(payload: &[u8]) -> String {
    bs58::encode(payload).with_check().into_string()
}

impl From<bs58::decode::Error> for AddressError {
    fn from(err: bs58::decode::Error) -> Self {
        match err {
            bs58::decode::Error::InvalidCharacter { character, .. } => {
                AddressError::InvalidBase58Char(character)
            }
            bs58::decode::Error::InvalidChecksum { .. } => AddressError::InvalidChecksum,
            _ => AddressError::InvalidFormat,
        }
    }
}
