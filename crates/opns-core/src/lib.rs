//! Core OpNS domain mining logic.
//!
//! This crate provides pure Rust implementations of:
//! - The OpNS covenant state codec and inscription outputs
//! - SHA256 double-hashing and the proof-of-work difficulty predicate
//! - Transaction construction, serialization and FORKID signature preimages
//! - P2PKH address and WIF key handling
//! - The size-based fee model

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod address;
pub mod covenant;
pub mod difficulty;
pub mod fee;
pub mod hash;
pub mod inscription;
pub mod network;
pub mod outpoint;
pub mod script;
pub mod sighash;
pub mod template;
pub mod transaction;

pub use address::{decode_wif, validate_address, Address, AddressError, WifKey};
pub use covenant::{ClaimedBitmap, CovenantError, CovenantRecord};
pub use difficulty::{meets_difficulty, verify_pow, DIFFICULTY, NONCE_SIZE};
pub use fee::SatoshisPerKilobyte;
pub use hash::double_sha256;
pub use inscription::{build_inscription, parse_inscription};
pub use network::Network;
pub use outpoint::{Outpoint, OutpointError};
pub use transaction::{Transaction, TxError, TxInput, TxOutput};
