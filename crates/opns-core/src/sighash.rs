//! BIP143-style signature preimages with the BSV FORKID flag.
//!
//! The covenant unlocking script pushes the raw preimage of its own input
//! (`ALL | ANYONECANPAY | FORKID`), which commits to that input and every
//! output but to no other input. Funding inputs sign the double SHA256 of
//! their preimage with `ALL | FORKID`.

use alloc::vec::Vec;
use crate::hash::double_sha256;
use crate::script::encode_varint;
use crate::transaction::{Transaction, TxError};

/// Signature hash type flags.
pub mod sighash_type {
    pub const ALL: u32 = 0x01;
    pub const NONE: u32 = 0x02;
    pub const SINGLE: u32 = 0x03;
    pub const FORKID: u32 = 0x40;
    pub const ANYONECANPAY: u32 = 0x80;

    /// Funding inputs.
    pub const ALL_FORKID: u32 = ALL | FORKID;
    /// The covenant input.
    pub const ALL_ANYONECANPAY_FORKID: u32 = ALL | ANYONECANPAY | FORKID;
}

use sighash_type::{ANYONECANPAY, NONE, SINGLE};

/// Build the signature preimage for input `index`.
pub fn signature_preimage(tx: &Transaction, index: usize, sighash: u32) -> Result<Vec<u8>, TxError> {
    let input = tx.inputs.get(index).ok_or(TxError::InputIndex {
        index,
        count: tx.inputs.len(),
    })?;

    let base = sighash & 0x1f;
    let anyone_can_pay = sighash & ANYONECANPAY != 0;

    let hash_prevouts = if anyone_can_pay {
        [0u8; 32]
    } else {
        let mut prevouts = Vec::with_capacity(36 * tx.inputs.len());
        for i in &tx.inputs {
            prevouts.extend_from_slice(&i.outpoint.to_bytes());
        }
        double_sha256(&prevouts)
    };

    let hash_sequence = if anyone_can_pay || base == SINGLE || base == NONE {
        [0u8; 32]
    } else {
        let mut sequences = Vec::with_capacity(4 * tx.inputs.len());
        for i in &tx.inputs {
            sequences.extend_from_slice(&i.sequence.to_le_bytes());
        }
        double_sha256(&sequences)
    };

    let hash_outputs = if base != SINGLE && base != NONE {
        double_sha256(&tx.outputs_bytes_from(0))
    } else if base == SINGLE && index < tx.outputs.len() {
        double_sha256(&tx.outputs[index].to_bytes())
    } else {
        [0u8; 32]
    };

    let script_code = &input.source_locking_script;
    let mut preimage = Vec::with_capacity(156 + script_code.len() + 9);
    preimage.extend_from_slice(&tx.version.to_le_bytes());
    preimage.extend_from_slice(&hash_prevouts);
    preimage.extend_from_slice(&hash_sequence);
    preimage.extend_from_slice(&input.outpoint.to_bytes());
    encode_varint(script_code.len() as u64, &mut preimage);
    preimage.extend_from_slice(script_code);
    preimage.extend_from_slice(&input.source_satoshis.to_le_bytes());
    preimage.extend_from_slice(&input.sequence.to_le_bytes());
    preimage.extend_from_slice(&hash_outputs);
    preimage.extend_from_slice(&tx.lock_time.to_le_bytes());
    preimage.extend_from_slice(&sighash.to_le_bytes());

    Ok(preimage)
}

/// The digest a signature for input `index` commits to.
pub fn signature_hash(tx: &Transaction, index: usize, sighash: u32) -> Result<[u8; 32], TxError> {
    Ok(double_sha256(&signature_preimage(tx, index, sighash)?))
}
