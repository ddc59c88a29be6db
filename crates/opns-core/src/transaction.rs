//! Transaction model and wire serialization.

use alloc::vec::Vec;
use thiserror::Error;
use crate::hash::{double_sha256, hash_to_display_hex};
use crate::network::{SEQUENCE_FINAL, TX_VERSION};
use crate::outpoint::Outpoint;
use crate::script::{encode_varint, varint_len};

/// Transaction construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxError {
    #[error("input index {index} out of range ({count} inputs)")]
    InputIndex { index: usize, count: usize },
    #[error("inputs ({inputs} sats) do not cover outputs ({outputs} sats) plus fee ({fee} sats)")]
    InsufficientInputs { inputs: u64, outputs: u64, fee: u64 },
}

/// A transaction input together with the output it spends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInput {
    /// The output being spent.
    pub outpoint: Outpoint,
    /// Unlocking script; empty until the input is signed.
    pub unlocking_script: Vec<u8>,
    pub sequence: u32,
    /// Value of the spent output (needed for signature preimages).
    pub source_satoshis: u64,
    /// Locking script of the spent output (the signature script code).
    pub source_locking_script: Vec<u8>,
}

impl TxInput {
    /// An unsigned input spending `outpoint`.
    pub fn new(outpoint: Outpoint, source_satoshis: u64, source_locking_script: Vec<u8>) -> Self {
        TxInput {
            outpoint,
            unlocking_script: Vec::new(),
            sequence: SEQUENCE_FINAL,
            source_satoshis,
            source_locking_script,
        }
    }

    pub fn is_signed(&self) -> bool {
        !self.unlocking_script.is_empty()
    }
}

/// A transaction output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutput {
    pub satoshis: u64,
    pub locking_script: Vec<u8>,
    /// Whether this output returns change to the funding identity.
    pub change: bool,
}

impl TxOutput {
    pub fn new(satoshis: u64, locking_script: Vec<u8>) -> Self {
        TxOutput { satoshis, locking_script, change: false }
    }

    /// A zero-value change output; its value is set once the fee is known.
    pub fn change(locking_script: Vec<u8>) -> Self {
        TxOutput { satoshis: 0, locking_script, change: true }
    }

    /// Serialize: value (8 bytes LE), script length (varint), script.
    pub fn serialize_into(&self, output: &mut Vec<u8>) {
        output.extend_from_slice(&self.satoshis.to_le_bytes());
        encode_varint(self.locking_script.len() as u64, output);
        output.extend_from_slice(&self.locking_script);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.size());
        self.serialize_into(&mut bytes);
        bytes
    }

    pub fn size(&self) -> usize {
        8 + varint_len(self.locking_script.len() as u64) + self.locking_script.len()
    }
}

/// A transaction under construction or ready to broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub lock_time: u32,
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl Transaction {
    pub fn new() -> Self {
        Transaction {
            version: TX_VERSION,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: 0,
        }
    }

    pub fn add_input(&mut self, input: TxInput) {
        self.inputs.push(input);
    }

    pub fn add_output(&mut self, output: TxOutput) {
        self.outputs.push(output);
    }

    pub fn total_input_satoshis(&self) -> u64 {
        self.inputs.iter().map(|i| i.source_satoshis).sum()
    }

    pub fn total_output_satoshis(&self) -> u64 {
        self.outputs.iter().map(|o| o.satoshis).sum()
    }

    /// Serialized outputs `outputs[from..]`, concatenated.
    pub fn outputs_bytes_from(&self, from: usize) -> Vec<u8> {
        let mut bytes = Vec::new();
        for output in self.outputs.iter().skip(from) {
            output.serialize_into(&mut bytes);
        }
        bytes
    }

    /// Serialize the transaction for broadcast.
    pub fn serialize(&self) -> Vec<u8> {
        let mut raw_tx = Vec::with_capacity(self.size());

        // Version (4 bytes, little-endian)
        raw_tx.extend_from_slice(&self.version.to_le_bytes());

        encode_varint(self.inputs.len() as u64, &mut raw_tx);
        for input in &self.inputs {
            raw_tx.extend_from_slice(&input.outpoint.to_bytes());
            encode_varint(input.unlocking_script.len() as u64, &mut raw_tx);
            raw_tx.extend_from_slice(&input.unlocking_script);
            raw_tx.extend_from_slice(&input.sequence.to_le_bytes());
        }

        encode_varint(self.outputs.len() as u64, &mut raw_tx);
        for output in &self.outputs {
            output.serialize_into(&mut raw_tx);
        }

        raw_tx.extend_from_slice(&self.lock_time.to_le_bytes());
        raw_tx
    }

    /// Serialized size in bytes.
    pub fn size(&self) -> usize {
        self.estimated_size(|_, input| input.unlocking_script.len())
    }

    /// Serialized size with unsigned inputs' unlocking scripts replaced by
    /// `estimate(index, input)` bytes.
    pub fn estimated_size<F>(&self, estimate: F) -> usize
    where
        F: Fn(usize, &TxInput) -> usize,
    {
        let inputs: usize = self
            .inputs
            .iter()
            .enumerate()
            .map(|(index, input)| {
                let script_len = if input.is_signed() {
                    input.unlocking_script.len()
                } else {
                    estimate(index, input)
                };
                36 + varint_len(script_len as u64) + script_len + 4
            })
            .sum();
        let outputs: usize = self.outputs.iter().map(TxOutput::size).sum();

        4 + varint_len(self.inputs.len() as u64)
            + inputs
            + varint_len(self.outputs.len() as u64)
            + outputs
            + 4
    }

    /// Transaction id in internal byte order.
    pub fn txid(&self) -> [u8; 32] {
        double_sha256(&self.serialize())
    }

    /// Transaction id as display hex.
    pub fn txid_hex(&self) -> alloc::string::String {
        hash_to_display_hex(&self.txid())
    }

    /// Outpoint of output `vout` of this transaction.
    pub fn outpoint(&self, vout: u32) -> Outpoint {
        Outpoint::new(self.txid(), vout)
    }

    /// Split what is left after `fee` equally across the change outputs,
    /// giving any remainder to the first one. Change outputs are removed
    /// when nothing is left. Returns the total change.
    pub fn distribute_change(&mut self, fee: u64) -> Result<u64, TxError> {
        let inputs = self.total_input_satoshis();
        let outputs: u64 = self
            .outputs
            .iter()
            .filter(|o| !o.change)
            .map(|o| o.satoshis)
            .sum();

        let change = inputs
            .checked_sub(outputs + fee)
            .ok_or(TxError::InsufficientInputs { inputs, outputs, fee })?;

        let change_outputs = self.outputs.iter().filter(|o| o.change).count() as u64;
        if change == 0 || change_outputs == 0 {
            self.outputs.retain(|o| !o.change);
            return Ok(0);
        }

        let share = change / change_outputs;
        let mut remainder = change % change_outputs;
        for output in self.outputs.iter_mut().filter(|o| o.change) {
            output.satoshis = share + remainder;
            remainder = 0;
        }
        Ok(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn sample_tx() -> Transaction {
        let mut tx = Transaction::new();
        tx.add_input(TxInput::new(Outpoint::new([1u8; 32], 0), 1_000, vec![0x51]));
        tx.add_output(TxOutput::new(600, vec![0x76, 0xa9]));
        tx.add_output(TxOutput::change(vec![0x52]));
        tx
    }

    #[test]
    fn test_serialize_layout() {
        let tx = sample_tx();
        let raw = tx.serialize();

        assert_eq!(&raw[..4], &1u32.to_le_bytes());
        assert_eq!(raw[4], 1); // one input
        assert_eq!(&raw[5..37], &[1u8; 32]);
        assert_eq!(raw[41], 0); // empty unlocking script
        assert_eq!(&raw[42..46], &SEQUENCE_FINAL.to_le_bytes());
        assert_eq!(raw[46], 2); // two outputs
        assert_eq!(&raw[47..55], &600u64.to_le_bytes());
        assert_eq!(&raw[raw.len() - 4..], &[0, 0, 0, 0]);
        assert_eq!(raw.len(), tx.size());
    }

    #[test]
    fn test_estimated_size_uses_estimate_for_unsigned() {
        let mut tx = sample_tx();
        let unsigned = tx.size();
        assert_eq!(tx.estimated_size(|_, _| 107), unsigned + 107);

        tx.inputs[0].unlocking_script = vec![0u8; 10];
        assert_eq!(tx.estimated_size(|_, _| 107), unsigned + 10);
    }

    #[test]
    fn test_txid_changes_with_unlocking_script() {
        let mut tx = sample_tx();
        let before = tx.txid();
        tx.inputs[0].unlocking_script = vec![0x00];
        assert_ne!(before, tx.txid());
        assert_eq!(tx.outpoint(1).txid, tx.txid());
    }

    #[test]
    fn test_distribute_change() {
        let mut tx = sample_tx();
        assert_eq!(tx.distribute_change(100), Ok(300));
        assert_eq!(tx.outputs[1].satoshis, 300);

        let mut tx = sample_tx();
        tx.add_output(TxOutput::change(vec![0x53]));
        assert_eq!(tx.distribute_change(99), Ok(301));
        assert_eq!(tx.outputs[1].satoshis, 151);
        assert_eq!(tx.outputs[2].satoshis, 150);
    }

    #[test]
    fn test_distribute_change_drops_empty_change() {
        let mut tx = sample_tx();
        assert_eq!(tx.distribute_change(400), Ok(0));
        assert_eq!(tx.outputs.len(), 1);
    }

    #[test]
    fn test_distribute_change_insufficient() {
        let mut tx = sample_tx();
        assert_eq!(
            tx.distribute_change(401),
            Err(TxError::InsufficientInputs { inputs: 1_000, outputs: 600, fee: 401 })
        );
    }
}
