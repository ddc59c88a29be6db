//! A claim transaction on its way to broadcast.

use crate::error::Result;
use crate::queue::FundingEntry;
use opns_core::script::append_push_data;
use opns_core::sighash::{sighash_type, signature_preimage};
use opns_core::{Transaction, TxError, TxInput, NONCE_SIZE};

/// Serialized length assumed for a P2PKH unlocking script while funding:
/// a 73-byte DER signature plus hash type and a 33-byte compressed key,
/// each behind a one-byte push.
pub const P2PKH_UNLOCK_ESTIMATE: usize = 108;

/// Outputs before this index are fixed by the covenant; the unlocking
/// script carries the serialized outputs from here on.
pub const TRAILING_OUTPUTS_FROM: usize = 3;

/// Builds the unlocking script for the covenant input.
///
/// `push [c] | push nonce | push owner | push trailing outputs | push preimage`,
/// where the preimage covers the covenant input with
/// `ALL | ANYONECANPAY | FORKID`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CovenantUnlocker {
    pub character: u8,
    pub nonce: [u8; NONCE_SIZE],
    pub owner_script: Vec<u8>,
}

impl CovenantUnlocker {
    pub fn new(character: u8, nonce: [u8; NONCE_SIZE], owner_script: Vec<u8>) -> Self {
        CovenantUnlocker { character, nonce, owner_script }
    }

    pub fn unlocking_script(&self, tx: &Transaction, index: usize) -> Result<Vec<u8>, TxError> {
        let preimage = signature_preimage(tx, index, sighash_type::ALL_ANYONECANPAY_FORKID)?;
        let trailing = tx.outputs_bytes_from(TRAILING_OUTPUTS_FROM);

        let mut script = Vec::with_capacity(
            2 + NONCE_SIZE + self.owner_script.len() + trailing.len() + preimage.len() + 16,
        );
        append_push_data(&mut script, &[self.character]);
        append_push_data(&mut script, &self.nonce);
        append_push_data(&mut script, &self.owner_script);
        append_push_data(&mut script, &trailing);
        append_push_data(&mut script, &preimage);
        Ok(script)
    }
}

/// Transaction plus what is needed to finish it: the covenant unlocker
/// for input 0 and the funding entries spent by the later inputs.
#[derive(Debug, Clone)]
pub struct PendingTransaction {
    pub tx: Transaction,
    covenant: Option<CovenantUnlocker>,
    funding: Vec<FundingEntry>,
    first_funding_input: usize,
}

impl PendingTransaction {
    /// Wrap `tx`. When `covenant` is given, input 0 must be the covenant input.
    pub fn new(tx: Transaction, covenant: Option<CovenantUnlocker>) -> Self {
        let first_funding_input = tx.inputs.len();
        PendingTransaction { tx, covenant, funding: Vec::new(), first_funding_input }
    }

    pub fn funding_entries(&self) -> &[FundingEntry] {
        &self.funding
    }

    /// Index of the first funding input.
    pub fn first_funding_input(&self) -> usize {
        self.first_funding_input
    }

    pub(crate) fn add_funding(&mut self, entry: FundingEntry, locking_script: Vec<u8>) {
        self.tx.add_input(TxInput::new(entry.outpoint, entry.satoshis, locking_script));
        self.funding.push(entry);
    }

    pub(crate) fn take_funding(&mut self) -> Vec<FundingEntry> {
        std::mem::take(&mut self.funding)
    }

    /// Size the transaction will have once every input is unlocked.
    pub fn estimated_size(&self) -> Result<usize> {
        let covenant_len = match &self.covenant {
            Some(unlocker) if !self.tx.inputs.is_empty() => {
                unlocker.unlocking_script(&self.tx, 0)?.len()
            }
            _ => 0,
        };
        let has_covenant = self.covenant.is_some();

        Ok(self.tx.estimated_size(|index, _| {
            if has_covenant && index == 0 {
                covenant_len
            } else {
                P2PKH_UNLOCK_ESTIMATE
            }
        }))
    }

    /// Fill in the covenant input's unlocking script against the final outputs.
    pub fn unlock_covenant(&mut self) -> Result<()> {
        if let Some(unlocker) = &self.covenant {
            let script = unlocker.unlocking_script(&self.tx, 0)?;
            self.tx.inputs[0].unlocking_script = script;
        }
        Ok(())
    }

    pub fn raw(&self) -> Vec<u8> {
        self.tx.serialize()
    }

    pub fn txid_hex(&self) -> String {
        self.tx.txid_hex()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opns_core::script::{read_op, OP_PUSHDATA2};
    use opns_core::{Outpoint, TxOutput};

    fn claim_tx() -> Transaction {
        let mut tx = Transaction::new();
        tx.add_input(TxInput::new(Outpoint::new([9u8; 32], 0), 1, vec![0xab; 120]));
        for script in [vec![0x01], vec![0x02], vec![0x03]] {
            tx.add_output(TxOutput::new(1, script));
        }
        tx
    }

    #[test]
    fn test_unlocking_script_layout() {
        let mut tx = claim_tx();
        tx.add_output(TxOutput::change(vec![0x76, 0xa9]));
        let unlocker = CovenantUnlocker::new(b'c', [7u8; NONCE_SIZE], vec![0x51, 0x52]);

        let script = unlocker.unlocking_script(&tx, 0).unwrap();
        let mut pos = 0;
        assert_eq!(read_op(&script, &mut pos).unwrap().data, b"c");
        assert_eq!(read_op(&script, &mut pos).unwrap().data, &[7u8; NONCE_SIZE]);
        assert_eq!(read_op(&script, &mut pos).unwrap().data, &[0x51, 0x52]);
        assert_eq!(read_op(&script, &mut pos).unwrap().data, tx.outputs[3].to_bytes().as_slice());

        let preimage = read_op(&script, &mut pos).unwrap();
        assert_eq!(preimage.opcode, OP_PUSHDATA2);
        assert_eq!(preimage.data, signature_preimage(&tx, 0, 0xc1).unwrap().as_slice());
        assert_eq!(pos, script.len());
    }

    #[test]
    fn test_no_trailing_outputs_pushes_empty() {
        let tx = claim_tx();
        let unlocker = CovenantUnlocker::new(b'a', [0u8; NONCE_SIZE], vec![]);
        let script = unlocker.unlocking_script(&tx, 0).unwrap();

        let mut pos = 0;
        for _ in 0..3 {
            read_op(&script, &mut pos).unwrap();
        }
        assert!(read_op(&script, &mut pos).unwrap().data.is_empty());
    }

    #[test]
    fn test_estimate_matches_unlocked_size() {
        let tx = claim_tx();
        let mut pending =
            PendingTransaction::new(tx, Some(CovenantUnlocker::new(b'a', [3u8; 32], vec![0x51])));

        let estimate = pending.estimated_size().unwrap();
        pending.unlock_covenant().unwrap();
        assert_eq!(pending.tx.size(), estimate);
    }

    #[test]
    fn test_funding_inputs_use_p2pkh_estimate() {
        let mut pending = PendingTransaction::new(claim_tx(), None);
        let before = pending.estimated_size().unwrap();

        let entry = FundingEntry::new(Outpoint::new([4u8; 32], 1), 500);
        pending.add_funding(entry, vec![0x76]);

        assert_eq!(pending.first_funding_input(), 1);
        assert_eq!(pending.estimated_size().unwrap(), before + 36 + 1 + P2PKH_UNLOCK_ESTIMATE + 4);
        assert_eq!(pending.take_funding(), vec![entry]);
        assert!(pending.funding_entries().is_empty());
    }
}
