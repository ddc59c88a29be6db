//! Funding and fee engine.
//!
//! Tops up a pending transaction from the funding queue until inputs cover
//! outputs plus the size-based fee, spreads the surplus over the change
//! outputs and signs every funding input with the funding key.

use crate::error::{Error, Result};
use crate::pending::PendingTransaction;
use crate::queue::{FundingEntry, FundingQueue};
use opns_core::script::append_push_data;
use opns_core::sighash::{sighash_type, signature_hash};
use opns_core::{decode_wif, Address, Network, SatoshisPerKilobyte, TxOutput};
use secp256k1::{Message, PublicKey, SecretKey, SECP256K1};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The funding identity and the resources it spends from.
pub struct FundingContext {
    secret: SecretKey,
    public_key: PublicKey,
    address: Address,
    locking_script: Vec<u8>,
    queue: Arc<dyn FundingQueue>,
    fees: SatoshisPerKilobyte,
}

impl fmt::Debug for FundingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FundingContext")
            .field("address", &self.address.display)
            .field("fees", &self.fees)
            .finish_non_exhaustive()
    }
}

impl FundingContext {
    pub fn new(
        secret: SecretKey,
        network: Network,
        queue: Arc<dyn FundingQueue>,
        fees: SatoshisPerKilobyte,
    ) -> Self {
        let public_key = PublicKey::from_secret_key(SECP256K1, &secret);
        let address = Address::from_public_key(&public_key.serialize(), network);
        let locking_script = address.locking_script();
        FundingContext { secret, public_key, address, locking_script, queue, fees }
    }

    /// Build the context from a WIF-encoded funding key.
    pub fn from_wif(
        wif: &str,
        network: Network,
        queue: Arc<dyn FundingQueue>,
        fees: SatoshisPerKilobyte,
    ) -> Result<Self> {
        let key = decode_wif(wif, network)?;
        if !key.compressed {
            return Err(Error::Config("funding key must be a compressed WIF".into()));
        }
        let secret = SecretKey::from_slice(&key.secret)?;
        Ok(FundingContext::new(secret, network, queue, fees))
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn locking_script(&self) -> &[u8] {
        &self.locking_script
    }

    pub fn queue(&self) -> &Arc<dyn FundingQueue> {
        &self.queue
    }

    pub fn fees(&self) -> SatoshisPerKilobyte {
        self.fees
    }
}

#[derive(Debug, Clone)]
pub struct FundingEngine {
    ctx: Arc<FundingContext>,
}

impl FundingEngine {
    pub fn new(ctx: Arc<FundingContext>) -> Self {
        FundingEngine { ctx }
    }

    pub fn context(&self) -> &FundingContext {
        &self.ctx
    }

    /// Add a change output, pull funding inputs until the fee is covered,
    /// distribute the change and sign the funding inputs.
    ///
    /// On failure every entry popped for this transaction is already back at
    /// the front of the queue.
    pub fn fund_and_sign(&self, pending: &mut PendingTransaction) -> Result<()> {
        let result = self.fund(pending).and_then(|fee| {
            let change = pending.tx.distribute_change(fee)?;
            debug!(fee, change, inputs = pending.tx.inputs.len(), "Funded transaction");
            self.sign(pending)
        });

        if result.is_err() {
            self.return_inputs(pending)?;
        }
        result
    }

    fn fund(&self, pending: &mut PendingTransaction) -> Result<u64> {
        let sats_out = pending.tx.total_output_satoshis();
        let mut sats_in = pending.tx.total_input_satoshis();

        pending.tx.add_output(TxOutput::change(self.ctx.locking_script.clone()));
        let mut fee = self.ctx.fees.compute_fee(pending.estimated_size()?);

        while sats_in < sats_out + fee {
            let Some(entry) = self.ctx.queue.pop_front()? else {
                let needed = sats_out + fee - sats_in;
                warn!(needed, "Funding queue exhausted");
                return Err(Error::FundingExhausted { needed });
            };

            pending.add_funding(entry, self.ctx.locking_script.clone());
            sats_in += entry.satoshis;
            fee = self.ctx.fees.compute_fee(pending.estimated_size()?);
        }

        Ok(fee)
    }

    fn sign(&self, pending: &mut PendingTransaction) -> Result<()> {
        let public_key = self.ctx.public_key.serialize();

        for index in pending.first_funding_input()..pending.tx.inputs.len() {
            let digest = signature_hash(&pending.tx, index, sighash_type::ALL_FORKID)?;
            let signature = SECP256K1.sign_ecdsa(&Message::from_digest(digest), &self.ctx.secret);

            let mut sig = signature.serialize_der().to_vec();
            sig.push(sighash_type::ALL_FORKID as u8);

            let mut script = Vec::with_capacity(sig.len() + public_key.len() + 2);
            append_push_data(&mut script, &sig);
            append_push_data(&mut script, &public_key);
            pending.tx.inputs[index].unlocking_script = script;
        }
        Ok(())
    }

    /// Put the entries funding `pending` back at the front of the queue,
    /// in the order they were taken.
    pub fn return_inputs(&self, pending: &mut PendingTransaction) -> Result<()> {
        let entries = pending.take_funding();
        if !entries.is_empty() {
            debug!(count = entries.len(), "Returning funding inputs to queue");
            self.ctx.queue.push_front(&entries)?;
        }
        Ok(())
    }

    /// Record the change outputs of a broadcast transaction as new funding.
    pub fn settle(&self, pending: &PendingTransaction) -> Result<()> {
        let txid = pending.tx.txid();
        let change: Vec<FundingEntry> = pending
            .tx
            .outputs
            .iter()
            .enumerate()
            .filter(|(_, output)| output.change && output.satoshis > 0)
            .map(|(vout, output)| {
                FundingEntry::new(opns_core::Outpoint::new(txid, vout as u32), output.satoshis)
            })
            .collect();

        if !change.is_empty() {
            info!(txid = %pending.txid_hex(), outputs = change.len(), "Queued change");
            self.ctx.queue.push_back(&change)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pending::CovenantUnlocker;
    use crate::queue::MemoryQueue;
    use crate::testing::{funding_context, funding_entry};
    use opns_core::script::read_op;
    use opns_core::{Outpoint, Transaction, TxInput};
    use secp256k1::ecdsa::Signature;

    fn claim(owner: &[u8]) -> PendingTransaction {
        let mut tx = Transaction::new();
        tx.add_input(TxInput::new(Outpoint::new([8u8; 32], 0), 1, vec![0xab; 150]));
        tx.add_output(TxOutput::new(1, vec![0x01; 150]));
        tx.add_output(TxOutput::new(1, vec![0x02; 150]));
        tx.add_output(TxOutput::new(1, vec![0x03; 80]));
        PendingTransaction::new(tx, Some(CovenantUnlocker::new(b'a', [1u8; 32], owner.to_vec())))
    }

    #[test]
    fn test_funds_and_balances() {
        let ctx = funding_context(&[funding_entry(1, 2_000), funding_entry(2, 5_000)]);
        let engine = FundingEngine::new(ctx.clone());
        let mut pending = claim(&[0x51]);

        engine.fund_and_sign(&mut pending).unwrap();
        pending.unlock_covenant().unwrap();

        let tx = &pending.tx;
        let fee = ctx.fees().compute_fee(tx.size());
        assert_eq!(tx.inputs.len(), 2);
        assert!(tx.total_input_satoshis() >= tx.total_output_satoshis() + fee);
        assert_eq!(tx.outputs.len(), 4);
        assert!(tx.outputs[3].change);
        assert_eq!(pending.funding_entries(), &[funding_entry(1, 2_000)]);
        assert_eq!(ctx.queue().snapshot().unwrap(), vec![funding_entry(2, 5_000)]);
    }

    #[test]
    fn test_funding_signatures_verify() {
        let ctx = funding_context(&[funding_entry(1, 3_000)]);
        let engine = FundingEngine::new(ctx.clone());
        let mut pending = claim(&[0x51]);
        engine.fund_and_sign(&mut pending).unwrap();

        let script = &pending.tx.inputs[1].unlocking_script;
        let mut pos = 0;
        let sig = read_op(script, &mut pos).unwrap().data;
        let key = read_op(script, &mut pos).unwrap().data;
        assert_eq!(key, ctx.public_key().serialize().as_slice());
        assert_eq!(*sig.last().unwrap(), 0x41);

        let signature = Signature::from_der(&sig[..sig.len() - 1]).unwrap();
        let digest = signature_hash(&pending.tx, 1, sighash_type::ALL_FORKID).unwrap();
        SECP256K1
            .verify_ecdsa(&Message::from_digest(digest), &signature, ctx.public_key())
            .unwrap();
    }

    #[test]
    fn test_exhaustion_returns_entries_in_order() {
        let ctx = funding_context(&[funding_entry(1, 1), funding_entry(2, 1)]);
        let engine = FundingEngine::new(ctx.clone());
        let mut pending = claim(&[0x51]);

        let err = engine.fund_and_sign(&mut pending).unwrap_err();
        assert!(matches!(err, Error::FundingExhausted { needed } if needed > 0));
        assert_eq!(
            ctx.queue().snapshot().unwrap(),
            vec![funding_entry(1, 1), funding_entry(2, 1)]
        );
        assert!(pending.funding_entries().is_empty());
    }

    #[test]
    fn test_empty_queue_exhausts() {
        let ctx = funding_context(&[]);
        let err = FundingEngine::new(ctx).fund_and_sign(&mut claim(&[])).unwrap_err();
        assert!(matches!(err, Error::FundingExhausted { .. }));
    }

    #[test]
    fn test_settle_queues_change() {
        let ctx = funding_context(&[funding_entry(1, 10_000)]);
        let engine = FundingEngine::new(ctx.clone());
        let mut pending = claim(&[0x51]);
        engine.fund_and_sign(&mut pending).unwrap();
        pending.unlock_covenant().unwrap();

        engine.settle(&pending).unwrap();
        let queued = ctx.queue().snapshot().unwrap();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].outpoint, pending.tx.outpoint(3));
        assert_eq!(queued[0].satoshis, pending.tx.outputs[3].satoshis);
    }

    #[test]
    fn test_return_inputs_is_idempotent() {
        let ctx = funding_context(&[funding_entry(1, 10_000)]);
        let engine = FundingEngine::new(ctx.clone());
        let mut pending = claim(&[0x51]);
        engine.fund_and_sign(&mut pending).unwrap();

        engine.return_inputs(&mut pending).unwrap();
        engine.return_inputs(&mut pending).unwrap();
        assert_eq!(ctx.queue().snapshot().unwrap(), vec![funding_entry(1, 10_000)]);
    }

    #[test]
    fn test_rejects_uncompressed_wif() {
        let wif = opns_core::address::encode_wif(&[0x11; 32], Network::Mainnet, false);
        let err = FundingContext::from_wif(
            &wif,
            Network::Mainnet,
            Arc::new(MemoryQueue::new()),
            SatoshisPerKilobyte::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
