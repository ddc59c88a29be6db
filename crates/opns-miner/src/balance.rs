//! Balance reconciliation against the indexer.

use crate::api::Indexer;
use crate::error::Result;
use crate::funding::FundingContext;
use crate::queue::FundingEntry;
use tracing::info;

/// Replace the funding queue with the identity's current unspent outputs
/// and return their total value.
///
/// Entries popped by a transaction still in flight are dropped by the
/// replace, so only call this between mining runs.
pub fn refresh_balance(indexer: &impl Indexer, funding: &FundingContext) -> Result<u64> {
    let address = &funding.address().display;
    let entries: Vec<FundingEntry> = indexer
        .unspent(address)?
        .into_iter()
        .map(|txo| FundingEntry::new(txo.outpoint, txo.satoshis))
        .collect();

    let balance: u64 = entries.iter().map(|e| e.satoshis).sum();
    funding.queue().replace(&entries)?;

    info!(address = %address, utxos = entries.len(), balance, "Refreshed funding balance");
    Ok(balance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Txo;
    use crate::testing::{funding_context, funding_entry, MockIndexer};
    use opns_core::Outpoint;

    #[test]
    fn test_refresh_replaces_queue() {
        let loc1 = Outpoint::new([1u8; 32], 0);
        let loc2 = Outpoint::new([2u8; 32], 3);
        let indexer = MockIndexer {
            unspent: vec![
                Txo { outpoint: loc1, satoshis: 1000 },
                Txo { outpoint: loc2, satoshis: 500 },
            ],
            ..MockIndexer::default()
        };
        let ctx = funding_context(&[funding_entry(9, 77)]);

        assert_eq!(refresh_balance(&indexer, &ctx).unwrap(), 1500);
        assert_eq!(
            ctx.queue().snapshot().unwrap(),
            vec![FundingEntry::new(loc1, 1000), FundingEntry::new(loc2, 500)]
        );
    }

    #[test]
    fn test_refresh_with_no_utxos_clears_queue() {
        let ctx = funding_context(&[funding_entry(0, 10)]);

        assert_eq!(refresh_balance(&MockIndexer::default(), &ctx).unwrap(), 0);
        assert!(ctx.queue().snapshot().unwrap().is_empty());
    }
}
