//! Transaction output references.

use alloc::string::String;
use core::fmt;
use core::str::FromStr;
use thiserror::Error;
use crate::hash::reverse_bytes;

/// Outpoint parsing errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OutpointError {
    #[error("missing '_' separator in outpoint {0:?}")]
    MissingSeparator(String),
    #[error("invalid txid hex in outpoint {0:?}")]
    InvalidTxid(String),
    #[error("invalid output index in outpoint {0:?}")]
    InvalidVout(String),
}

/// A reference to a transaction output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Outpoint {
    /// Transaction id in internal byte order.
    pub txid: [u8; 32],
    /// Output index.
    pub vout: u32,
}

impl Outpoint {
    pub fn new(txid: [u8; 32], vout: u32) -> Self {
        Outpoint { txid, vout }
    }

    /// Build an outpoint from a display-order (reversed) txid.
    pub fn from_display_txid(txid: &[u8; 32], vout: u32) -> Self {
        Outpoint { txid: reverse_bytes(txid), vout }
    }

    /// The txid as display hex.
    pub fn txid_hex(&self) -> String {
        hex::encode(reverse_bytes(&self.txid))
    }

    /// Wire serialization: internal txid followed by the little-endian index.
    pub fn to_bytes(&self) -> [u8; 36] {
        let mut bytes = [0u8; 36];
        bytes[..32].copy_from_slice(&self.txid);
        bytes[32..].copy_from_slice(&self.vout.to_le_bytes());
        bytes
    }
}

impl fmt::Display for Outpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.txid_hex(), self.vout)
    }
}

impl FromStr for Outpoint {
    type Err = OutpointError;

    /// Parse `<display txid hex>_<vout>`; `.` is accepted as separator too.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (txid, vout) = s
            .rsplit_once(&['_', '.'][..])
            .ok_or_else(|| OutpointError::MissingSeparator(s.into()))?;

        let mut display = [0u8; 32];
        hex::decode_to_slice(txid, &mut display)
            .map_err(|_| OutpointError::InvalidTxid(s.into()))?;
        let vout = vout
            .parse::<u32>()
            .map_err(|_| OutpointError::InvalidVout(s.into()))?;

        Ok(Outpoint::from_display_txid(&display, vout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    const TXID: &str = "25cb9c17772641ba2374a8d74f729aad921932fef5e2c76642f279a38e55b758";

    #[test]
    fn test_parse_and_display() {
        let token = alloc::format!("{}_3", TXID);
        let outpoint: Outpoint = token.parse().unwrap();

        assert_eq!(outpoint.vout, 3);
        // Internal order is the reverse of the display hex.
        assert_eq!(outpoint.txid[0], 0x58);
        assert_eq!(outpoint.to_string(), token);
    }

    #[test]
    fn test_parse_dot_separator() {
        let outpoint: Outpoint = alloc::format!("{}.0", TXID).parse().unwrap();
        assert_eq!(outpoint.vout, 0);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(TXID.parse::<Outpoint>(), Err(OutpointError::MissingSeparator(_))));
        assert!(matches!("zz_1".parse::<Outpoint>(), Err(OutpointError::InvalidTxid(_))));
        assert!(matches!(
            alloc::format!("{}_x", TXID).parse::<Outpoint>(),
            Err(OutpointError::InvalidVout(_))
        ));
    }

    #[test]
    fn test_to_bytes() {
        let outpoint = Outpoint::new([0x11; 32], 2);
        let bytes = outpoint.to_bytes();
        assert_eq!(&bytes[..32], &[0x11; 32]);
        assert_eq!(&bytes[32..], &[2, 0, 0, 0]);
    }
}
