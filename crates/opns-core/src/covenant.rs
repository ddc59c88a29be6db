//! OpNS covenant state encoding and decoding.
//!
//! A covenant locking script is laid out as:
//!
//! ```text
//! [CONTRACT][OP_RETURN OP_FALSE][genesis][claimed][domain][pow][state len: u32 LE][0x00]
//! ```
//!
//! The four state fields are push-data ops. The claimed bitmap is a 256-bit
//! integer (bit `c` set once character `c` has been branched from this
//! record) stored little-endian and sign-padded like a script number.

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use thiserror::Error;
use crate::network::GENESIS;
use crate::outpoint::Outpoint;
use crate::script::{append_push_data, read_op, ScriptError, OP_FALSE, OP_RETURN};
use crate::template::CONTRACT;

/// Bytes between the contract template and the first state push.
pub const STATE_HEADER: [u8; 2] = [OP_RETURN, OP_FALSE];

/// Covenant decoding errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CovenantError {
    /// The script does not start with the covenant template.
    #[error("invalid script: not an OpNS covenant")]
    InvalidScript,
    /// The state is tagged with a different genesis.
    #[error("invalid genesis")]
    InvalidGenesis,
    /// A state field runs past the end of the script.
    #[error("covenant state truncated")]
    Truncated,
    /// The claimed bitmap does not fit in 256 bits.
    #[error("claimed bitmap wider than 256 bits ({0} bytes)")]
    BitmapOverflow(usize),
    /// The proof-of-work commitment is not a 32-byte digest.
    #[error("pow commitment must be 32 bytes, got {0}")]
    InvalidPow(usize),
}

impl From<ScriptError> for CovenantError {
    fn from(_: ScriptError) -> Self {
        CovenantError::Truncated
    }
}

/// The set of characters already branched from a record.
///
/// Stored as a 32-byte big-endian integer; bit `c` corresponds to the
/// character byte `c`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ClaimedBitmap([u8; 32]);

impl ClaimedBitmap {
    /// No characters claimed.
    pub const EMPTY: ClaimedBitmap = ClaimedBitmap([0u8; 32]);

    pub fn from_be_bytes(bytes: [u8; 32]) -> Self {
        ClaimedBitmap(bytes)
    }

    pub fn to_be_bytes(&self) -> [u8; 32] {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Whether character `c` has been claimed.
    pub fn is_claimed(&self, c: u8) -> bool {
        let (byte, mask) = Self::position(c);
        self.0[byte] & mask != 0
    }

    /// A copy of this bitmap with character `c` claimed.
    pub fn with_claimed(&self, c: u8) -> Self {
        let (byte, mask) = Self::position(c);
        let mut bytes = self.0;
        bytes[byte] |= mask;
        ClaimedBitmap(bytes)
    }

    /// All claimed characters in ascending order.
    pub fn claimed(&self) -> impl Iterator<Item = u8> + '_ {
        (0..=255u8).filter(move |c| self.is_claimed(*c))
    }

    fn position(c: u8) -> (usize, u8) {
        (31 - (c as usize / 8), 1u8 << (c % 8))
    }

    /// Script form: minimal little-endian magnitude, zero-padded when the
    /// top bit would otherwise read as a sign bit. Zero is `[0x00]`.
    pub fn to_script_bytes(&self) -> Vec<u8> {
        let first = match self.0.iter().position(|b| *b != 0) {
            Some(first) => first,
            None => return vec![0x00],
        };

        let mut bytes = Vec::with_capacity(33);
        if self.0[first] & 0x80 != 0 {
            bytes.push(0x00);
        }
        bytes.extend_from_slice(&self.0[first..]);
        bytes.reverse();
        bytes
    }

    /// Parse the script form written by [`ClaimedBitmap::to_script_bytes`].
    pub fn from_script_bytes(data: &[u8]) -> Result<Self, CovenantError> {
        let significant = data.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
        if significant > 32 {
            return Err(CovenantError::BitmapOverflow(data.len()));
        }

        let mut bytes = [0u8; 32];
        for (i, b) in data[..significant].iter().enumerate() {
            bytes[31 - i] = *b;
        }
        Ok(ClaimedBitmap(bytes))
    }
}

/// A parsed covenant output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CovenantRecord {
    /// The output holding this record.
    pub location: Outpoint,
    /// Characters already branched from this record.
    pub claimed: ClaimedBitmap,
    /// The domain this record represents.
    pub domain: Vec<u8>,
    /// Proof-of-work commitment the next character is mined against.
    pub pow: [u8; 32],
    /// The full locking script the record was parsed from.
    pub locking_script: Vec<u8>,
}

impl CovenantRecord {
    /// Domain as text, for display.
    pub fn domain_str(&self) -> String {
        String::from_utf8_lossy(&self.domain).into_owned()
    }

    /// The domain of the child branch for `c`.
    pub fn child_domain(&self, c: u8) -> Vec<u8> {
        let mut domain = self.domain.clone();
        domain.push(c);
        domain
    }

    /// Locking script restating this record with `c` claimed.
    pub fn restated_script(&self, c: u8, pow: &[u8; 32]) -> Vec<u8> {
        encode(&self.claimed.with_claimed(c), &self.domain, pow)
    }

    /// Locking script of the fresh child record for `c`.
    pub fn child_script(&self, c: u8, pow: &[u8; 32]) -> Vec<u8> {
        encode(&ClaimedBitmap::EMPTY, &self.child_domain(c), pow)
    }
}

/// Parse a covenant record from its locking script.
pub fn decode(script: &[u8], location: Outpoint) -> Result<CovenantRecord, CovenantError> {
    if !script.starts_with(CONTRACT) {
        return Err(CovenantError::InvalidScript);
    }

    let mut pos = CONTRACT.len();
    match script.get(pos..pos + STATE_HEADER.len()) {
        None => return Err(CovenantError::Truncated),
        Some(header) if header != STATE_HEADER => return Err(CovenantError::InvalidScript),
        Some(_) => pos += STATE_HEADER.len(),
    }

    let genesis = read_op(script, &mut pos)?;
    if genesis.data != GENESIS {
        return Err(CovenantError::InvalidGenesis);
    }

    let claimed = read_op(script, &mut pos)?;
    let domain = read_op(script, &mut pos)?;
    let pow = read_op(script, &mut pos)?;

    let pow: [u8; 32] = pow
        .data
        .try_into()
        .map_err(|_| CovenantError::InvalidPow(pow.data.len()))?;

    Ok(CovenantRecord {
        location,
        claimed: ClaimedBitmap::from_script_bytes(claimed.data)?,
        domain: domain.data.to_vec(),
        pow,
        locking_script: script.to_vec(),
    })
}

/// Build a covenant locking script for the given state.
pub fn encode(claimed: &ClaimedBitmap, domain: &[u8], pow: &[u8; 32]) -> Vec<u8> {
    let mut state = Vec::with_capacity(STATE_HEADER.len() + GENESIS.len() + domain.len() + 80);
    state.extend_from_slice(&STATE_HEADER);
    append_push_data(&mut state, &GENESIS);
    append_push_data(&mut state, &claimed.to_script_bytes());
    append_push_data(&mut state, domain);
    append_push_data(&mut state, pow);

    // The recorded length excludes the leading OP_RETURN.
    let state_size = (state.len() - 1) as u32;

    let mut script = Vec::with_capacity(CONTRACT.len() + state.len() + 5);
    script.extend_from_slice(CONTRACT);
    script.extend_from_slice(&state);
    script.extend_from_slice(&state_size.to_le_bytes());
    script.push(0x00);
    script
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location() -> Outpoint {
        Outpoint::new([0x42; 32], 1)
    }

    #[test]
    fn test_roundtrip() {
        let claimed = ClaimedBitmap::EMPTY.with_claimed(b'a').with_claimed(b'z').with_claimed(255);
        let pow = [0x5a; 32];
        let script = encode(&claimed, b"opns", &pow);

        let record = decode(&script, location()).unwrap();
        assert_eq!(record.claimed, claimed);
        assert_eq!(record.domain, b"opns");
        assert_eq!(record.pow, pow);
        assert_eq!(record.location, location());
        assert_eq!(record.locking_script, script);
    }

    #[test]
    fn test_roundtrip_empty_domain_and_bitmap() {
        let script = encode(&ClaimedBitmap::EMPTY, b"", &[0u8; 32]);
        let record = decode(&script, location()).unwrap();
        assert!(record.claimed.is_empty());
        assert!(record.domain.is_empty());
    }

    #[test]
    fn test_layout() {
        let pow = [0x11; 32];
        let script = encode(&ClaimedBitmap::EMPTY, b"ab", &pow);

        let state = &script[CONTRACT.len()..];
        assert_eq!(&state[..2], &STATE_HEADER);
        assert_eq!(state[2] as usize, GENESIS.len());
        // Empty bitmap is a one-byte push of zero.
        assert_eq!(&state[3 + GENESIS.len()..5 + GENESIS.len()], &[0x01, 0x00]);

        let trailer = &script[script.len() - 5..];
        assert_eq!(trailer[4], 0x00);
        let state_size = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
        assert_eq!(state_size as usize, state.len() - 5 - 1);
    }

    #[test]
    fn test_bitmap_script_bytes() {
        assert_eq!(ClaimedBitmap::EMPTY.to_script_bytes(), vec![0x00]);
        assert_eq!(ClaimedBitmap::EMPTY.with_claimed(0).to_script_bytes(), vec![0x01]);
        // 'c' = 99 = byte 12, bit 3
        let c = ClaimedBitmap::EMPTY.with_claimed(b'c').to_script_bytes();
        assert_eq!(c.len(), 13);
        assert_eq!(c[12], 0x08);
        // Bit 7 would read as a sign bit, so a zero byte is appended.
        assert_eq!(ClaimedBitmap::EMPTY.with_claimed(7).to_script_bytes(), vec![0x80, 0x00]);
        assert_eq!(ClaimedBitmap::EMPTY.with_claimed(255).to_script_bytes().len(), 33);
    }

    #[test]
    fn test_bitmap_from_script_bytes() {
        let bitmap = ClaimedBitmap::from_script_bytes(&[0x80, 0x00]).unwrap();
        assert!(bitmap.is_claimed(7));
        assert_eq!(bitmap.claimed().collect::<Vec<_>>(), vec![7]);

        assert_eq!(ClaimedBitmap::from_script_bytes(&[]).unwrap(), ClaimedBitmap::EMPTY);
        assert_eq!(
            ClaimedBitmap::from_script_bytes(&[1u8; 33]),
            Err(CovenantError::BitmapOverflow(33))
        );
    }

    #[test]
    fn test_claim_never_shrinks() {
        let base = ClaimedBitmap::EMPTY.with_claimed(b'a');
        let next = base.with_claimed(b'b');
        assert!(next.is_claimed(b'a'));
        assert!(next.is_claimed(b'b'));
        assert_eq!(next.with_claimed(b'a'), next);
    }

    #[test]
    fn test_decode_invalid_script() {
        assert_eq!(decode(&[0x76, 0xa9], location()), Err(CovenantError::InvalidScript));

        let mut script = encode(&ClaimedBitmap::EMPTY, b"x", &[0u8; 32]);
        script[0] ^= 0xff;
        assert_eq!(decode(&script, location()), Err(CovenantError::InvalidScript));
    }

    #[test]
    fn test_decode_invalid_genesis() {
        let mut script = encode(&ClaimedBitmap::EMPTY, b"x", &[0u8; 32]);
        script[CONTRACT.len() + 3] ^= 0xff;
        assert_eq!(decode(&script, location()), Err(CovenantError::InvalidGenesis));
    }

    #[test]
    fn test_decode_truncated() {
        let script = encode(&ClaimedBitmap::EMPTY, b"domain", &[0u8; 32]);
        let genesis_end = CONTRACT.len() + 2 + 1 + GENESIS.len();

        assert_eq!(decode(CONTRACT, location()), Err(CovenantError::Truncated));
        assert_eq!(decode(&script[..genesis_end + 4], location()), Err(CovenantError::Truncated));
    }

    #[test]
    fn test_child_and_restated_scripts() {
        let record = decode(&encode(&ClaimedBitmap::EMPTY, b"ab", &[1u8; 32]), location()).unwrap();
        let pow = [9u8; 32];

        let restated = decode(&record.restated_script(b'c', &pow), location()).unwrap();
        assert_eq!(restated.domain, b"ab");
        assert!(restated.claimed.is_claimed(b'c'));
        assert_eq!(restated.pow, pow);

        let child = decode(&record.child_script(b'c', &pow), location()).unwrap();
        assert_eq!(child.domain, b"abc");
        assert!(child.claimed.is_empty());
        assert_eq!(child.pow, pow);
    }
}
