//! Inscription outputs announcing a mined domain to indexers.
//!
//! ```text
//! <owner script> OP_FALSE OP_IF "ord" OP_1 "application/op-ns" OP_0 <domain> OP_ENDIF
//! OP_RETURN "1opNSUJVbBc2Vf8LFNSoywGGK4jMcGVrC" <genesis>
//! ```

use alloc::vec::Vec;
use crate::network::{CONTENT_TYPE, GENESIS, INSCRIPTION_TAG, PROTOCOL_ID};
use crate::script::{
    append_push_data, read_op, OP_0, OP_1, OP_ENDIF, OP_FALSE, OP_IF, OP_RETURN,
};

/// Build the inscription locking script binding `domain` to `owner_script`.
pub fn build_inscription(domain: &[u8], owner_script: &[u8]) -> Vec<u8> {
    let mut script = Vec::with_capacity(owner_script.len() + domain.len() + 100);
    script.extend_from_slice(owner_script);
    script.extend_from_slice(&[OP_FALSE, OP_IF]);
    append_push_data(&mut script, INSCRIPTION_TAG.as_bytes());
    script.push(OP_1);
    append_push_data(&mut script, CONTENT_TYPE.as_bytes());
    script.push(OP_0);
    append_push_data(&mut script, domain);
    script.extend_from_slice(&[OP_ENDIF, OP_RETURN]);
    append_push_data(&mut script, PROTOCOL_ID.as_bytes());
    append_push_data(&mut script, &GENESIS);
    script
}

/// A domain inscription found in a locking script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainInscription {
    /// Locking script preceding the envelope.
    pub owner_script: Vec<u8>,
    pub domain: Vec<u8>,
}

/// Parse an inscription produced by [`build_inscription`].
///
/// Returns `None` for scripts that carry no OpNS inscription. The owner
/// script is everything before the envelope; it is not interpreted.
pub fn parse_inscription(script: &[u8]) -> Option<DomainInscription> {
    let mut envelope = Vec::with_capacity(32);
    envelope.extend_from_slice(&[OP_FALSE, OP_IF]);
    append_push_data(&mut envelope, INSCRIPTION_TAG.as_bytes());
    envelope.push(OP_1);
    append_push_data(&mut envelope, CONTENT_TYPE.as_bytes());
    envelope.push(OP_0);

    let start = script
        .windows(envelope.len())
        .position(|window| window == envelope.as_slice())?;

    let mut pos = start + envelope.len();
    let domain = read_op(script, &mut pos).ok()?.data.to_vec();

    let mut trailer = Vec::with_capacity(80);
    trailer.extend_from_slice(&[OP_ENDIF, OP_RETURN]);
    append_push_data(&mut trailer, PROTOCOL_ID.as_bytes());
    append_push_data(&mut trailer, &GENESIS);
    if script.get(pos..)? != trailer.as_slice() {
        return None;
    }

    Some(DomainInscription {
        owner_script: script[..start].to_vec(),
        domain,
    })
}
