//! Minimal script building and push-data reading.
//!
//! Only what the covenant and P2PKH templates need: appending opcodes and
//! push-data, and walking a script one op at a time.

use alloc::vec::Vec;
use thiserror::Error;

pub const OP_0: u8 = 0x00;
pub const OP_FALSE: u8 = OP_0;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_PUSHDATA4: u8 = 0x4e;
pub const OP_1: u8 = 0x51;
pub const OP_IF: u8 = 0x63;
pub const OP_ENDIF: u8 = 0x68;
pub const OP_RETURN: u8 = 0x6a;
pub const OP_DUP: u8 = 0x76;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_CHECKSIG: u8 = 0xac;

/// Script reading errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    /// A push or its length prefix runs past the end of the script.
    #[error("script truncated at offset {0}")]
    Truncated(usize),
}

/// A single decoded script operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Op<'a> {
    /// The opcode byte.
    pub opcode: u8,
    /// Pushed data (empty for non-push opcodes).
    pub data: &'a [u8],
}

/// Prefix for pushing `len` bytes.
pub fn push_data_prefix(len: usize) -> Vec<u8> {
    if len <= 75 {
        alloc::vec![len as u8]
    } else if len <= 0xff {
        alloc::vec![OP_PUSHDATA1, len as u8]
    } else if len <= 0xffff {
        let mut prefix = alloc::vec![OP_PUSHDATA2];
        prefix.extend_from_slice(&(len as u16).to_le_bytes());
        prefix
    } else {
        let mut prefix = alloc::vec![OP_PUSHDATA4];
        prefix.extend_from_slice(&(len as u32).to_le_bytes());
        prefix
    }
}

/// Append a push of `data` to `script`.
pub fn append_push_data(script: &mut Vec<u8>, data: &[u8]) {
    script.extend_from_slice(&push_data_prefix(data.len()));
    script.extend_from_slice(data);
}

/// Number of bytes a push of `len` bytes occupies in a script.
#[inline]
pub fn push_data_len(len: usize) -> usize {
    push_data_prefix(len).len() + len
}

/// Read the op at `*pos`, advancing `pos` past it.
pub fn read_op<'a>(script: &'a [u8], pos: &mut usize) -> Result<Op<'a>, ScriptError> {
    let start = *pos;
    let opcode = *script.get(start).ok_or(ScriptError::Truncated(start))?;
    let mut cursor = start + 1;

    let len = match opcode {
        0x01..=0x4b => opcode as usize,
        OP_PUSHDATA1 => read_le(script, &mut cursor, 1)?,
        OP_PUSHDATA2 => read_le(script, &mut cursor, 2)?,
        OP_PUSHDATA4 => read_le(script, &mut cursor, 4)?,
        _ => 0,
    };

    let end = cursor.checked_add(len).ok_or(ScriptError::Truncated(cursor))?;
    let data = script.get(cursor..end).ok_or(ScriptError::Truncated(cursor))?;
    *pos = end;

    Ok(Op { opcode, data })
}

fn read_le(script: &[u8], cursor: &mut usize, width: usize) -> Result<usize, ScriptError> {
    let bytes = script
        .get(*cursor..*cursor + width)
        .ok_or(ScriptError::Truncated(*cursor))?;
    let mut value = 0usize;
    for (i, b) in bytes.iter().enumerate() {
        value |= (*b as usize) << (8 * i);
    }
    *cursor += width;
    Ok(value)
}

/// Encode a variable-length integer (Bitcoin varint).
pub fn encode_varint(value: u64, output: &mut Vec<u8>) {
    if value < 0xfd {
        output.push(value as u8);
    } else if value <= 0xffff {
        output.push(0xfd);
        output.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value <= 0xffffffff {
        output.push(0xfe);
        output.extend_from_slice(&(value as u32).to_le_bytes());
    } else {
        output.push(0xff);
        output.extend_from_slice(&value.to_le_bytes());
    }
}

/// Encoded size of a varint.
#[inline]
pub fn varint_len(value: u64) -> usize {
    match value {
        0..=0xfc => 1,
        0xfd..=0xffff => 3,
        0x10000..=0xffffffff => 5,
        _ => 9,
    }
}
