//! The compiled OpNS covenant locking template.
//!
//! Every covenant output is `CONTRACT || state`, where the state section is
//! produced by [`crate::covenant::encode`]. The template itself never changes
//! between states, so it doubles as the type tag for a covenant script.

/// Compiled covenant code preceding the state section of every OpNS output.
pub const CONTRACT: &[u8] = &[
    0x00, 0x79, 0xa8, 0x01, 0x14, 0x7f, 0x75, 0x7c,
    0x21, 0x02, 0x79, 0xbe, 0x66, 0x7e, 0xf9, 0xdc,
    0xbb, 0xac, 0x55, 0xa0, 0x62, 0x95, 0xce, 0x87,
    0x0b, 0x07, 0x02, 0x9b, 0xfc, 0xdb, 0x2d, 0xce,
    0x28, 0xd9, 0x59, 0xf2, 0x81, 0x5b, 0x16, 0xf8,
    0x17, 0x98, 0x7c, 0x01, 0x41, 0x7e, 0xad,
    0x52, 0x79, 0x53, 0x79, 0x7e, 0x54, 0x79, 0x7e,
    0xaa, 0x01, 0x00, 0x7e, 0x81, 0x03, 0xff, 0xff,
    0x03, 0xa1, 0x69,
    0x55, 0x79, 0x01, 0x20, 0x7f, 0x77, 0x00, 0x7e,
    0x81, 0x56, 0x79, 0x97, 0x00, 0x9c, 0x69, 0x57,
    0x79, 0x82, 0x77, 0x58, 0x79, 0x7e, 0xaa, 0x7b,
    0x01, 0x68, 0x7f, 0x75, 0x01, 0x20, 0x7f, 0x77,
    0x88, 0x6d, 0x6d, 0x6d, 0x6d, 0x51,
];
