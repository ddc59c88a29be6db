//! Network definitions and OpNS protocol constants.

/// BSV network type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Network {
    /// BSV mainnet
    #[default]
    Mainnet,
    /// BSV testnet
    Testnet,
}

impl Network {
    /// Get the version byte for P2PKH addresses.
    pub fn p2pkh_version(&self) -> u8 {
        match self {
            Network::Mainnet => 0x00,
            Network::Testnet => 0x6f,
        }
    }

    /// Get the version byte for WIF-encoded private keys.
    pub fn wif_version(&self) -> u8 {
        match self {
            Network::Mainnet => 0x80,
            Network::Testnet => 0xef,
        }
    }

    /// Get the OpNS indexer API base URL for this network.
    pub fn indexer_api_url(&self) -> &'static str {
        match self {
            Network::Mainnet => "https://ordinals.gorillapool.io/api",
            Network::Testnet => "https://testnet.ordinals.gorillapool.io/api",
        }
    }

    /// Parse network from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "mainnet" | "main" | "bsv" => Some(Network::Mainnet),
            "testnet" | "test" => Some(Network::Testnet),
            _ => None,
        }
    }

    /// Get network name as string.
    pub fn name(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
        }
    }
}

impl core::fmt::Display for Network {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Genesis outpoint of the OpNS tree (txid followed by the 4-byte vout).
/// Every covenant state and inscription is tagged with it.
pub const GENESIS: [u8; 36] = [
    0x25, 0xcb, 0x9c, 0x17, 0x77, 0x26, 0x41, 0xba,
    0x23, 0x74, 0xa8, 0xd7, 0x4f, 0x72, 0x9a, 0xad,
    0x92, 0x19, 0x32, 0xfe, 0xf5, 0xe2, 0xc7, 0x66,
    0x42, 0xf2, 0x79, 0xa3, 0x8e, 0x55, 0xb7, 0x58,
    0x00, 0x00, 0x00, 0x00,
];

/// Protocol identifier pushed after the inscription envelope.
pub const PROTOCOL_ID: &str = "1opNSUJVbBc2Vf8LFNSoywGGK4jMcGVrC";

/// Content type of the inscription carrying the domain.
pub const CONTENT_TYPE: &str = "application/op-ns";

/// Inscription envelope marker.
pub const INSCRIPTION_TAG: &str = "ord";

/// Value carried by every covenant and inscription output.
pub const COVENANT_SATOSHIS: u64 = 1;

/// Transaction version used for mining transactions.
pub const TX_VERSION: u32 = 1;

/// Sequence number for final inputs.
pub const SEQUENCE_FINAL: u32 = 0xffff_ffff;

/// Default fee rate in satoshis per 1000 bytes.
pub const DEFAULT_SATS_PER_KB: u64 = 1;
