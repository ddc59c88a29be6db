//! Size-based fee model.

use crate::network::DEFAULT_SATS_PER_KB;

/// Linear fee: `ceil(size * satoshis / 1000)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SatoshisPerKilobyte {
    pub satoshis: u64,
}

impl Default for SatoshisPerKilobyte {
    fn default() -> Self {
        SatoshisPerKilobyte { satoshis: DEFAULT_SATS_PER_KB }
    }
}

impl SatoshisPerKilobyte {
    pub fn new(satoshis: u64) -> Self {
        SatoshisPerKilobyte { satoshis }
    }

    /// Fee for a transaction of `size` bytes.
    pub fn compute_fee(&self, size: usize) -> u64 {
        (size as u64 * self.satoshis).div_ceil(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rate_rounds_up() {
        let fees = SatoshisPerKilobyte::default();
        assert_eq!(fees.compute_fee(0), 0);
        assert_eq!(fees.compute_fee(1), 1);
        assert_eq!(fees.compute_fee(1000), 1);
        assert_eq!(fees.compute_fee(1001), 2);
    }

    #[test]
    fn test_custom_rate() {
        assert_eq!(SatoshisPerKilobyte::new(50).compute_fee(250), 13);
    }
}
