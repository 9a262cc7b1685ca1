//! Fee calculation from serialized size.

use crate::types::Transaction;

/// Computes fees from a rate in shannons per 1000 bytes.
#[derive(Clone, Copy, Debug)]
pub struct FeeCalculator {
    fee_rate: u64,
}

impl FeeCalculator {
    /// A calculator charging `fee_rate` shannons per 1000 bytes.
    pub fn new(fee_rate: u64) -> Self {
        FeeCalculator { fee_rate }
    }

    /// The fee for `size` bytes, rounded up whenever `size * rate` is not a
    /// multiple of 1000.
    pub fn fee(&self, size: u64) -> u64 {
        let fee = self.fee_rate.saturating_mul(size) / 1000;
        if fee.saturating_mul(1000) < self.fee_rate.saturating_mul(size) {
            fee + 1
        } else {
            fee
        }
    }

    /// The fee for a transaction at its in-block size.
    pub fn fee_for_tx(&self, tx: &Transaction) -> u64 {
        self.fee(tx.serialized_size_in_block() as u64)
    }
}
