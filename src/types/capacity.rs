//! Capacity in shannons with checked arithmetic.

use std::fmt;

use thiserror::Error;

/// Error for capacity arithmetic that would wrap.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum CapacityError {
    /// The operation overflows or underflows `u64`.
    #[error("capacity arithmetic overflow")]
    Overflow,
}

/// Result alias for capacity arithmetic.
pub type CapacityResult<T> = Result<T, CapacityError>;

const BYTE_SHANNONS: u64 = 100_000_000;

/// An amount of shannons; one CKByte is 10^8 shannons.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Capacity(u64);

impl Capacity {
    /// The zero amount.
    pub const fn zero() -> Self {
        Capacity(0)
    }

    /// Constructs directly from shannons.
    pub const fn shannons(val: u64) -> Self {
        Capacity(val)
    }

    /// Converts a byte count into the capacity it occupies.
    pub fn bytes(size: usize) -> CapacityResult<Self> {
        (size as u64)
            .checked_mul(BYTE_SHANNONS)
            .map(Capacity)
            .ok_or(CapacityError::Overflow)
    }

    /// Returns the amount in shannons.
    pub fn as_u64(self) -> u64 {
        self.0
    }

    /// Checked addition.
    pub fn safe_add(self, rhs: Capacity) -> CapacityResult<Self> {
        self.0
            .checked_add(rhs.0)
            .map(Capacity)
            .ok_or(CapacityError::Overflow)
    }

    /// Checked subtraction.
    pub fn safe_sub(self, rhs: Capacity) -> CapacityResult<Self> {
        self.0
            .checked_sub(rhs.0)
            .map(Capacity)
            .ok_or(CapacityError::Overflow)
    }

    /// Checked multiplication by a scalar.
    pub fn safe_mul(self, rhs: u64) -> CapacityResult<Self> {
        self.0
            .checked_mul(rhs)
            .map(Capacity)
            .ok_or(CapacityError::Overflow)
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Capacity({})", self.0)
    }
}

/// Shorthand for a whole number of CKBytes, mostly for tests and fixtures.
#[macro_export]
macro_rules! capacity_bytes {
    ($num:expr) => {
        $crate::types::Capacity::bytes($num).expect("capacity overflow")
    };
}
