//! Fixed-size hash types compared by byte value.

use std::{fmt, str::FromStr};

use thiserror::Error;

/// Error when parsing a fixed hash from a hex string.
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum FromStrError {
    /// The input length is not exactly twice the hash width.
    #[error("invalid length: expect {expected} hex chars but got {actual}")]
    InvalidLength {
        /// Expected number of hex characters.
        expected: usize,
        /// Actual number of characters supplied.
        actual: usize,
    },
    /// The input contains a non-hex character.
    #[error("invalid hex character")]
    InvalidCharacter,
}

/// Error when constructing a fixed hash from a slice of the wrong length.
#[derive(Error, Debug, PartialEq, Eq, Clone)]
#[error("invalid slice length: expect {expected} bytes but got {actual}")]
pub struct FromSliceError {
    /// Expected byte length.
    pub expected: usize,
    /// Actual byte length.
    pub actual: usize,
}

macro_rules! impl_fixed_hash {
    ($(#[$docs:meta])* $name:ident, $size:literal) => {
        $(#[$docs])*
        #[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub [u8; $size]);

        impl $name {
            /// The width of the hash in bytes.
            pub const SIZE: usize = $size;

            /// Returns the all-zero hash.
            pub const fn zero() -> Self {
                $name([0u8; $size])
            }

            /// Views the hash as a byte slice.
            pub fn as_bytes(&self) -> &[u8] {
                &self.0[..]
            }

            /// Constructs the hash from a slice, failing on any other length.
            pub fn from_slice(input: &[u8]) -> Result<Self, FromSliceError> {
                if input.len() != $size {
                    return Err(FromSliceError {
                        expected: $size,
                        actual: input.len(),
                    });
                }
                let mut ret = [0u8; $size];
                ret.copy_from_slice(input);
                Ok($name(ret))
            }
        }

        impl From<[u8; $size]> for $name {
            fn from(bytes: [u8; $size]) -> Self {
                $name(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0[..]
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                let mut buf = [0u8; $size * 2];
                faster_hex::hex_encode(&self.0, &mut buf).map_err(|_| fmt::Error)?;
                let s = std::str::from_utf8(&buf).map_err(|_| fmt::Error)?;
                write!(f, "{}", s)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, concat!(stringify!($name), "(0x{})"), self)
            }
        }

        impl FromStr for $name {
            type Err = FromStrError;

            fn from_str(input: &str) -> Result<Self, Self::Err> {
                let input = input.strip_prefix("0x").unwrap_or(input);
                if input.len() != $size * 2 {
                    return Err(FromStrError::InvalidLength {
                        expected: $size * 2,
                        actual: input.len(),
                    });
                }
                let mut ret = [0u8; $size];
                faster_hex::hex_decode(input.as_bytes(), &mut ret)
                    .map_err(|_| FromStrError::InvalidCharacter)?;
                Ok($name(ret))
            }
        }
    };
}

impl_fixed_hash!(
    /// The 32-byte fixed-length binary data, e.g. a script hash.
    H256,
    32
);
impl_fixed_hash!(
    /// The 20-byte fixed-length binary data, e.g. a blake160 key hash.
    H160,
    20
);
