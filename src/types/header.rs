//! The block header fields this crate consumes.

use crate::{fixed_hash::H256, types::EpochNumberWithFraction};

/// The subset of a chain header used here: header deps are recorded by hash,
/// and the DAO calculator reads epoch, number and the `dao` field. Full
/// headers come from the RPC collaborator, which stays outside this crate.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Header {
    /// The header hash.
    pub hash: H256,
    /// The block number.
    pub number: u64,
    /// The epoch with in-epoch position.
    pub epoch: EpochNumberWithFraction,
    /// Timestamp in milliseconds.
    pub timestamp: u64,
    /// The accumulated DAO statistics field.
    pub dao: [u8; 32],
}
