//! Scripts: the (code hash, hash type, args) triple gating cells.

use bytes::Bytes;

use crate::{
    fixed_hash::H256,
    hash::blake2b_256,
    molecule::Entity,
    types::{Capacity, CapacityResult},
};

/// How a script's `code_hash` resolves to on-chain code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ScriptHashType {
    /// Matches the hash of a dep cell's data; runs under VM version 0.
    #[default]
    Data = 0,
    /// Matches a dep cell's type script hash.
    Type = 1,
    /// Matches the hash of a dep cell's data; runs under VM version 1.
    Data1 = 2,
}

impl ScriptHashType {
    /// Decodes the wire byte, `None` for values outside the enum.
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(ScriptHashType::Data),
            1 => Some(ScriptHashType::Type),
            2 => Some(ScriptHashType::Data1),
            _ => None,
        }
    }
}

impl From<ScriptHashType> for u8 {
    fn from(t: ScriptHashType) -> u8 {
        t as u8
    }
}

/// The on-chain logic controlling a cell, either as lock or as type script.
///
/// Scripts are shared by value and never mutated after construction; two
/// scripts are the same script iff their hashes match, which for the
/// deterministic serialization is plain value equality.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Script {
    /// Identifies the code to run.
    pub code_hash: H256,
    /// How `code_hash` resolves.
    pub hash_type: ScriptHashType,
    /// Auxiliary argument bytes, e.g. a blake160 key hash for lock scripts.
    pub args: Bytes,
}

impl Script {
    /// Constructs a script.
    pub fn new(code_hash: H256, hash_type: ScriptHashType, args: Bytes) -> Self {
        Script {
            code_hash,
            hash_type,
            args,
        }
    }

    /// The script hash: blake2b over the canonical serialization.
    pub fn calc_script_hash(&self) -> H256 {
        H256(blake2b_256(self.to_bytes()))
    }

    /// The capacity the script occupies inside a cell: code hash, hash type
    /// and args.
    pub fn occupied_capacity(&self) -> CapacityResult<Capacity> {
        Capacity::bytes(self.args.len() + 32 + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capacity_bytes;

    #[test]
    fn occupied_capacity_counts_args() {
        let script = Script::new(H256::zero(), ScriptHashType::Type, Bytes::new());
        assert_eq!(script.occupied_capacity().unwrap(), capacity_bytes!(33));
        let script = Script::new(H256::zero(), ScriptHashType::Type, vec![0u8; 20].into());
        assert_eq!(script.occupied_capacity().unwrap(), capacity_bytes!(53));
    }

    #[test]
    fn script_hash_distinguishes_hash_type() {
        let a = Script::new(H256::zero(), ScriptHashType::Data, Bytes::new());
        let b = Script::new(H256::zero(), ScriptHashType::Type, Bytes::new());
        assert_ne!(a.calc_script_hash(), b.calc_script_hash());
    }
}
