//! Decoded addresses.
//!
//! An address here is the already-decoded form: the lock script it denotes
//! plus the network it belongs to. The bech32m text grammar lives in the
//! caller's address codec; this crate only consumes the payload.

use bytes::Bytes;

use crate::{
    constants::{self, NetworkType},
    fixed_hash::H160,
    types::{Script, ScriptHashType},
};

/// A decoded address: a lock script bound to a network.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Address {
    script: Script,
    network: NetworkType,
}

impl Address {
    /// Wraps an already-decoded lock script.
    pub fn new(script: Script, network: NetworkType) -> Self {
        Address { script, network }
    }

    /// The canonical single-sig address for a blake160 key hash.
    pub fn from_pubkey_hash(hash: H160, network: NetworkType) -> Self {
        let script = Script::new(
            *constants::CODE_HASH_SIGHASH_ALL,
            ScriptHashType::Type,
            Bytes::copy_from_slice(hash.as_bytes()),
        );
        Address { script, network }
    }

    /// The lock script the address denotes.
    pub fn payload(&self) -> &Script {
        &self.script
    }

    /// The network the address belongs to.
    pub fn network(&self) -> NetworkType {
        self.network
    }
}

impl From<&Address> for Script {
    fn from(addr: &Address) -> Script {
        addr.script.clone()
    }
}
