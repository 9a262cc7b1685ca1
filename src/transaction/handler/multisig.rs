//! The multisig lock: configuration encoding and the script handler.

use bytes::{BufMut, Bytes, BytesMut};

use super::{HandlerContext, ScriptHandler};
use crate::{
    constants::{self, NetworkType, BLAKE160_SIZE, SECP_SIGNATURE_SIZE},
    fixed_hash::H160,
    hash::blake2b_160,
    molecule::{VerificationError, VerificationResult},
    transaction::{tx_data::TransactionData, TxBuilderError, WitnessRole},
    types::{CellDep, ScriptGroup},
};

/// An `M`-of-`N` multisig lock configuration.
///
/// Encodes to `[version, first_n, threshold, N] ‖ key_hashes`; the blake160
/// of that encoding is what the lock script's args carry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultisigConfig {
    version: u8,
    first_n: u8,
    threshold: u8,
    key_hashes: Vec<H160>,
}

impl MultisigConfig {
    /// A legacy (version 0) configuration.
    ///
    /// `first_n` keys must sign in order before the rest; `threshold`
    /// signatures are required in total.
    pub fn new(
        first_n: u8,
        threshold: u8,
        key_hashes: Vec<H160>,
    ) -> Result<Self, VerificationError> {
        if key_hashes.is_empty() || key_hashes.len() > u8::MAX as usize {
            return Err(VerificationError::InvalidData(
                "MultisigConfig",
                format!("{} key hashes", key_hashes.len()),
            ));
        }
        if threshold == 0 || threshold as usize > key_hashes.len() || first_n > threshold {
            return Err(VerificationError::InvalidData(
                "MultisigConfig",
                format!(
                    "threshold {} / first_n {} over {} keys",
                    threshold,
                    first_n,
                    key_hashes.len()
                ),
            ));
        }
        Ok(MultisigConfig {
            version: 0,
            first_n,
            threshold,
            key_hashes,
        })
    }

    /// The required signature count.
    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// The blake160 hashes of the participating keys.
    pub fn key_hashes(&self) -> &[H160] {
        &self.key_hashes
    }

    /// The canonical encoding.
    pub fn encode(&self) -> Bytes {
        let mut buf =
            BytesMut::with_capacity(4 + BLAKE160_SIZE * self.key_hashes.len());
        buf.put_u8(self.version);
        buf.put_u8(self.first_n);
        buf.put_u8(self.threshold);
        buf.put_u8(self.key_hashes.len() as u8);
        for hash in &self.key_hashes {
            buf.put_slice(hash.as_bytes());
        }
        buf.freeze()
    }

    /// The exact inverse of [`Self::encode`]; rejects truncated or
    /// length-inconsistent input.
    pub fn decode(data: &[u8]) -> VerificationResult<Self> {
        if data.len() < 4 {
            return Err(VerificationError::HeaderIsBroken("MultisigConfig", 4, data.len()));
        }
        let (version, first_n, threshold, count) = (data[0], data[1], data[2], data[3]);
        let expected = 4 + BLAKE160_SIZE * count as usize;
        if data.len() != expected {
            return Err(VerificationError::TotalSizeNotMatch(
                "MultisigConfig",
                expected,
                data.len(),
            ));
        }
        if version != 0 {
            return Err(VerificationError::InvalidData(
                "MultisigConfig",
                format!("unsupported version {}", version),
            ));
        }
        if threshold == 0 || threshold > count || first_n > threshold {
            return Err(VerificationError::InvalidData(
                "MultisigConfig",
                format!("threshold {} / first_n {} over {} keys", threshold, first_n, count),
            ));
        }
        let key_hashes = data[4..]
            .chunks(BLAKE160_SIZE)
            .map(|chunk| {
                let mut hash = [0u8; BLAKE160_SIZE];
                hash.copy_from_slice(chunk);
                H160(hash)
            })
            .collect();
        Ok(MultisigConfig {
            version,
            first_n,
            threshold,
            key_hashes,
        })
    }

    /// blake160 over the encoding: the lock script args for this config.
    pub fn hash160(&self) -> H160 {
        H160(blake2b_160(self.encode()))
    }

    /// The witness lock placeholder: the encoding followed by one zeroed
    /// 65-byte slot per required signature.
    pub fn placeholder_witness_lock(&self) -> Bytes {
        let header = self.encode();
        let mut buf =
            BytesMut::with_capacity(header.len() + SECP_SIGNATURE_SIZE * self.threshold as usize);
        buf.put_slice(&header);
        buf.put_bytes(0, SECP_SIGNATURE_SIZE * self.threshold as usize);
        buf.freeze()
    }
}

/// Marks a build as spending cells behind one multisig configuration.
pub struct Secp256k1Blake160MultisigAllScriptContext {
    /// The configuration whose hash160 the lock args carry.
    pub config: MultisigConfig,
}

impl Secp256k1Blake160MultisigAllScriptContext {
    /// Wraps a configuration.
    pub fn new(config: MultisigConfig) -> Self {
        Secp256k1Blake160MultisigAllScriptContext { config }
    }
}

impl HandlerContext for Secp256k1Blake160MultisigAllScriptContext {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Adds the genesis multisig dep group and sizes the witness placeholder to
/// `4 + 20·N` header bytes plus `65·threshold` signature slots.
pub struct Secp256k1Blake160MultisigAllScriptHandler {
    cell_deps: Vec<CellDep>,
}

impl Secp256k1Blake160MultisigAllScriptHandler {
    /// A handler wired to the genesis dep group of `network`.
    pub fn new(network: NetworkType) -> Self {
        Secp256k1Blake160MultisigAllScriptHandler {
            cell_deps: vec![constants::multisig_dep(network)],
        }
    }

    fn is_match(&self, group: &ScriptGroup) -> bool {
        group.script.code_hash == *constants::CODE_HASH_MULTISIG_ALL
    }
}

impl ScriptHandler for Secp256k1Blake160MultisigAllScriptHandler {
    fn build_transaction(
        &self,
        tx_data: &mut TransactionData,
        script_group: &ScriptGroup,
        context: &dyn HandlerContext,
    ) -> Result<bool, TxBuilderError> {
        let Some(context) = context
            .as_any()
            .downcast_ref::<Secp256k1Blake160MultisigAllScriptContext>()
        else {
            return Ok(false);
        };
        if !self.is_match(script_group) {
            return Ok(false);
        }
        for cell_dep in &self.cell_deps {
            tx_data.add_cell_dep(cell_dep.clone());
        }
        if let Some(&index) = script_group.input_indices.first() {
            tx_data.set_witness(
                index,
                WitnessRole::Lock,
                context.config.placeholder_witness_lock(),
            )?;
        }
        Ok(true)
    }
}
