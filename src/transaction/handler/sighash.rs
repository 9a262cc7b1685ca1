//! Handler for the secp256k1-blake160 sighash-all lock.

use bytes::Bytes;

use super::{HandlerContext, ScriptHandler};
use crate::{
    constants::{self, NetworkType, SECP_SIGNATURE_SIZE},
    transaction::{tx_data::TransactionData, TxBuilderError, WitnessRole},
    types::{CellDep, ScriptGroup},
};

/// Marks a build as involving plain single-sig locks.
pub struct Secp256k1Blake160SighashAllScriptContext;

impl HandlerContext for Secp256k1Blake160SighashAllScriptContext {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Adds the genesis dep group and a zeroed 65-byte lock placeholder, so the
/// serialized witness already has its final length.
pub struct Secp256k1Blake160SighashAllScriptHandler {
    cell_deps: Vec<CellDep>,
}

impl Secp256k1Blake160SighashAllScriptHandler {
    /// A handler wired to the genesis dep group of `network`.
    pub fn new(network: NetworkType) -> Self {
        Secp256k1Blake160SighashAllScriptHandler {
            cell_deps: vec![constants::sighash_dep(network)],
        }
    }

    fn is_match(&self, group: &ScriptGroup) -> bool {
        group.script.code_hash == *constants::CODE_HASH_SIGHASH_ALL
    }
}

impl ScriptHandler for Secp256k1Blake160SighashAllScriptHandler {
    fn build_transaction(
        &self,
        tx_data: &mut TransactionData,
        script_group: &ScriptGroup,
        context: &dyn HandlerContext,
    ) -> Result<bool, TxBuilderError> {
        if context
            .as_any()
            .downcast_ref::<Secp256k1Blake160SighashAllScriptContext>()
            .is_none()
            || !self.is_match(script_group)
        {
            return Ok(false);
        }
        for cell_dep in &self.cell_deps {
            tx_data.add_cell_dep(cell_dep.clone());
        }
        if let Some(&index) = script_group.input_indices.first() {
            tx_data.set_witness(
                index,
                WitnessRole::Lock,
                Bytes::from(vec![0u8; SECP_SIGNATURE_SIZE]),
            )?;
        }
        Ok(true)
    }
}
