//! Handler for the anyone-can-pay lock.
//!
//! Anyone-can-pay is a secp256k1-blake160 lock whose args carry the key hash
//! in the first 20 bytes, optionally followed by minimum-transfer digits that
//! only the on-chain script interprets. For fee purposes it behaves exactly
//! like the sighash lock: one 65-byte signature in the witness lock field.

use bytes::Bytes;

use super::{HandlerContext, ScriptHandler};
use crate::{
    constants::{self, NetworkType, SECP_SIGNATURE_SIZE},
    fixed_hash::H256,
    transaction::{tx_data::TransactionData, TxBuilderError, WitnessRole},
    types::{CellDep, ScriptGroup},
};

/// Marks a build as spending anyone-can-pay cells.
pub struct AnyoneCanPayScriptContext;

impl HandlerContext for AnyoneCanPayScriptContext {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Adds the deployment's cell deps and the 65-byte lock placeholder.
///
/// Anyone-can-pay is deployed outside genesis, so the deps are taken at
/// construction instead of from baked-in constants.
pub struct AnyoneCanPayScriptHandler {
    code_hash: H256,
    cell_deps: Vec<CellDep>,
}

impl AnyoneCanPayScriptHandler {
    /// A handler for an explicit deployment.
    pub fn new(code_hash: H256, cell_deps: Vec<CellDep>) -> Self {
        AnyoneCanPayScriptHandler {
            code_hash,
            cell_deps,
        }
    }

    /// A handler for the well-known deployment of `network`, given its deps.
    pub fn new_with_network(network: NetworkType, cell_deps: Vec<CellDep>) -> Self {
        Self::new(constants::acp_code_hash(network), cell_deps)
    }

    fn is_match(&self, group: &ScriptGroup) -> bool {
        group.script.code_hash == self.code_hash
    }
}

impl ScriptHandler for AnyoneCanPayScriptHandler {
    fn build_transaction(
        &self,
        tx_data: &mut TransactionData,
        script_group: &ScriptGroup,
        context: &dyn HandlerContext,
    ) -> Result<bool, TxBuilderError> {
        if context
            .as_any()
            .downcast_ref::<AnyoneCanPayScriptContext>()
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
