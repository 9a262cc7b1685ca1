//! Handler for the Nervos DAO type script.
//!
//! The DAO script needs no witness lock placeholder, but every phase touches
//! the transaction differently:
//!
//! - deposit: the output cell carries the DAO type script and 8 zero bytes of
//!   data; only the code cell dep is needed;
//! - withdraw (phase 1): the spent deposit cell's block header joins the
//!   header deps (the new cell's data records that block number);
//! - claim (phase 2): deposit and withdraw headers both join the header
//!   deps, each claimed input gets the minimum unlock `since`, and its
//!   witness input-type field carries the little-endian index of the deposit
//!   header dep, which is where the on-chain script looks it up.

use byteorder::{ByteOrder, LittleEndian};
use bytes::Bytes;

use super::{HandlerContext, ScriptHandler};
use crate::{
    constants::{self, NetworkType},
    dao,
    fixed_hash::H256,
    transaction::{tx_data::TransactionData, TxBuilderError, WitnessRole},
    types::{CellDep, Header, ScriptGroup},
};

/// Marks a build as creating a DAO deposit output.
pub struct DaoDepositContext;

impl HandlerContext for DaoDepositContext {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Marks a build as turning a deposit into a withdrawing cell.
pub struct DaoWithdrawContext {
    /// Hash of the block that committed the deposit.
    pub deposit_block_hash: H256,
}

impl DaoWithdrawContext {
    /// For a deposit committed in `deposit_block_hash`.
    pub fn new(deposit_block_hash: H256) -> Self {
        DaoWithdrawContext { deposit_block_hash }
    }
}

impl HandlerContext for DaoWithdrawContext {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Marks a build as claiming a withdrawing cell.
pub struct DaoClaimContext {
    /// Header of the block that committed the deposit.
    pub deposit_header: Header,
    /// Header of the block that committed the withdraw.
    pub withdraw_header: Header,
}

impl DaoClaimContext {
    /// For a withdraw committed in `withdraw_header` whose deposit was
    /// committed in `deposit_header`.
    pub fn new(deposit_header: Header, withdraw_header: Header) -> Self {
        DaoClaimContext {
            deposit_header,
            withdraw_header,
        }
    }
}

impl HandlerContext for DaoClaimContext {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Contributes deps, header deps, since values and input-type witnesses for
/// the three DAO phases.
pub struct DaoScriptHandler {
    cell_deps: Vec<CellDep>,
}

impl DaoScriptHandler {
    /// A handler wired to the genesis DAO code cell of `network`.
    pub fn new(network: NetworkType) -> Self {
        DaoScriptHandler {
            cell_deps: vec![constants::dao_dep(network)],
        }
    }

    fn is_match(&self, group: &ScriptGroup) -> bool {
        group.script.code_hash == *constants::CODE_HASH_DAO
    }

    fn add_cell_deps(&self, tx_data: &mut TransactionData) {
        for cell_dep in &self.cell_deps {
            tx_data.add_cell_dep(cell_dep.clone());
        }
    }

    fn build_claim(
        &self,
        tx_data: &mut TransactionData,
        script_group: &ScriptGroup,
        context: &DaoClaimContext,
    ) -> Result<(), TxBuilderError> {
        self.add_cell_deps(tx_data);
        let deposit_index = tx_data.add_header_dep(context.deposit_header.hash);
        tx_data.add_header_dep(context.withdraw_header.hash);
        let since = dao::minimum_since(context.deposit_header.epoch, context.withdraw_header.epoch);
        let mut index_data = [0u8; 8];
        LittleEndian::write_u64(&mut index_data, deposit_index as u64);
        for &input_index in &script_group.input_indices {
            tx_data.set_since(input_index, since.as_u64())?;
            tx_data.set_witness(
                input_index,
                WitnessRole::InputType,
                Bytes::copy_from_slice(&index_data),
            )?;
        }
        Ok(())
    }
}

impl ScriptHandler for DaoScriptHandler {
    fn build_transaction(
        &self,
        tx_data: &mut TransactionData,
        script_group: &ScriptGroup,
        context: &dyn HandlerContext,
    ) -> Result<bool, TxBuilderError> {
        if !self.is_match(script_group) {
            return Ok(false);
        }
        if context.as_any().downcast_ref::<DaoDepositContext>().is_some() {
            self.add_cell_deps(tx_data);
            Ok(true)
        } else if let Some(context) = context.as_any().downcast_ref::<DaoWithdrawContext>() {
            self.add_cell_deps(tx_data);
            tx_data.add_header_dep(context.deposit_block_hash);
            Ok(true)
        } else if let Some(context) = context.as_any().downcast_ref::<DaoClaimContext>() {
            self.build_claim(tx_data, script_group, context)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
