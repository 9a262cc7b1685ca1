//! The cell-selection and fee-convergence loop.

use std::collections::HashMap;

use bytes::Bytes;
use log::debug;

use super::{
    handler::{dao::DaoClaimContext, HandlerContexts},
    input::{InputIterator, TransactionInput},
    tx_data::TransactionData,
    TransactionBuilderConfiguration, TransactionWithScriptGroups, TxBuilderError,
};
use crate::{
    address::Address,
    dao,
    fixed_hash::H256,
    types::{Capacity, CellDep, CellOutput, Header, ScriptGroup},
};

/// Anything that can turn accumulated outputs into a balanced transaction.
pub trait CkbTransactionBuilder {
    /// Runs script grouping, handler invocation and the cell-selection loop,
    /// producing a fee-balanced transaction with its script groups.
    fn build(
        &mut self,
        contexts: &HandlerContexts,
    ) -> Result<TransactionWithScriptGroups, TxBuilderError>;
}

/// The general-purpose builder: accumulate outputs, register a change
/// recipient, then [`build`](CkbTransactionBuilder::build).
///
/// Not safe for concurrent use; each logical transaction should own its own
/// builder, and a builder that returned an error must be discarded.
pub struct SimpleTransactionBuilder {
    configuration: TransactionBuilderConfiguration,
    input_iter: InputIterator,
    tx: TransactionData,
    change_output_index: Option<usize>,
    reward: u64,
}

impl SimpleTransactionBuilder {
    /// A builder drawing spendable cells from `input_iter`.
    pub fn new(configuration: TransactionBuilderConfiguration, input_iter: InputIterator) -> Self {
        SimpleTransactionBuilder {
            configuration,
            input_iter,
            tx: TransactionData::default(),
            change_output_index: None,
            reward: 0,
        }
    }

    /// Appends an output with its data.
    pub fn add_output(&mut self, output: CellOutput, data: Bytes) {
        self.tx.add_output(output, data);
    }

    /// Appends a plain transfer output to `address`.
    pub fn add_output_by_address(&mut self, address: &Address, capacity: Capacity) {
        let output = CellOutput::new(capacity, address.into(), None);
        self.tx.add_output(output, Bytes::new());
    }

    /// Registers `output` as the change recipient.
    ///
    /// At most one change output per builder; the balance loop rewrites its
    /// capacity once inputs cover outputs plus fee.
    pub fn set_change_output(
        &mut self,
        output: CellOutput,
        data: Bytes,
    ) -> Result<(), TxBuilderError> {
        if let Some(index) = self.change_output_index {
            return Err(TxBuilderError::ChangeAlreadySet(index));
        }
        self.change_output_index = Some(self.tx.outputs_len());
        self.tx.add_output(output, data);
        Ok(())
    }

    /// Registers a zero-capacity change output to `address`.
    pub fn add_change_output_by_address(&mut self, address: &Address) -> Result<(), TxBuilderError> {
        let output = CellOutput::new(Capacity::zero(), address.into(), None);
        self.set_change_output(output, Bytes::new())
    }

    /// Queues a pre-selected input; consumed before the live-cell source.
    pub fn add_input(&mut self, input: TransactionInput) {
        self.input_iter.push_customized_input(input);
    }

    /// Adds a cell dep outside any handler, deduplicated by value.
    pub fn add_cell_dep(&mut self, cell_dep: CellDep) {
        self.tx.add_cell_dep(cell_dep);
    }

    /// Adds a header dep outside any handler, deduplicated by value.
    pub fn add_header_dep(&mut self, hash: H256) {
        self.tx.add_header_dep(hash);
    }

    /// Extra capacity available beyond the inputs, e.g. a DAO reward.
    pub(crate) fn set_reward(&mut self, reward: u64) {
        self.reward = reward;
    }

    fn handle_script(
        tx: &mut TransactionData,
        configuration: &TransactionBuilderConfiguration,
        script_group: &ScriptGroup,
        contexts: &HandlerContexts,
    ) -> Result<(), TxBuilderError> {
        for handler in configuration.get_script_handlers() {
            for context in &contexts.contexts {
                if handler.build_transaction(tx, script_group, context.as_ref())? {
                    break;
                }
            }
        }
        Ok(())
    }

    fn change_occupied_capacity(&self, change_index: usize) -> Result<Capacity, TxBuilderError> {
        let output = &self.tx.outputs()[change_index];
        let data = &self.tx.outputs_data()[change_index];
        output
            .occupied_capacity(Capacity::bytes(data.len())?)
            .map_err(Into::into)
    }
}

impl CkbTransactionBuilder for SimpleTransactionBuilder {
    fn build(
        &mut self,
        contexts: &HandlerContexts,
    ) -> Result<TransactionWithScriptGroups, TxBuilderError> {
        let change_index = self
            .change_output_index
            .ok_or(TxBuilderError::NoChangeOutput)?;

        let mut lock_groups: HashMap<H256, ScriptGroup> = HashMap::default();
        let mut type_groups: HashMap<H256, ScriptGroup> = HashMap::default();

        // pre-registered outputs: record their type groups and let handlers
        // contribute deps before any input is selected
        let mut outputs_capacity = Capacity::zero();
        let outputs = self.tx.outputs().to_vec();
        for (index, output) in outputs.iter().enumerate() {
            outputs_capacity = outputs_capacity.safe_add(output.capacity)?;
            if let Some(type_script) = &output.type_ {
                let script_group = type_groups
                    .entry(type_script.calc_script_hash())
                    .or_insert_with(|| ScriptGroup::from_type_script(type_script));
                script_group.output_indices.push(index);
                Self::handle_script(&mut self.tx, &self.configuration, script_group, contexts)?;
            }
        }

        let calculator = self.configuration.fee_calculator();
        let mut inputs_capacity = Capacity::zero();
        let mut required = outputs_capacity.as_u64();
        let mut enough = false;

        while let Some(input) = self.input_iter.next() {
            let input = input?;
            let input_index = self.tx.inputs().len();
            self.tx.add_input(input.cell_input());

            let previous_output = input.previous_output().clone();
            let lock_script = &previous_output.lock;
            let script_group = lock_groups
                .entry(lock_script.calc_script_hash())
                .or_insert_with(|| ScriptGroup::from_lock_script(lock_script));
            script_group.input_indices.push(input_index);
            // handlers fill the witness placeholder now, so the serialized
            // size below is already fee-accurate
            Self::handle_script(&mut self.tx, &self.configuration, script_group, contexts)?;

            if let Some(type_script) = &previous_output.type_ {
                let script_group = type_groups
                    .entry(type_script.calc_script_hash())
                    .or_insert_with(|| ScriptGroup::from_type_script(type_script));
                script_group.input_indices.push(input_index);
                Self::handle_script(&mut self.tx, &self.configuration, script_group, contexts)?;
            }

            inputs_capacity = inputs_capacity.safe_add(previous_output.capacity)?;
            let fee = calculator.fee_for_tx(&self.tx.build_tx_view());
            let available = inputs_capacity.as_u64() + self.reward;
            required = outputs_capacity.as_u64() + fee;
            debug!(
                "balancing: {} inputs, {} available, {} required",
                input_index + 1,
                available,
                required
            );

            if let Some(change_capacity) = available.checked_sub(required) {
                let change_floor = self.change_occupied_capacity(change_index)?.as_u64();
                if change_capacity >= change_floor {
                    self.tx
                        .set_output_capacity(change_index, Capacity::shannons(change_capacity))?;
                    enough = true;
                    break;
                }
                // the change cell itself must meet its rent floor
                required += change_floor - change_capacity;
            }
        }

        if !enough {
            return Err(TxBuilderError::InsufficientCapacity {
                required,
                collected: inputs_capacity.as_u64() + self.reward,
            });
        }

        let script_groups = lock_groups
            .into_values()
            .chain(type_groups.into_values())
            .collect();
        Ok(TransactionWithScriptGroups::new(
            self.tx.build_tx_view(),
            script_groups,
        ))
    }
}

/// A claim (DAO withdraw phase 2) builder: spends a withdrawing cell and
/// feeds the accrued reward into the balance loop as extra capacity.
pub struct DaoClaimTransactionBuilder {
    inner: SimpleTransactionBuilder,
}

impl DaoClaimTransactionBuilder {
    /// Prepares a claim of `withdraw_cell`, whose deposit was committed in
    /// `deposit_header` and whose withdraw was committed in
    /// `withdraw_header`.
    ///
    /// The cell joins the transaction ahead of anything the live-cell source
    /// yields; pair the build call with a
    /// [`DaoClaimContext`] so the DAO handler wires header deps, since and
    /// the input-type witness.
    pub fn new(
        configuration: TransactionBuilderConfiguration,
        input_iter: InputIterator,
        withdraw_cell: TransactionInput,
        deposit_header: &Header,
        withdraw_header: &Header,
    ) -> Result<Self, TxBuilderError> {
        let reward = dao::reward(
            &withdraw_cell.live_cell.output,
            &withdraw_cell.live_cell.output_data,
            &deposit_header.dao,
            &withdraw_header.dao,
        )?;
        let mut inner = SimpleTransactionBuilder::new(configuration, input_iter);
        inner.add_input(withdraw_cell);
        inner.set_reward(reward);
        Ok(DaoClaimTransactionBuilder { inner })
    }

    /// A handler context matching this claim.
    pub fn claim_context(deposit_header: Header, withdraw_header: Header) -> DaoClaimContext {
        DaoClaimContext::new(deposit_header, withdraw_header)
    }

    /// See [`SimpleTransactionBuilder::add_output`].
    pub fn add_output(&mut self, output: CellOutput, data: Bytes) {
        self.inner.add_output(output, data);
    }

    /// See [`SimpleTransactionBuilder::set_change_output`].
    pub fn set_change_output(
        &mut self,
        output: CellOutput,
        data: Bytes,
    ) -> Result<(), TxBuilderError> {
        self.inner.set_change_output(output, data)
    }

    /// See [`SimpleTransactionBuilder::add_change_output_by_address`].
    pub fn add_change_output_by_address(
        &mut self,
        address: &Address,
    ) -> Result<(), TxBuilderError> {
        self.inner.add_change_output_by_address(address)
    }
}

impl CkbTransactionBuilder for DaoClaimTransactionBuilder {
    fn build(
        &mut self,
        contexts: &HandlerContexts,
    ) -> Result<TransactionWithScriptGroups, TxBuilderError> {
        self.inner.build(contexts)
    }
}
