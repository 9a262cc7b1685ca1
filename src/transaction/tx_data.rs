//! The mutable transaction under construction.

use bytes::Bytes;

use super::TxBuilderError;
use crate::{
    constants::TX_VERSION,
    fixed_hash::H256,
    molecule::Entity,
    types::{Capacity, CellDep, CellInput, CellOutput, Transaction, WitnessArgs},
};

/// Which field of a witness a mutation addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WitnessRole {
    /// The lock field, consumed by lock scripts.
    Lock,
    /// The input-type field.
    InputType,
    /// The output-type field.
    OutputType,
}

/// A transaction under construction.
///
/// The wire format keeps inputs, outputs, output data and witnesses as
/// parallel vectors; this type owns all of them behind mutation primitives
/// that keep the vectors aligned: deps deduplicate by value, every added
/// input brings an empty witness along, and witness fields are edited
/// through deserialize-set-reserialize rather than raw appends. Script
/// handlers receive `&mut TransactionData` and perform all their side
/// effects through these methods.
#[derive(Clone, Debug)]
pub struct TransactionData {
    version: u32,
    cell_deps: Vec<CellDep>,
    header_deps: Vec<H256>,
    inputs: Vec<CellInput>,
    outputs: Vec<CellOutput>,
    outputs_data: Vec<Bytes>,
    witnesses: Vec<Bytes>,
}

impl Default for TransactionData {
    fn default() -> Self {
        TransactionData {
            version: TX_VERSION,
            cell_deps: Vec::new(),
            header_deps: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            outputs_data: Vec::new(),
            witnesses: Vec::new(),
        }
    }
}

impl TransactionData {
    /// Adds a cell dep unless an equal one is present; returns its index.
    pub fn add_cell_dep(&mut self, cell_dep: CellDep) -> usize {
        if let Some(index) = self.cell_deps.iter().position(|dep| *dep == cell_dep) {
            return index;
        }
        self.cell_deps.push(cell_dep);
        self.cell_deps.len() - 1
    }

    /// Adds a header dep unless an equal one is present; returns its index.
    pub fn add_header_dep(&mut self, hash: H256) -> usize {
        if let Some(index) = self.header_deps.iter().position(|dep| *dep == hash) {
            return index;
        }
        self.header_deps.push(hash);
        self.header_deps.len() - 1
    }

    /// Appends an input together with its empty witness slot.
    pub fn add_input(&mut self, input: CellInput) {
        self.inputs.push(input);
        self.witnesses.push(Bytes::new());
    }

    /// Updates the `since` of an existing input.
    pub fn set_since(&mut self, index: usize, since: u64) -> Result<(), TxBuilderError> {
        let input = self
            .inputs
            .get_mut(index)
            .ok_or(TxBuilderError::IndexOutOfRange(index))?;
        input.since = since;
        Ok(())
    }

    /// Appends an output with its data.
    pub fn add_output(&mut self, output: CellOutput, data: Bytes) {
        self.outputs.push(output);
        self.outputs_data.push(data);
    }

    /// Replaces the data of an existing output.
    pub fn set_output_data(&mut self, index: usize, data: Bytes) -> Result<(), TxBuilderError> {
        if index >= self.outputs_data.len() {
            return Err(TxBuilderError::IndexOutOfRange(index));
        }
        self.outputs_data[index] = data;
        Ok(())
    }

    /// Updates the capacity of an existing output.
    pub fn set_output_capacity(
        &mut self,
        index: usize,
        capacity: Capacity,
    ) -> Result<(), TxBuilderError> {
        let output = self
            .outputs
            .get_mut(index)
            .ok_or(TxBuilderError::IndexOutOfRange(index))?;
        output.capacity = capacity;
        Ok(())
    }

    /// Sets one field of the witness at `index`, keeping the others.
    ///
    /// The existing witness is deserialized (an empty slot counts as an empty
    /// `WitnessArgs`), the addressed field replaced, and the result packed
    /// back, so repeated calls overwrite instead of append.
    pub fn set_witness(
        &mut self,
        index: usize,
        role: WitnessRole,
        data: Bytes,
    ) -> Result<(), TxBuilderError> {
        if index >= self.witnesses.len() {
            return Err(TxBuilderError::IndexOutOfRange(index));
        }
        let mut witness = if self.witnesses[index].is_empty() {
            WitnessArgs::default()
        } else {
            WitnessArgs::from_slice(&self.witnesses[index])?
        };
        match role {
            WitnessRole::Lock => witness.lock = Some(data),
            WitnessRole::InputType => witness.input_type = Some(data),
            WitnessRole::OutputType => witness.output_type = Some(data),
        }
        self.witnesses[index] = witness.to_bytes();
        Ok(())
    }

    /// Appends a trailing witness beyond the input-aligned ones.
    pub fn add_witness(&mut self, witness: Bytes) {
        self.witnesses.push(witness);
    }

    /// The inputs added so far.
    pub fn inputs(&self) -> &[CellInput] {
        &self.inputs
    }

    /// The outputs added so far.
    pub fn outputs(&self) -> &[CellOutput] {
        &self.outputs
    }

    /// The data of each output.
    pub fn outputs_data(&self) -> &[Bytes] {
        &self.outputs_data
    }

    /// The deduplicated cell deps.
    pub fn cell_deps(&self) -> &[CellDep] {
        &self.cell_deps
    }

    /// The deduplicated header deps.
    pub fn header_deps(&self) -> &[H256] {
        &self.header_deps
    }

    /// The witnesses, aligned with inputs.
    pub fn witnesses(&self) -> &[Bytes] {
        &self.witnesses
    }

    /// Number of outputs, the index the next `add_output` will get.
    pub fn outputs_len(&self) -> usize {
        self.outputs.len()
    }

    /// Snapshots the current state as an immutable transaction.
    pub fn build_tx_view(&self) -> Transaction {
        Transaction {
            version: self.version,
            cell_deps: self.cell_deps.clone(),
            header_deps: self.header_deps.clone(),
            inputs: self.inputs.clone(),
            outputs: self.outputs.clone(),
            outputs_data: self.outputs_data.clone(),
            witnesses: self.witnesses.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DepType, OutPoint, Script};

    fn dep(tag: u8) -> CellDep {
        CellDep::new(OutPoint::new(H256([tag; 32]), 0), DepType::DepGroup)
    }

    #[test]
    fn deps_dedup_by_value() {
        let mut data = TransactionData::default();
        assert_eq!(data.add_cell_dep(dep(1)), 0);
        assert_eq!(data.add_cell_dep(dep(2)), 1);
        assert_eq!(data.add_cell_dep(dep(1)), 0);
        assert_eq!(data.cell_deps().len(), 2);

        assert_eq!(data.add_header_dep(H256([9; 32])), 0);
        assert_eq!(data.add_header_dep(H256([9; 32])), 0);
        assert_eq!(data.header_deps().len(), 1);
    }

    #[test]
    fn inputs_and_witnesses_stay_aligned() {
        let mut data = TransactionData::default();
        data.add_input(CellInput::new(OutPoint::new(H256([1; 32]), 0), 0));
        data.add_input(CellInput::new(OutPoint::new(H256([2; 32]), 0), 0));
        assert_eq!(data.inputs().len(), data.witnesses().len());
    }

    #[test]
    fn set_witness_overwrites_one_field() {
        let mut data = TransactionData::default();
        data.add_input(CellInput::new(OutPoint::new(H256([1; 32]), 0), 0));
        data.set_witness(0, WitnessRole::Lock, vec![0u8; 65].into())
            .unwrap();
        data.set_witness(0, WitnessRole::InputType, vec![1, 2, 3].into())
            .unwrap();
        data.set_witness(0, WitnessRole::Lock, vec![7u8; 65].into())
            .unwrap();
        let witness = WitnessArgs::from_slice(&data.witnesses()[0]).unwrap();
        assert_eq!(witness.lock, Some(vec![7u8; 65].into()));
        assert_eq!(witness.input_type, Some(vec![1, 2, 3].into()));
        assert_eq!(witness.output_type, None);
    }

    #[test]
    fn index_mutations_check_bounds() {
        let mut data = TransactionData::default();
        data.add_output(
            CellOutput::new(Capacity::zero(), Script::default(), None),
            Bytes::new(),
        );
        assert!(data.set_output_data(0, Bytes::new()).is_ok());
        assert!(matches!(
            data.set_output_data(1, Bytes::new()),
            Err(TxBuilderError::IndexOutOfRange(1))
        ));
        assert!(matches!(
            data.set_since(0, 0),
            Err(TxBuilderError::IndexOutOfRange(0))
        ));
        assert!(matches!(
            data.set_witness(0, WitnessRole::Lock, Bytes::new()),
            Err(TxBuilderError::IndexOutOfRange(0))
        ));
    }
}
