//! Live cells and the input iterator feeding the balance loop.

use std::collections::VecDeque;

use bytes::Bytes;
use thiserror::Error;

use crate::types::{CellInput, CellOutput, OutPoint};

/// An unspent cell as reported by the live-cell collaborator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LiveCell {
    /// Where the cell lives.
    pub out_point: OutPoint,
    /// The cell itself.
    pub output: CellOutput,
    /// The cell's data.
    pub output_data: Bytes,
}

/// A live cell selected for spending, together with its timelock.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionInput {
    /// The cell to consume.
    pub live_cell: LiveCell,
    /// The raw `since` value the input will carry.
    pub since: u64,
}

impl TransactionInput {
    /// Pairs a live cell with a `since` value.
    pub fn new(live_cell: LiveCell, since: u64) -> Self {
        TransactionInput { live_cell, since }
    }

    /// The input as it appears in the transaction.
    pub fn cell_input(&self) -> CellInput {
        CellInput::new(self.live_cell.out_point.clone(), self.since)
    }

    /// The consumed cell.
    pub fn previous_output(&self) -> &CellOutput {
        &self.live_cell.output
    }
}

/// Failure of the external live-cell source.
#[derive(Error, Debug)]
pub enum CellCollectorError {
    /// Whatever the collaborator reported, opaque at this boundary.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// The cell feed for one build: customized, pre-supplied inputs are consumed
/// first, then the pluggable live-cell source.
///
/// The source is the external collaborator boundary; each `next` may block on
/// a remote query. Filtering (by lock, by absence of a type script) is the
/// source's responsibility.
pub struct InputIterator {
    customized_inputs: VecDeque<TransactionInput>,
    source: Option<Box<dyn Iterator<Item = Result<TransactionInput, CellCollectorError>>>>,
}

impl InputIterator {
    /// An iterator over a live-cell source.
    pub fn new(source: Box<dyn Iterator<Item = Result<TransactionInput, CellCollectorError>>>) -> Self {
        InputIterator {
            customized_inputs: VecDeque::new(),
            source: Some(source),
        }
    }

    /// An iterator over a fixed set of inputs, no fallback source.
    pub fn new_with_inputs(inputs: Vec<TransactionInput>) -> Self {
        InputIterator {
            customized_inputs: inputs.into(),
            source: None,
        }
    }

    /// Queues an input to be consumed before the source is consulted.
    pub fn push_customized_input(&mut self, input: TransactionInput) {
        self.customized_inputs.push_back(input);
    }
}

impl Iterator for InputIterator {
    type Item = Result<TransactionInput, CellCollectorError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(input) = self.customized_inputs.pop_front() {
            return Some(Ok(input));
        }
        self.source.as_mut().and_then(|source| source.next())
    }
}
