//! Cells, out points, deps and the transaction itself.

use bytes::Bytes;

use crate::{
    fixed_hash::H256,
    hash::blake2b_256,
    molecule::{self, Entity},
    types::{Capacity, CapacityResult, Script},
};

/// The `u32` offset prefix a transaction carries inside a block's
/// transaction vector; counted into the size used for fee estimation.
pub(crate) const SERIALIZED_OFFSET_BYTES: usize = 4;

/// Identifies a cell by the transaction that created it and the output index.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct OutPoint {
    /// Hash of the creating transaction.
    pub tx_hash: H256,
    /// Index into that transaction's outputs.
    pub index: u32,
}

impl OutPoint {
    /// Constructs an out point.
    pub fn new(tx_hash: H256, index: u32) -> Self {
        OutPoint { tx_hash, index }
    }
}

/// How a cell dep is interpreted when resolving scripts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DepType {
    /// The dep cell's data is the code itself.
    #[default]
    Code = 0,
    /// The dep cell's data is a vector of out points to expand.
    DepGroup = 1,
}

impl DepType {
    /// Decodes the wire byte, `None` for values outside the enum.
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(DepType::Code),
            1 => Some(DepType::DepGroup),
            _ => None,
        }
    }
}

impl From<DepType> for u8 {
    fn from(t: DepType) -> u8 {
        t as u8
    }
}

/// A dependency cell the transaction references for code or data.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct CellDep {
    /// The dep cell.
    pub out_point: OutPoint,
    /// Plain code cell or dep group.
    pub dep_type: DepType,
}

impl CellDep {
    /// Constructs a cell dep.
    pub fn new(out_point: OutPoint, dep_type: DepType) -> Self {
        CellDep {
            out_point,
            dep_type,
        }
    }
}

/// A consumed cell reference plus its timelock.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct CellInput {
    /// The `since` timelock; see [`Since`](crate::types::Since).
    pub since: u64,
    /// The cell being spent.
    pub previous_output: OutPoint,
}

impl CellInput {
    /// Constructs an input spending `previous_output` under `since`.
    pub fn new(previous_output: OutPoint, since: u64) -> Self {
        CellInput {
            since,
            previous_output,
        }
    }
}

/// A created cell: capacity plus the scripts guarding it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CellOutput {
    /// The cell's value in shannons, which also pays its storage rent.
    pub capacity: Capacity,
    /// Required lock script gating the spend.
    pub lock: Script,
    /// Optional type script governing the cell data.
    pub type_: Option<Script>,
}

impl CellOutput {
    /// Constructs an output.
    pub fn new(capacity: Capacity, lock: Script, type_: Option<Script>) -> Self {
        CellOutput {
            capacity,
            lock,
            type_,
        }
    }

    /// The minimum capacity this cell must carry: 8 bytes for the capacity
    /// field itself, the data, and both scripts.
    pub fn occupied_capacity(&self, data_capacity: Capacity) -> CapacityResult<Capacity> {
        Capacity::bytes(8)
            .and_then(|x| x.safe_add(data_capacity))
            .and_then(|x| self.lock.occupied_capacity().and_then(|y| y.safe_add(x)))
            .and_then(|x| {
                self.type_
                    .as_ref()
                    .map(Script::occupied_capacity)
                    .transpose()
                    .and_then(|y| y.unwrap_or_else(Capacity::zero).safe_add(x))
            })
    }

    /// Whether `capacity` is below the occupied floor.
    pub fn is_lack_of_capacity(&self, data_capacity: Capacity) -> CapacityResult<bool> {
        self.occupied_capacity(data_capacity)
            .map(|occupied| occupied > self.capacity)
    }
}

/// A full transaction.
///
/// The parallel vectors mirror the wire format: `outputs_data[i]` belongs to
/// `outputs[i]`, and once signing begins `witnesses` has at least one entry
/// per input. The [`TransactionData`](crate::transaction::TransactionData)
/// mutation layer maintains those invariants while building.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transaction {
    /// Format version, currently 0.
    pub version: u32,
    /// Referenced dep cells.
    pub cell_deps: Vec<CellDep>,
    /// Referenced block header hashes.
    pub header_deps: Vec<H256>,
    /// Consumed cells.
    pub inputs: Vec<CellInput>,
    /// Created cells.
    pub outputs: Vec<CellOutput>,
    /// Data carried by each created cell.
    pub outputs_data: Vec<Bytes>,
    /// Per-input auxiliary data, not covered by the transaction hash.
    pub witnesses: Vec<Bytes>,
}

impl Transaction {
    /// The transaction hash: blake2b over the raw part, witnesses excluded.
    pub fn hash(&self) -> H256 {
        H256(blake2b_256(molecule::pack_raw_transaction(self)))
    }

    /// Hash over the full serialization, witnesses included.
    pub fn witness_hash(&self) -> H256 {
        H256(blake2b_256(self.to_bytes()))
    }

    /// The size this transaction occupies inside a block, the quantity fees
    /// are charged on.
    pub fn serialized_size_in_block(&self) -> usize {
        self.to_bytes().len() + SERIALIZED_OFFSET_BYTES
    }

    /// Sums the output capacities.
    pub fn outputs_capacity(&self) -> CapacityResult<Capacity> {
        self.outputs
            .iter()
            .map(|output| output.capacity)
            .try_fold(Capacity::zero(), Capacity::safe_add)
    }
}

/// The structured content of one witness entry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WitnessArgs {
    /// Consumed by the lock script, typically a signature.
    pub lock: Option<Bytes>,
    /// Consumed by the type script when running on inputs.
    pub input_type: Option<Bytes>,
    /// Consumed by the type script when running on outputs.
    pub output_type: Option<Bytes>,
}

impl WitnessArgs {
    /// A witness args with only the lock field set.
    pub fn new_lock(lock: Bytes) -> Self {
        WitnessArgs {
            lock: Some(lock),
            ..Default::default()
        }
    }

    /// Whether all three fields are absent.
    pub fn is_empty(&self) -> bool {
        self.lock.is_none() && self.input_type.is_none() && self.output_type.is_none()
    }
}
