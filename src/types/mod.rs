//! The core data model: scripts, cells, transactions and script groups.

mod capacity;
mod header;
mod script;
mod script_group;
mod since;
mod transaction;

pub use capacity::{Capacity, CapacityError, CapacityResult};
pub use header::Header;
pub use script::{Script, ScriptHashType};
pub use script_group::{ScriptGroup, ScriptGroupType};
pub use since::{EpochNumberWithFraction, Since, SinceMetric};
pub use transaction::{
    CellDep, CellInput, CellOutput, DepType, OutPoint, Transaction, WitnessArgs,
};
