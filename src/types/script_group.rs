//! Script groups: the per-script partition of a transaction.

use crate::types::Script;

/// Whether a group collects cells by their lock or their type script.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScriptGroupType {
    /// Grouped by lock script.
    Lock = 0,
    /// Grouped by type script.
    Type = 1,
}

/// The inputs and outputs governed by one script instance.
///
/// Groups are created by the builder during `build()`, keyed by the script
/// hash so no two groups for the same script coexist, and consumed by both
/// script handlers and signers. A lock group always has at least one input
/// index; a type group has at least one index on either side.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptGroup {
    /// The script all listed cells share.
    pub script: Script,
    /// Lock or type.
    pub group_type: ScriptGroupType,
    /// Indices into the transaction's inputs.
    pub input_indices: Vec<usize>,
    /// Indices into the transaction's outputs.
    pub output_indices: Vec<usize>,
}

impl ScriptGroup {
    /// A fresh, empty group for a lock script.
    pub fn from_lock_script(script: &Script) -> Self {
        ScriptGroup {
            script: script.clone(),
            group_type: ScriptGroupType::Lock,
            input_indices: Vec::new(),
            output_indices: Vec::new(),
        }
    }

    /// A fresh, empty group for a type script.
    pub fn from_type_script(script: &Script) -> Self {
        ScriptGroup {
            script: script.clone(),
            group_type: ScriptGroupType::Type,
            input_indices: Vec::new(),
            output_indices: Vec::new(),
        }
    }
}
