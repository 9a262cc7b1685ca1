//! Transaction building: mutation primitives, script handlers, the
//! cell-selection/fee loop and signing.

use thiserror::Error;

use crate::{
    constants::NetworkType,
    dao::DaoError,
    molecule::VerificationError,
    types::{CapacityError, ScriptGroup, Transaction},
};

pub mod builder;
pub mod fee_calculator;
pub mod handler;
pub mod input;
pub mod signer;
pub mod tx_data;

pub use builder::{CkbTransactionBuilder, DaoClaimTransactionBuilder, SimpleTransactionBuilder};
pub use fee_calculator::FeeCalculator;
pub use input::{CellCollectorError, InputIterator, LiveCell, TransactionInput};
pub use tx_data::{TransactionData, WitnessRole};

use handler::{dao::DaoScriptHandler, multisig::Secp256k1Blake160MultisigAllScriptHandler,
    sighash::Secp256k1Blake160SighashAllScriptHandler, ScriptHandler};

/// The default fee rate in shannons per 1000 bytes.
pub const DEFAULT_FEE_RATE: u64 = 1000;

/// Errors surfaced while building a transaction.
#[derive(Error, Debug)]
pub enum TxBuilderError {
    /// The live-cell iterator ran dry before inputs covered outputs plus fee.
    #[error("insufficient capacity: collected {collected} shannons but {required} required")]
    InsufficientCapacity {
        /// Outputs plus fee (plus the change floor) at the last iteration.
        required: u64,
        /// Inputs plus reward collected so far.
        collected: u64,
    },
    /// A change output was registered twice.
    #[error("change output already set at index {0}")]
    ChangeAlreadySet(usize),
    /// `build` was called without a registered change output.
    #[error("no change output was registered before build")]
    NoChangeOutput,
    /// An index-addressed mutation pointed outside the vector.
    #[error("index {0} out of range")]
    IndexOutOfRange(usize),
    /// An existing witness failed to deserialize.
    #[error("witness: {0}")]
    Witness(#[from] VerificationError),
    /// Capacity arithmetic overflowed.
    #[error("capacity: {0}")]
    Capacity(#[from] CapacityError),
    /// DAO reward calculation failed.
    #[error("dao: {0}")]
    Dao(#[from] DaoError),
    /// The live-cell source failed.
    #[error("live cell source: {0}")]
    CellCollector(#[from] CellCollectorError),
    /// An omnilock configuration references an auth mode this crate does not
    /// build placeholders for.
    #[error("unsupported omnilock auth flag {0:#04x}")]
    UnsupportedAuthFlag(u8),
    /// An omnilock multisig identity without its multisig configuration.
    #[error("omnilock multisig configuration is missing")]
    MissingMultisigConfig,
    /// A script handler failed; the build is aborted and the builder must be
    /// discarded.
    #[error("script handler: {0}")]
    Handler(#[source] anyhow::Error),
}

/// Everything a builder produces: the transaction plus the script groups the
/// signers need.
#[derive(Clone, Debug)]
pub struct TransactionWithScriptGroups {
    tx_view: Transaction,
    script_groups: Vec<ScriptGroup>,
}

impl TransactionWithScriptGroups {
    /// Bundles a built transaction with its groups.
    pub fn new(tx_view: Transaction, script_groups: Vec<ScriptGroup>) -> Self {
        TransactionWithScriptGroups {
            tx_view,
            script_groups,
        }
    }

    /// The transaction.
    pub fn tx_view(&self) -> &Transaction {
        &self.tx_view
    }

    /// The script groups, lock groups first.
    pub fn script_groups(&self) -> &[ScriptGroup] {
        &self.script_groups
    }

    /// Splits into a mutable transaction and the groups describing it.
    pub(crate) fn parts_mut(&mut self) -> (&mut Transaction, &[ScriptGroup]) {
        (&mut self.tx_view, &self.script_groups)
    }

    /// Unwraps the transaction for broadcasting.
    pub fn into_tx_view(self) -> Transaction {
        self.tx_view
    }
}

/// Builder-wide configuration: the network, the fee rate and the registered
/// script handlers.
///
/// Constructed once, then treated as read-only; the handler list is consulted
/// in registration order for every (script group, context) pair.
pub struct TransactionBuilderConfiguration {
    network: NetworkType,
    fee_rate: u64,
    script_handlers: Vec<Box<dyn ScriptHandler>>,
}

impl TransactionBuilderConfiguration {
    /// A configuration with the genesis script handlers (sighash, multisig,
    /// DAO) registered.
    pub fn new(network: NetworkType) -> Self {
        let mut configuration = Self::new_with_empty_handlers(network);
        configuration.register_script_handler(Box::new(
            Secp256k1Blake160SighashAllScriptHandler::new(network),
        ));
        configuration.register_script_handler(Box::new(
            Secp256k1Blake160MultisigAllScriptHandler::new(network),
        ));
        configuration.register_script_handler(Box::new(DaoScriptHandler::new(network)));
        configuration
    }

    /// A configuration without any script handler, for callers wiring a
    /// custom set.
    pub fn new_with_empty_handlers(network: NetworkType) -> Self {
        TransactionBuilderConfiguration {
            network,
            fee_rate: DEFAULT_FEE_RATE,
            script_handlers: Vec::new(),
        }
    }

    /// Shorthand for [`Self::new`] on mainnet.
    pub fn new_mainnet() -> Self {
        Self::new(NetworkType::Mainnet)
    }

    /// Shorthand for [`Self::new`] on testnet.
    pub fn new_testnet() -> Self {
        Self::new(NetworkType::Testnet)
    }

    /// The network the configuration targets.
    pub fn network(&self) -> NetworkType {
        self.network
    }

    /// The fee rate in shannons per 1000 bytes.
    pub fn fee_rate(&self) -> u64 {
        self.fee_rate
    }

    /// Overrides the fee rate.
    pub fn set_fee_rate(&mut self, fee_rate: u64) {
        self.fee_rate = fee_rate;
    }

    /// Appends a handler; handlers run in registration order.
    pub fn register_script_handler(&mut self, handler: Box<dyn ScriptHandler>) {
        self.script_handlers.push(handler);
    }

    /// The registered handlers.
    pub fn get_script_handlers(&self) -> &[Box<dyn ScriptHandler>] {
        &self.script_handlers
    }

    /// A fee calculator for the configured rate.
    pub fn fee_calculator(&self) -> FeeCalculator {
        FeeCalculator::new(self.fee_rate)
    }
}
