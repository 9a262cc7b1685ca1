//! Script handlers: per-script strategies that prepare a transaction for
//! fee estimation.
//!
//! A handler recognizes the scripts it governs by exact code-hash equality
//! and contributes cell deps and witness placeholders through the
//! [`TransactionData`] mutation primitives, so the serialized size (and
//! therefore the fee) is already byte-accurate before any signature exists.
//! Handlers are invoked for every (script group, context) pair in
//! registration order and must be idempotent: the balance loop re-invokes
//! them each time a new input joins a group.

use std::any::Any;

use super::{tx_data::TransactionData, TxBuilderError};
use crate::types::ScriptGroup;

pub mod acp;
pub mod dao;
pub mod multisig;
pub mod omnilock;
pub mod sighash;

/// An opaque per-script context supplied by the caller for one build.
///
/// Handlers downcast to the concrete context type they understand and ignore
/// everything else.
pub trait HandlerContext: Any {
    /// Upcast for downcasting in handlers.
    fn as_any(&self) -> &dyn Any;
}

/// The contexts supplied to a single `build` call.
#[derive(Default)]
pub struct HandlerContexts {
    /// The contexts, tried in order for every handler.
    pub contexts: Vec<Box<dyn HandlerContext>>,
}

impl HandlerContexts {
    /// A single sighash context.
    pub fn new_sighash() -> Self {
        HandlerContexts {
            contexts: vec![Box::new(sighash::Secp256k1Blake160SighashAllScriptContext)],
        }
    }

    /// A single multisig context.
    pub fn new_multisig(config: multisig::MultisigConfig) -> Self {
        HandlerContexts {
            contexts: vec![Box::new(
                multisig::Secp256k1Blake160MultisigAllScriptContext::new(config),
            )],
        }
    }

    /// Appends another context.
    pub fn add_context(&mut self, context: Box<dyn HandlerContext>) {
        self.contexts.push(context);
    }
}

/// A strategy preparing script groups it recognizes.
pub trait ScriptHandler {
    /// Inspects `group` under `context`; returns `Ok(true)` iff the handler
    /// recognized both and mutated the transaction. All mutations go through
    /// the [`TransactionData`] primitives and must be idempotent. An error
    /// aborts the enclosing build with no rollback.
    fn build_transaction(
        &self,
        tx_data: &mut TransactionData,
        script_group: &ScriptGroup,
        context: &dyn HandlerContext,
    ) -> Result<bool, TxBuilderError>;
}
