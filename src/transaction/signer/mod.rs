//! The signer registry: per-script strategies producing valid witnesses.
//!
//! Signing happens after `build`: every group's witness already holds the
//! placeholder its handler sized, so the signature the signer writes back
//! never changes the serialized length. The signing message covers the
//! transaction hash, the placeholder-filled first witness of the group, the
//! remaining witnesses of the group's inputs, and every witness beyond the
//! input count, each length-prefixed with a little-endian `u64`.

use std::collections::HashMap;

use log::debug;
use thiserror::Error;

use super::{
    handler::{multisig::MultisigConfig, omnilock::OmniLockConfig},
    TransactionWithScriptGroups,
};
use crate::{
    constants::{self, NetworkType},
    crypto::{CryptoError, Message, Privkey},
    fixed_hash::H256,
    hash::new_blake2b,
    molecule::VerificationError,
    types::{ScriptGroup, ScriptGroupType, Transaction},
};

pub mod acp;
pub mod multisig;
pub mod omnilock;
pub mod sighash;

/// Errors surfaced while signing.
#[derive(Error, Debug)]
pub enum SignerError {
    /// A witness failed to deserialize; usually the handler step was
    /// skipped, so the placeholder is missing.
    #[error("witness: {0}")]
    Witness(#[from] VerificationError),
    /// The group violates its shape invariant.
    #[error("invalid script group: {0}")]
    InvalidScriptGroup(&'static str),
    /// A signer was dispatched for a group role it cannot sign.
    #[error("unknown script group type for this signer")]
    UnknownGroupType,
    /// The witness placeholder does not match what the configuration
    /// requires.
    #[error("witness placeholder missing or mismatched: {0}")]
    InvalidPlaceholder(String),
    /// An omnilock configuration selects an auth flavor this crate cannot
    /// sign.
    #[error("unsupported omnilock auth flag {0:#04x}")]
    UnsupportedAuthFlag(u8),
    /// An omnilock multisig identity without its multisig configuration.
    #[error("omnilock multisig configuration is missing")]
    MissingMultisigConfig,
    /// Key handling or signing failed.
    #[error("crypto: {0}")]
    Crypto(#[from] CryptoError),
}

/// One signing context: a private key plus whatever the script needs.
///
/// A closed sum so every signer matches exhaustively; scripts added through
/// [`TransactionSigner::register`] reuse these variants.
pub enum SignContext {
    /// A bare key, for sighash and anyone-can-pay locks.
    Sighash {
        /// The signing key.
        key: Privkey,
    },
    /// The locally held keys of a multisig configuration; keys outside the
    /// configuration are ignored, the rest each fill one signature slot.
    Multisig {
        /// The signing keys.
        keys: Vec<Privkey>,
        /// The configuration the lock args commit to.
        config: MultisigConfig,
    },
    /// A key unlocking an omnilock cell.
    Omnilock {
        /// The signing key.
        key: Privkey,
        /// The omnilock configuration.
        config: OmniLockConfig,
    },
}

/// The contexts supplied to one `sign_transaction` call, tried in order per
/// group.
#[derive(Default)]
pub struct SignContexts {
    /// The contexts.
    pub contexts: Vec<SignContext>,
}

impl SignContexts {
    /// A single sighash context.
    pub fn new_sighash(key: Privkey) -> Self {
        SignContexts {
            contexts: vec![SignContext::Sighash { key }],
        }
    }

    /// A multisig context over the locally held keys.
    pub fn new_multisig(keys: Vec<Privkey>, config: MultisigConfig) -> Self {
        SignContexts {
            contexts: vec![SignContext::Multisig { keys, config }],
        }
    }

    /// A single omnilock context.
    pub fn new_omnilock(key: Privkey, config: OmniLockConfig) -> Self {
        SignContexts {
            contexts: vec![SignContext::Omnilock { key, config }],
        }
    }

    /// Appends another context.
    pub fn add_context(&mut self, context: SignContext) {
        self.contexts.push(context);
    }
}

/// A per-script signing strategy.
pub trait Signer {
    /// Attempts to sign `group` with `context`; `Ok(false)` when the context
    /// does not match the group (wrong variant, wrong key), `Ok(true)` after
    /// writing the witness back.
    fn sign_transaction(
        &self,
        tx: &mut Transaction,
        script_group: &ScriptGroup,
        context: &SignContext,
    ) -> Result<bool, SignerError>;
}

/// The signing message for `group` with its first witness replaced by
/// `first_witness`, which lets multisig signers hash the fully zeroed
/// placeholder while the real witness already carries earlier signatures.
pub fn generate_signing_message_with(
    tx: &Transaction,
    script_group: &ScriptGroup,
    first_witness: &[u8],
) -> Result<Message, SignerError> {
    let mut indices = script_group.input_indices.iter();
    indices
        .next()
        .ok_or(SignerError::InvalidScriptGroup("lock group without inputs"))?;
    let tx_hash = tx.hash();
    let mut blake2b = new_blake2b();
    blake2b.update(tx_hash.as_bytes());
    blake2b.update(&(first_witness.len() as u64).to_le_bytes());
    blake2b.update(first_witness);
    for &index in indices {
        let witness = tx
            .witnesses
            .get(index)
            .ok_or(SignerError::InvalidScriptGroup("input without witness"))?;
        blake2b.update(&(witness.len() as u64).to_le_bytes());
        blake2b.update(witness);
    }
    for witness in tx.witnesses.iter().skip(tx.inputs.len()) {
        blake2b.update(&(witness.len() as u64).to_le_bytes());
        blake2b.update(witness);
    }
    let mut result = [0u8; 32];
    blake2b.finalize(&mut result);
    Ok(H256(result))
}

/// The signing message for `group` over its current witnesses.
pub fn generate_signing_message(
    tx: &Transaction,
    script_group: &ScriptGroup,
) -> Result<Message, SignerError> {
    let index = *script_group
        .input_indices
        .first()
        .ok_or(SignerError::InvalidScriptGroup("lock group without inputs"))?;
    let first_witness = tx
        .witnesses
        .get(index)
        .ok_or(SignerError::InvalidScriptGroup("input without witness"))?
        .clone();
    generate_signing_message_with(tx, script_group, &first_witness)
}

/// Dispatches script groups to registered signers.
///
/// Populated at construction and read-only afterwards; keys are
/// `blake2b_256(code_hash ‖ role_tag)`, so two scripts sharing a code hash
/// share a signer regardless of hash type.
pub struct TransactionSigner {
    signers: HashMap<H256, Box<dyn Signer>>,
}

impl TransactionSigner {
    /// A registry with the stock signers for `network`: sighash, multisig,
    /// anyone-can-pay and omnilock.
    pub fn new(network: NetworkType) -> Self {
        let mut signer = TransactionSigner {
            signers: HashMap::default(),
        };
        signer.register(
            *constants::CODE_HASH_SIGHASH_ALL,
            ScriptGroupType::Lock,
            Box::new(sighash::Secp256k1Blake160SighashAllSigner),
        );
        signer.register(
            *constants::CODE_HASH_MULTISIG_ALL,
            ScriptGroupType::Lock,
            Box::new(multisig::Secp256k1Blake160MultisigAllSigner),
        );
        signer.register(
            constants::acp_code_hash(network),
            ScriptGroupType::Lock,
            Box::new(acp::AnyoneCanPaySigner),
        );
        signer.register(
            constants::omnilock_code_hash(network),
            ScriptGroupType::Lock,
            Box::new(omnilock::OmniLockSigner),
        );
        signer
    }

    /// Registers `signer` for `(code_hash, group_type)`, replacing any
    /// previous registration for the same pair.
    pub fn register(
        &mut self,
        code_hash: H256,
        group_type: ScriptGroupType,
        signer: Box<dyn Signer>,
    ) {
        self.signers
            .insert(Self::registry_key(&code_hash, group_type), signer);
    }

    fn registry_key(code_hash: &H256, group_type: ScriptGroupType) -> H256 {
        let mut blake2b = new_blake2b();
        blake2b.update(code_hash.as_bytes());
        blake2b.update(&[group_type as u8]);
        let mut result = [0u8; 32];
        blake2b.finalize(&mut result);
        H256(result)
    }

    /// Signs every group a (signer, context) pair matches, returning the
    /// indices of the groups that were signed.
    ///
    /// A group without a registered signer, or matched by no context, is
    /// left unsigned without error; callers compare the returned list
    /// against the group count to decide whether the transaction is
    /// complete.
    pub fn sign_transaction(
        &self,
        tx_with_groups: &mut TransactionWithScriptGroups,
        contexts: &SignContexts,
    ) -> Result<Vec<usize>, SignerError> {
        let mut signed_groups = Vec::new();
        let (tx, script_groups) = tx_with_groups.parts_mut();
        for (index, script_group) in script_groups.iter().enumerate() {
            let key = Self::registry_key(&script_group.script.code_hash, script_group.group_type);
            let Some(signer) = self.signers.get(&key) else {
                debug!("no signer registered for group {}", index);
                continue;
            };
            for context in &contexts.contexts {
                if signer.sign_transaction(tx, script_group, context)? {
                    signed_groups.push(index);
                    break;
                }
            }
        }
        Ok(signed_groups)
    }
}
