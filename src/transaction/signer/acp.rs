//! Signer for the anyone-can-pay lock.

use bytes::Bytes;

use super::{generate_signing_message, SignContext, Signer, SignerError};
use crate::{
    constants::{BLAKE160_SIZE, SECP_SIGNATURE_SIZE},
    molecule::Entity,
    types::{ScriptGroup, ScriptGroupType, Transaction, WitnessArgs},
};

/// Same signature math as the sighash lock, but the key hash is only the
/// first 20 bytes of the args; trailing bytes are minimum-transfer limits
/// the on-chain script interprets and the signer ignores.
pub struct AnyoneCanPaySigner;

impl Signer for AnyoneCanPaySigner {
    fn sign_transaction(
        &self,
        tx: &mut Transaction,
        script_group: &ScriptGroup,
        context: &SignContext,
    ) -> Result<bool, SignerError> {
        let SignContext::Sighash { key } = context else {
            return Ok(false);
        };
        if script_group.group_type != ScriptGroupType::Lock {
            return Err(SignerError::UnknownGroupType);
        }
        let args = &script_group.script.args;
        if args.len() < BLAKE160_SIZE {
            return Ok(false);
        }
        if args[..BLAKE160_SIZE] != key.pubkey()?.blake160().as_bytes()[..] {
            return Ok(false);
        }

        let index = *script_group
            .input_indices
            .first()
            .ok_or(SignerError::InvalidScriptGroup("lock group without inputs"))?;
        let witness_bytes = tx
            .witnesses
            .get(index)
            .ok_or(SignerError::InvalidScriptGroup("input without witness"))?;
        let mut witness = WitnessArgs::from_slice(witness_bytes)?;
        match &witness.lock {
            Some(lock) if lock.len() == SECP_SIGNATURE_SIZE => {}
            _ => {
                return Err(SignerError::InvalidPlaceholder(
                    "expect a zeroed 65-byte lock field".to_string(),
                ))
            }
        }

        let message = generate_signing_message(tx, script_group)?;
        let signature = key.sign_recoverable(&message)?;
        witness.lock = Some(Bytes::copy_from_slice(signature.as_bytes()));
        tx.witnesses[index] = witness.to_bytes();
        Ok(true)
    }
}
