//! Signer for the secp256k1-blake160 multisig-all lock.

use bytes::Bytes;

use super::{generate_signing_message_with, SignContext, Signer, SignerError};
use crate::{
    constants::{BLAKE160_SIZE, SECP_SIGNATURE_SIZE},
    molecule::Entity,
    transaction::handler::multisig::MultisigConfig,
    types::{ScriptGroup, ScriptGroupType, Transaction, WitnessArgs},
};

/// Fills one signature slot of the multisig witness per matching key.
///
/// Every co-signer hashes the same message, computed over the witness with
/// all slots zeroed, so signatures can arrive in any order and across
/// separate signing calls; each lands in the first slot that is still all
/// zero. A key outside the configuration is a no-op.
pub struct Secp256k1Blake160MultisigAllSigner;

/// Writes `signature` into the first all-zero slot after the config header;
/// `None` when every slot is taken.
fn fill_signature_slot(
    lock: &mut [u8],
    header_len: usize,
    threshold: u8,
    signature: &[u8],
) -> Option<()> {
    for slot in 0..threshold as usize {
        let start = header_len + slot * SECP_SIGNATURE_SIZE;
        let range = start..start + SECP_SIGNATURE_SIZE;
        if lock[range.clone()].iter().all(|byte| *byte == 0) {
            lock[range].copy_from_slice(signature);
            return Some(());
        }
    }
    None
}

/// Verifies the witness lock is the config header followed by exactly
/// `threshold` signature slots.
fn check_multisig_lock(
    witness: &WitnessArgs,
    config: &MultisigConfig,
) -> Result<Bytes, SignerError> {
    let lock = witness.lock.clone().ok_or_else(|| {
        SignerError::InvalidPlaceholder("missing multisig lock field".to_string())
    })?;
    let header = config.encode();
    let expected = header.len() + SECP_SIGNATURE_SIZE * config.threshold() as usize;
    if lock.len() != expected || lock[..header.len()] != header[..] {
        return Err(SignerError::InvalidPlaceholder(format!(
            "expect {} bytes starting with the multisig header, got {}",
            expected,
            lock.len()
        )));
    }
    Ok(lock)
}

impl Signer for Secp256k1Blake160MultisigAllSigner {
    fn sign_transaction(
        &self,
        tx: &mut Transaction,
        script_group: &ScriptGroup,
        context: &SignContext,
    ) -> Result<bool, SignerError> {
        let SignContext::Multisig { keys, config } = context else {
            return Ok(false);
        };
        if script_group.group_type != ScriptGroupType::Lock {
            return Err(SignerError::UnknownGroupType);
        }
        let args = &script_group.script.args;
        if args.len() != BLAKE160_SIZE || args.as_ref() != config.hash160().as_bytes() {
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
        let mut lock = check_multisig_lock(&witness, config)?.to_vec();

        // every signature covers the fully zeroed placeholder
        let mut message_witness = witness.clone();
        message_witness.lock = Some(config.placeholder_witness_lock());
        let message =
            generate_signing_message_with(tx, script_group, &message_witness.to_bytes())?;

        let header_len = config.encode().len();
        let mut signed = false;
        for key in keys {
            // a key outside the configuration never matches
            if !config.key_hashes().contains(&key.pubkey()?.blake160()) {
                continue;
            }
            let signature = key.sign_recoverable(&message)?;
            fill_signature_slot(&mut lock, header_len, config.threshold(), signature.as_bytes())
                .ok_or_else(|| {
                    SignerError::InvalidPlaceholder("no empty signature slot left".to_string())
                })?;
            signed = true;
        }
        if !signed {
            return Ok(false);
        }

        witness.lock = Some(lock.into());
        tx.witnesses[index] = witness.to_bytes();
        Ok(true)
    }
}
