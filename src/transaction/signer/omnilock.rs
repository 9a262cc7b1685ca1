//! Signer for the omnilock.

use bytes::Bytes;

use super::{
    generate_signing_message, generate_signing_message_with, SignContext, Signer, SignerError,
};
use crate::{
    constants::SECP_SIGNATURE_SIZE,
    crypto::Privkey,
    molecule::Entity,
    transaction::handler::omnilock::{IdentityFlag, OmniLockConfig, OmniLockWitnessLock},
    types::{ScriptGroup, ScriptGroupType, Transaction, WitnessArgs},
};

/// Mode-dispatches on the configuration: administrator mode emits the
/// identity proof with no signature; auth mode re-runs the single-sig or
/// multisig protocol with the signature nested inside
/// [`OmniLockWitnessLock`]. Any other auth flag fails explicitly.
pub struct OmniLockSigner;

impl Signer for OmniLockSigner {
    fn sign_transaction(
        &self,
        tx: &mut Transaction,
        script_group: &ScriptGroup,
        context: &SignContext,
    ) -> Result<bool, SignerError> {
        let SignContext::Omnilock { key, config } = context else {
            return Ok(false);
        };
        if script_group.group_type != ScriptGroupType::Lock {
            return Err(SignerError::UnknownGroupType);
        }
        let args = &script_group.script.args;
        let identity = config.identity().encode();
        if args.len() < identity.len() || args[..identity.len()] != identity[..] {
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

        if let Some(admin) = config.admin_identity() {
            // administrator mode carries the proof, nothing to sign
            let lock = OmniLockWitnessLock {
                omni_identity: Some(admin.clone()),
                ..Default::default()
            };
            witness.lock = Some(lock.to_bytes());
            tx.witnesses[index] = witness.to_bytes();
            return Ok(true);
        }

        match config.identity().flag {
            IdentityFlag::Ckb => {
                if config.identity().auth_content != key.pubkey()?.blake160() {
                    return Ok(false);
                }
                sign_single(tx, script_group, key, index, witness)
            }
            IdentityFlag::Multisig => sign_multisig(tx, script_group, key, config, index, witness),
            flag => Err(SignerError::UnsupportedAuthFlag(flag.into())),
        }
    }
}

fn parse_omni_lock(witness: &WitnessArgs) -> Result<OmniLockWitnessLock, SignerError> {
    let lock = witness.lock.as_ref().ok_or_else(|| {
        SignerError::InvalidPlaceholder("missing omnilock lock field".to_string())
    })?;
    Ok(OmniLockWitnessLock::from_slice(lock)?)
}

fn sign_single(
    tx: &mut Transaction,
    script_group: &ScriptGroup,
    key: &Privkey,
    index: usize,
    mut witness: WitnessArgs,
) -> Result<bool, SignerError> {
    let omni_lock = parse_omni_lock(&witness)?;
    match &omni_lock.signature {
        Some(signature) if signature.len() == SECP_SIGNATURE_SIZE => {}
        _ => {
            return Err(SignerError::InvalidPlaceholder(
                "expect a zeroed 65-byte omnilock signature".to_string(),
            ))
        }
    }

    // the placeholder is already zeroed, the current witness is the message
    let message = generate_signing_message(tx, script_group)?;
    let signature = key.sign_recoverable(&message)?;
    let lock = OmniLockWitnessLock {
        signature: Some(Bytes::copy_from_slice(signature.as_bytes())),
        ..Default::default()
    };
    witness.lock = Some(lock.to_bytes());
    tx.witnesses[index] = witness.to_bytes();
    Ok(true)
}

fn sign_multisig(
    tx: &mut Transaction,
    script_group: &ScriptGroup,
    key: &Privkey,
    config: &OmniLockConfig,
    index: usize,
    mut witness: WitnessArgs,
) -> Result<bool, SignerError> {
    let multisig_config = config
        .multisig_config()
        .ok_or(SignerError::MissingMultisigConfig)?;
    if !multisig_config
        .key_hashes()
        .contains(&key.pubkey()?.blake160())
    {
        return Ok(false);
    }

    let omni_lock = parse_omni_lock(&witness)?;
    let lock = omni_lock.signature.clone().ok_or_else(|| {
        SignerError::InvalidPlaceholder("missing omnilock multisig placeholder".to_string())
    })?;
    let header = multisig_config.encode();
    let expected = header.len() + SECP_SIGNATURE_SIZE * multisig_config.threshold() as usize;
    if lock.len() != expected || lock[..header.len()] != header[..] {
        return Err(SignerError::InvalidPlaceholder(format!(
            "expect {} bytes starting with the multisig header, got {}",
            expected,
            lock.len()
        )));
    }

    // hash the fully zeroed placeholder so co-signers agree on the message
    let zeroed = OmniLockWitnessLock {
        signature: Some(multisig_config.placeholder_witness_lock()),
        ..Default::default()
    };
    let mut message_witness = witness.clone();
    message_witness.lock = Some(zeroed.to_bytes());
    let message = generate_signing_message_with(tx, script_group, &message_witness.to_bytes())?;
    let signature = key.sign_recoverable(&message)?;

    let mut filled = lock.to_vec();
    let mut placed = false;
    for slot in 0..multisig_config.threshold() as usize {
        let start = header.len() + slot * SECP_SIGNATURE_SIZE;
        let range = start..start + SECP_SIGNATURE_SIZE;
        if filled[range.clone()].iter().all(|byte| *byte == 0) {
            filled[range].copy_from_slice(signature.as_bytes());
            placed = true;
            break;
        }
    }
    if !placed {
        return Err(SignerError::InvalidPlaceholder(
            "no empty signature slot left".to_string(),
        ));
    }
    let lock = OmniLockWitnessLock {
        signature: Some(filled.into()),
        ..Default::default()
    };
    witness.lock = Some(lock.to_bytes());
    tx.witnesses[index] = witness.to_bytes();
    Ok(true)
}
