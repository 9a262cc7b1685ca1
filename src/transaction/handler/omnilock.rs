//! The omnilock: identity model, witness structures and the script handler.
//!
//! Omnilock args start with a 21-byte identity (one auth-flag byte plus 20
//! bytes of auth content) followed by an omni-flags byte and optional mode
//! fields. The witness lock field is not a bare signature but the
//! `OmniLockWitnessLock` table below. This crate signs the CKB single-sig
//! and CKB multisig auth flavors and builds administrator-mode witnesses;
//! every other auth flag fails explicitly.

use bytes::Bytes;

use super::{multisig::MultisigConfig, HandlerContext, ScriptHandler};
use crate::{
    constants::{self, NetworkType, SECP_SIGNATURE_SIZE},
    fixed_hash::{H160, H256},
    molecule::{
        build_bytes, build_dynvec, parse_bytes, parse_dynvec, parse_table, Entity,
        VerificationError, VerificationResult,
    },
    transaction::{tx_data::TransactionData, TxBuilderError, WitnessRole},
    types::{CellDep, ScriptGroup},
};

/// The auth flavor an omnilock identity selects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdentityFlag {
    /// CKB secp256k1-blake160 single-sig.
    Ckb = 0x00,
    /// Ethereum keccak160.
    Ethereum = 0x01,
    /// EOS.
    Eos = 0x02,
    /// TRON.
    Tron = 0x03,
    /// Bitcoin.
    Bitcoin = 0x04,
    /// Dogecoin.
    Dogecoin = 0x05,
    /// CKB multisig.
    Multisig = 0x06,
    /// Unlock by owning another lock's cell.
    OwnerLock = 0xFC,
    /// Unlock via an exec'd auth binary.
    Exec = 0xFD,
    /// Unlock via a dynamically linked auth library.
    DynamicLinking = 0xFE,
}

impl IdentityFlag {
    /// Decodes the wire byte, `None` for values outside the enum.
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0x00 => Some(IdentityFlag::Ckb),
            0x01 => Some(IdentityFlag::Ethereum),
            0x02 => Some(IdentityFlag::Eos),
            0x03 => Some(IdentityFlag::Tron),
            0x04 => Some(IdentityFlag::Bitcoin),
            0x05 => Some(IdentityFlag::Dogecoin),
            0x06 => Some(IdentityFlag::Multisig),
            0xFC => Some(IdentityFlag::OwnerLock),
            0xFD => Some(IdentityFlag::Exec),
            0xFE => Some(IdentityFlag::DynamicLinking),
            _ => None,
        }
    }
}

impl From<IdentityFlag> for u8 {
    fn from(flag: IdentityFlag) -> u8 {
        flag as u8
    }
}

/// The 21-byte identity at the front of omnilock args.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    /// The auth flavor.
    pub flag: IdentityFlag,
    /// Flavor-specific auth content, e.g. a blake160 key hash.
    pub auth_content: H160,
}

impl Identity {
    /// An identity.
    pub fn new(flag: IdentityFlag, auth_content: H160) -> Self {
        Identity { flag, auth_content }
    }

    /// The wire form: flag byte plus content.
    pub fn encode(&self) -> [u8; 21] {
        let mut ret = [0u8; 21];
        ret[0] = self.flag.into();
        ret[1..].copy_from_slice(self.auth_content.as_bytes());
        ret
    }
}

/// One sparse-merkle-tree proof entry of an administrator identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SmtProofEntry {
    /// Which of the input/output trees the proof addresses.
    pub mask: u8,
    /// The serialized proof.
    pub proof: Bytes,
}

impl Entity for SmtProofEntry {
    const NAME: &'static str = "SmtProofEntry";

    fn to_bytes(&self) -> Bytes {
        build_dynvec(&[Bytes::copy_from_slice(&[self.mask]), build_bytes(&self.proof)])
    }

    fn from_slice(slice: &[u8]) -> VerificationResult<Self> {
        let fields = parse_table(Self::NAME, slice, 2)?;
        if fields[0].len() != 1 {
            return Err(VerificationError::TotalSizeNotMatch(
                Self::NAME,
                1,
                fields[0].len(),
            ));
        }
        Ok(SmtProofEntry {
            mask: fields[0][0],
            proof: Bytes::copy_from_slice(parse_bytes(Self::NAME, fields[1])?),
        })
    }
}

/// An administrator identity with its membership proofs, the structure the
/// witness carries in administrator mode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdminIdentity {
    /// The administrator's identity.
    pub identity: Identity,
    /// Proofs that the identity is in the administrator SMT.
    pub proofs: Vec<SmtProofEntry>,
}

impl AdminIdentity {
    /// Bundles an identity with its proofs.
    pub fn new(identity: Identity, proofs: Vec<SmtProofEntry>) -> Self {
        AdminIdentity { identity, proofs }
    }
}

impl Entity for AdminIdentity {
    const NAME: &'static str = "Identity";

    fn to_bytes(&self) -> Bytes {
        build_dynvec(&[
            Bytes::copy_from_slice(&self.identity.encode()),
            build_dynvec(&self.proofs.iter().map(Entity::to_bytes).collect::<Vec<_>>()),
        ])
    }

    fn from_slice(slice: &[u8]) -> VerificationResult<Self> {
        let fields = parse_table(Self::NAME, slice, 2)?;
        if fields[0].len() != 21 {
            return Err(VerificationError::TotalSizeNotMatch(
                Self::NAME,
                21,
                fields[0].len(),
            ));
        }
        let flag = IdentityFlag::from_u8(fields[0][0]).ok_or_else(|| {
            VerificationError::InvalidData(Self::NAME, format!("unknown flag {}", fields[0][0]))
        })?;
        let mut auth_content = [0u8; 20];
        auth_content.copy_from_slice(&fields[0][1..]);
        let proofs = parse_dynvec("SmtProofEntryVec", fields[1])?
            .into_iter()
            .map(SmtProofEntry::from_slice)
            .collect::<VerificationResult<Vec<_>>>()?;
        Ok(AdminIdentity {
            identity: Identity::new(flag, H160(auth_content)),
            proofs,
        })
    }
}

/// The structured content of an omnilock witness lock field.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OmniLockWitnessLock {
    /// The signature for auth modes.
    pub signature: Option<Bytes>,
    /// The administrator identity proof for administrator mode.
    pub omni_identity: Option<AdminIdentity>,
    /// The preimage for the hashed flavors; unused here.
    pub preimage: Option<Bytes>,
}

impl Entity for OmniLockWitnessLock {
    const NAME: &'static str = "OmniLockWitnessLock";

    fn to_bytes(&self) -> Bytes {
        let pack_opt = |field: &Option<Bytes>| match field {
            Some(data) => build_bytes(data),
            None => Bytes::new(),
        };
        build_dynvec(&[
            pack_opt(&self.signature),
            self.omni_identity
                .as_ref()
                .map(Entity::to_bytes)
                .unwrap_or_default(),
            pack_opt(&self.preimage),
        ])
    }

    fn from_slice(slice: &[u8]) -> VerificationResult<Self> {
        let fields = parse_table(Self::NAME, slice, 3)?;
        let parse_opt = |field: &[u8]| -> VerificationResult<Option<Bytes>> {
            if field.is_empty() {
                Ok(None)
            } else {
                parse_bytes(Self::NAME, field).map(|data| Some(Bytes::copy_from_slice(data)))
            }
        };
        let omni_identity = if fields[1].is_empty() {
            None
        } else {
            Some(AdminIdentity::from_slice(fields[1])?)
        };
        Ok(OmniLockWitnessLock {
            signature: parse_opt(fields[0])?,
            omni_identity,
            preimage: parse_opt(fields[2])?,
        })
    }
}

/// A caller's omnilock configuration: the identity plus whatever the mode
/// needs.
#[derive(Clone, Debug)]
pub struct OmniLockConfig {
    identity: Identity,
    multisig_config: Option<MultisigConfig>,
    admin_identity: Option<AdminIdentity>,
}

impl OmniLockConfig {
    /// A CKB single-sig identity over a blake160 key hash.
    pub fn new_pubkey_hash(hash: H160) -> Self {
        OmniLockConfig {
            identity: Identity::new(IdentityFlag::Ckb, hash),
            multisig_config: None,
            admin_identity: None,
        }
    }

    /// A CKB multisig identity over a multisig configuration.
    pub fn new_multisig(config: MultisigConfig) -> Self {
        OmniLockConfig {
            identity: Identity::new(IdentityFlag::Multisig, config.hash160()),
            multisig_config: Some(config),
            admin_identity: None,
        }
    }

    /// An arbitrary identity, for flags this crate cannot sign itself.
    pub fn new(identity: Identity) -> Self {
        OmniLockConfig {
            identity,
            multisig_config: None,
            admin_identity: None,
        }
    }

    /// Switches the configuration into administrator mode.
    pub fn set_admin_identity(&mut self, admin: AdminIdentity) {
        self.admin_identity = Some(admin);
    }

    /// The identity the lock args carry.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The multisig configuration behind a [`IdentityFlag::Multisig`]
    /// identity.
    pub fn multisig_config(&self) -> Option<&MultisigConfig> {
        self.multisig_config.as_ref()
    }

    /// The administrator identity, when in administrator mode.
    pub fn admin_identity(&self) -> Option<&AdminIdentity> {
        self.admin_identity.as_ref()
    }

    /// The witness lock this configuration will occupy once signed, with all
    /// signature bytes zeroed; its serialized length is what the fee loop
    /// measures.
    pub fn placeholder_witness_lock(&self) -> Result<Bytes, TxBuilderError> {
        if let Some(admin) = &self.admin_identity {
            let lock = OmniLockWitnessLock {
                omni_identity: Some(admin.clone()),
                ..Default::default()
            };
            return Ok(lock.to_bytes());
        }
        let signature = match self.identity.flag {
            IdentityFlag::Ckb => Bytes::from(vec![0u8; SECP_SIGNATURE_SIZE]),
            IdentityFlag::Multisig => self
                .multisig_config
                .as_ref()
                .ok_or(TxBuilderError::MissingMultisigConfig)?
                .placeholder_witness_lock(),
            flag => return Err(TxBuilderError::UnsupportedAuthFlag(flag.into())),
        };
        let lock = OmniLockWitnessLock {
            signature: Some(signature),
            ..Default::default()
        };
        Ok(lock.to_bytes())
    }
}

/// Marks a build as spending omnilock cells under one configuration.
pub struct OmniLockScriptContext {
    /// The configuration whose identity the lock args carry.
    pub config: OmniLockConfig,
}

impl OmniLockScriptContext {
    /// Wraps a configuration.
    pub fn new(config: OmniLockConfig) -> Self {
        OmniLockScriptContext { config }
    }
}

impl HandlerContext for OmniLockScriptContext {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Adds the deployment's cell deps and a mode-sized witness placeholder.
///
/// Omnilock is deployed outside genesis, so the deps are taken at
/// construction.
pub struct OmniLockScriptHandler {
    code_hash: H256,
    cell_deps: Vec<CellDep>,
}

impl OmniLockScriptHandler {
    /// A handler for an explicit deployment.
    pub fn new(code_hash: H256, cell_deps: Vec<CellDep>) -> Self {
        OmniLockScriptHandler {
            code_hash,
            cell_deps,
        }
    }

    /// A handler for the well-known deployment of `network`, given its deps.
    pub fn new_with_network(network: NetworkType, cell_deps: Vec<CellDep>) -> Self {
        Self::new(constants::omnilock_code_hash(network), cell_deps)
    }

    fn is_match(&self, group: &ScriptGroup) -> bool {
        group.script.code_hash == self.code_hash
    }
}

impl ScriptHandler for OmniLockScriptHandler {
    fn build_transaction(
        &self,
        tx_data: &mut TransactionData,
        script_group: &ScriptGroup,
        context: &dyn HandlerContext,
    ) -> Result<bool, TxBuilderError> {
        let Some(context) = context.as_any().downcast_ref::<OmniLockScriptContext>() else {
            return Ok(false);
        };
        if !self.is_match(script_group) {
            return Ok(false);
        }
        for cell_dep in &self.cell_deps {
            tx_data.add_cell_dep(cell_dep.clone());
        }
        if let Some(&index) = script_group.input_indices.first() {
            tx_data.set_witness(
                index,
                WitnessRole::Lock,
                context.config.placeholder_witness_lock()?,
            )?;
        }
        Ok(true)
    }
}
