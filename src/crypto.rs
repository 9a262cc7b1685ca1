//! Thin wrapper over secp256k1 recoverable signing.

use std::{fmt, str::FromStr};

use lazy_static::lazy_static;
use thiserror::Error;

use crate::{
    fixed_hash::{FromStrError, H160, H256},
    hash::blake2b_160,
};

/// A 32-byte digest to sign.
pub type Message = H256;

lazy_static! {
    /// The process-wide verification/signing context.
    pub static ref SECP256K1: secp256k1::Secp256k1<secp256k1::All> = secp256k1::Secp256k1::new();
}

/// Errors from key handling and signing.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// The underlying library rejected a key, message or signature.
    #[error("secp256k1: {0}")]
    Secp(#[from] secp256k1::Error),
    /// A recovery id outside 0..=3.
    #[error("invalid recovery id {0}")]
    InvalidRecoveryId(u8),
}

/// A secp256k1 private key.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Privkey {
    inner: H256,
}

impl Privkey {
    /// Wraps a 32-byte scalar; validity is checked on first use.
    pub fn from_slice(key: &[u8]) -> Self {
        assert_eq!(32, key.len(), "should provide 32-byte length slice");
        let mut h = H256::zero();
        h.0.copy_from_slice(&key[0..32]);
        Privkey { inner: h }
    }

    /// Signs `message`, producing a recoverable signature.
    pub fn sign_recoverable(&self, message: &Message) -> Result<Signature, CryptoError> {
        let context = &SECP256K1;
        let privkey = secp256k1::SecretKey::from_slice(self.inner.as_bytes())?;
        let message = secp256k1::Message::from_slice(message.as_bytes())?;
        let data = context.sign_ecdsa_recoverable(&message, &privkey);
        let (rec_id, data) = data.serialize_compact();
        Ok(Signature::from_compact(rec_id.to_i32() as u8, data))
    }

    /// Derives the public key.
    pub fn pubkey(&self) -> Result<Pubkey, CryptoError> {
        let privkey = secp256k1::SecretKey::from_slice(self.inner.as_bytes())?;
        Ok(Pubkey(secp256k1::PublicKey::from_secret_key(
            &SECP256K1, &privkey,
        )))
    }
}

impl From<H256> for Privkey {
    fn from(key: H256) -> Self {
        Privkey { inner: key }
    }
}

impl FromStr for Privkey {
    type Err = FromStrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(H256::from_str(s)?.into())
    }
}

/// A secp256k1 public key.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Pubkey(secp256k1::PublicKey);

impl Pubkey {
    /// The 33-byte compressed serialization.
    pub fn serialize(&self) -> [u8; 33] {
        self.0.serialize()
    }

    /// blake160 over the compressed serialization, the form lock args carry.
    pub fn blake160(&self) -> H160 {
        H160(blake2b_160(self.serialize()))
    }
}

/// A recoverable signature in the 65-byte r‖s‖v wire form.
#[derive(Clone)]
pub struct Signature([u8; 65]);

impl Signature {
    /// Assembles from the compact serialization plus recovery id.
    pub fn from_compact(rec_id: u8, data: [u8; 64]) -> Self {
        let mut sig = [0u8; 65];
        sig[0..64].copy_from_slice(&data);
        sig[64] = rec_id;
        Signature(sig)
    }

    /// Reads the wire form back.
    pub fn from_slice(data: &[u8]) -> Result<Self, CryptoError> {
        if data.len() != 65 {
            return Err(CryptoError::Secp(secp256k1::Error::InvalidSignature));
        }
        let mut sig = [0u8; 65];
        sig.copy_from_slice(data);
        Ok(Signature(sig))
    }

    /// The 65 wire bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0[..]
    }

    /// Recovers the signing public key for `message`.
    pub fn recover(&self, message: &Message) -> Result<Pubkey, CryptoError> {
        let rec_id = secp256k1::ecdsa::RecoveryId::from_i32(i32::from(self.0[64]))
            .map_err(|_| CryptoError::InvalidRecoveryId(self.0[64]))?;
        let signature = secp256k1::ecdsa::RecoverableSignature::from_compact(&self.0[..64], rec_id)?;
        let message = secp256k1::Message::from_slice(message.as_bytes())?;
        Ok(Pubkey(SECP256K1.recover_ecdsa(&message, &signature)?))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Signature(0x{})",
            faster_hex::hex_string(&self.0)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn random_privkey() -> Privkey {
        let mut data = [0u8; 32];
        loop {
            rand::thread_rng().fill(&mut data[..]);
            if secp256k1::SecretKey::from_slice(&data).is_ok() {
                return Privkey::from_slice(&data);
            }
        }
    }

    #[test]
    fn sign_and_recover() {
        let privkey = random_privkey();
        let message = H256([7u8; 32]);
        let signature = privkey.sign_recoverable(&message).unwrap();
        let recovered = signature.recover(&message).unwrap();
        assert_eq!(recovered, privkey.pubkey().unwrap());
    }

    #[test]
    fn signature_round_trips_wire_form() {
        let privkey = random_privkey();
        let message = H256([9u8; 32]);
        let signature = privkey.sign_recoverable(&message).unwrap();
        let restored = Signature::from_slice(signature.as_bytes()).unwrap();
        assert_eq!(restored.as_bytes(), signature.as_bytes());
    }
}
