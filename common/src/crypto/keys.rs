use crate::serializer::{Reader, ReaderError, Serializer, Writer};
use ed25519_dalek::{Signer as DalekSigner, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::de::Error as SerdeError;
use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

pub const KEY_SIZE: usize = 32;
pub const SIGNATURE_SIZE: usize = 64;

// Account identity on the ledger: a compressed ed25519 verifying key
#[derive(Eq, PartialEq, PartialOrd, Ord, Hash, Clone, Debug)]
pub struct PublicKey([u8; KEY_SIZE]);

impl PublicKey {
    pub const fn new(bytes: [u8; KEY_SIZE]) -> Self {
        PublicKey(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    // Verify a signature over raw message bytes
    // An invalid key encoding verifies nothing
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        let Ok(key) = VerifyingKey::from_bytes(&self.0) else {
            return false;
        };
        let signature = ed25519_dalek::Signature::from_bytes(&signature.0);
        key.verify(message, &signature).is_ok()
    }
}

impl FromStr for PublicKey {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| "Invalid hex string")?;
        let bytes: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| "Invalid public key")?;
        Ok(PublicKey::new(bytes))
    }
}

impl Display for PublicKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serializer for PublicKey {
    fn write(&self, writer: &mut Writer) {
        writer.write_bytes(&self.0);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        Ok(PublicKey::new(reader.read_bytes_32()?))
    }

    fn size(&self) -> usize {
        KEY_SIZE
    }
}

impl Serialize for PublicKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'a> Deserialize<'a> for PublicKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'a>,
    {
        let hex = String::deserialize(deserializer)?;
        PublicKey::from_str(&hex).map_err(SerdeError::custom)
    }
}

#[derive(Eq, PartialEq, Clone, Debug)]
pub struct Signature([u8; SIGNATURE_SIZE]);

impl Signature {
    pub const fn new(bytes: [u8; SIGNATURE_SIZE]) -> Self {
        Signature(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serializer for Signature {
    fn write(&self, writer: &mut Writer) {
        writer.write_bytes(&self.0);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        Ok(Signature::new(reader.read_bytes_64()?))
    }

    fn size(&self) -> usize {
        SIGNATURE_SIZE
    }
}

impl Serialize for Signature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'a> Deserialize<'a> for Signature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'a>,
    {
        let hex = String::deserialize(deserializer)?;
        let bytes = hex::decode(hex).map_err(SerdeError::custom)?;
        let bytes: [u8; SIGNATURE_SIZE] = bytes
            .try_into()
            .map_err(|_| SerdeError::custom("Invalid signature length"))?;
        Ok(Signature::new(bytes))
    }
}

// Signing key held by the local reference signer
// Never serialized; secret material stays in this process
pub struct KeyPair {
    secret: SigningKey,
}

impl KeyPair {
    pub fn new() -> Self {
        KeyPair {
            secret: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn from_seed(seed: [u8; KEY_SIZE]) -> Self {
        KeyPair {
            secret: SigningKey::from_bytes(&seed),
        }
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::new(self.secret.verifying_key().to_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature::new(self.secret.sign(message).to_bytes())
    }
}

impl Default for KeyPair {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify() {
        let keypair = KeyPair::new();
        let signature = keypair.sign(b"payload");
        assert!(keypair.public_key().verify(b"payload", &signature));
        assert!(!keypair.public_key().verify(b"tampered", &signature));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let keypair = KeyPair::new();
        let other = KeyPair::new();
        let signature = keypair.sign(b"payload");
        assert!(!other.public_key().verify(b"payload", &signature));
    }

    #[test]
    fn test_from_seed_is_deterministic() {
        let a = KeyPair::from_seed([7; KEY_SIZE]);
        let b = KeyPair::from_seed([7; KEY_SIZE]);
        assert_eq!(a.public_key(), b.public_key());
    }
}
