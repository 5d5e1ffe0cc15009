//! Credential boundary
//!
//! Signing is delegated to whatever holds the account key: a wallet, a
//! hardware device, or the in-process `LocalSigner` below. The client
//! never sees private key material through this trait.

use async_trait::async_trait;
use docstore_common::{
    call::{CallDescriptor, SignedCall},
    crypto::{KeyPair, PublicKey},
    serializer::Serializer,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignerError {
    #[error("signing request was refused: {0}")]
    Refused(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[async_trait]
pub trait CallSigner: Send + Sync {
    fn public_key(&self) -> PublicKey;

    async fn sign(&self, descriptor: &CallDescriptor) -> Result<SignedCall, SignerError>;
}

/// Keypair-backed reference signer
pub struct LocalSigner {
    keypair: KeyPair,
}

impl LocalSigner {
    pub fn new(keypair: KeyPair) -> Self {
        LocalSigner { keypair }
    }
}

#[async_trait]
impl CallSigner for LocalSigner {
    fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }

    async fn sign(&self, descriptor: &CallDescriptor) -> Result<SignedCall, SignerError> {
        // A descriptor bound to another account must never be signed here
        if *descriptor.caller() != self.keypair.public_key() {
            return Err(SignerError::Refused(
                "descriptor caller does not match the signer key".to_owned(),
            ));
        }

        let signature = self.keypair.sign(&descriptor.to_bytes());
        Ok(SignedCall::new(descriptor.clone(), signature))
    }
}
