mod builder;

pub use builder::CallBuilder;

use crate::{
    crypto::{hash, Hash, PublicKey, Signature},
    network::Network,
    serializer::{Reader, ReaderError, Serializer, Writer},
};
use serde::{Deserialize, Serialize};

/// Fixes what a call is bound to: the target contract, the network, the
/// calling account and its freshness sequence
///
/// The sequence is the exactly-once marker: the network accepts each
/// `(caller, sequence)` pair a single time, so a replayed or duplicated
/// submission cannot take effect twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingContext {
    pub contract: Hash,
    pub network: Network,
    pub caller: PublicKey,
    pub sequence: u64,
}

impl Serializer for BindingContext {
    fn write(&self, writer: &mut Writer) {
        self.contract.write(writer);
        self.network.write(writer);
        self.caller.write(writer);
        writer.write_u64(&self.sequence);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        let contract = Hash::read(reader)?;
        let network = Network::read(reader)?;
        let caller = PublicKey::read(reader)?;
        let sequence = reader.read_u64()?;

        Ok(BindingContext {
            contract,
            network,
            caller,
            sequence,
        })
    }

    fn size(&self) -> usize {
        self.contract.size() + self.network.size() + self.caller.size() + 8
    }
}

/// A fully-encoded call, ready for simulation or signing
///
/// Immutable once built. A retry after rejection or an expired estimate
/// requires building a fresh descriptor; there is no way to mutate this
/// one into a new attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallDescriptor {
    binding: BindingContext,
    method: String,
    // schema-encoded arguments
    args: Vec<u8>,
}

impl CallDescriptor {
    pub(crate) fn new(binding: BindingContext, method: String, args: Vec<u8>) -> Self {
        CallDescriptor {
            binding,
            method,
            args,
        }
    }

    #[inline]
    pub fn binding(&self) -> &BindingContext {
        &self.binding
    }

    #[inline]
    pub fn contract(&self) -> &Hash {
        &self.binding.contract
    }

    #[inline]
    pub fn network(&self) -> Network {
        self.binding.network
    }

    #[inline]
    pub fn caller(&self) -> &PublicKey {
        &self.binding.caller
    }

    #[inline]
    pub fn sequence(&self) -> u64 {
        self.binding.sequence
    }

    #[inline]
    pub fn method(&self) -> &str {
        &self.method
    }

    #[inline]
    pub fn args(&self) -> &[u8] {
        &self.args
    }

    // Content-addressed identifier, stable for the descriptor's lifetime
    // Callers poll submission outcomes by this id
    pub fn id(&self) -> Hash {
        hash(&self.to_bytes())
    }
}

impl Serializer for CallDescriptor {
    fn write(&self, writer: &mut Writer) {
        self.binding.write(writer);
        writer.write_string(&self.method);
        writer.write_u32(&(self.args.len() as u32));
        writer.write_bytes(&self.args);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        let binding = BindingContext::read(reader)?;
        let method = reader.read_string()?;
        let args_len = reader.read_u32()? as usize;
        let args = reader.read_bytes(args_len)?;

        Ok(CallDescriptor {
            binding,
            method,
            args,
        })
    }

    fn size(&self) -> usize {
        self.binding.size() + 2 + self.method.len() + 4 + self.args.len()
    }
}

/// A descriptor plus the calling account's signature over its encoding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedCall {
    descriptor: CallDescriptor,
    signature: Signature,
}

impl SignedCall {
    pub fn new(descriptor: CallDescriptor, signature: Signature) -> Self {
        SignedCall {
            descriptor,
            signature,
        }
    }

    #[inline]
    pub fn descriptor(&self) -> &CallDescriptor {
        &self.descriptor
    }

    #[inline]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    // Check the signature against the calling account's key
    pub fn verify(&self) -> bool {
        self.descriptor
            .caller()
            .verify(&self.descriptor.to_bytes(), &self.signature)
    }

    #[inline]
    pub fn consume(self) -> (CallDescriptor, Signature) {
        (self.descriptor, self.signature)
    }
}

impl Serializer for SignedCall {
    fn write(&self, writer: &mut Writer) {
        self.descriptor.write(writer);
        self.signature.write(writer);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        let descriptor = CallDescriptor::read(reader)?;
        let signature = Signature::read(reader)?;

        Ok(SignedCall {
            descriptor,
            signature,
        })
    }

    fn size(&self) -> usize {
        self.descriptor.size() + self.signature.size()
    }
}
