mod hash;
mod keys;

pub use hash::{hash, Hash, HASH_SIZE};
pub use keys::{KeyPair, PublicKey, Signature, KEY_SIZE, SIGNATURE_SIZE};
