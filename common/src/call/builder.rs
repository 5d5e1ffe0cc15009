use super::{BindingContext, CallDescriptor};
use crate::schema::{Schema, SchemaError, Value};
use log::trace;

// Builds immutable call descriptors against a method table
// All argument validation happens here, before anything touches the
// network: unknown methods, arity and shape mismatches are surfaced as
// SchemaError and nothing is encoded
pub struct CallBuilder<'a> {
    schema: &'a Schema,
}

impl<'a> CallBuilder<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        CallBuilder { schema }
    }

    pub fn schema(&self) -> &Schema {
        self.schema
    }

    pub fn build(
        &self,
        method: &str,
        args: &[Value],
        binding: BindingContext,
    ) -> Result<CallDescriptor, SchemaError> {
        let def = self
            .schema
            .method(method)
            .ok_or_else(|| SchemaError::UnknownMethod(method.to_owned()))?;

        let encoded = def.encode_args(args)?;
        trace!(
            "built descriptor for {} ({} bytes of arguments, sequence {})",
            method,
            encoded.len(),
            binding.sequence
        );

        Ok(CallDescriptor::new(binding, def.name.to_owned(), encoded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        call::SignedCall,
        crypto::{Hash, KeyPair},
        network::Network,
        record::{methods, RECORD_STORE_SCHEMA},
        serializer::Serializer,
    };

    fn binding(sequence: u64) -> BindingContext {
        BindingContext {
            contract: Hash::max(),
            network: Network::Devnet,
            caller: KeyPair::from_seed([3; 32]).public_key(),
            sequence,
        }
    }

    fn count_args() -> Vec<Value> {
        vec![Value::Address(KeyPair::from_seed([3; 32]).public_key())]
    }

    #[test]
    fn test_unknown_method_rejected() {
        let builder = CallBuilder::new(&RECORD_STORE_SCHEMA);
        let result = builder.build("burn_everything", &[], binding(0));
        assert!(matches!(result, Err(SchemaError::UnknownMethod(_))));
    }

    #[test]
    fn test_missing_argument_rejected() {
        let builder = CallBuilder::new(&RECORD_STORE_SCHEMA);
        let result = builder.build(methods::GET_RECORD, &count_args(), binding(0));
        assert!(matches!(result, Err(SchemaError::ArityMismatch { .. })));
    }

    #[test]
    fn test_wrong_shape_names_parameter() {
        let builder = CallBuilder::new(&RECORD_STORE_SCHEMA);
        let args = vec![
            Value::Address(KeyPair::from_seed([3; 32]).public_key()),
            // id must be u32
            Value::String("two".to_owned()),
        ];
        match builder.build(methods::GET_RECORD, &args, binding(0)) {
            Err(SchemaError::Argument { method, param, .. }) => {
                assert_eq!(method, methods::GET_RECORD);
                assert_eq!(param, "id");
            }
            other => panic!("expected argument error, got {other:?}"),
        }
    }

    #[test]
    fn test_descriptor_roundtrip_and_stable_id() {
        let builder = CallBuilder::new(&RECORD_STORE_SCHEMA);
        let descriptor = builder
            .build(methods::GET_RECORD_COUNT, &count_args(), binding(9))
            .expect("build should succeed");

        assert_eq!(descriptor.method(), methods::GET_RECORD_COUNT);
        assert_eq!(descriptor.sequence(), 9);
        assert_eq!(descriptor.id(), descriptor.id());

        let decoded = CallDescriptor::from_bytes(&descriptor.to_bytes())
            .expect("deserialization should succeed");
        assert_eq!(decoded, descriptor);
        assert_eq!(decoded.id(), descriptor.id());
    }

    #[test]
    fn test_rebuilt_descriptor_with_new_sequence_differs() {
        let builder = CallBuilder::new(&RECORD_STORE_SCHEMA);
        let first = builder
            .build(methods::GET_RECORD_COUNT, &count_args(), binding(1))
            .expect("build should succeed");
        let second = builder
            .build(methods::GET_RECORD_COUNT, &count_args(), binding(2))
            .expect("build should succeed");
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn test_signed_call_verify() {
        let keypair = KeyPair::from_seed([3; 32]);
        let builder = CallBuilder::new(&RECORD_STORE_SCHEMA);
        let descriptor = builder
            .build(methods::GET_RECORD_COUNT, &count_args(), binding(0))
            .expect("build should succeed");

        let signature = keypair.sign(&descriptor.to_bytes());
        let signed = SignedCall::new(descriptor.clone(), signature);
        assert!(signed.verify());

        // A signature from another key must not verify
        let other = KeyPair::from_seed([4; 32]);
        let forged = SignedCall::new(descriptor, other.sign(b"other"));
        assert!(!forged.verify());
    }
}
