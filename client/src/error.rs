use crate::{node::NodeError, signer::SignerError};
use docstore_common::{
    api::RejectReason, crypto::Hash, schema::SchemaError, serializer::ReaderError,
};
use std::time::Duration;
use thiserror::Error;

// Everything a record store operation can fail with
// Nothing in the client retries automatically: a rejected or expired
// descriptor is stale, and the caller decides whether to rebuild
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("invalid argument '{field}': {reason}")]
    InvalidArgument {
        field: &'static str,
        reason: String,
    },
    #[error(transparent)]
    Build(#[from] SchemaError),
    #[error(transparent)]
    Codec(#[from] ReaderError),
    #[error("simulation failed: {message}")]
    Simulation { message: String },
    #[error("submission rejected: {reason}")]
    Submission { reason: RejectReason },
    #[error("call was already simulated")]
    AlreadySimulated,
    #[error("call must be simulated before signing")]
    NotSimulated,
    #[error("call was already signed")]
    AlreadySigned,
    #[error("call must be signed before submission")]
    NotSigned,
    #[error("call {0} was already submitted")]
    AlreadySubmitted(Hash),
    #[error("no outcome for call {id} within {timeout:?}; it may still be included, poll it by id")]
    Timeout { id: Hash, timeout: Duration },
    #[error(transparent)]
    Signer(#[from] SignerError),
    #[error(transparent)]
    Node(NodeError),
}

impl From<NodeError> for ClientError {
    // Simulation aborts are their own error class; everything else from
    // the node is a transport-level failure
    fn from(error: NodeError) -> Self {
        match error {
            NodeError::Aborted(message) => ClientError::Simulation { message },
            other => ClientError::Node(other),
        }
    }
}
