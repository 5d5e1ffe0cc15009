//! Network boundary of the client
//!
//! The remote contract execution platform is an external collaborator.
//! Everything the client needs from it fits in four request/response
//! operations, so the boundary is a trait and the JSON-RPC adapter below
//! is just one way to satisfy it.

use anyhow::Context;
use async_trait::async_trait;
use docstore_common::{
    api::{
        CostEstimate, GetOutcomeParams, GetSequenceParams, GetSequenceResult, InclusionStatus,
        RejectReason, SimulateParams, SimulateResult, SubmitParams, SIMULATION_ABORTED_CODE,
    },
    call::{CallDescriptor, SignedCall},
    crypto::{Hash, PublicKey},
    rpc::{JsonRpcRequest, JsonRpcResponse, RpcError},
    serializer::Serializer,
};
use log::trace;
use serde::{de::DeserializeOwned, Serialize};
use std::{
    borrow::Cow,
    sync::atomic::{AtomicU64, Ordering},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NodeError {
    // The call would not succeed against current ledger state
    #[error("simulation aborted: {0}")]
    Aborted(String),
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// Provisional result of a simulation: decoded return bytes plus the
// resource estimate the signature will cover
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationOutput {
    pub result: Vec<u8>,
    pub cost: CostEstimate,
}

// Typed submission outcome; hex stays at the wire boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Pending,
    Confirmed { result: Vec<u8> },
    Rejected { reason: RejectReason },
}

impl SubmitOutcome {
    fn from_status(status: InclusionStatus) -> Result<Self, NodeError> {
        Ok(match status {
            InclusionStatus::Pending => SubmitOutcome::Pending,
            InclusionStatus::Confirmed { result } => SubmitOutcome::Confirmed {
                result: hex::decode(&result).context("invalid hex in confirmed result")?,
            },
            InclusionStatus::Rejected { reason } => SubmitOutcome::Rejected { reason },
        })
    }
}

/// Remote contract execution platform: two real operations (simulate,
/// submit) plus the lookups that support them
#[async_trait]
pub trait ContractNode: Send + Sync {
    /// Next expected sequence for an account, the exactly-once marker a
    /// fresh descriptor must embed
    async fn sequence(&self, account: &PublicKey) -> Result<u64, NodeError>;

    /// Dry-run a descriptor against current state; never mutates the ledger
    async fn simulate(&self, descriptor: &CallDescriptor) -> Result<SimulationOutput, NodeError>;

    /// Send a signed call for inclusion and wait for its resolution
    async fn submit(&self, call: &SignedCall) -> Result<SubmitOutcome, NodeError>;

    /// Look up the outcome of a previously submitted call by descriptor id
    /// Used after a timeout: the call may have been included out-of-band
    async fn outcome(&self, id: &Hash) -> Result<Option<SubmitOutcome>, NodeError>;
}

/// The request/response transport itself (HTTP, WebSocket, ...) is owned
/// by the application
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn request(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse, RpcError>;
}

/// Adapts any JSON-RPC transport to the `ContractNode` trait
pub struct RpcNode<T> {
    transport: T,
    next_id: AtomicU64,
}

impl<T: RpcTransport> RpcNode<T> {
    pub fn new(transport: T) -> Self {
        RpcNode {
            transport,
            next_id: AtomicU64::new(0),
        }
    }

    async fn call<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: &P,
    ) -> Result<R, NodeError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("call: {}", method);
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let params = serde_json::to_value(params).map_err(RpcError::from)?;
        let request = JsonRpcRequest::new(id, method, Some(params));
        let response = self.transport.request(request).await?;
        let value = response.into_result()?;
        Ok(serde_json::from_value(value).map_err(RpcError::from)?)
    }
}

#[async_trait]
impl<T: RpcTransport> ContractNode for RpcNode<T> {
    async fn sequence(&self, account: &PublicKey) -> Result<u64, NodeError> {
        let params = GetSequenceParams {
            account: Cow::Borrowed(account),
        };
        let result: GetSequenceResult = self.call("get_account_sequence", &params).await?;
        Ok(result.sequence)
    }

    async fn simulate(&self, descriptor: &CallDescriptor) -> Result<SimulationOutput, NodeError> {
        let params = SimulateParams {
            data: Cow::Owned(descriptor.to_hex()),
        };
        let result: SimulateResult = match self.call("simulate_call", &params).await {
            Ok(result) => result,
            // The node reports an aborting call with a dedicated code
            Err(NodeError::Rpc(RpcError::Server { code, message }))
                if code == SIMULATION_ABORTED_CODE =>
            {
                return Err(NodeError::Aborted(message))
            }
            Err(other) => return Err(other),
        };

        let decoded =
            hex::decode(&result.result).context("invalid hex in simulation result")?;
        Ok(SimulationOutput {
            result: decoded,
            cost: result.cost,
        })
    }

    async fn submit(&self, call: &SignedCall) -> Result<SubmitOutcome, NodeError> {
        let params = SubmitParams {
            data: Cow::Owned(call.to_hex()),
        };
        let status: InclusionStatus = self.call("submit_call", &params).await?;
        SubmitOutcome::from_status(status)
    }

    async fn outcome(&self, id: &Hash) -> Result<Option<SubmitOutcome>, NodeError> {
        let params = GetOutcomeParams {
            id: Cow::Borrowed(id),
        };
        let status: Option<InclusionStatus> = self.call("get_call_outcome", &params).await?;
        status.map(SubmitOutcome::from_status).transpose()
    }
}
