//! Two-phase call execution
//!
//! Built -> Simulated -> Signed -> Submitted -> Confirmed | Rejected
//!
//! Read-only callers stop at Simulated and treat the provisional result
//! as final; state-mutating callers must advance through sign and submit
//! for the call to take durable effect. Transitions are checked: misuse
//! is a dedicated error, never undefined behavior.

use crate::{
    error::ClientError,
    node::{ContractNode, SimulationOutput, SubmitOutcome},
    signer::CallSigner,
};
use docstore_common::{
    api::RejectReason,
    call::{CallDescriptor, SignedCall},
    crypto::Hash,
};
use log::{debug, trace};
use std::{mem, time::Duration};
use tokio::time::timeout;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    Confirmed { result: Vec<u8> },
    Rejected { reason: RejectReason },
}

enum State {
    Built,
    Simulated {
        output: SimulationOutput,
    },
    Signed {
        call: SignedCall,
        output: SimulationOutput,
    },
    Finished {
        outcome: CallOutcome,
    },
}

pub struct CallExecution<'a, N> {
    node: &'a N,
    descriptor: CallDescriptor,
    // content id, stable for the descriptor's lifetime
    id: Hash,
    state: State,
}

impl<'a, N: ContractNode> CallExecution<'a, N> {
    pub fn new(node: &'a N, descriptor: CallDescriptor) -> Self {
        let id = descriptor.id();
        CallExecution {
            node,
            descriptor,
            id,
            state: State::Built,
        }
    }

    pub fn id(&self) -> &Hash {
        &self.id
    }

    pub fn descriptor(&self) -> &CallDescriptor {
        &self.descriptor
    }

    pub fn simulated(&self) -> Option<&SimulationOutput> {
        match &self.state {
            State::Simulated { output } | State::Signed { output, .. } => Some(output),
            _ => None,
        }
    }

    pub fn outcome(&self) -> Option<&CallOutcome> {
        match &self.state {
            State::Finished { outcome } => Some(outcome),
            _ => None,
        }
    }

    /// Dry-run the descriptor against current ledger state
    ///
    /// For a read-only method the returned output is authoritative and
    /// the protocol ends here; for a mutating method it is a preview.
    pub async fn simulate(&mut self) -> Result<&SimulationOutput, ClientError> {
        match self.state {
            State::Built => {}
            _ => return Err(ClientError::AlreadySimulated),
        }

        trace!("simulating call {}", self.id);
        let output = self.node.simulate(&self.descriptor).await?;
        debug!(
            "call {} simulated: {} result bytes, fee estimate {}",
            self.id,
            output.result.len(),
            output.cost.fee
        );

        self.state = State::Simulated { output };
        self.simulated().ok_or(ClientError::NotSimulated)
    }

    /// Have the credential holder sign the simulated descriptor
    ///
    /// The descriptor already carries the fee estimate from simulation,
    /// so no re-simulation happens here.
    pub async fn sign<S: CallSigner + ?Sized>(&mut self, signer: &S) -> Result<(), ClientError> {
        let state = mem::replace(&mut self.state, State::Built);
        let output = match state {
            State::Simulated { output } => output,
            State::Built => return Err(ClientError::NotSimulated),
            State::Signed { .. } => {
                self.state = state;
                return Err(ClientError::AlreadySigned);
            }
            State::Finished { .. } => {
                self.state = state;
                return Err(ClientError::AlreadySubmitted(self.id.clone()));
            }
        };

        match signer.sign(&self.descriptor).await {
            Ok(call) => {
                trace!("call {} signed", self.id);
                self.state = State::Signed { call, output };
                Ok(())
            }
            Err(error) => {
                // Signing failed, the simulation is still valid
                self.state = State::Simulated { output };
                Err(error.into())
            }
        }
    }

    /// Send the signed call for inclusion and wait for its resolution,
    /// bounded by `wait`
    ///
    /// On timeout the call stays signed and may still be included later;
    /// the error carries the descriptor id so the caller can poll
    /// `ContractNode::outcome` out-of-band.
    pub async fn submit(&mut self, wait: Duration) -> Result<&CallOutcome, ClientError> {
        let state = mem::replace(&mut self.state, State::Built);
        let (call, output) = match state {
            State::Signed { call, output } => (call, output),
            State::Built => return Err(ClientError::NotSigned),
            State::Simulated { .. } => {
                self.state = state;
                return Err(ClientError::NotSigned);
            }
            State::Finished { .. } => {
                self.state = state;
                return Err(ClientError::AlreadySubmitted(self.id.clone()));
            }
        };

        trace!("submitting call {} (timeout {:?})", self.id, wait);
        let resolution = match timeout(wait, self.node.submit(&call)).await {
            Err(_elapsed) => {
                self.state = State::Signed { call, output };
                return Err(ClientError::Timeout {
                    id: self.id.clone(),
                    timeout: wait,
                });
            }
            Ok(Err(error)) => {
                self.state = State::Signed { call, output };
                return Err(error.into());
            }
            Ok(Ok(resolution)) => resolution,
        };

        match resolution {
            SubmitOutcome::Pending => {
                // Accepted but not resolved within the wait
                self.state = State::Signed { call, output };
                Err(ClientError::Timeout {
                    id: self.id.clone(),
                    timeout: wait,
                })
            }
            SubmitOutcome::Confirmed { result } => {
                debug!("call {} confirmed", self.id);
                self.state = State::Finished {
                    outcome: CallOutcome::Confirmed { result },
                };
                self.outcome().ok_or(ClientError::NotSigned)
            }
            SubmitOutcome::Rejected { reason } => {
                debug!("call {} rejected: {}", self.id, reason);
                self.state = State::Finished {
                    outcome: CallOutcome::Rejected { reason },
                };
                Err(ClientError::Submission { reason })
            }
        }
    }
}
