// Wire types for the node RPC boundary
// Binary payloads (descriptors, results) travel hex-encoded inside JSON,
// the same way transactions are submitted to a daemon

use crate::crypto::{Hash, PublicKey};
use serde::{Deserialize, Serialize};
use std::{
    borrow::Cow,
    fmt::{Display, Formatter},
};

// Custom JSON-RPC error code the node answers with when a simulated call
// aborts against current state (as opposed to a transport-level failure)
pub const SIMULATION_ABORTED_CODE: i16 = -5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulateParams<'a> {
    // hex-encoded call descriptor
    pub data: Cow<'a, str>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulateResult {
    // hex-encoded return value
    pub result: String,
    pub cost: CostEstimate,
}

// Resource estimate attached to a simulation
// The fee is part of what gets signed; an estimate can expire if ledger
// state moves too far between simulation and submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub compute_units: u64,
    pub storage_bytes: u64,
    pub fee: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitParams<'a> {
    // hex-encoded signed call
    pub data: Cow<'a, str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    InsufficientFunds,
    SequenceReused,
    ConflictingState,
    ExpiredEstimate,
    InvalidSignature,
}

impl Display for RejectReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            RejectReason::InsufficientFunds => "insufficient funds",
            RejectReason::SequenceReused => "sequence already used",
            RejectReason::ConflictingState => "conflicting state",
            RejectReason::ExpiredEstimate => "expired fee estimate",
            RejectReason::InvalidSignature => "invalid signature",
        };
        write!(f, "{}", reason)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InclusionStatus {
    // Accepted but not yet included; poll by descriptor id
    Pending,
    Confirmed {
        // hex-encoded return value
        result: String,
    },
    Rejected {
        reason: RejectReason,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetOutcomeParams<'a> {
    pub id: Cow<'a, Hash>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetSequenceParams<'a> {
    pub account: Cow<'a, PublicKey>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetSequenceResult {
    pub sequence: u64,
}
