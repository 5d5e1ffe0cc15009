//! In-memory contract node for integration tests
//!
//! Emulates the remote record store end-to-end: descriptors are decoded
//! through the real schema table, executed against an owner-scoped
//! ledger, and results are encoded back through the same codec the
//! client decodes with. Ids are monotonic per owner and survive
//! deletions; sequences are enforced exactly-once.

use async_trait::async_trait;
use docstore_client::{
    node::{ContractNode, NodeError, SimulationOutput, SubmitOutcome},
    signer::{CallSigner, LocalSigner, SignerError},
};
use docstore_common::{
    api::{CostEstimate, RejectReason},
    call::{CallDescriptor, SignedCall},
    crypto::{Hash, KeyPair, PublicKey},
    record::{methods, Record, RecordPatch, RECORD_STORE_SCHEMA},
    schema::{MethodDef, Value},
    serializer::Serializer,
};
use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
};

#[derive(Default, Clone)]
struct OwnerSpace {
    // Last assigned id; never decremented, so deleted ids are not reused
    last_id: u32,
    records: BTreeMap<u32, Record>,
}

pub struct MemoryNode {
    ledger: Mutex<HashMap<PublicKey, OwnerSpace>>,
    sequences: Mutex<HashMap<PublicKey, u64>>,
    outcomes: Mutex<HashMap<Hash, SubmitOutcome>>,
    // Logical clock for ledger timestamps, deterministic across runs
    clock: AtomicU64,
    pub submits: AtomicU64,
}

impl MemoryNode {
    pub fn new() -> Self {
        MemoryNode {
            ledger: Mutex::new(HashMap::new()),
            sequences: Mutex::new(HashMap::new()),
            outcomes: Mutex::new(HashMap::new()),
            clock: AtomicU64::new(1_700_000_000),
            submits: AtomicU64::new(0),
        }
    }

    fn now(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::SeqCst)
    }

    fn method_def(descriptor: &CallDescriptor) -> Result<&'static MethodDef, NodeError> {
        RECORD_STORE_SCHEMA
            .method(descriptor.method())
            .ok_or_else(|| NodeError::Aborted(format!("unknown method {}", descriptor.method())))
    }

    fn cost_for(descriptor: &CallDescriptor, result: &[u8]) -> CostEstimate {
        CostEstimate {
            compute_units: 100 + descriptor.args().len() as u64,
            storage_bytes: result.len() as u64,
            fee: 5000 + (descriptor.size() as u64 / 1024) * 1000,
        }
    }

    // Execute a decoded call against the ledger
    // Simulation runs against a scratch copy so it never takes effect
    fn run(&self, descriptor: &CallDescriptor, commit: bool) -> Result<Value, NodeError> {
        let def = Self::method_def(descriptor)?;
        let mut args = def
            .decode_args(descriptor.args())
            .map_err(|error| NodeError::Aborted(format!("malformed arguments: {error}")))?
            .into_iter();

        let mut guard = self.ledger.lock().unwrap();
        let mut scratch;
        let ledger = if commit || !def.mutates {
            &mut *guard
        } else {
            scratch = guard.clone();
            &mut scratch
        };

        match descriptor.method() {
            methods::STORE_RECORD => {
                let owner = address(args.next());
                let name = string(args.next());
                let content = bytes(args.next());
                let metadata = optional_bytes(args.next());
                let tags = strings(args.next());

                let space = ledger.entry(owner.clone()).or_default();
                let id = space.last_id + 1;
                space.last_id = id;

                let now = self.now();
                space.records.insert(
                    id,
                    Record {
                        id,
                        owner,
                        name,
                        content,
                        metadata,
                        tags,
                        created_at: now,
                        updated_at: now,
                    },
                );
                Ok(Value::U32(id))
            }
            methods::GET_RECORD => {
                let owner = address(args.next());
                let id = u32_of(args.next());
                let record = ledger
                    .get(&owner)
                    .and_then(|space| space.records.get(&id));
                Ok(Value::optional(record.map(Record::to_value)))
            }
            methods::GET_OWNER_RECORDS => {
                let owner = address(args.next());
                let records = ledger
                    .get(&owner)
                    .map(|space| space.records.values().map(Record::to_value).collect())
                    .unwrap_or_default();
                Ok(Value::Sequence(records))
            }
            methods::UPDATE_RECORD => {
                let owner = address(args.next());
                let id = u32_of(args.next());
                let patch = RecordPatch {
                    name: optional_string(args.next()),
                    content: optional_bytes(args.next()),
                    metadata: optional_bytes(args.next()),
                    tags: optional_strings(args.next()),
                };

                match ledger
                    .get_mut(&owner)
                    .and_then(|space| space.records.get_mut(&id))
                {
                    Some(record) => {
                        // An all-absent patch is a successful no-op and
                        // must not bump updated_at
                        patch.apply(record, self.now());
                        Ok(Value::Bool(true))
                    }
                    None => Ok(Value::Bool(false)),
                }
            }
            methods::DELETE_RECORD => {
                let owner = address(args.next());
                let id = u32_of(args.next());
                let removed = ledger
                    .get_mut(&owner)
                    .map_or(false, |space| space.records.remove(&id).is_some());
                Ok(Value::Bool(removed))
            }
            methods::GET_RECORDS_BY_TAGS => {
                let owner = address(args.next());
                let search_tags = strings(args.next());
                let records = ledger
                    .get(&owner)
                    .map(|space| {
                        space
                            .records
                            .values()
                            .filter(|record| record.matches_any_tag(&search_tags))
                            .map(Record::to_value)
                            .collect()
                    })
                    .unwrap_or_default();
                Ok(Value::Sequence(records))
            }
            methods::GET_RECORD_COUNT => {
                let owner = address(args.next());
                let count = ledger.get(&owner).map_or(0, |space| space.records.len());
                Ok(Value::U32(count as u32))
            }
            other => Err(NodeError::Aborted(format!("unknown method {other}"))),
        }
    }
}

impl Default for MemoryNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContractNode for MemoryNode {
    async fn sequence(&self, account: &PublicKey) -> Result<u64, NodeError> {
        Ok(*self.sequences.lock().unwrap().get(account).unwrap_or(&0))
    }

    async fn simulate(&self, descriptor: &CallDescriptor) -> Result<SimulationOutput, NodeError> {
        let def = Self::method_def(descriptor)?;
        let value = self.run(descriptor, false)?;
        let result = def
            .encode_return(&value)
            .map_err(|error| NodeError::Aborted(error.to_string()))?;
        let cost = Self::cost_for(descriptor, &result);
        Ok(SimulationOutput { result, cost })
    }

    async fn submit(&self, call: &SignedCall) -> Result<SubmitOutcome, NodeError> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        let descriptor = call.descriptor();

        if !call.verify() {
            return Ok(SubmitOutcome::Rejected {
                reason: RejectReason::InvalidSignature,
            });
        }

        let expected = *self
            .sequences
            .lock()
            .unwrap()
            .get(descriptor.caller())
            .unwrap_or(&0);
        let outcome = if descriptor.sequence() != expected {
            SubmitOutcome::Rejected {
                reason: RejectReason::SequenceReused,
            }
        } else {
            let def = Self::method_def(descriptor)?;
            let value = self.run(descriptor, true)?;
            let result = def
                .encode_return(&value)
                .map_err(|error| NodeError::Aborted(error.to_string()))?;
            self.sequences
                .lock()
                .unwrap()
                .insert(descriptor.caller().clone(), expected + 1);
            SubmitOutcome::Confirmed { result }
        };

        self.outcomes
            .lock()
            .unwrap()
            .insert(descriptor.id(), outcome.clone());
        Ok(outcome)
    }

    async fn outcome(&self, id: &Hash) -> Result<Option<SubmitOutcome>, NodeError> {
        Ok(self.outcomes.lock().unwrap().get(id).cloned())
    }
}

/// Wraps the local signer to count how often the credential boundary is
/// crossed; read-only operations must never reach it
pub struct CountingSigner {
    inner: LocalSigner,
    signatures: Arc<AtomicU64>,
}

impl CountingSigner {
    pub fn new(keypair: KeyPair) -> Self {
        CountingSigner {
            inner: LocalSigner::new(keypair),
            signatures: Arc::new(AtomicU64::new(0)),
        }
    }

    // Shared handle that stays readable after the store takes the signer
    pub fn counter(&self) -> Arc<AtomicU64> {
        self.signatures.clone()
    }
}

#[async_trait]
impl CallSigner for CountingSigner {
    fn public_key(&self) -> PublicKey {
        self.inner.public_key()
    }

    async fn sign(&self, descriptor: &CallDescriptor) -> Result<SignedCall, SignerError> {
        self.signatures.fetch_add(1, Ordering::SeqCst);
        self.inner.sign(descriptor).await
    }
}

fn address(value: Option<Value>) -> PublicKey {
    value
        .and_then(Value::into_address)
        .expect("address argument")
}

fn u32_of(value: Option<Value>) -> u32 {
    value.and_then(Value::into_u32).expect("u32 argument")
}

fn string(value: Option<Value>) -> String {
    value.and_then(Value::into_string).expect("string argument")
}

fn bytes(value: Option<Value>) -> Vec<u8> {
    value.and_then(Value::into_bytes).expect("bytes argument")
}

fn strings(value: Option<Value>) -> Vec<String> {
    value
        .and_then(Value::into_sequence)
        .expect("sequence argument")
        .into_iter()
        .map(|element| element.into_string().expect("string element"))
        .collect()
}

fn optional(value: Option<Value>) -> Option<Value> {
    value
        .and_then(Value::into_optional)
        .expect("optional argument")
}

fn optional_string(value: Option<Value>) -> Option<String> {
    optional(value).map(|inner| inner.into_string().expect("string value"))
}

fn optional_bytes(value: Option<Value>) -> Option<Vec<u8>> {
    optional(value).map(|inner| inner.into_bytes().expect("bytes value"))
}

fn optional_strings(value: Option<Value>) -> Option<Vec<String>> {
    optional(value).map(|inner| {
        inner
            .into_sequence()
            .expect("sequence value")
            .into_iter()
            .map(|element| element.into_string().expect("string element"))
            .collect()
    })
}
