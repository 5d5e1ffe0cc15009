//! Record store facade
//!
//! One method per record action, each composed as call builder ->
//! two-phase execution -> schema codec. The facade, not the caller,
//! decides how far the protocol runs: queries stop at the simulated
//! result, mutations always sign and submit. A provisional result is
//! never surfaced as final for a mutating call.

use crate::{
    assembler::{CallExecution, CallOutcome},
    config::DEFAULT_SUBMIT_TIMEOUT,
    error::ClientError,
    node::ContractNode,
    signer::CallSigner,
};
use docstore_common::{
    call::{BindingContext, CallBuilder},
    config::{
        MAX_CONTENT_SIZE, MAX_METADATA_SIZE, MAX_NAME_LENGTH, MAX_TAGS_PER_RECORD, MAX_TAG_LENGTH,
    },
    crypto::{Hash, PublicKey},
    network::Network,
    record::{methods, Record, RecordPatch, RECORD_STORE_SCHEMA},
    schema::{SchemaError, Value},
    serializer::ReaderError,
};
use log::{debug, trace};
use std::{sync::Arc, time::Duration};

pub struct RecordStore<N, S> {
    node: Arc<N>,
    signer: S,
    contract: Hash,
    network: Network,
    submit_timeout: Duration,
}

impl<N: ContractNode, S: CallSigner> RecordStore<N, S> {
    pub fn new(node: Arc<N>, signer: S, contract: Hash, network: Network) -> Self {
        RecordStore {
            node,
            signer,
            contract,
            network,
            submit_timeout: DEFAULT_SUBMIT_TIMEOUT,
        }
    }

    pub fn with_submit_timeout(mut self, timeout: Duration) -> Self {
        self.submit_timeout = timeout;
        self
    }

    // The account every operation is scoped to
    pub fn owner(&self) -> PublicKey {
        self.signer.public_key()
    }

    pub fn contract(&self) -> &Hash {
        &self.contract
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Build a descriptor with a fresh sequence and hand back the raw
    /// two-phase execution, for callers that want to inspect the
    /// provisional result or cost estimate before electing to submit
    pub async fn begin(
        &self,
        method: &str,
        args: &[Value],
    ) -> Result<CallExecution<'_, N>, ClientError> {
        let caller = self.signer.public_key();
        let sequence = self.node.sequence(&caller).await?;
        let binding = BindingContext {
            contract: self.contract.clone(),
            network: self.network,
            caller,
            sequence,
        };

        let descriptor = CallBuilder::new(&RECORD_STORE_SCHEMA).build(method, args, binding)?;
        Ok(CallExecution::new(self.node.as_ref(), descriptor))
    }

    // Read-only path: the simulated result is authoritative, nothing is
    // signed or submitted
    async fn query(&self, method: &str, args: &[Value]) -> Result<Value, ClientError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("query {}", method);
        }
        let def = RECORD_STORE_SCHEMA
            .method(method)
            .ok_or_else(|| SchemaError::UnknownMethod(method.to_owned()))?;

        let mut execution = self.begin(method, args).await?;
        let output = execution.simulate().await?;
        Ok(def.decode_return(&output.result)?)
    }

    // Mutating path: simulate for the fee estimate, then sign and submit;
    // only the confirmed result is decoded and returned
    async fn execute(&self, method: &str, args: &[Value]) -> Result<Value, ClientError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("execute {}", method);
        }
        let def = RECORD_STORE_SCHEMA
            .method(method)
            .ok_or_else(|| SchemaError::UnknownMethod(method.to_owned()))?;

        let mut execution = self.begin(method, args).await?;
        execution.simulate().await?;
        execution.sign(&self.signer).await?;
        let outcome = execution.submit(self.submit_timeout).await?;

        match outcome {
            CallOutcome::Confirmed { result } => Ok(def.decode_return(result)?),
            // submit() already surfaces rejections as errors
            CallOutcome::Rejected { reason } => Err(ClientError::Submission { reason: *reason }),
        }
    }

    /// Store a new record; the contract assigns and returns its id
    pub async fn create(
        &self,
        name: &str,
        content: Vec<u8>,
        metadata: Option<Vec<u8>>,
        tags: Vec<String>,
    ) -> Result<u32, ClientError> {
        check_name(name)?;
        check_content(&content)?;
        if let Some(metadata) = &metadata {
            check_metadata(metadata)?;
        }
        check_tags(&tags)?;

        let args = [
            Value::Address(self.owner()),
            Value::String(name.to_owned()),
            Value::Bytes(content),
            Value::optional(metadata.map(Value::Bytes)),
            Value::Sequence(tags.into_iter().map(Value::String).collect()),
        ];
        let value = self.execute(methods::STORE_RECORD, &args).await?;
        let id = expect_u32(value)?;
        debug!("created record {} for {}", id, self.owner());
        Ok(id)
    }

    /// Fetch one record by id; absent when unknown or owned by another
    /// account
    pub async fn read(&self, id: u32) -> Result<Option<Record>, ClientError> {
        let args = [Value::Address(self.owner()), Value::U32(id)];
        let value = self.query(methods::GET_RECORD, &args).await?;
        let inner = value
            .into_optional()
            .ok_or(ClientError::Codec(ReaderError::InvalidValue))?;
        inner.map(expect_record).transpose()
    }

    /// Every live record for the owner
    pub async fn list(&self) -> Result<Vec<Record>, ClientError> {
        let args = [Value::Address(self.owner())];
        let value = self.query(methods::GET_OWNER_RECORDS, &args).await?;
        expect_records(value)
    }

    /// Apply a partial update; false when the id is absent
    pub async fn update(&self, id: u32, patch: RecordPatch) -> Result<bool, ClientError> {
        if let Some(name) = &patch.name {
            check_name(name)?;
        }
        if let Some(content) = &patch.content {
            check_content(content)?;
        }
        if let Some(metadata) = &patch.metadata {
            check_metadata(metadata)?;
        }
        if let Some(tags) = &patch.tags {
            check_tags(tags)?;
        }

        let args = [
            Value::Address(self.owner()),
            Value::U32(id),
            Value::optional(patch.name.map(Value::String)),
            Value::optional(patch.content.map(Value::Bytes)),
            Value::optional(patch.metadata.map(Value::Bytes)),
            Value::optional(
                patch
                    .tags
                    .map(|tags| Value::Sequence(tags.into_iter().map(Value::String).collect())),
            ),
        ];
        let value = self.execute(methods::UPDATE_RECORD, &args).await?;
        expect_bool(value)
    }

    /// Permanently delete a record; its id is never reassigned
    pub async fn delete(&self, id: u32) -> Result<bool, ClientError> {
        let args = [Value::Address(self.owner()), Value::U32(id)];
        let value = self.execute(methods::DELETE_RECORD, &args).await?;
        expect_bool(value)
    }

    /// Records sharing at least one tag with the search set
    /// An empty search set is invalid input, not "match all"
    pub async fn filter_by_tags(&self, search_tags: Vec<String>) -> Result<Vec<Record>, ClientError> {
        if search_tags.is_empty() {
            return Err(ClientError::InvalidArgument {
                field: "search_tags",
                reason: "at least one tag is required".to_owned(),
            });
        }
        check_tags(&search_tags)?;

        let args = [
            Value::Address(self.owner()),
            Value::Sequence(search_tags.into_iter().map(Value::String).collect()),
        ];
        let value = self.query(methods::GET_RECORDS_BY_TAGS, &args).await?;
        expect_records(value)
    }

    /// Count of live records for the owner
    pub async fn count(&self) -> Result<u32, ClientError> {
        let args = [Value::Address(self.owner())];
        let value = self.query(methods::GET_RECORD_COUNT, &args).await?;
        expect_u32(value)
    }
}

// Return-value extraction: the shapes were enforced by decode_return, so
// a mismatch here means the node answered with a different schema
fn expect_u32(value: Value) -> Result<u32, ClientError> {
    value
        .into_u32()
        .ok_or(ClientError::Codec(ReaderError::InvalidValue))
}

fn expect_bool(value: Value) -> Result<bool, ClientError> {
    value
        .into_bool()
        .ok_or(ClientError::Codec(ReaderError::InvalidValue))
}

fn expect_record(value: Value) -> Result<Record, ClientError> {
    Record::from_value(value).map_err(|_| ClientError::Codec(ReaderError::InvalidValue))
}

fn expect_records(value: Value) -> Result<Vec<Record>, ClientError> {
    value
        .into_sequence()
        .ok_or(ClientError::Codec(ReaderError::InvalidValue))?
        .into_iter()
        .map(expect_record)
        .collect()
}

fn check_name(name: &str) -> Result<(), ClientError> {
    if name.is_empty() {
        return Err(ClientError::InvalidArgument {
            field: "name",
            reason: "must not be empty".to_owned(),
        });
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(ClientError::InvalidArgument {
            field: "name",
            reason: format!("exceeds {} bytes", MAX_NAME_LENGTH),
        });
    }
    Ok(())
}

fn check_content(content: &[u8]) -> Result<(), ClientError> {
    if content.len() > MAX_CONTENT_SIZE {
        return Err(ClientError::InvalidArgument {
            field: "content",
            reason: format!("exceeds {} bytes", MAX_CONTENT_SIZE),
        });
    }
    Ok(())
}

fn check_metadata(metadata: &[u8]) -> Result<(), ClientError> {
    if metadata.len() > MAX_METADATA_SIZE {
        return Err(ClientError::InvalidArgument {
            field: "metadata",
            reason: format!("exceeds {} bytes", MAX_METADATA_SIZE),
        });
    }
    Ok(())
}

fn check_tags(tags: &[String]) -> Result<(), ClientError> {
    if tags.len() > MAX_TAGS_PER_RECORD {
        return Err(ClientError::InvalidArgument {
            field: "tags",
            reason: format!("more than {} tags", MAX_TAGS_PER_RECORD),
        });
    }
    for tag in tags {
        if tag.is_empty() {
            return Err(ClientError::InvalidArgument {
                field: "tags",
                reason: "tags must not be empty".to_owned(),
            });
        }
        if tag.len() > MAX_TAG_LENGTH {
            return Err(ClientError::InvalidArgument {
                field: "tags",
                reason: format!("tag exceeds {} bytes", MAX_TAG_LENGTH),
            });
        }
    }
    Ok(())
}
