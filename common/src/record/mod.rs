// Record data model and the partial-update merge rule
//
// The merge rule lives here, next to the type it mutates, because the
// client must construct update calls against exactly the semantics the
// contract applies: absent leaves a field alone, present replaces it
// whole, and a present-but-empty metadata payload clears it.

use crate::{
    crypto::PublicKey,
    schema::{FieldDef, MethodDef, Parameter, Schema, SchemaError, Shape, Value},
    serializer::{Reader, ReaderError, Serializer, Writer},
    time::TimestampSeconds,
};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

// Contract method names, shared by the facade and any node emulation
pub mod methods {
    pub const STORE_RECORD: &str = "store_record";
    pub const GET_RECORD: &str = "get_record";
    pub const GET_OWNER_RECORDS: &str = "get_owner_records";
    pub const UPDATE_RECORD: &str = "update_record";
    pub const DELETE_RECORD: &str = "delete_record";
    pub const GET_RECORDS_BY_TAGS: &str = "get_records_by_tags";
    pub const GET_RECORD_COUNT: &str = "get_record_count";
}

/// An owner-scoped encrypted record as persisted by the contract
///
/// Ids are assigned by the contract, monotonically increasing per owner
/// and never reused after deletion. `content` and `metadata` are opaque
/// ciphertext; the client never interprets them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Record {
    pub id: u32,
    pub owner: PublicKey,
    pub name: String,
    pub content: Vec<u8>,
    pub metadata: Option<Vec<u8>>,
    pub tags: Vec<String>,
    pub created_at: TimestampSeconds,
    pub updated_at: TimestampSeconds,
}

impl Record {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|candidate| candidate == tag)
    }

    // Inclusive-OR membership over the caller-supplied search tags
    pub fn matches_any_tag(&self, search_tags: &[String]) -> bool {
        search_tags.iter().any(|tag| self.has_tag(tag))
    }

    pub fn to_value(&self) -> Value {
        Value::Record(vec![
            Value::U32(self.id),
            Value::Address(self.owner.clone()),
            Value::String(self.name.clone()),
            Value::Bytes(self.content.clone()),
            Value::optional(self.metadata.clone().map(Value::Bytes)),
            Value::Sequence(self.tags.iter().cloned().map(Value::String).collect()),
            Value::U64(self.created_at),
            Value::U64(self.updated_at),
        ])
    }

    pub fn from_value(value: Value) -> Result<Self, SchemaError> {
        let mismatch = |found: &'static str| SchemaError::Mismatch {
            expected: "record<8 fields>".to_owned(),
            found,
        };

        let kind = value.kind();
        let fields = value.into_record().ok_or_else(|| mismatch(kind))?;
        if fields.len() != 8 {
            return Err(SchemaError::FieldCountMismatch {
                expected: 8,
                found: fields.len(),
            });
        }

        let mut fields = fields.into_iter();
        // Arity was checked above, the iterator cannot run dry
        let mut next = || fields.next().ok_or_else(|| mismatch("record"));

        let id = next()?.into_u32().ok_or_else(|| mismatch("record"))?;
        let owner = next()?.into_address().ok_or_else(|| mismatch("record"))?;
        let name = next()?.into_string().ok_or_else(|| mismatch("record"))?;
        let content = next()?.into_bytes().ok_or_else(|| mismatch("record"))?;
        let metadata = next()?
            .into_optional()
            .ok_or_else(|| mismatch("record"))?
            .map(|inner| inner.into_bytes().ok_or_else(|| mismatch("record")))
            .transpose()?;
        let tags = next()?
            .into_sequence()
            .ok_or_else(|| mismatch("record"))?
            .into_iter()
            .map(|tag| tag.into_string().ok_or_else(|| mismatch("record")))
            .collect::<Result<Vec<_>, _>>()?;
        let created_at = next()?.into_u64().ok_or_else(|| mismatch("record"))?;
        let updated_at = next()?.into_u64().ok_or_else(|| mismatch("record"))?;

        Ok(Record {
            id,
            owner,
            name,
            content,
            metadata,
            tags,
            created_at,
            updated_at,
        })
    }
}

// Must stay byte-compatible with record_shape(): the schema layer and
// this impl describe the same wire layout
impl Serializer for Record {
    fn write(&self, writer: &mut Writer) {
        writer.write_u32(&self.id);
        self.owner.write(writer);
        writer.write_string(&self.name);
        writer.write_u32(&(self.content.len() as u32));
        writer.write_bytes(&self.content);
        match &self.metadata {
            Some(metadata) => {
                writer.write_bool(true);
                writer.write_u32(&(metadata.len() as u32));
                writer.write_bytes(metadata);
            }
            None => writer.write_bool(false),
        }
        writer.write_u32(&(self.tags.len() as u32));
        for tag in &self.tags {
            writer.write_string(tag);
        }
        writer.write_u64(&self.created_at);
        writer.write_u64(&self.updated_at);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        let id = reader.read_u32()?;
        let owner = PublicKey::read(reader)?;
        let name = reader.read_string()?;
        let content_len = reader.read_u32()? as usize;
        let content = reader.read_bytes(content_len)?;
        let metadata = if reader.read_bool()? {
            let metadata_len = reader.read_u32()? as usize;
            Some(reader.read_bytes(metadata_len)?)
        } else {
            None
        };
        let tags_len = reader.read_u32()? as usize;
        let mut tags = Vec::with_capacity(tags_len.min(reader.size()));
        for _ in 0..tags_len {
            tags.push(reader.read_string()?);
        }
        let created_at = reader.read_u64()?;
        let updated_at = reader.read_u64()?;

        Ok(Record {
            id,
            owner,
            name,
            content,
            metadata,
            tags,
            created_at,
            updated_at,
        })
    }

    fn size(&self) -> usize {
        4 + self.owner.size()
            + 2
            + self.name.len()
            + 4
            + self.content.len()
            + 1
            + self.metadata.as_ref().map_or(0, |m| 4 + m.len())
            + 4
            + self.tags.iter().map(|tag| 2 + tag.len()).sum::<usize>()
            + 8
            + 8
    }
}

/// A partial update: absent fields are preserved, present fields replace
/// the stored value whole
///
/// There is no element-level merge for `tags` and no byte-level patch for
/// `content`. `metadata` present-but-empty clears the stored metadata to
/// absent, which is the only way to remove it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordPatch {
    pub name: Option<String>,
    pub content: Option<Vec<u8>>,
    pub metadata: Option<Vec<u8>>,
    pub tags: Option<Vec<String>>,
}

impl RecordPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.content.is_none()
            && self.metadata.is_none()
            && self.tags.is_none()
    }

    // Apply the contract's merge rule to a stored record
    // Returns whether anything was applied; updated_at is bumped only in
    // that case, so an empty patch never produces a spurious change signal
    pub fn apply(&self, record: &mut Record, now: TimestampSeconds) -> bool {
        if self.is_empty() {
            return false;
        }

        if let Some(name) = &self.name {
            record.name = name.clone();
        }
        if let Some(content) = &self.content {
            record.content = content.clone();
        }
        if let Some(metadata) = &self.metadata {
            record.metadata = if metadata.is_empty() {
                None
            } else {
                Some(metadata.clone())
            };
        }
        if let Some(tags) = &self.tags {
            record.tags = tags.clone();
        }

        record.updated_at = now;
        true
    }
}

pub fn record_shape() -> Shape {
    Shape::Record(vec![
        FieldDef {
            name: "id",
            shape: Shape::U32,
        },
        FieldDef {
            name: "owner",
            shape: Shape::Address,
        },
        FieldDef {
            name: "name",
            shape: Shape::String,
        },
        FieldDef {
            name: "content",
            shape: Shape::Bytes,
        },
        FieldDef {
            name: "metadata",
            shape: Shape::Optional(Box::new(Shape::Bytes)),
        },
        FieldDef {
            name: "tags",
            shape: Shape::Sequence(Box::new(Shape::String)),
        },
        FieldDef {
            name: "created_at",
            shape: Shape::U64,
        },
        FieldDef {
            name: "updated_at",
            shape: Shape::U64,
        },
    ])
}

// The whole record store surface as a declarative method table
pub fn record_store_schema() -> Schema {
    let owner = Parameter {
        name: "owner",
        shape: Shape::Address,
    };
    let id = Parameter {
        name: "id",
        shape: Shape::U32,
    };

    Schema::new(vec![
        MethodDef {
            name: methods::STORE_RECORD,
            params: vec![
                owner.clone(),
                Parameter {
                    name: "name",
                    shape: Shape::String,
                },
                Parameter {
                    name: "content",
                    shape: Shape::Bytes,
                },
                Parameter {
                    name: "metadata",
                    shape: Shape::Optional(Box::new(Shape::Bytes)),
                },
                Parameter {
                    name: "tags",
                    shape: Shape::Sequence(Box::new(Shape::String)),
                },
            ],
            returns: Shape::U32,
            mutates: true,
        },
        MethodDef {
            name: methods::GET_RECORD,
            params: vec![owner.clone(), id.clone()],
            returns: Shape::Optional(Box::new(record_shape())),
            mutates: false,
        },
        MethodDef {
            name: methods::GET_OWNER_RECORDS,
            params: vec![owner.clone()],
            returns: Shape::Sequence(Box::new(record_shape())),
            mutates: false,
        },
        MethodDef {
            name: methods::UPDATE_RECORD,
            params: vec![
                owner.clone(),
                id.clone(),
                Parameter {
                    name: "name",
                    shape: Shape::Optional(Box::new(Shape::String)),
                },
                Parameter {
                    name: "content",
                    shape: Shape::Optional(Box::new(Shape::Bytes)),
                },
                Parameter {
                    name: "metadata",
                    shape: Shape::Optional(Box::new(Shape::Bytes)),
                },
                Parameter {
                    name: "tags",
                    shape: Shape::Optional(Box::new(Shape::Sequence(Box::new(Shape::String)))),
                },
            ],
            returns: Shape::Bool,
            mutates: true,
        },
        MethodDef {
            name: methods::DELETE_RECORD,
            params: vec![owner.clone(), id],
            returns: Shape::Bool,
            mutates: true,
        },
        MethodDef {
            name: methods::GET_RECORDS_BY_TAGS,
            params: vec![
                owner.clone(),
                Parameter {
                    name: "search_tags",
                    shape: Shape::Sequence(Box::new(Shape::String)),
                },
            ],
            returns: Shape::Sequence(Box::new(record_shape())),
            mutates: false,
        },
        MethodDef {
            name: methods::GET_RECORD_COUNT,
            params: vec![owner],
            returns: Shape::U32,
            mutates: false,
        },
    ])
}

lazy_static! {
    pub static ref RECORD_STORE_SCHEMA: Schema = record_store_schema();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    fn sample_record() -> Record {
        Record {
            id: 7,
            owner: KeyPair::from_seed([1; 32]).public_key(),
            name: "notes".to_owned(),
            content: vec![0xDE, 0xAD, 0xBE, 0xEF],
            metadata: Some(vec![1, 2, 3]),
            tags: vec!["work".to_owned(), "draft".to_owned()],
            created_at: 1_700_000_000,
            updated_at: 1_700_000_100,
        }
    }

    #[test]
    fn test_record_serde_roundtrip() {
        let record = sample_record();
        let bytes = record.to_bytes();
        assert_eq!(bytes.len(), record.size());
        let decoded = Record::from_bytes(&bytes).expect("deserialization should succeed");
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_record_without_metadata_roundtrip() {
        let mut record = sample_record();
        record.metadata = None;
        record.tags = Vec::new();
        let decoded =
            Record::from_bytes(&record.to_bytes()).expect("deserialization should succeed");
        assert_eq!(decoded, record);
    }

    // The hand-written Serializer impl and the schema shape must agree
    // byte for byte
    #[test]
    fn test_record_matches_schema_layout() {
        let record = sample_record();

        let mut via_schema = Vec::new();
        record_shape()
            .encode(&record.to_value(), &mut Writer::new(&mut via_schema))
            .expect("encode should succeed");

        assert_eq!(via_schema, record.to_bytes());

        let decoded_value = record_shape()
            .decode(&mut Reader::new(&via_schema))
            .expect("decode should succeed");
        let decoded = Record::from_value(decoded_value).expect("conversion should succeed");
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_patch_name_only() {
        let mut record = sample_record();
        let before = record.clone();
        let patch = RecordPatch {
            name: Some("renamed".to_owned()),
            ..Default::default()
        };

        assert!(patch.apply(&mut record, 1_700_000_200));
        assert_eq!(record.name, "renamed");
        assert_eq!(record.content, before.content);
        assert_eq!(record.metadata, before.metadata);
        assert_eq!(record.tags, before.tags);
        assert_eq!(record.created_at, before.created_at);
        assert_eq!(record.updated_at, 1_700_000_200);
    }

    #[test]
    fn test_empty_patch_is_noop() {
        let mut record = sample_record();
        let before = record.clone();

        assert!(!RecordPatch::default().apply(&mut record, 1_700_000_200));
        assert_eq!(record, before);
    }

    #[test]
    fn test_patch_replaces_tags_whole() {
        let mut record = sample_record();
        let patch = RecordPatch {
            tags: Some(vec!["final".to_owned()]),
            ..Default::default()
        };

        patch.apply(&mut record, 1_700_000_200);
        assert_eq!(record.tags, vec!["final".to_owned()]);
    }

    #[test]
    fn test_patch_empty_metadata_clears() {
        let mut record = sample_record();
        let patch = RecordPatch {
            metadata: Some(Vec::new()),
            ..Default::default()
        };

        patch.apply(&mut record, 1_700_000_200);
        assert_eq!(record.metadata, None);
    }

    #[test]
    fn test_tag_matching() {
        let record = sample_record();
        assert!(record.matches_any_tag(&["work".to_owned(), "missing".to_owned()]));
        assert!(!record.matches_any_tag(&["missing".to_owned()]));
        assert!(!record.matches_any_tag(&[]));
    }

    #[test]
    fn test_schema_has_all_methods() {
        let schema = record_store_schema();
        assert_eq!(schema.len(), 7);
        for name in [
            methods::STORE_RECORD,
            methods::GET_RECORD,
            methods::GET_OWNER_RECORDS,
            methods::UPDATE_RECORD,
            methods::DELETE_RECORD,
            methods::GET_RECORDS_BY_TAGS,
            methods::GET_RECORD_COUNT,
        ] {
            assert!(schema.method(name).is_some(), "missing method {name}");
        }

        // Queries must never require a signature
        for name in [
            methods::GET_RECORD,
            methods::GET_OWNER_RECORDS,
            methods::GET_RECORDS_BY_TAGS,
            methods::GET_RECORD_COUNT,
        ] {
            assert!(!schema.method(name).map_or(true, |def| def.mutates));
        }
    }
}
