mod value;

pub use value::Value;

use crate::{
    config::{MAX_BYTES_LENGTH, MAX_SEQUENCE_LENGTH},
    crypto::PublicKey,
    serializer::{Reader, ReaderError, Serializer, Writer},
};
use indexmap::IndexMap;
use thiserror::Error;

// Raised while validating or encoding caller-supplied values against a
// declared shape. Decoding failures are ReaderError: malformed bytes are
// a codec problem, a mismatched Value is a caller problem.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("unknown method '{0}'")]
    UnknownMethod(String),
    #[error("method '{method}' expects {expected} arguments, {found} were provided")]
    ArityMismatch {
        method: String,
        expected: usize,
        found: usize,
    },
    #[error("expected a {expected} value, got {found}")]
    Mismatch {
        expected: String,
        found: &'static str,
    },
    #[error("record value carries {found} fields, its shape declares {expected}")]
    FieldCountMismatch { expected: usize, found: usize },
    #[error("{what} of {actual} exceeds the maximum of {max}")]
    ValueTooLarge {
        what: &'static str,
        max: usize,
        actual: usize,
    },
    #[error("argument '{param}' of '{method}': {source}")]
    Argument {
        method: String,
        param: String,
        #[source]
        source: Box<SchemaError>,
    },
}

// Declared wire shape of one parameter or return value
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Shape {
    U8,
    U16,
    U32,
    U64,
    U128,
    Bool,
    String,
    Bytes,
    Address,
    Optional(Box<Shape>),
    Sequence(Box<Shape>),
    Record(Vec<FieldDef>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub shape: Shape,
}

impl Shape {
    fn describe(&self) -> String {
        match self {
            Shape::U8 => "u8".to_owned(),
            Shape::U16 => "u16".to_owned(),
            Shape::U32 => "u32".to_owned(),
            Shape::U64 => "u64".to_owned(),
            Shape::U128 => "u128".to_owned(),
            Shape::Bool => "bool".to_owned(),
            Shape::String => "string".to_owned(),
            Shape::Bytes => "bytes".to_owned(),
            Shape::Address => "address".to_owned(),
            Shape::Optional(inner) => format!("optional<{}>", inner.describe()),
            Shape::Sequence(inner) => format!("sequence<{}>", inner.describe()),
            Shape::Record(fields) => format!("record<{} fields>", fields.len()),
        }
    }

    fn mismatch(&self, value: &Value) -> SchemaError {
        SchemaError::Mismatch {
            expected: self.describe(),
            found: value.kind(),
        }
    }

    // Encode a value against this shape
    // Validation happens here: a mismatched variant never reaches the wire
    pub fn encode(&self, value: &Value, writer: &mut Writer) -> Result<(), SchemaError> {
        match (self, value) {
            (Shape::U8, Value::U8(v)) => writer.write_u8(*v),
            (Shape::U16, Value::U16(v)) => writer.write_u16(*v),
            (Shape::U32, Value::U32(v)) => writer.write_u32(v),
            (Shape::U64, Value::U64(v)) => writer.write_u64(v),
            (Shape::U128, Value::U128(v)) => writer.write_u128(v),
            (Shape::Bool, Value::Bool(v)) => writer.write_bool(*v),
            (Shape::String, Value::String(v)) => {
                if v.len() > u16::MAX as usize {
                    return Err(SchemaError::ValueTooLarge {
                        what: "string length",
                        max: u16::MAX as usize,
                        actual: v.len(),
                    });
                }
                writer.write_string(v);
            }
            (Shape::Bytes, Value::Bytes(v)) => {
                if v.len() > MAX_BYTES_LENGTH {
                    return Err(SchemaError::ValueTooLarge {
                        what: "byte string length",
                        max: MAX_BYTES_LENGTH,
                        actual: v.len(),
                    });
                }
                writer.write_u32(&(v.len() as u32));
                writer.write_bytes(v);
            }
            (Shape::Address, Value::Address(v)) => v.write(writer),
            (Shape::Optional(inner), Value::Optional(v)) => match v {
                Some(boxed) => {
                    writer.write_bool(true);
                    inner.encode(boxed, writer)?;
                }
                None => writer.write_bool(false),
            },
            (Shape::Sequence(inner), Value::Sequence(values)) => {
                if values.len() > MAX_SEQUENCE_LENGTH {
                    return Err(SchemaError::ValueTooLarge {
                        what: "sequence length",
                        max: MAX_SEQUENCE_LENGTH,
                        actual: values.len(),
                    });
                }
                writer.write_u32(&(values.len() as u32));
                for element in values {
                    inner.encode(element, writer)?;
                }
            }
            (Shape::Record(fields), Value::Record(values)) => {
                if fields.len() != values.len() {
                    return Err(SchemaError::FieldCountMismatch {
                        expected: fields.len(),
                        found: values.len(),
                    });
                }
                for (field, value) in fields.iter().zip(values) {
                    field.shape.encode(value, writer)?;
                }
            }
            (shape, value) => return Err(shape.mismatch(value)),
        }
        Ok(())
    }

    // Decode a value of this shape off the reader
    // Length prefixes are bounded before any allocation happens
    pub fn decode(&self, reader: &mut Reader) -> Result<Value, ReaderError> {
        Ok(match self {
            Shape::U8 => Value::U8(reader.read_u8()?),
            Shape::U16 => Value::U16(reader.read_u16()?),
            Shape::U32 => Value::U32(reader.read_u32()?),
            Shape::U64 => Value::U64(reader.read_u64()?),
            Shape::U128 => Value::U128(reader.read_u128()?),
            Shape::Bool => Value::Bool(reader.read_bool()?),
            Shape::String => Value::String(reader.read_string()?),
            Shape::Bytes => {
                let len = reader.read_u32()? as usize;
                if len > MAX_BYTES_LENGTH {
                    return Err(ReaderError::ExceedsMaxBytesSize {
                        max: MAX_BYTES_LENGTH,
                        actual: len,
                    });
                }
                Value::Bytes(reader.read_bytes(len)?)
            }
            Shape::Address => Value::Address(PublicKey::read(reader)?),
            Shape::Optional(inner) => {
                if reader.read_bool()? {
                    Value::Optional(Some(Box::new(inner.decode(reader)?)))
                } else {
                    Value::Optional(None)
                }
            }
            Shape::Sequence(inner) => {
                let len = reader.read_u32()? as usize;
                if len > MAX_SEQUENCE_LENGTH {
                    return Err(ReaderError::ExceedsMaxSequenceSize {
                        max: MAX_SEQUENCE_LENGTH,
                        actual: len,
                    });
                }
                let mut values = Vec::with_capacity(len.min(reader.size()));
                for _ in 0..len {
                    values.push(inner.decode(reader)?);
                }
                Value::Sequence(values)
            }
            Shape::Record(fields) => {
                let mut values = Vec::with_capacity(fields.len());
                for field in fields {
                    values.push(field.shape.decode(reader)?);
                }
                Value::Record(values)
            }
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Parameter {
    pub name: &'static str,
    pub shape: Shape,
}

// One contract method: its calling convention and whether a successful
// call mutates ledger state (drives the two-phase protocol)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodDef {
    pub name: &'static str,
    pub params: Vec<Parameter>,
    pub returns: Shape,
    pub mutates: bool,
}

impl MethodDef {
    pub fn encode_args(&self, args: &[Value]) -> Result<Vec<u8>, SchemaError> {
        if args.len() != self.params.len() {
            return Err(SchemaError::ArityMismatch {
                method: self.name.to_owned(),
                expected: self.params.len(),
                found: args.len(),
            });
        }

        let mut buffer = Vec::new();
        let mut writer = Writer::new(&mut buffer);
        for (param, arg) in self.params.iter().zip(args) {
            param
                .shape
                .encode(arg, &mut writer)
                .map_err(|source| SchemaError::Argument {
                    method: self.name.to_owned(),
                    param: param.name.to_owned(),
                    source: Box::new(source),
                })?;
        }
        Ok(buffer)
    }

    pub fn decode_args(&self, bytes: &[u8]) -> Result<Vec<Value>, ReaderError> {
        let mut reader = Reader::new(bytes);
        let mut args = Vec::with_capacity(self.params.len());
        for param in &self.params {
            args.push(param.shape.decode(&mut reader)?);
        }
        if reader.size() != 0 {
            return Err(ReaderError::InvalidSize);
        }
        Ok(args)
    }

    pub fn encode_return(&self, value: &Value) -> Result<Vec<u8>, SchemaError> {
        let mut buffer = Vec::new();
        let mut writer = Writer::new(&mut buffer);
        self.returns.encode(value, &mut writer)?;
        Ok(buffer)
    }

    pub fn decode_return(&self, bytes: &[u8]) -> Result<Value, ReaderError> {
        let mut reader = Reader::new(bytes);
        let value = self.returns.decode(&mut reader)?;
        if reader.size() != 0 {
            return Err(ReaderError::InvalidSize);
        }
        Ok(value)
    }
}

// Method table loaded once at initialization
// All seven record operations dispatch through this table; there is no
// per-method encode/decode code anywhere else
#[derive(Clone, Debug)]
pub struct Schema {
    methods: IndexMap<&'static str, MethodDef>,
}

impl Schema {
    pub fn new(methods: Vec<MethodDef>) -> Self {
        Schema {
            methods: methods.into_iter().map(|def| (def.name, def)).collect(),
        }
    }

    pub fn method(&self, name: &str) -> Option<&MethodDef> {
        self.methods.get(name)
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodDef> {
        self.methods.values()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}
