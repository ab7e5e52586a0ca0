//! Decoded records and field values

use std::fmt;

use crate::error::{Result, RifxError, SchemaError};

/// A decoded field value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    UInt(u64),
    SInt(i64),
    Bytes(Vec<u8>),
    List(Vec<u64>),
    Record(Box<Record>),
    Records(Vec<Record>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UInt(v) => write!(f, "{v:#x}"),
            Self::SInt(v) => write!(f, "{v}"),
            Self::Bytes(bytes) => {
                for b in bytes {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
            Self::List(values) => write!(f, "{values:?}"),
            Self::Record(record) => write!(f, "{}@{:#x}", record.name, record.offset),
            Self::Records(records) => write!(f, "[{} records]", records.len()),
        }
    }
}

/// Typed view over a decoded byte range
///
/// Identity is the schema name plus the byte offset in the owning buffer.
/// Fields keep their declaration order regardless of decode order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub(crate) name: &'static str,
    pub(crate) offset: usize,
    pub(crate) len: usize,
    pub(crate) fields: Vec<(&'static str, Value)>,
}

impl Record {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Byte offset of the record in the buffer it was decoded from
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes covered by the record (furthest field end)
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Byte range of the record in its owning buffer
    pub fn span(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.len
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.fields.iter().map(|(name, value)| (*name, value))
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, value)| value)
    }

    fn require(&self, field: &'static str) -> Result<&Value> {
        self.get(field).ok_or_else(|| {
            SchemaError::MissingField {
                record: self.name,
                field,
            }
            .into()
        })
    }

    fn mismatch(&self, field: &'static str, expected: &'static str) -> RifxError {
        SchemaError::TypeMismatch {
            record: self.name,
            field,
            expected,
        }
        .into()
    }

    pub fn uint(&self, field: &'static str) -> Result<u64> {
        match self.require(field)? {
            Value::UInt(v) => Ok(*v),
            _ => Err(self.mismatch(field, "an unsigned integer")),
        }
    }

    pub fn get_u32(&self, field: &'static str) -> Result<u32> {
        Ok(self.uint(field)? as u32)
    }

    pub fn get_u16(&self, field: &'static str) -> Result<u16> {
        Ok(self.uint(field)? as u16)
    }

    pub fn get_u8(&self, field: &'static str) -> Result<u8> {
        Ok(self.uint(field)? as u8)
    }

    pub fn sint(&self, field: &'static str) -> Result<i64> {
        match self.require(field)? {
            Value::SInt(v) => Ok(*v),
            _ => Err(self.mismatch(field, "a signed integer")),
        }
    }

    pub fn bytes(&self, field: &'static str) -> Result<&[u8]> {
        match self.require(field)? {
            Value::Bytes(b) => Ok(b),
            _ => Err(self.mismatch(field, "a byte run")),
        }
    }

    pub fn list(&self, field: &'static str) -> Result<&[u64]> {
        match self.require(field)? {
            Value::List(values) => Ok(values),
            _ => Err(self.mismatch(field, "an integer list")),
        }
    }

    pub fn record(&self, field: &'static str) -> Result<&Record> {
        match self.require(field)? {
            Value::Record(record) => Ok(record),
            _ => Err(self.mismatch(field, "a record")),
        }
    }

    pub fn records(&self, field: &'static str) -> Result<&[Record]> {
        match self.require(field)? {
            Value::Records(records) => Ok(records),
            _ => Err(self.mismatch(field, "a record list")),
        }
    }
}
