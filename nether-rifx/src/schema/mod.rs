//! Declarative record layouts
//!
//! A [`Schema`] lists named fields with their position, width and kind. Fields
//! may take their offset, length, element count or layout from a sibling's
//! decoded value, so construction resolves those references into a dependency
//! graph and fixes a decode order once. Decoding then walks that order against
//! a byte range and produces a [`Record`].
//!
//! A [`Kind::Variant`] field picks its layout from a [`Variants`] table keyed
//! by a sibling's value. The table is supplied per decode, so one schema serves
//! every format version.
//!
//! ```
//! use nether_rifx::field::Width;
//! use nether_rifx::schema::{Field, Kind, Len, Offset, Schema};
//!
//! let schema = Schema::builder("pascal_string")
//!     .uint("len", 0, Width::U8)
//!     .field(Field::new("text", Offset::At(1), Kind::Bytes(Len::Ref("len"))))
//!     .build()
//!     .unwrap();
//!
//! let record = schema.decode(b"\x03abcXYZ", 0).unwrap();
//! assert_eq!(record.bytes("text").unwrap(), b"abc");
//! assert_eq!(record.len(), 4);
//! ```

use tracing::trace;

use crate::error::{Result, RifxError, SchemaError};
use crate::field::{self, Endian, Width};

mod record;

pub use record::{Record, Value};

/// Where a field starts, relative to the record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offset {
    /// Fixed byte offset
    At(usize),
    /// Taken from a sibling integer field
    Ref(&'static str),
    /// Right after the furthest field declared before this one
    End,
}

impl From<usize> for Offset {
    fn from(offset: usize) -> Self {
        Self::At(offset)
    }
}

/// Length of a byte run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Len {
    Fixed(usize),
    Ref(&'static str),
    /// Everything to the end of the buffer
    ToEnd,
}

/// Element count of a list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Count {
    Fixed(usize),
    Ref(&'static str),
}

/// What a field decodes to
///
/// An `endian` of `None` inherits the enclosing record's byte order.
#[derive(Debug, Clone, Copy)]
pub enum Kind {
    UInt { width: Width, endian: Option<Endian> },
    SInt { width: Width, endian: Option<Endian> },
    /// Bit-packed sub-field, always read big-endian
    Bits { width: Width, mask: u32 },
    Bytes(Len),
    UIntList { width: Width, endian: Option<Endian>, count: Count },
    Record(&'static Schema),
    Records { schema: &'static Schema, count: Count },
    /// `len` bytes laid out by whichever schema the [`Variants`] table holds
    /// for the `selector` field's value; raw bytes when it holds none
    Variant { selector: &'static str, len: Len },
}

impl Kind {
    fn is_integer(&self) -> bool {
        matches!(self, Self::UInt { .. } | Self::Bits { .. })
    }

    /// Sibling fields this kind reads before it can decode
    fn references(&self) -> impl Iterator<Item = &'static str> {
        let (first, second) = match *self {
            Self::Bytes(Len::Ref(name)) => (Some(name), None),
            Self::UIntList { count: Count::Ref(name), .. } => (Some(name), None),
            Self::Records { count: Count::Ref(name), .. } => (Some(name), None),
            Self::Variant { selector, len } => (
                Some(selector),
                match len {
                    Len::Ref(name) => Some(name),
                    _ => None,
                },
            ),
            _ => (None, None),
        };
        first.into_iter().chain(second)
    }

    /// Whether the field's extent depends on where the buffer ends
    fn is_open_ended(&self) -> bool {
        matches!(
            self,
            Self::Bytes(Len::ToEnd) | Self::Variant { len: Len::ToEnd, .. }
        )
    }
}

/// Layouts a [`Kind::Variant`] field can take, keyed by its selector value
pub trait Variants {
    /// Schema for selector value `key`; `None` keeps the raw bytes
    fn schema(&self, key: u64) -> Option<&'static Schema>;
}

/// A single field descriptor
#[derive(Debug, Clone)]
pub struct Field {
    pub name: &'static str,
    pub offset: Offset,
    pub kind: Kind,
    /// Constant the decoded value must equal
    pub expect: Option<Value>,
}

impl Field {
    pub fn new(name: &'static str, offset: impl Into<Offset>, kind: Kind) -> Self {
        Self {
            name,
            offset: offset.into(),
            kind,
            expect: None,
        }
    }

    /// Require the decoded value to equal `value`
    pub fn constant(mut self, value: Value) -> Self {
        self.expect = Some(value);
        self
    }
}

/// Builder for [`Schema`]
pub struct SchemaBuilder {
    name: &'static str,
    endian: Option<Endian>,
    fields: Vec<Field>,
}

impl SchemaBuilder {
    /// Byte order for fields that don't declare one (inherited when unset)
    pub fn endian(mut self, endian: Endian) -> Self {
        self.endian = Some(endian);
        self
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn uint(self, name: &'static str, offset: usize, width: Width) -> Self {
        self.field(Field::new(name, offset, Kind::UInt { width, endian: None }))
    }

    pub fn bits(self, name: &'static str, offset: usize, mask: u32, width: Width) -> Self {
        self.field(Field::new(name, offset, Kind::Bits { width, mask }))
    }

    pub fn bytes(self, name: &'static str, offset: impl Into<Offset>, len: Len) -> Self {
        self.field(Field::new(name, offset, Kind::Bytes(len)))
    }

    /// Trailing byte run starting where the declared fields end
    pub fn trailing(self, name: &'static str) -> Self {
        self.bytes(name, Offset::End, Len::ToEnd)
    }

    pub fn record(self, name: &'static str, offset: usize, schema: &'static Schema) -> Self {
        self.field(Field::new(name, offset, Kind::Record(schema)))
    }

    /// `len` bytes whose layout is chosen by the value of `selector`
    pub fn variant(
        self,
        name: &'static str,
        offset: impl Into<Offset>,
        selector: &'static str,
        len: Len,
    ) -> Self {
        self.field(Field::new(name, offset, Kind::Variant { selector, len }))
    }

    /// Resolve references and fix the decode order
    pub fn build(self) -> std::result::Result<Schema, SchemaError> {
        let SchemaBuilder {
            name: schema,
            endian,
            fields,
        } = self;

        let index_of = |reference: &'static str, field: &'static str| {
            fields
                .iter()
                .position(|f| f.name == reference)
                .ok_or(SchemaError::UnknownReference {
                    schema,
                    field,
                    reference,
                })
        };

        for (i, f) in fields.iter().enumerate() {
            if fields[..i].iter().any(|other| other.name == f.name) {
                return Err(SchemaError::DuplicateField {
                    schema,
                    field: f.name,
                });
            }
        }

        // A nested record has no extent of its own to stop a run at
        for f in &fields {
            let nested = match f.kind {
                Kind::Record(nested) | Kind::Records { schema: nested, .. } => nested,
                _ => continue,
            };
            if nested.fields.iter().any(|n| n.kind.is_open_ended()) {
                return Err(SchemaError::Unbounded {
                    schema,
                    field: f.name,
                    nested: nested.name,
                });
            }
        }

        let mut deps: Vec<Vec<usize>> = Vec::with_capacity(fields.len());
        for (i, f) in fields.iter().enumerate() {
            let mut d = Vec::new();
            let offset_ref = match f.offset {
                Offset::Ref(reference) => Some(reference),
                _ => None,
            };
            for reference in offset_ref.into_iter().chain(f.kind.references()) {
                let target = index_of(reference, f.name)?;
                // Offsets, lengths, counts and selectors only come from unsigned integers
                if !fields[target].kind.is_integer() {
                    return Err(SchemaError::TypeMismatch {
                        record: schema,
                        field: reference,
                        expected: "an unsigned integer",
                    });
                }
                d.push(target);
            }
            if f.offset == Offset::End {
                d.extend(0..i);
            }
            d.sort_unstable();
            d.dedup();
            deps.push(d);
        }

        let order = decode_order(schema, &fields, &deps)?;
        trace!(schema, fields = fields.len(), "schema built");

        Ok(Schema {
            name: schema,
            endian,
            fields,
            order,
        })
    }
}

/// Topological order: independent fields first in declaration order, then
/// dependent fields as soon as everything they need is decoded.
fn decode_order(
    schema: &'static str,
    fields: &[Field],
    deps: &[Vec<usize>],
) -> std::result::Result<Vec<usize>, SchemaError> {
    let mut done = vec![false; fields.len()];
    let mut order = Vec::with_capacity(fields.len());

    while order.len() < fields.len() {
        let next = (0..fields.len())
            .filter(|&i| !done[i] && deps[i].iter().all(|&d| done[d]))
            .min_by_key(|&i| (!deps[i].is_empty(), i));

        match next {
            Some(i) => {
                done[i] = true;
                order.push(i);
            }
            None => {
                return Err(SchemaError::Cycle {
                    schema,
                    fields: (0..fields.len())
                        .filter(|&i| !done[i])
                        .map(|i| fields[i].name)
                        .collect(),
                });
            }
        }
    }

    Ok(order)
}

/// A reusable record layout
#[derive(Debug)]
pub struct Schema {
    name: &'static str,
    endian: Option<Endian>,
    fields: Vec<Field>,
    order: Vec<usize>,
}

impl Schema {
    pub fn builder(name: &'static str) -> SchemaBuilder {
        SchemaBuilder {
            name,
            endian: None,
            fields: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Field names in the order they are decoded
    pub fn decode_order(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.order.iter().map(|&i| self.fields[i].name)
    }

    /// Decode a record starting at `offset` in `buffer`
    ///
    /// Top-level records default to big-endian unless the schema says
    /// otherwise. Variant fields keep their raw bytes.
    pub fn decode(&self, buffer: &[u8], offset: usize) -> Result<Record> {
        self.decode_with(buffer, offset, Endian::Big, None)
    }

    /// Decode a record, laying out variant fields from `variants`
    pub fn decode_variants(
        &self,
        buffer: &[u8],
        offset: usize,
        variants: &dyn Variants,
    ) -> Result<Record> {
        self.decode_with(buffer, offset, Endian::Big, Some(variants))
    }

    fn decode_with(
        &self,
        buffer: &[u8],
        base: usize,
        inherited: Endian,
        variants: Option<&dyn Variants>,
    ) -> Result<Record> {
        let endian = self.endian.unwrap_or(inherited);
        let mut values: Vec<Option<Value>> = vec![None; self.fields.len()];
        let mut ends = vec![0usize; self.fields.len()];

        for &i in &self.order {
            let field = &self.fields[i];

            let relative = match field.offset {
                Offset::At(at) => at,
                Offset::Ref(name) => self.referenced(&values, name)?,
                Offset::End => ends[..i].iter().copied().max().unwrap_or(0),
            };
            let at = base + relative;

            let (value, len) = match field.kind {
                Kind::UInt { width, endian: own } => (
                    Value::UInt(field::decode(buffer, at, width, own.unwrap_or(endian))?),
                    width.bytes(),
                ),
                Kind::SInt { width, endian: own } => (
                    Value::SInt(field::decode_signed(buffer, at, width, own.unwrap_or(endian))?),
                    width.bytes(),
                ),
                Kind::Bits { width, mask } => (
                    Value::UInt(field::decode_bits(buffer, at, mask, width)?),
                    width.bytes(),
                ),
                Kind::Bytes(len) => {
                    let len = self.run_len(&values, buffer, at, len)?;
                    (Value::Bytes(field::bytes_at(buffer, at, len)?.to_vec()), len)
                }
                Kind::UIntList {
                    width,
                    endian: own,
                    count,
                } => {
                    let count = self.count(&values, count)?;
                    let need = count.saturating_mul(width.bytes());
                    field::bytes_at(buffer, at, need)?;
                    let list = (0..count)
                        .map(|n| {
                            let at = at + n * width.bytes();
                            field::decode(buffer, at, width, own.unwrap_or(endian))
                        })
                        .collect::<Result<Vec<_>>>()?;
                    (Value::List(list), need)
                }
                Kind::Record(schema) => {
                    let record = schema.decode_with(buffer, at, endian, variants)?;
                    let len = record.len;
                    (Value::Record(Box::new(record)), len)
                }
                Kind::Records { schema, count } => {
                    let count = self.count(&values, count)?;
                    let mut records = Vec::with_capacity(count.min(4096));
                    let mut cursor = at;
                    for _ in 0..count {
                        let record = schema.decode_with(buffer, cursor, endian, variants)?;
                        cursor += record.len;
                        records.push(record);
                    }
                    (Value::Records(records), cursor - at)
                }
                Kind::Variant { selector, len } => {
                    let key = self.referenced(&values, selector)? as u64;
                    let len = self.run_len(&values, buffer, at, len)?;
                    let raw = field::bytes_at(buffer, at, len)?;
                    match variants.and_then(|v| v.schema(key)) {
                        Some(schema) => {
                            // The body never reads past its own run
                            let body = &buffer[..at + len];
                            let record = schema.decode_with(body, at, endian, variants)?;
                            (Value::Record(Box::new(record)), len)
                        }
                        None => {
                            trace!(
                                record = self.name,
                                field = field.name,
                                key,
                                "no layout for variant"
                            );
                            (Value::Bytes(raw.to_vec()), len)
                        }
                    }
                }
            };

            if let Some(expected) = &field.expect
                && *expected != value
            {
                return Err(RifxError::FormatViolation {
                    record: self.name,
                    field: field.name,
                    expected: expected.to_string(),
                    found: value.to_string(),
                });
            }

            ends[i] = relative + len;
            values[i] = Some(value);
        }

        let len = ends.iter().copied().max().unwrap_or(0);
        let fields = self
            .fields
            .iter()
            .zip(values)
            .filter_map(|(f, v)| v.map(|v| (f.name, v)))
            .collect();

        Ok(Record {
            name: self.name,
            offset: base,
            len,
            fields,
        })
    }

    fn referenced(&self, values: &[Option<Value>], name: &'static str) -> Result<usize> {
        let index = self.fields.iter().position(|f| f.name == name);
        match index.and_then(|i| values[i].as_ref()) {
            Some(Value::UInt(v)) => Ok(*v as usize),
            Some(_) => Err(SchemaError::TypeMismatch {
                record: self.name,
                field: name,
                expected: "an unsigned integer",
            }
            .into()),
            None => Err(SchemaError::MissingField {
                record: self.name,
                field: name,
            }
            .into()),
        }
    }

    fn run_len(
        &self,
        values: &[Option<Value>],
        buffer: &[u8],
        at: usize,
        len: Len,
    ) -> Result<usize> {
        match len {
            Len::Fixed(n) => Ok(n),
            Len::Ref(name) => self.referenced(values, name),
            Len::ToEnd => Ok(buffer.len().saturating_sub(at)),
        }
    }

    fn count(&self, values: &[Option<Value>], count: Count) -> Result<usize> {
        match count {
            Count::Fixed(n) => Ok(n),
            Count::Ref(name) => self.referenced(values, name),
        }
    }
}
