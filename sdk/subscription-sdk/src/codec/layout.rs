//! Ordered field descriptors shared by the encoder and the decoder.
//!
//! Every byte layout the billing program uses (account storage and
//! instruction arguments) is written down once as a slice of [`Field`]s.
//! [`FieldWriter`] and [`FieldReader`] walk the same slice, so adding a field
//! changes both directions at once.

use crate::error::DecodeError;
use solana_sdk::pubkey::Pubkey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Pubkey,
    U8,
    Bool,
    U64,
    I64,
    /// 1-byte presence tag, then 8 bytes iff the tag is 1.
    OptionU64,
    OptionI64,
}

impl FieldKind {
    /// Encoded width when an optional value is absent.
    pub const fn min_width(self) -> usize {
        match self {
            FieldKind::Pubkey => 32,
            FieldKind::U8 | FieldKind::Bool => 1,
            FieldKind::U64 | FieldKind::I64 => 8,
            FieldKind::OptionU64 | FieldKind::OptionI64 => 1,
        }
    }

    /// Encoded width when an optional value is present.
    pub const fn max_width(self) -> usize {
        match self {
            FieldKind::OptionU64 | FieldKind::OptionI64 => 9,
            other => other.min_width(),
        }
    }

    pub const fn is_signed(self) -> bool {
        matches!(self, FieldKind::I64 | FieldKind::OptionI64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl Field {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }
}

/// Smallest encoding of `fields` (every option absent).
pub const fn min_len(fields: &[Field]) -> usize {
    let mut total = 0;
    let mut i = 0;
    while i < fields.len() {
        total += fields[i].kind.min_width();
        i += 1;
    }
    total
}

/// Largest encoding of `fields` (every option present).
pub const fn max_len(fields: &[Field]) -> usize {
    let mut total = 0;
    let mut i = 0;
    while i < fields.len() {
        total += fields[i].kind.max_width();
        i += 1;
    }
    total
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue {
    Pubkey(Pubkey),
    U8(u8),
    Bool(bool),
    U64(u64),
    I64(i64),
    OptionU64(Option<u64>),
    OptionI64(Option<i64>),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Pubkey(_) => FieldKind::Pubkey,
            FieldValue::U8(_) => FieldKind::U8,
            FieldValue::Bool(_) => FieldKind::Bool,
            FieldValue::U64(_) => FieldKind::U64,
            FieldValue::I64(_) => FieldKind::I64,
            FieldValue::OptionU64(_) => FieldKind::OptionU64,
            FieldValue::OptionI64(_) => FieldKind::OptionI64,
        }
    }
}

/// Cursor over an untrusted buffer. Every read is bounds checked.
pub struct FieldReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> FieldReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::at(data, 0)
    }

    /// Start reading at `offset`. Length errors still count the whole buffer.
    pub fn at(data: &'a [u8], offset: usize) -> Self {
        Self { data, offset }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let end = self.offset + N;
        let bytes = self
            .data
            .get(self.offset..end)
            .ok_or(DecodeError::TooSmall {
                len: self.data.len(),
                min: end,
            })?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        self.offset = end;
        Ok(out)
    }

    fn presence(&mut self, field: &Field) -> Result<bool, DecodeError> {
        match self.take::<1>()?[0] {
            0 => Ok(false),
            1 => Ok(true),
            tag => Err(DecodeError::GarbageValue {
                field: field.name,
                reason: format!("option tag {tag}"),
            }),
        }
    }

    pub fn read(&mut self, field: &Field) -> Result<FieldValue, DecodeError> {
        let value = match field.kind {
            FieldKind::Pubkey => FieldValue::Pubkey(Pubkey::new_from_array(self.take::<32>()?)),
            FieldKind::U8 => FieldValue::U8(self.take::<1>()?[0]),
            FieldKind::Bool => match self.take::<1>()?[0] {
                0 => FieldValue::Bool(false),
                1 => FieldValue::Bool(true),
                byte => {
                    return Err(DecodeError::GarbageValue {
                        field: field.name,
                        reason: format!("bool byte {byte}"),
                    })
                },
            },
            FieldKind::U64 => FieldValue::U64(u64::from_le_bytes(self.take::<8>()?)),
            FieldKind::I64 => FieldValue::I64(i64::from_le_bytes(self.take::<8>()?)),
            // The tag decides whether the next 8 bytes belong to this field.
            FieldKind::OptionU64 => FieldValue::OptionU64(if self.presence(field)? {
                Some(u64::from_le_bytes(self.take::<8>()?))
            } else {
                None
            }),
            FieldKind::OptionI64 => FieldValue::OptionI64(if self.presence(field)? {
                Some(i64::from_le_bytes(self.take::<8>()?))
            } else {
                None
            }),
        };
        Ok(value)
    }

    pub fn read_all(&mut self, fields: &[Field]) -> Result<Vec<FieldValue>, DecodeError> {
        fields.iter().map(|field| self.read(field)).collect()
    }
}

#[derive(Debug, Default)]
pub struct FieldWriter {
    buffer: Vec<u8>,
}

impl FieldWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(prefix: &[u8]) -> Self {
        Self {
            buffer: prefix.to_vec(),
        }
    }

    /// Append `value` as `field`. Fails if the value's kind differs from the
    /// descriptor's.
    pub fn write(&mut self, field: &Field, value: &FieldValue) -> Result<(), String> {
        if value.kind() != field.kind {
            return Err(format!(
                "field `{}` expects {:?}, got {:?}",
                field.name,
                field.kind,
                value.kind()
            ));
        }

        match *value {
            FieldValue::Pubkey(key) => self.buffer.extend_from_slice(key.as_ref()),
            FieldValue::U8(v) => self.buffer.push(v),
            FieldValue::Bool(v) => self.buffer.push(v as u8),
            FieldValue::U64(v) => self.buffer.extend_from_slice(&v.to_le_bytes()),
            FieldValue::I64(v) => self.buffer.extend_from_slice(&v.to_le_bytes()),
            FieldValue::OptionU64(v) => self.option(v.map(u64::to_le_bytes)),
            FieldValue::OptionI64(v) => self.option(v.map(i64::to_le_bytes)),
        }
        Ok(())
    }

    fn option(&mut self, bytes: Option<[u8; 8]>) {
        match bytes {
            Some(bytes) => {
                self.buffer.push(1);
                self.buffer.extend_from_slice(&bytes);
            },
            None => self.buffer.push(0),
        }
    }

    pub fn write_all(&mut self, fields: &[Field], values: &[FieldValue]) -> Result<(), String> {
        if fields.len() != values.len() {
            return Err(format!(
                "layout has {} fields, got {} values",
                fields.len(),
                values.len()
            ));
        }
        for (field, value) in fields.iter().zip(values) {
            self.write(field, value)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}
