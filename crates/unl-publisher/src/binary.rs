//! Canonical binary field encoding
//!
//! Every field is written as a field header (type code + field code packed
//! into one to three bytes) followed by its value. Fixed-width integers are
//! written big-endian; blobs carry a variable length prefix. Objects are
//! serialized with their fields sorted by `(type code, field code)`.

use std::collections::BTreeMap;
use unl_core::{Result, UnlError};

/// Type code of 32-bit unsigned integers
pub const TYPE_UINT32: u8 = 2;
/// Type code of variable-length blobs
pub const TYPE_BLOB: u8 = 7;

/// Largest length a variable length prefix can express
pub const MAX_VL_LENGTH: usize = 918_744;

/// Identifies a field by its type code and field code
///
/// Ordering follows canonical serialization order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldId {
    /// Serialized type of the field
    pub type_code: u8,
    /// Field number within its type
    pub field_code: u8,
}

impl FieldId {
    /// Create a field id
    pub const fn new(type_code: u8, field_code: u8) -> Self {
        Self {
            type_code,
            field_code,
        }
    }

    /// Encoded field header
    pub fn header(&self) -> Vec<u8> {
        encode_field_header(self.type_code, self.field_code)
    }

    /// Whether the field is part of signing data
    pub fn is_signing_field(&self) -> bool {
        !matches!(*self, fields::SIGNATURE | fields::MASTER_SIGNATURE)
    }
}

/// Fields used by manifests
pub mod fields {
    use super::{FieldId, TYPE_BLOB, TYPE_UINT32};

    /// Manifest sequence number
    pub const SEQUENCE: FieldId = FieldId::new(TYPE_UINT32, 4);
    /// Master public key
    pub const PUBLIC_KEY: FieldId = FieldId::new(TYPE_BLOB, 1);
    /// Ephemeral signing public key
    pub const SIGNING_PUB_KEY: FieldId = FieldId::new(TYPE_BLOB, 3);
    /// Signature by the ephemeral key
    pub const SIGNATURE: FieldId = FieldId::new(TYPE_BLOB, 6);
    /// Validator domain
    pub const DOMAIN: FieldId = FieldId::new(TYPE_BLOB, 7);
    /// Signature by the master key
    pub const MASTER_SIGNATURE: FieldId = FieldId::new(TYPE_BLOB, 18);

    /// Human-readable name of a known field
    pub fn name(id: FieldId) -> Option<&'static str> {
        Some(match id {
            SEQUENCE => "Sequence",
            PUBLIC_KEY => "PublicKey",
            SIGNING_PUB_KEY => "SigningPubKey",
            SIGNATURE => "Signature",
            DOMAIN => "Domain",
            MASTER_SIGNATURE => "MasterSignature",
            _ => return None,
        })
    }
}

/// Pack a type code and field code into a field header
pub fn encode_field_header(type_code: u8, field_code: u8) -> Vec<u8> {
    match (type_code < 16, field_code < 16) {
        (true, true) => vec![(type_code << 4) | field_code],
        (true, false) => vec![type_code << 4, field_code],
        (false, true) => vec![field_code, type_code],
        (false, false) => vec![0, type_code, field_code],
    }
}

/// Read a field header, returning the field and the number of bytes consumed
pub fn decode_field_header(bytes: &[u8]) -> Result<(FieldId, usize)> {
    let truncated = || UnlError::decoding("truncated field header");
    let first = *bytes.first().ok_or_else(truncated)?;
    let (high, low) = (first >> 4, first & 0x0F);

    match (high, low) {
        (0, 0) => {
            let type_code = *bytes.get(1).ok_or_else(truncated)?;
            let field_code = *bytes.get(2).ok_or_else(truncated)?;
            Ok((FieldId::new(type_code, field_code), 3))
        }
        (0, field_code) => {
            let type_code = *bytes.get(1).ok_or_else(truncated)?;
            Ok((FieldId::new(type_code, field_code), 2))
        }
        (type_code, 0) => {
            let field_code = *bytes.get(1).ok_or_else(truncated)?;
            Ok((FieldId::new(type_code, field_code), 2))
        }
        (type_code, field_code) => Ok((FieldId::new(type_code, field_code), 1)),
    }
}

/// Encode a blob length as a variable length prefix (1 to 3 bytes)
pub fn encode_vl_length(len: usize) -> Result<Vec<u8>> {
    match len {
        0..=192 => Ok(vec![len as u8]),
        193..=12_480 => {
            let rest = len - 193;
            Ok(vec![193 + (rest >> 8) as u8, (rest & 0xFF) as u8])
        }
        12_481..=MAX_VL_LENGTH => {
            let rest = len - 12_481;
            Ok(vec![
                241 + (rest >> 16) as u8,
                ((rest >> 8) & 0xFF) as u8,
                (rest & 0xFF) as u8,
            ])
        }
        _ => Err(UnlError::encoding(format!(
            "blob of {len} bytes exceeds the maximum of {MAX_VL_LENGTH}"
        ))),
    }
}

/// Decode a variable length prefix, returning the length and bytes consumed
pub fn decode_vl_length(bytes: &[u8]) -> Result<(usize, usize)> {
    let truncated = || UnlError::decoding("truncated length prefix");
    let b1 = *bytes.first().ok_or_else(truncated)? as usize;
    match b1 {
        0..=192 => Ok((b1, 1)),
        193..=240 => {
            let b2 = *bytes.get(1).ok_or_else(truncated)? as usize;
            Ok((193 + ((b1 - 193) << 8) + b2, 2))
        }
        241..=254 => {
            let b2 = *bytes.get(1).ok_or_else(truncated)? as usize;
            let b3 = *bytes.get(2).ok_or_else(truncated)? as usize;
            Ok((12_481 + ((b1 - 241) << 16) + (b2 << 8) + b3, 3))
        }
        _ => Err(UnlError::decoding(format!("invalid length prefix byte {b1}"))),
    }
}

/// Appends tagged fields to a byte buffer
#[derive(Debug, Default, Clone)]
pub struct TaggedFieldWriter {
    buf: Vec<u8>,
}

impl TaggedFieldWriter {
    /// Create an empty writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer whose output starts with `prefix`
    pub fn with_prefix(prefix: &[u8]) -> Self {
        Self {
            buf: prefix.to_vec(),
        }
    }

    /// Append a 32-bit field: header, then 4 big-endian bytes
    pub fn append_u32(&mut self, field: FieldId, value: u32) -> Result<&mut Self> {
        expect_type(field, TYPE_UINT32)?;
        self.buf.extend_from_slice(&field.header());
        self.buf.extend_from_slice(&value.to_be_bytes());
        Ok(self)
    }

    /// Append a blob field: header, length prefix, then the raw bytes
    pub fn append_blob(&mut self, field: FieldId, value: &[u8]) -> Result<&mut Self> {
        expect_type(field, TYPE_BLOB)?;
        let length = encode_vl_length(value.len())?;
        self.buf.extend_from_slice(&field.header());
        self.buf.extend_from_slice(&length);
        self.buf.extend_from_slice(value);
        Ok(self)
    }

    /// Append a field value of either kind
    pub fn append(&mut self, field: FieldId, value: &FieldValue) -> Result<&mut Self> {
        match value {
            FieldValue::UInt32(v) => self.append_u32(field, *v),
            FieldValue::Blob(v) => self.append_blob(field, v),
        }
    }

    /// Bytes written so far
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consume the writer, returning its bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

fn expect_type(field: FieldId, type_code: u8) -> Result<()> {
    if field.type_code != type_code {
        return Err(UnlError::encoding(format!(
            "field ({}, {}) does not have type {type_code}",
            field.type_code, field.field_code
        )));
    }
    Ok(())
}

/// A serialized field value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// 32-bit unsigned integer
    UInt32(u32),
    /// Variable-length blob
    Blob(Vec<u8>),
}

impl FieldValue {
    fn type_code(&self) -> u8 {
        match self {
            FieldValue::UInt32(_) => TYPE_UINT32,
            FieldValue::Blob(_) => TYPE_BLOB,
        }
    }
}

/// An object of tagged fields, kept in canonical order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StObject {
    fields: BTreeMap<FieldId, FieldValue>,
}

impl StObject {
    /// Create an empty object
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, checking that the value matches the field's type
    pub fn insert(&mut self, field: FieldId, value: FieldValue) -> Result<()> {
        if field.type_code != value.type_code() {
            return Err(UnlError::encoding(format!(
                "value of type {} does not fit field ({}, {})",
                value.type_code(),
                field.type_code,
                field.field_code
            )));
        }
        self.fields.insert(field, value);
        Ok(())
    }

    /// Get a field value
    pub fn get(&self, field: FieldId) -> Option<&FieldValue> {
        self.fields.get(&field)
    }

    /// Get a 32-bit field
    pub fn get_u32(&self, field: FieldId) -> Option<u32> {
        match self.fields.get(&field) {
            Some(FieldValue::UInt32(v)) => Some(*v),
            _ => None,
        }
    }

    /// Get a blob field
    pub fn get_blob(&self, field: FieldId) -> Option<&[u8]> {
        match self.fields.get(&field) {
            Some(FieldValue::Blob(v)) => Some(v),
            _ => None,
        }
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the object has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (&FieldId, &FieldValue)> {
        self.fields.iter()
    }

    /// Serialize all fields in canonical order
    pub fn encode(&self) -> Result<Vec<u8>> {
        self.write_into(TaggedFieldWriter::new(), |_| true)
    }

    /// Serialize the signing fields after `prefix`
    pub fn signing_data(&self, prefix: &[u8]) -> Result<Vec<u8>> {
        self.write_into(TaggedFieldWriter::with_prefix(prefix), FieldId::is_signing_field)
    }

    fn write_into(
        &self,
        mut writer: TaggedFieldWriter,
        include: impl Fn(&FieldId) -> bool,
    ) -> Result<Vec<u8>> {
        for (field, value) in self.fields.iter().filter(|(f, _)| include(*f)) {
            writer.append(*field, value)?;
        }
        Ok(writer.into_bytes())
    }

    /// Parse a serialized object, rejecting non-canonical field order
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut object = Self::new();
        let mut previous: Option<FieldId> = None;
        let mut pos = 0;

        while pos < bytes.len() {
            let (field, header_len) = decode_field_header(&bytes[pos..])?;
            pos += header_len;

            if previous.is_some_and(|p| p >= field) {
                return Err(UnlError::decoding(format!(
                    "field ({}, {}) out of canonical order",
                    field.type_code, field.field_code
                )));
            }
            previous = Some(field);

            let value = match field.type_code {
                TYPE_UINT32 => {
                    let raw: [u8; 4] = bytes
                        .get(pos..pos + 4)
                        .and_then(|s| s.try_into().ok())
                        .ok_or_else(|| UnlError::decoding("truncated 32-bit field"))?;
                    pos += 4;
                    FieldValue::UInt32(u32::from_be_bytes(raw))
                }
                TYPE_BLOB => {
                    let (len, prefix_len) = decode_vl_length(&bytes[pos..])?;
                    pos += prefix_len;
                    let raw = bytes
                        .get(pos..pos + len)
                        .ok_or_else(|| UnlError::decoding("truncated blob field"))?;
                    pos += len;
                    FieldValue::Blob(raw.to_vec())
                }
                other => {
                    return Err(UnlError::decoding(format!(
                        "unsupported field type {other}"
                    )))
                }
            };
            object.fields.insert(field, value);
        }

        Ok(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_field_headers() {
        assert_eq!(fields::SEQUENCE.header(), vec![0x24]);
        assert_eq!(fields::PUBLIC_KEY.header(), vec![0x71]);
        assert_eq!(fields::SIGNING_PUB_KEY.header(), vec![0x73]);
        assert_eq!(fields::SIGNATURE.header(), vec![0x76]);
        assert_eq!(fields::DOMAIN.header(), vec![0x77]);
        assert_eq!(fields::MASTER_SIGNATURE.header(), vec![0x70, 0x12]);
        assert_eq!(encode_field_header(16, 3), vec![0x03, 16]);
        assert_eq!(encode_field_header(16, 16), vec![0x00, 16, 16]);
    }

    #[test]
    fn test_field_header_decoding() {
        for (t, f) in [(2, 4), (7, 18), (16, 3), (16, 16), (1, 1)] {
            let header = encode_field_header(t, f);
            assert_eq!(
                decode_field_header(&header).unwrap(),
                (FieldId::new(t, f), header.len())
            );
        }
        assert_matches!(decode_field_header(&[0x70]), Err(UnlError::Decoding { .. }));
    }

    #[test]
    fn test_vl_length_boundaries() {
        assert_eq!(encode_vl_length(0).unwrap(), vec![0]);
        assert_eq!(encode_vl_length(33).unwrap(), vec![33]);
        assert_eq!(encode_vl_length(192).unwrap(), vec![192]);
        assert_eq!(encode_vl_length(193).unwrap(), vec![193, 0]);
        assert_eq!(encode_vl_length(12_480).unwrap(), vec![240, 255]);
        assert_eq!(encode_vl_length(12_481).unwrap(), vec![241, 0, 0]);
        assert_eq!(encode_vl_length(918_744).unwrap(), vec![254, 212, 23]);
        assert_matches!(encode_vl_length(918_745), Err(UnlError::Encoding { .. }));

        for len in [0, 192, 193, 500, 12_480, 12_481, 100_000, 918_744] {
            let prefix = encode_vl_length(len).unwrap();
            assert_eq!(decode_vl_length(&prefix).unwrap(), (len, prefix.len()));
        }
        assert_matches!(decode_vl_length(&[255]), Err(UnlError::Decoding { .. }));
    }

    #[test]
    fn test_writer_layout() {
        let mut writer = TaggedFieldWriter::with_prefix(b"MAN\0");
        writer
            .append_u32(fields::SEQUENCE, 1)
            .unwrap()
            .append_blob(fields::DOMAIN, b"ab")
            .unwrap();
        assert_eq!(
            writer.into_bytes(),
            vec![b'M', b'A', b'N', 0, 0x24, 0, 0, 0, 1, 0x77, 2, b'a', b'b']
        );
    }

    #[test]
    fn test_writer_rejects_type_mismatch() {
        let mut writer = TaggedFieldWriter::new();
        assert_matches!(
            writer.append_u32(fields::PUBLIC_KEY, 1),
            Err(UnlError::Encoding { .. })
        );
        assert_matches!(
            writer.append_blob(fields::SEQUENCE, b""),
            Err(UnlError::Encoding { .. })
        );
    }

    #[test]
    fn test_object_canonical_order_and_signing_data() {
        let mut object = StObject::new();
        object
            .insert(fields::MASTER_SIGNATURE, FieldValue::Blob(vec![9]))
            .unwrap();
        object.insert(fields::DOMAIN, FieldValue::Blob(vec![8])).unwrap();
        object.insert(fields::SIGNATURE, FieldValue::Blob(vec![7])).unwrap();
        object.insert(fields::SEQUENCE, FieldValue::UInt32(2)).unwrap();

        assert_eq!(
            object.encode().unwrap(),
            vec![0x24, 0, 0, 0, 2, 0x76, 1, 7, 0x77, 1, 8, 0x70, 0x12, 1, 9]
        );
        assert_eq!(
            object.signing_data(b"P").unwrap(),
            vec![b'P', 0x24, 0, 0, 0, 2, 0x77, 1, 8]
        );

        let decoded = StObject::decode(&object.encode().unwrap()).unwrap();
        assert_eq!(decoded, object);
    }

    #[test]
    fn test_object_decode_rejects_bad_input() {
        // Domain before Sequence
        let out_of_order = [0x77, 1, 8, 0x24, 0, 0, 0, 2];
        assert_matches!(StObject::decode(&out_of_order), Err(UnlError::Decoding { .. }));

        // Duplicate field
        let duplicate = [0x24, 0, 0, 0, 1, 0x24, 0, 0, 0, 2];
        assert_matches!(StObject::decode(&duplicate), Err(UnlError::Decoding { .. }));

        // Blob shorter than its prefix claims
        assert_matches!(StObject::decode(&[0x71, 5, 1]), Err(UnlError::Decoding { .. }));

        // Unsupported type
        assert_matches!(StObject::decode(&[0x81, 0]), Err(UnlError::Decoding { .. }));
    }

    #[test]
    fn test_insert_rejects_type_mismatch() {
        let mut object = StObject::new();
        assert_matches!(
            object.insert(fields::SEQUENCE, FieldValue::Blob(vec![])),
            Err(UnlError::Encoding { .. })
        );
        assert!(object.is_empty());
    }
}
