//! Binary exchange format for compiled segments.
//!
//! ```text
//! magic     "SGDX"       4 bytes
//! version   u16 LE
//! reserved  u16 LE       must be 0
//! body_len  u64 LE
//! body      body_len bytes
//! checksum  u32 LE       crc32 of body
//! ```
//!
//! Integers inside the body are LEB128 varints and strings are
//! varint-length-prefixed UTF-8. The body lists the schema, the stored
//! documents, then for each field its exact dictionary, its text dictionary
//! and its norms. Dictionaries are written in term order and postings in
//! doc id order, so encoding is a pure function of the segment content.

use std::io::{Cursor, Read};
use std::sync::Arc;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::engine::data::{FieldIndex, Posting, PostingList, SegmentData, StoredDocument, TermDictionary};
use crate::error::{Result, SegdexError};
use crate::schema::{FieldOptions, Schema};
use crate::util::varint;

/// Leading bytes of every exported segment.
pub const MAGIC: &[u8; 4] = b"SGDX";

/// Current format version.
pub const FORMAT_VERSION: u16 = 1;

/// Bytes before the body: magic, version, reserved, body length.
pub const HEADER_LEN: usize = 4 + 2 + 2 + 8;

/// Bytes after the body.
pub const TRAILER_LEN: usize = 4;

/// Serialize a segment.
pub fn encode(segment: &SegmentData) -> Result<Vec<u8>> {
    let mut body = SegmentWriter::new();
    body.write_segment(segment)?;
    let body = body.into_inner();

    let mut out = Vec::with_capacity(HEADER_LEN + body.len() + TRAILER_LEN);
    out.extend_from_slice(MAGIC);
    out.write_u16::<LittleEndian>(FORMAT_VERSION)?;
    out.write_u16::<LittleEndian>(0)?;
    out.write_u64::<LittleEndian>(body.len() as u64)?;
    out.extend_from_slice(&body);
    out.write_u32::<LittleEndian>(crc32fast::hash(&body))?;
    Ok(out)
}

/// Parse a segment previously produced by [`encode`].
pub fn decode(data: &[u8]) -> Result<SegmentData> {
    if data.len() < HEADER_LEN + TRAILER_LEN {
        return Err(SegdexError::corrupt(format!(
            "segment data too short: {} bytes",
            data.len()
        )));
    }
    if &data[..4] != MAGIC {
        return Err(SegdexError::corrupt("bad magic, not a segment"));
    }

    let mut header = Cursor::new(&data[4..HEADER_LEN]);
    let version = header.read_u16::<LittleEndian>()?;
    if version != FORMAT_VERSION {
        return Err(SegdexError::corrupt(format!(
            "unsupported segment format version {version} (expected {FORMAT_VERSION})"
        )));
    }
    let reserved = header.read_u16::<LittleEndian>()?;
    if reserved != 0 {
        return Err(SegdexError::corrupt("reserved header bits are set"));
    }
    let body_len = header.read_u64::<LittleEndian>()?;

    let expected = body_len
        .checked_add((HEADER_LEN + TRAILER_LEN) as u64)
        .ok_or_else(|| SegdexError::corrupt(format!("body length {body_len} overflows")))?;
    if data.len() as u64 != expected {
        return Err(SegdexError::corrupt(format!(
            "segment length {} does not match header ({expected})",
            data.len()
        )));
    }

    let body_end = HEADER_LEN + body_len as usize;
    let body = &data[HEADER_LEN..body_end];
    let stored_checksum = Cursor::new(&data[body_end..]).read_u32::<LittleEndian>()?;
    if crc32fast::hash(body) != stored_checksum {
        return Err(SegdexError::corrupt("checksum mismatch"));
    }

    let mut reader = SegmentReader::new(body);
    let segment = reader.read_segment()?;
    if !reader.is_eof() {
        return Err(SegdexError::corrupt("trailing bytes after segment body"));
    }
    Ok(segment)
}

/// Writer for the segment body.
struct SegmentWriter {
    buf: Vec<u8>,
}

impl SegmentWriter {
    fn new() -> Self {
        SegmentWriter { buf: Vec::new() }
    }

    fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    fn write_varint(&mut self, value: u64) {
        varint::put_u64(&mut self.buf, value);
    }

    fn write_string(&mut self, value: &str) {
        self.write_varint(value.len() as u64);
        self.buf.extend_from_slice(value.as_bytes());
    }

    fn write_segment(&mut self, segment: &SegmentData) -> Result<()> {
        let schema = &segment.schema;
        if segment.fields.len() != schema.len() {
            return Err(SegdexError::state(
                "segment field indexes do not match its schema",
            ));
        }

        self.write_varint(schema.len() as u64);
        for field in schema.fields() {
            self.write_string(field.name());
            self.write_u8(field.options().to_bits());
        }

        self.write_varint(segment.stored.len() as u64);
        for doc in &segment.stored {
            self.write_varint(doc.len() as u64);
            for (ordinal, value) in doc {
                self.write_varint(*ordinal as u64);
                self.write_string(value);
            }
        }

        for index in &segment.fields {
            if let Some(dictionary) = &index.exact {
                self.write_dictionary(dictionary);
            }
            if let Some(dictionary) = &index.text {
                self.write_dictionary(dictionary);
                for &norm in &index.norms {
                    self.write_varint(norm as u64);
                }
            }
        }
        Ok(())
    }

    fn write_dictionary(&mut self, dictionary: &TermDictionary) {
        self.write_varint(dictionary.len() as u64);
        for (term, postings) in dictionary {
            self.write_string(term);
            self.write_varint(postings.len() as u64);
            let mut previous = 0u32;
            for posting in postings {
                self.write_varint((posting.doc_id - previous) as u64);
                self.write_varint(posting.term_freq as u64);
                previous = posting.doc_id;
            }
        }
    }
}

/// Reader for the segment body. Every structural inconsistency is reported
/// as corrupt data.
struct SegmentReader<'a> {
    cursor: Cursor<&'a [u8]>,
    len: u64,
}

impl<'a> SegmentReader<'a> {
    fn new(body: &'a [u8]) -> Self {
        SegmentReader {
            len: body.len() as u64,
            cursor: Cursor::new(body),
        }
    }

    fn remaining(&self) -> u64 {
        self.len.saturating_sub(self.cursor.position())
    }

    fn is_eof(&self) -> bool {
        self.remaining() == 0
    }

    fn read_u8(&mut self) -> Result<u8> {
        self.cursor.read_u8().map_err(truncated)
    }

    fn read_varint(&mut self) -> Result<u64> {
        varint::read_u64(&mut self.cursor).map_err(|e| match e {
            SegdexError::Io(io) => truncated(io),
            other => other,
        })
    }

    fn read_u32_varint(&mut self, what: &str) -> Result<u32> {
        let value = self.read_varint()?;
        u32::try_from(value).map_err(|_| SegdexError::corrupt(format!("{what} out of range: {value}")))
    }

    /// Read a count, rejecting values that could not fit in the remaining
    /// bytes given each element takes at least `min_element_len` bytes.
    fn read_count(&mut self, min_element_len: u64, what: &str) -> Result<usize> {
        let count = self.read_varint()?;
        if count.saturating_mul(min_element_len) > self.remaining() {
            return Err(SegdexError::corrupt(format!(
                "{what} count {count} exceeds remaining data"
            )));
        }
        Ok(count as usize)
    }

    fn read_string(&mut self) -> Result<String> {
        let length = self.read_count(1, "string length")?;
        let mut bytes = vec![0u8; length];
        self.cursor.read_exact(&mut bytes).map_err(truncated)?;
        String::from_utf8(bytes).map_err(|e| SegdexError::corrupt(format!("Invalid UTF-8: {e}")))
    }

    fn read_segment(&mut self) -> Result<SegmentData> {
        let field_count = self.read_count(2, "field")?;
        let mut fields = Vec::with_capacity(field_count);
        for _ in 0..field_count {
            let name = self.read_string()?;
            let bits = self.read_u8()?;
            let options = FieldOptions::from_bits(bits)
                .ok_or_else(|| SegdexError::corrupt(format!("unknown capability bits {bits:#x}")))?;
            fields.push((name, options));
        }
        let schema = Schema::new(fields.clone())
            .map_err(|e| SegdexError::corrupt(format!("invalid schema: {e}")))?;
        // Field order on disk must already be the ordinal order.
        if schema.fields().iter().map(|f| f.name()).ne(fields.iter().map(|(n, _)| n.as_str())) {
            return Err(SegdexError::corrupt("schema fields are not in ordinal order"));
        }
        let schema = Arc::new(schema);

        let doc_count = self.read_count(1, "document")?;
        if doc_count > u32::MAX as usize {
            return Err(SegdexError::corrupt("too many documents"));
        }
        let mut stored = Vec::with_capacity(doc_count);
        for _ in 0..doc_count {
            stored.push(self.read_stored_document(&schema)?);
        }

        let mut indexes = Vec::with_capacity(schema.len());
        for field in schema.fields() {
            let options = field.options();
            let mut index = FieldIndex::default();
            if options.is_exact() {
                index.exact = Some(self.read_dictionary(doc_count as u32)?);
            }
            if options.is_text() {
                index.text = Some(self.read_dictionary(doc_count as u32)?);
                let mut norms = Vec::with_capacity(doc_count);
                for _ in 0..doc_count {
                    norms.push(self.read_u32_varint("norm")?);
                }
                index.norms = norms;
            }
            indexes.push(index);
        }

        Ok(SegmentData {
            schema,
            stored,
            fields: indexes,
        })
    }

    fn read_stored_document(&mut self, schema: &Schema) -> Result<StoredDocument> {
        let count = self.read_count(2, "stored field")?;
        let mut doc = Vec::with_capacity(count);
        let mut previous: Option<u32> = None;
        for _ in 0..count {
            let ordinal = self.read_u32_varint("field ordinal")?;
            if previous.is_some_and(|p| p >= ordinal) {
                return Err(SegdexError::corrupt("stored fields out of order"));
            }
            match schema.field_at(ordinal as usize) {
                Some(field) if field.options().is_stored() => {}
                _ => {
                    return Err(SegdexError::corrupt(format!(
                        "stored value for unknown or unstored field ordinal {ordinal}"
                    )));
                }
            }
            let value = self.read_string()?;
            doc.push((ordinal, value));
            previous = Some(ordinal);
        }
        Ok(doc)
    }

    fn read_dictionary(&mut self, doc_count: u32) -> Result<TermDictionary> {
        let term_count = self.read_count(3, "term")?;
        let mut dictionary = TermDictionary::new();
        let mut previous_term: Option<String> = None;
        for _ in 0..term_count {
            let term = self.read_string()?;
            if previous_term.as_ref().is_some_and(|p| *p >= term) {
                return Err(SegdexError::corrupt("dictionary terms out of order"));
            }
            let postings = self.read_postings(doc_count)?;
            previous_term = Some(term.clone());
            dictionary.insert(term, postings);
        }
        Ok(dictionary)
    }

    fn read_postings(&mut self, doc_count: u32) -> Result<PostingList> {
        let count = self.read_count(2, "posting")?;
        if count == 0 {
            return Err(SegdexError::corrupt("empty posting list"));
        }
        let mut postings = Vec::with_capacity(count);
        let mut doc_id = 0u32;
        for i in 0..count {
            let delta = self.read_u32_varint("doc delta")?;
            if i > 0 && delta == 0 {
                return Err(SegdexError::corrupt("duplicate doc id in postings"));
            }
            doc_id = doc_id
                .checked_add(delta)
                .filter(|&id| id < doc_count)
                .ok_or_else(|| SegdexError::corrupt("posting doc id out of range"))?;
            let term_freq = self.read_u32_varint("term frequency")?;
            if term_freq == 0 {
                return Err(SegdexError::corrupt("zero term frequency"));
            }
            postings.push(Posting { doc_id, term_freq });
        }
        Ok(postings)
    }
}

fn truncated(error: std::io::Error) -> SegdexError {
    SegdexError::corrupt(format!("truncated segment data: {error}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn sample() -> SegmentData {
        let schema = Arc::new(
            Schema::builder()
                .add_field("id", FieldOptions::exact_stored())
                .add_field("body", FieldOptions::new().text(true))
                .build()
                .unwrap(),
        );
        let mut segment = SegmentData::empty(schema);
        segment.stored = vec![vec![(1, "0".to_string())], vec![(1, "1".to_string())]];
        let body = &mut segment.fields[0];
        body.text.as_mut().unwrap().insert(
            "fox".to_string(),
            vec![
                Posting { doc_id: 0, term_freq: 1 },
                Posting { doc_id: 1, term_freq: 2 },
            ],
        );
        body.norms = vec![2, 3];
        let id = &mut segment.fields[1];
        let exact = id.exact.as_mut().unwrap();
        exact.insert("0".to_string(), vec![Posting { doc_id: 0, term_freq: 1 }]);
        exact.insert("1".to_string(), vec![Posting { doc_id: 1, term_freq: 1 }]);
        segment
    }

    #[test]
    fn test_encode_decode() {
        let segment = sample();
        let bytes = encode(&segment).unwrap();
        assert_eq!(&bytes[..4], MAGIC);

        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded, segment);
        assert_eq!(encode(&decoded).unwrap(), bytes);
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = encode(&sample()).unwrap();
        bytes[0] = b'X';
        assert_eq!(decode(&bytes).unwrap_err().kind(), ErrorKind::CorruptData);
    }

    #[test]
    fn test_unsupported_version() {
        let mut bytes = encode(&sample()).unwrap();
        bytes[4] = 99;
        let err = decode(&bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptData);
        assert!(err.to_string().contains("version"));
    }

    #[test]
    fn test_truncated() {
        let bytes = encode(&sample()).unwrap();
        for len in [0, 3, HEADER_LEN, bytes.len() - 1] {
            assert_eq!(
                decode(&bytes[..len]).unwrap_err().kind(),
                ErrorKind::CorruptData
            );
        }
    }

    #[test]
    fn test_checksum_mismatch() {
        let mut bytes = encode(&sample()).unwrap();
        bytes[HEADER_LEN + 1] ^= 0xFF;
        let err = decode(&bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptData);
    }

    #[test]
    fn test_structural_corruption_with_valid_checksum() {
        // A body that claims one field with no capabilities.
        let body = [1u8, 1, b'a', 0, 0];
        let mut bytes = Vec::new();
        bytes.extend_from_slice(MAGIC);
        bytes.write_u16::<LittleEndian>(FORMAT_VERSION).unwrap();
        bytes.write_u16::<LittleEndian>(0).unwrap();
        bytes.write_u64::<LittleEndian>(body.len() as u64).unwrap();
        bytes.extend_from_slice(&body);
        bytes.write_u32::<LittleEndian>(crc32fast::hash(&body)).unwrap();

        let err = decode(&bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptData);
    }

    #[test]
    fn test_oversized_body_length() {
        for body_len in [u64::MAX, u64::MAX - (HEADER_LEN + TRAILER_LEN) as u64 + 1] {
            let mut bytes = Vec::new();
            bytes.extend_from_slice(MAGIC);
            bytes.write_u16::<LittleEndian>(FORMAT_VERSION).unwrap();
            bytes.write_u16::<LittleEndian>(0).unwrap();
            bytes.write_u64::<LittleEndian>(body_len).unwrap();
            bytes.extend_from_slice(&[0; TRAILER_LEN]);

            let err = decode(&bytes).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::CorruptData);
            assert!(err.to_string().contains("overflows"));
        }
    }
}
