//! A hand-implemented subset of the Molecule serialization.
//!
//! Molecule is the canonical binary schema for all on-chain CKB data. The
//! subset here covers the four layouts the transaction types need:
//!
//! - fixed-size values (`Uint32`, `Uint64`, `Byte32`) are little-endian with
//!   no header;
//! - fixvecs (`Bytes`, `CellInputVec`, ...) carry a `u32` item count followed
//!   by the items;
//! - dynvecs and tables carry a `u32` total size, one `u32` offset per item,
//!   then the items; offsets must be in order and the total size must equal
//!   the byte length of the whole encoding;
//! - options are a zero-length encoding when absent, the item itself
//!   otherwise; structs are plain field concatenation.
//!
//! Packing is total and deterministic; unpacking verifies every header and
//! fails with a [`VerificationError`] on truncated or length-inconsistent
//! input, so `from_slice(to_bytes(v)) == v` for every well-formed value.

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

mod blockchain;

pub(crate) use blockchain::pack_raw_transaction;

/// The size of the `u32` every header is built from.
pub(crate) const NUMBER_SIZE: usize = 4;

/// Error type for all layout violations found while unpacking.
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum VerificationError {
    /// The slice is shorter than the header it must start with.
    #[error("{0}: header requires {1} bytes but only {2} given")]
    HeaderIsBroken(&'static str, usize, usize),
    /// The total size recorded in the header disagrees with the slice length.
    #[error("{0}: expect total size {1} but {2} bytes given")]
    TotalSizeNotMatch(&'static str, usize, usize),
    /// Offsets are not monotonically non-decreasing or point out of bounds.
    #[error("{0}: offsets are broken or out of order")]
    OffsetsNotMatch(&'static str),
    /// A table carries the wrong number of fields.
    #[error("{0}: expect {1} fields but found {2}")]
    FieldCountNotMatch(&'static str, usize, usize),
    /// A field decodes to a value outside its domain.
    #[error("{0}: invalid data: {1}")]
    InvalidData(&'static str, String),
}

/// Result alias for unpacking.
pub type VerificationResult<T> = Result<T, VerificationError>;

/// A value with a canonical molecule layout.
pub trait Entity: Sized {
    /// The schema type name, used in decode errors.
    const NAME: &'static str;

    /// Serializes the value into its canonical layout.
    fn to_bytes(&self) -> Bytes;

    /// Deserializes a value, verifying the layout strictly.
    fn from_slice(slice: &[u8]) -> VerificationResult<Self>;

    /// The byte length of the canonical serialization.
    fn serialized_size(&self) -> usize {
        self.to_bytes().len()
    }
}

pub(crate) fn read_number(
    name: &'static str,
    slice: &[u8],
    offset: usize,
) -> VerificationResult<u32> {
    if slice.len() < offset + NUMBER_SIZE {
        return Err(VerificationError::HeaderIsBroken(
            name,
            offset + NUMBER_SIZE,
            slice.len(),
        ));
    }
    let mut le = [0u8; NUMBER_SIZE];
    le.copy_from_slice(&slice[offset..offset + NUMBER_SIZE]);
    Ok(u32::from_le_bytes(le))
}

/// Assembles a dynvec (or, identically, a table) from packed items.
pub(crate) fn build_dynvec(items: &[Bytes]) -> Bytes {
    let header = NUMBER_SIZE * (1 + items.len());
    let total = header + items.iter().map(Bytes::len).sum::<usize>();
    let mut buf = BytesMut::with_capacity(total);
    buf.put_u32_le(total as u32);
    let mut offset = header;
    for item in items {
        buf.put_u32_le(offset as u32);
        offset += item.len();
    }
    for item in items {
        buf.put_slice(item);
    }
    buf.freeze()
}

/// Splits a dynvec into its item slices, verifying the full header.
pub(crate) fn parse_dynvec<'r>(
    name: &'static str,
    slice: &'r [u8],
) -> VerificationResult<Vec<&'r [u8]>> {
    let total = read_number(name, slice, 0)? as usize;
    if total != slice.len() {
        return Err(VerificationError::TotalSizeNotMatch(
            name,
            total,
            slice.len(),
        ));
    }
    if total == NUMBER_SIZE {
        return Ok(Vec::new());
    }
    let first = read_number(name, slice, NUMBER_SIZE)? as usize;
    if first < NUMBER_SIZE * 2 || first % NUMBER_SIZE != 0 || first > total {
        return Err(VerificationError::OffsetsNotMatch(name));
    }
    let count = first / NUMBER_SIZE - 1;
    let mut offsets = Vec::with_capacity(count + 1);
    for i in 0..count {
        offsets.push(read_number(name, slice, NUMBER_SIZE * (i + 1))? as usize);
    }
    offsets.push(total);
    let mut items = Vec::with_capacity(count);
    for pair in offsets.windows(2) {
        let (start, end) = (pair[0], pair[1]);
        if start > end || end > total {
            return Err(VerificationError::OffsetsNotMatch(name));
        }
        items.push(&slice[start..end]);
    }
    Ok(items)
}

/// Parses a table, checking the declared field count.
pub(crate) fn parse_table<'r>(
    name: &'static str,
    slice: &'r [u8],
    expected: usize,
) -> VerificationResult<Vec<&'r [u8]>> {
    let fields = parse_dynvec(name, slice)?;
    if fields.len() != expected {
        return Err(VerificationError::FieldCountNotMatch(
            name,
            expected,
            fields.len(),
        ));
    }
    Ok(fields)
}

/// Packs raw bytes as the schema `Bytes` fixvec.
pub(crate) fn build_bytes(data: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(NUMBER_SIZE + data.len());
    buf.put_u32_le(data.len() as u32);
    buf.put_slice(data);
    buf.freeze()
}

/// Unpacks the schema `Bytes` fixvec into its payload slice.
pub(crate) fn parse_bytes<'r>(name: &'static str, slice: &'r [u8]) -> VerificationResult<&'r [u8]> {
    let count = read_number(name, slice, 0)? as usize;
    if slice.len() != NUMBER_SIZE + count {
        return Err(VerificationError::TotalSizeNotMatch(
            name,
            NUMBER_SIZE + count,
            slice.len(),
        ));
    }
    Ok(&slice[NUMBER_SIZE..])
}

/// Assembles a fixvec from packed items; all items must share one size.
pub(crate) fn build_fixvec(items: &[Bytes]) -> Bytes {
    let total = NUMBER_SIZE + items.iter().map(Bytes::len).sum::<usize>();
    let mut buf = BytesMut::with_capacity(total);
    buf.put_u32_le(items.len() as u32);
    for item in items {
        buf.put_slice(item);
    }
    buf.freeze()
}

/// Splits a fixvec of `item_size`-byte items, verifying the item count.
pub(crate) fn parse_fixvec<'r>(
    name: &'static str,
    slice: &'r [u8],
    item_size: usize,
) -> VerificationResult<Vec<&'r [u8]>> {
    let count = read_number(name, slice, 0)? as usize;
    let expected = NUMBER_SIZE + count * item_size;
    if slice.len() != expected {
        return Err(VerificationError::TotalSizeNotMatch(
            name,
            expected,
            slice.len(),
        ));
    }
    Ok(slice[NUMBER_SIZE..].chunks(item_size).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dynvec_round_trip() {
        let items = vec![build_bytes(b"ab"), build_bytes(b""), build_bytes(b"xyz")];
        let packed = build_dynvec(&items);
        let parsed = parse_dynvec("test", &packed).unwrap();
        assert_eq!(parsed.len(), 3);
        for (raw, item) in parsed.iter().zip(items.iter()) {
            assert_eq!(*raw, &item[..]);
        }
    }

    #[test]
    fn empty_dynvec_is_four_bytes() {
        let packed = build_dynvec(&[]);
        assert_eq!(&packed[..], &[4, 0, 0, 0]);
        assert!(parse_dynvec("test", &packed).unwrap().is_empty());
    }

    #[test]
    fn dynvec_rejects_bad_total_size() {
        let mut packed = build_dynvec(&[build_bytes(b"ab")]).to_vec();
        packed.pop();
        assert_eq!(
            parse_dynvec("test", &packed),
            Err(VerificationError::TotalSizeNotMatch(
                "test",
                packed.len() + 1,
                packed.len()
            ))
        );
    }

    #[test]
    fn dynvec_rejects_descending_offsets() {
        // total 20, offsets [12, 16]; corrupt the second offset below the first
        let mut packed = build_dynvec(&[build_bytes(b""), build_bytes(b"")]).to_vec();
        packed[8] = 9;
        assert_eq!(
            parse_dynvec("test", &packed),
            Err(VerificationError::OffsetsNotMatch("test"))
        );
    }

    #[test]
    fn fixvec_rejects_truncation() {
        let packed = build_fixvec(&[Bytes::from_static(&[0u8; 8])]);
        assert!(parse_fixvec("test", &packed[..packed.len() - 1], 8).is_err());
        assert!(parse_fixvec("test", &packed, 8).is_ok());
    }
}
