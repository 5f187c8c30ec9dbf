// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! PLAIN value encoding (spec.md §4.2).
//!
//! Every physical type writes PLAIN the same way: fixed-width numerics are
//! packed little-endian with no delimiter, booleans are bit-packed
//! LSB-first, and variable-length byte arrays carry a 4-byte little-endian
//! length prefix per value. None of this has a direct analogue in the
//! parquet2, which delegates PLAIN encoding to `arrow2` conversions
//! (`serialization/native/*`) rather than implementing it against a raw
//! byte buffer; this module implements the encoding directly from spec.md.

use crate::error::{ParquetError, Result};

/// Encodes `values` as PLAIN `i32`, appending to `out`.
pub fn encode_i32(values: &[i32], out: &mut Vec<u8>) {
    out.reserve(values.len() * 4);
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
}

pub fn encode_i64(values: &[i64], out: &mut Vec<u8>) {
    out.reserve(values.len() * 8);
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
}

pub fn encode_f32(values: &[f32], out: &mut Vec<u8>) {
    out.reserve(values.len() * 4);
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
}

pub fn encode_f64(values: &[f64], out: &mut Vec<u8>) {
    out.reserve(values.len() * 8);
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
}

/// `INT96` values are 12 raw bytes each (3 little-endian u32 words, per the
/// legacy Parquet encoding), emitted in source order with no transformation.
pub fn encode_int96(values: &[[u8; 12]], out: &mut Vec<u8>) {
    out.reserve(values.len() * 12);
    for v in values {
        out.extend_from_slice(v);
    }
}

/// Bit-packs `values` LSB-first, 8 booleans per byte. The last byte is
/// zero-padded in its unused high bits.
pub fn encode_boolean(values: &[bool], out: &mut Vec<u8>) {
    let num_bytes = values.len().div_ceil(8);
    let start = out.len();
    out.resize(start + num_bytes, 0);
    for (i, &v) in values.iter().enumerate() {
        if v {
            out[start + i / 8] |= 1 << (i % 8);
        }
    }
}

/// `FIXED_LEN_BYTE_ARRAY`: the concatenation of each value's `type_length`
/// bytes, with no per-value framing (the length is known from the schema).
pub fn encode_fixed_len_byte_array(bytes: &[u8], out: &mut Vec<u8>) {
    out.extend_from_slice(bytes);
}

/// `BYTE_ARRAY`: for each value, a 4-byte little-endian length prefix
/// followed by the raw bytes, driven by the dense `(bytes, offsets)` pair
/// described in spec.md §3.
pub fn encode_byte_array(bytes: &[u8], offsets: &[u32], out: &mut Vec<u8>) -> Result<()> {
    if offsets.is_empty() {
        return Ok(());
    }
    for w in offsets.windows(2) {
        let (start, end) = (w[0] as usize, w[1] as usize);
        if end < start || end > bytes.len() {
            return Err(ParquetError::InvalidOffsets("byte_array column".to_string()));
        }
        let len = (end - start) as u32;
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&bytes[start..end]);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boolean_packs_lsb_first() {
        let mut out = vec![];
        encode_boolean(&[true, false, true, true, false, false, false, false, true], &mut out);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], 0b0000_1101);
        assert_eq!(out[1], 0b0000_0001);
    }

    #[test]
    fn boolean_empty() {
        let mut out = vec![];
        encode_boolean(&[], &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn i32_little_endian() {
        let mut out = vec![];
        encode_i32(&[1, -1], &mut out);
        assert_eq!(out, vec![1, 0, 0, 0, 0xff, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn byte_array_length_prefixed() {
        let bytes = b"foobar";
        let offsets = [0u32, 3, 6];
        let mut out = vec![];
        encode_byte_array(bytes, &offsets, &mut out).unwrap();
        assert_eq!(&out[0..4], &3u32.to_le_bytes());
        assert_eq!(&out[4..7], b"foo");
        assert_eq!(&out[7..11], &3u32.to_le_bytes());
        assert_eq!(&out[11..14], b"bar");
    }

    #[test]
    fn byte_array_rejects_invalid_offsets() {
        let bytes = b"foo";
        let offsets = [0u32, 10]; // past end of bytes
        let mut out = vec![];
        assert!(encode_byte_array(bytes, &offsets, &mut out).is_err());
    }

    #[test]
    fn fixed_len_byte_array_is_raw_concat() {
        let mut out = vec![];
        encode_fixed_len_byte_array(b"AAPL    AAPL    ", &mut out);
        assert_eq!(out.len(), 16);
    }
}
