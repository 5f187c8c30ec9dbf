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

//! RLE / bit-pack hybrid encoding for definition and repetition levels
//! (spec.md §4.3).
//!
//! parquet2's `encoding/hybrid_rle` module is a much larger,
//! generic bitpacking/RLE toolkit built for decoding arbitrary bit widths
//! off the read path. This module is the write-side subset spec.md asks
//! for: levels are bounded by `max_level <= 1` in this crate (deeper
//! nested groups are rejected, see spec.md §9 "Open question — REPEATED
//! semantics"), so `bit_width` is always 0 or 1 and runs are encoded
//! against that width, matching the algorithm described in §4.3 rather
//! than reusing parquet2's generic N-bit decoder.

use crate::encoding::uleb128;

/// `ceil(log2(max_level + 1))`, the number of bits needed to represent every
/// value in `0..=max_level`.
pub fn bit_width(max_level: u32) -> u32 {
    if max_level == 0 {
        0
    } else {
        (usize::BITS - (max_level as usize).leading_zeros()) as u32
    }
}

/// Encodes `levels` (each `0..=max_level`) as a sequence of RLE and
/// bit-packed runs, without the leading 4-byte length prefix (the caller
/// adds that when framing a page body, per spec.md §4.3).
///
/// Runs of length >= 8 are emitted as RLE; everything else accumulates into
/// bit-packed runs of 8-value groups. This is the "acceptable policy"
/// spec.md §4.3 explicitly allows any implementation of.
pub fn encode(levels: &[u8], max_level: u32, out: &mut Vec<u8>) {
    let width = bit_width(max_level);
    if width == 0 {
        // every level is 0; nothing to encode beyond the (empty) stream.
        return;
    }
    let value_bytes = (width as usize).div_ceil(8);

    let mut i = 0;
    let mut pending: Vec<u8> = Vec::new();
    while i < levels.len() {
        let run_len = run_length_at(levels, i);
        if run_len >= 8 {
            flush_bitpacked(&pending, width, out);
            pending.clear();
            write_rle_run(levels[i], run_len, value_bytes, out);
            i += run_len;
        } else {
            pending.push(levels[i]);
            i += 1;
        }
    }
    flush_bitpacked(&pending, width, out);
}

fn run_length_at(levels: &[u8], start: usize) -> usize {
    let v = levels[start];
    let mut len = 1;
    while start + len < levels.len() && levels[start + len] == v {
        len += 1;
    }
    len
}

fn write_rle_run(value: u8, run_len: usize, value_bytes: usize, out: &mut Vec<u8>) {
    let header = (run_len as u64) << 1; // LSB=0 marks an RLE run
    uleb128::encode(header, out);
    let bytes = (value as u32).to_le_bytes();
    out.extend_from_slice(&bytes[..value_bytes]);
}

/// Packs `pending` (whose length need not be a multiple of 8 — the final
/// group is zero-padded) as one bit-packed run, if non-empty.
fn flush_bitpacked(pending: &[u8], width: u32, out: &mut Vec<u8>) {
    if pending.is_empty() {
        return;
    }
    let num_groups = pending.len().div_ceil(8);
    let header = ((num_groups as u64) << 1) | 1; // LSB=1 marks bit-packed
    uleb128::encode(header, out);

    // width is 0 or 1 in this crate (max_level <= 1), so each group of 8
    // values packs into exactly `width` bytes, LSB-first.
    for group in 0..num_groups {
        let mut byte = 0u8;
        for bit in 0..8 {
            let idx = group * 8 + bit;
            let v = pending.get(idx).copied().unwrap_or(0);
            if width == 1 && v != 0 {
                byte |= 1 << bit;
            }
        }
        if width > 0 {
            out.push(byte);
        }
    }
}

/// Decodes an RLE/bit-pack hybrid stream back into levels, for round-trip
/// tests (spec.md §8 property 5). Not used by the writer itself.
pub fn decode(mut data: &[u8], max_level: u32, expected_len: usize) -> Vec<u8> {
    let width = bit_width(max_level);
    let value_bytes = (width as usize).div_ceil(8);
    let mut out = Vec::with_capacity(expected_len);

    if width == 0 {
        return vec![0; expected_len];
    }

    while out.len() < expected_len && !data.is_empty() {
        let (header, consumed) = uleb128::decode(data);
        data = &data[consumed..];
        if header & 1 == 0 {
            let run_len = (header >> 1) as usize;
            let mut value_buf = [0u8; 4];
            value_buf[..value_bytes].copy_from_slice(&data[..value_bytes]);
            data = &data[value_bytes..];
            let value = u32::from_le_bytes(value_buf) as u8;
            out.extend(std::iter::repeat(value).take(run_len));
        } else {
            let num_groups = (header >> 1) as usize;
            let group_bytes = num_groups * width as usize; // width is 0 or 1 byte/group here
            let group_data = &data[..group_bytes];
            data = &data[group_bytes..];
            for group in 0..num_groups {
                let byte = group_data[group];
                for bit in 0..8 {
                    if out.len() >= expected_len {
                        break;
                    }
                    out.push((byte >> bit) & 1);
                }
            }
        }
    }
    out.truncate(expected_len);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_width_of_def_levels() {
        assert_eq!(bit_width(1), 1);
        assert_eq!(bit_width(0), 0);
    }

    #[test]
    fn round_trip_all_zero() {
        let levels = vec![0u8; 100];
        let mut out = vec![];
        encode(&levels, 1, &mut out);
        let decoded = decode(&out, 1, levels.len());
        assert_eq!(decoded, levels);
    }

    #[test]
    fn round_trip_all_one() {
        let levels = vec![1u8; 37];
        let mut out = vec![];
        encode(&levels, 1, &mut out);
        let decoded = decode(&out, 1, levels.len());
        assert_eq!(decoded, levels);
    }

    #[test]
    fn round_trip_mixed_runs() {
        let mut levels = vec![1u8; 10];
        levels.extend(vec![0u8; 3]);
        levels.extend(vec![1u8; 1]);
        levels.extend(vec![0u8; 20]);
        let mut out = vec![];
        encode(&levels, 1, &mut out);
        let decoded = decode(&out, 1, levels.len());
        assert_eq!(decoded, levels);
    }

    #[test]
    fn round_trip_random() {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let len = rng.gen_range(0..500);
            let levels: Vec<u8> = (0..len).map(|_| rng.gen_range(0..=1)).collect();
            let mut out = vec![];
            encode(&levels, 1, &mut out);
            let decoded = decode(&out, 1, levels.len());
            assert_eq!(decoded, levels);
        }
    }

    #[test]
    fn required_column_max_level_zero_is_empty() {
        let levels = vec![0u8; 5];
        let mut out = vec![];
        encode(&levels, 0, &mut out);
        assert!(out.is_empty());
    }
}
