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

//! Unsigned LEB128 varint encoding (spec.md §4.1).
//!
//! `decode` is adapted from parquet2's read-side decoder
//! (`parquet2::encoding::uleb128::decode`); `encode` is new, needed because
//! this crate writes the compact protocol itself instead of delegating to
//! a generated Thrift crate.

/// Appends the ULEB128 encoding of `value` to `out`.
pub fn encode(mut value: u64, out: &mut Vec<u8>) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Decodes a ULEB128 varint from the front of `values`, returning the value
/// and the number of bytes consumed.
pub fn decode(values: &[u8]) -> (u64, usize) {
    let mut result = 0;
    let mut shift = 0;

    let mut consumed = 0;
    for byte in values {
        consumed += 1;
        if shift == 63 && *byte > 1 {
            panic!("uleb128 varint overflows u64")
        };

        result |= u64::from(byte & 0x7f) << shift;

        if byte & 0x80 == 0 {
            break;
        }

        shift += 7;
    }
    (result, consumed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_1() {
        let data = vec![0xe5, 0x8e, 0x26, 0xDE, 0xAD, 0xBE, 0xEF];
        let (value, len) = decode(&data);
        assert_eq!(value, 624_485);
        assert_eq!(len, 3);
    }

    #[test]
    fn decode_2() {
        let data = vec![0b00010000, 0b00000001, 0b00000011, 0b00000011];
        let (value, len) = decode(&data);
        assert_eq!(value, 16);
        assert_eq!(len, 1);
    }

    #[test]
    fn round_trip_small_values() {
        for v in 0..1000u64 {
            let mut buf = vec![];
            encode(v, &mut buf);
            let (decoded, consumed) = decode(&buf);
            assert_eq!(decoded, v);
            assert_eq!(consumed, buf.len());
        }
    }

    #[test]
    fn round_trip_u64_range() {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        for _ in 0..10_000 {
            // spec.md property 7: round trips for all u in [0, 2^63)
            let v: u64 = rng.gen_range(0..(1u64 << 63));
            let mut buf = vec![];
            encode(v, &mut buf);
            let (decoded, consumed) = decode(&buf);
            assert_eq!(decoded, v);
            assert_eq!(consumed, buf.len());
        }
    }

    #[test]
    fn round_trip_boundaries() {
        for v in [0u64, 1, 127, 128, 16383, 16384, u64::MAX] {
            let mut buf = vec![];
            encode(v, &mut buf);
            let (decoded, _) = decode(&buf);
            assert_eq!(decoded, v);
        }
    }
}
