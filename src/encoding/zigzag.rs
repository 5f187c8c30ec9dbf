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

//! Zig-zag encoding of signed integers (spec.md §4.1).
//!
//! `decode` is adapted from parquet2's
//! `parquet2::encoding::zigzag_leb128::decode`; `encode` is new.

/// Maps a signed `i64` to the non-negative `u64` Thrift's compact protocol
/// varint-encodes, per `((x << 1) ^ (x >> 63))`.
pub fn encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

pub fn decode_u64(u: u64) -> i64 {
    (u >> 1) as i64 ^ -((u & 1) as i64)
}

/// Decodes a zig-zag + ULEB128 varint from the front of `values`.
pub fn decode(values: &[u8]) -> (i64, usize) {
    let (u, consumed) = super::uleb128::decode(values);
    (decode_u64(u), consumed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_pairs() {
        let cases = [
            (0i64, 0u64),
            (-1, 1),
            (1, 2),
            (-2, 3),
            (2, 4),
            (-3, 5),
            (3, 6),
            (-4, 7),
            (4, 8),
            (-5, 9),
        ];
        for (signed, zz) in cases {
            assert_eq!(encode(signed), zz);
            assert_eq!(decode_u64(zz), signed);
        }
    }

    #[test]
    fn round_trip_i64_range() {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        for _ in 0..10_000 {
            let v: i64 = rng.gen();
            assert_eq!(decode_u64(encode(v)), v);
        }
        for v in [i64::MIN, i64::MAX, 0, -1, 1] {
            assert_eq!(decode_u64(encode(v)), v);
        }
    }
}
