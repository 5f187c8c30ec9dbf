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

// Adapted from parquet2's `compression.rs`: the `Codec` trait and
// dispatch function are kept almost verbatim; the codec list is trimmed to
// what spec.md §3 requires (UNCOMPRESSED plus GZIP and ZSTD) and the codecs
// are rewired onto this crate's own `Compression` enum instead of one
// generated from a Thrift schema.

use crate::error::{ParquetError, Result};
use crate::schema::Compression;

/// Parquet page compression codec interface.
pub trait Codec: std::fmt::Debug {
    /// Compresses `input_buf`, appending the result to `output_buf`.
    fn compress(&mut self, input_buf: &[u8], output_buf: &mut Vec<u8>) -> Result<()>;
}

/// Compresses `input` per `codec`, returning a borrowed passthrough for
/// `UNCOMPRESSED` and an owned buffer otherwise (spec.md §4.5).
pub fn compress(codec: Compression, input: &[u8], scratch: &mut Vec<u8>) -> Result<()> {
    scratch.clear();
    match codec {
        Compression::Uncompressed => {
            scratch.extend_from_slice(input);
            Ok(())
        }
        #[cfg(feature = "gzip")]
        Compression::Gzip => gzip_codec::GzipCodec::default().compress(input, scratch),
        #[cfg(feature = "zstd")]
        Compression::Zstd => zstd_codec::ZstdCodec::default().compress(input, scratch),
        #[allow(unreachable_patterns)]
        other => Err(ParquetError::UnsupportedCompression(other)),
    }
}

#[cfg(feature = "gzip")]
mod gzip_codec {
    use std::io::Write;

    use flate2::{write, Compression as Flate2Level};

    use super::Codec;
    use crate::error::Result;

    #[derive(Debug, Default)]
    pub struct GzipCodec;

    impl Codec for GzipCodec {
        fn compress(&mut self, input_buf: &[u8], output_buf: &mut Vec<u8>) -> Result<()> {
            let mut encoder = write::GzEncoder::new(output_buf, Flate2Level::default());
            encoder.write_all(input_buf)?;
            encoder.try_finish().map_err(|e| e.into())
        }
    }
}

#[cfg(feature = "zstd")]
mod zstd_codec {
    use std::io::Write;

    use super::Codec;
    use crate::error::Result;

    const ZSTD_COMPRESSION_LEVEL: i32 = 3;

    #[derive(Debug, Default)]
    pub struct ZstdCodec;

    impl Codec for ZstdCodec {
        fn compress(&mut self, input_buf: &[u8], output_buf: &mut Vec<u8>) -> Result<()> {
            let mut encoder = zstd::Encoder::new(output_buf, ZSTD_COMPRESSION_LEVEL)?;
            encoder.write_all(input_buf)?;
            encoder.finish().map(|_| ()).map_err(|e| e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(codec: Compression, data: &[u8]) {
        let mut compressed = vec![];
        compress(codec, data, &mut compressed).unwrap();

        let decompressed = match codec {
            Compression::Uncompressed => compressed.clone(),
            #[cfg(feature = "gzip")]
            Compression::Gzip => {
                use std::io::Read;
                let mut d = flate2::read::GzDecoder::new(compressed.as_slice());
                let mut out = Vec::new();
                d.read_to_end(&mut out).unwrap();
                out
            }
            #[cfg(feature = "zstd")]
            Compression::Zstd => zstd::decode_all(compressed.as_slice()).unwrap(),
            #[allow(unreachable_patterns)]
            _ => panic!("codec not built"),
        };
        assert_eq!(decompressed, data);
    }

    fn test_codec(c: Compression) {
        for size in [0usize, 100, 10_000] {
            let data: Vec<u8> = (0..size).map(|x| (x % 255) as u8).collect();
            round_trip(c, &data);
        }
    }

    #[test]
    fn uncompressed_is_passthrough() {
        test_codec(Compression::Uncompressed);
    }

    #[cfg(feature = "gzip")]
    #[test]
    fn gzip_round_trips() {
        test_codec(Compression::Gzip);
    }

    #[cfg(feature = "zstd")]
    #[test]
    fn zstd_round_trips() {
        test_codec(Compression::Zstd);
    }
}
