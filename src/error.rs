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

//! Error taxonomy for the encoder, ring buffer, sink and FFI façade.

use thiserror::Error;

/// A specialized `Result` for this crate.
pub type Result<T> = std::result::Result<T, ParquetError>;

/// Every way an operation in this crate can fail.
///
/// Variants are grouped the way `spec.md` §7 groups them (configuration,
/// input shape, size limits, state, resources, sink) rather than
/// alphabetically, so the ordering here is meaningful: it mirrors the
/// taxonomy callers are expected to match on.
#[derive(Debug, Error)]
pub enum ParquetError {
    // -- configuration --
    #[error("schema must have at least one column")]
    InvalidSchema,
    #[error("column name must be non-empty valid UTF-8: {0}")]
    InvalidColumnName(String),
    #[error("FIXED_LEN_BYTE_ARRAY column `{0}` must have a positive type_length")]
    InvalidFixedTypeLength(String),
    #[error("ring buffer capacity must be a non-zero power of two, got {0}")]
    InvalidQueueCapacity(usize),
    #[error("max_payload_bytes must be non-zero")]
    InvalidPayloadSize,
    #[error("row_group_rows must be non-zero")]
    InvalidRowGroupRows,

    // -- input shape --
    #[error("expected {expected} columns, got {actual}")]
    ColumnCountMismatch { expected: usize, actual: usize },
    #[error("column {index} (`{name}`) has physical type {actual:?}, schema declares {expected:?}")]
    ColumnTypeMismatch {
        index: usize,
        name: String,
        expected: crate::schema::PhysicalType,
        actual: crate::schema::PhysicalType,
    },
    #[error("column {index} (`{name}`) encodes {actual} rows, row group declares {expected}")]
    RowCountMismatch {
        index: usize,
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("BYTE_ARRAY offsets for column `{0}` are not a valid monotonic prefix sum")]
    InvalidOffsets(String),
    #[error("levels for column `{0}` violate the invariants in spec.md §3: {1}")]
    InvalidLevels(String, &'static str),
    #[error("row group has {0} rows, which exceeds i32::MAX")]
    TooManyRows(usize),
    #[error("length computation overflowed for column `{0}`")]
    LengthOverflow(String),

    // -- size limits --
    #[error("record of {0} bytes exceeds the sink's configured max_payload_bytes")]
    PayloadTooLarge(usize),
    #[error("page size field would exceed i32::MAX ({0} bytes)")]
    PageTooLarge(usize),
    #[error("serialized footer ({0} bytes) exceeds u32::MAX")]
    MetadataTooLarge(usize),

    // -- state --
    #[error("writer is not open")]
    NotOpen,
    #[error("writer has already been closed")]
    WriterClosed,

    // -- resources --
    #[error("out of memory")]
    OutOfMemory,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("compression codec {0:?} is not implemented")]
    UnsupportedCompression(crate::schema::Compression),

    // -- sink --
    #[error("record dropped: ring buffer is full")]
    BufferFull,
    #[error("record of {0} bytes exceeds the maximum a single slot can hold")]
    RecordTooLarge(usize),

    // -- protocol encoder (§4.1) --
    #[error("thrift field id delta {0} is outside the representable i16 range")]
    InvalidArgument(i64),
    #[error("value {0} exceeds the maximum the compact-protocol reader accepts")]
    TooLarge(i64),

    #[error("{0}")]
    General(String),
}
