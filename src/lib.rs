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

//! `parqlog`: lock-free capture of fixed-shape records into Apache Parquet
//! files, for producers where the hot path cannot block, allocate, or lock
//! (spec.md §1).
//!
//! The pieces, roughly bottom-up:
//!
//! - [`thrift`] — a write-only Thrift Compact Protocol encoder.
//! - [`encoding`] — PLAIN value encoding, the RLE/bit-packed hybrid level
//!   encoding, and the ULEB128/zig-zag varint primitives the protocol
//!   encoder and level encoder build on.
//! - [`compression`] — pluggable page compression (GZIP, ZSTD).
//! - [`schema`], [`column_data`], [`metadata`] — the data model: column
//!   definitions, the value/levels buffers a caller hands in, and the
//!   row-group/column-chunk metadata the writer accumulates.
//! - [`page`] and [`writer`] — data page assembly and the file writer
//!   lifecycle (open, write row groups, close).
//! - [`ring`] — the lock-free SPSC ring buffer producers push fixed-size
//!   records into.
//! - [`accumulator`] and [`sink`] — the background drainer thread that turns
//!   ring contents into row groups.
//! - [`ffi`] — the stable-ABI façade for non-Rust callers.
//!
//! This crate does not read Parquet, does not implement dictionary
//! encoding, column statistics, bloom filters, encryption, nested repeated
//! groups beyond a single level, or file rotation (spec.md §1 Non-goals).

#![deny(unsafe_code)]

pub mod accumulator;
pub mod column_data;
pub mod compression;
pub mod encoding;
pub mod error;
pub mod ffi;
pub mod metadata;
pub mod page;
#[allow(unsafe_code)]
pub mod ring;
pub mod schema;
pub mod sink;
pub mod thrift;
pub mod writer;

pub use accumulator::BatchAccumulator;
pub use column_data::{ColumnData, ColumnLevels};
pub use error::{ParquetError, Result};
pub use ring::RingBuffer;
pub use schema::{ColumnDef, Compression, LogicalAnnotation, PhysicalType, Repetition, SchemaDescriptor};
pub use sink::{LogSink, SinkConfig, MAX_RECORD_BYTES};
pub use writer::{FileWriter, WriteOptions, FOOTER_SIZE, PARQUET_MAGIC};
