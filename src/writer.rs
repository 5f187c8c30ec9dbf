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

//! The column-chunk/row-group/file writer lifecycle (spec.md §4.6).
//!
//! Grounded on parquet2's `write::file::FileWriter` / `write::
//! row_group::write_row_group` / `write::column_chunk::write_column_chunk`
//! shape (open → write → end, tracking a running byte offset), collapsed
//! into a single struct since this crate's row groups arrive as one
//! synchronous call with in-memory column slices rather than a streaming
//! iterator of encoded pages.

use std::io::Write;

use tracing::{debug, trace};

use crate::column_data::{ColumnData, ColumnLevels};
use crate::error::{ParquetError, Result};
use crate::metadata::{self, ColumnChunkMeta, RowGroupMeta};
use crate::page::{self, PageScratch};
use crate::schema::{Compression, SchemaDescriptor};

pub const PARQUET_MAGIC: [u8; 4] = *b"PAR1";
pub const FOOTER_SIZE: u64 = 8;

/// Per-file options fixed at `open` (spec.md's Configuration ambient
/// concern: a plain struct, not a deserialized config file — see
/// SPEC_FULL.md).
#[derive(Debug, Clone)]
pub struct WriteOptions {
    pub compression: Compression,
    /// Thrift `FileMetaData.version`: 1 or 2.
    pub version: i32,
    pub created_by: String,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            compression: Compression::Uncompressed,
            version: 1,
            created_by: "parqlog".to_string(),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum State {
    Open,
    Closed,
}

/// Drives encoders, tracks offsets, assembles row groups, and writes the
/// footer and trailing magic (spec.md §4.6 `FileState`).
pub struct FileWriter<W: Write> {
    writer: W,
    schema: SchemaDescriptor,
    options: WriteOptions,
    offset: u64,
    row_groups: Vec<RowGroupMeta>,
    total_rows: u64,
    state: State,
    page_scratch: PageScratch,
}

impl<W: Write> FileWriter<W> {
    /// Validates `schema` (already done by [`SchemaDescriptor::try_new`]),
    /// writes the `"PAR1"` magic prefix, and enters the OPEN state
    /// (spec.md §4.6 operation 1).
    pub fn open(mut writer: W, schema: SchemaDescriptor, options: WriteOptions) -> Result<Self> {
        writer.write_all(&PARQUET_MAGIC)?;
        Ok(Self {
            writer,
            schema,
            options,
            offset: PARQUET_MAGIC.len() as u64,
            row_groups: Vec::new(),
            total_rows: 0,
            state: State::Open,
            page_scratch: PageScratch::new(),
        })
    }

    pub fn schema(&self) -> &SchemaDescriptor {
        &self.schema
    }

    pub fn options(&self) -> &WriteOptions {
        &self.options
    }

    pub fn total_rows(&self) -> u64 {
        self.total_rows
    }

    pub fn is_closed(&self) -> bool {
        self.state == State::Closed
    }

    /// Encodes and writes one row group (spec.md §4.6 operation 2).
    ///
    /// Column types and the levels invariants (spec.md §3) are validated
    /// for every column *before* any page bytes are written, so a rejected
    /// row group never leaves partial data on the sink for input-shape
    /// errors. Once validation passes, each column's page is written to the
    /// sink as it is encoded (spec.md §9's first accepted design for the
    /// mid-write-failure open question) rather than buffered for the whole
    /// row group, since this writer's scratch buffers are reused across
    /// columns, not allocated per column.
    pub fn write_row_group(
        &mut self,
        rows: usize,
        columns: &[ColumnData<'_>],
        levels: Option<&[ColumnLevels<'_>]>,
    ) -> Result<()> {
        match self.state {
            State::Closed => return Err(ParquetError::WriterClosed),
            State::Open => {}
        }
        if columns.len() != self.schema.len() {
            return Err(ParquetError::ColumnCountMismatch {
                expected: self.schema.len(),
                actual: columns.len(),
            });
        }
        if rows > i32::MAX as usize {
            return Err(ParquetError::TooManyRows(rows));
        }
        if rows == 0 {
            // spec.md §4.6 operation 2: a no-op, never emits an empty row group.
            return Ok(());
        }

        let no_levels;
        let levels: &[ColumnLevels<'_>] = match levels {
            Some(levels) => levels,
            None => {
                no_levels = vec![ColumnLevels::none(); columns.len()];
                &no_levels
            }
        };
        if levels.len() != columns.len() {
            return Err(ParquetError::ColumnCountMismatch {
                expected: columns.len(),
                actual: levels.len(),
            });
        }

        for (i, (column, data)) in self.schema.columns().iter().zip(columns).enumerate() {
            if !page::physical_type_matches(column, data) {
                return Err(ParquetError::ColumnTypeMismatch {
                    index: i,
                    name: column.name.clone(),
                    expected: column.physical_type,
                    actual: data.physical_type(),
                });
            }
            page::validate_column(i, column, data, &levels[i], rows)?;
        }

        let initial_offset = self.offset;
        let mut chunks = Vec::with_capacity(columns.len());

        for (i, (column, data)) in self.schema.columns().iter().zip(columns).enumerate() {
            let page_offset = self.offset;
            let spec = page::build_data_page(
                i,
                column,
                data,
                &levels[i],
                rows,
                self.options.compression,
                &mut self.page_scratch,
            )?;

            self.writer.write_all(spec.header_bytes)?;
            self.writer.write_all(spec.body_bytes)?;
            let header_len = spec.header_bytes.len() as u64;
            let body_len = spec.body_bytes.len() as u64;
            self.offset += header_len + body_len;

            chunks.push(ColumnChunkMeta {
                column_index: i,
                data_page_offset: page_offset as i64,
                total_compressed_size: (header_len + body_len) as i64,
                total_uncompressed_size: (header_len as usize + spec.uncompressed_size) as i64,
                num_values: spec.num_values as i64,
            });
        }

        let total_byte_size = (self.offset - initial_offset) as i64;
        self.row_groups.push(RowGroupMeta {
            chunks,
            total_byte_size,
            num_rows: rows as i64,
        });
        self.total_rows += rows as u64;
        trace!(rows, total_byte_size, "wrote row group");
        Ok(())
    }

    /// Serializes and appends `FileMetaData`, the footer length, and the
    /// trailing magic, then flushes (spec.md §4.6 operation 3). Idempotent:
    /// a second call is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.state == State::Closed {
            return Ok(());
        }

        let mut footer = crate::thrift::CompactProtocolWriter::new();
        metadata::write_file_metadata(
            &self.schema,
            self.options.compression,
            self.options.version,
            self.total_rows as i64,
            &self.row_groups,
            &self.options.created_by,
            &mut footer,
        )?;
        let metadata_bytes = footer.into_bytes();
        if metadata_bytes.len() > u32::MAX as usize {
            return Err(ParquetError::MetadataTooLarge(metadata_bytes.len()));
        }

        self.writer.write_all(&metadata_bytes)?;
        let len = metadata_bytes.len() as u32;
        self.writer.write_all(&len.to_le_bytes())?;
        self.writer.write_all(&PARQUET_MAGIC)?;
        self.writer.flush()?;

        self.offset += metadata_bytes.len() as u64 + FOOTER_SIZE;
        self.state = State::Closed;
        debug!(
            total_rows = self.total_rows,
            row_groups = self.row_groups.len(),
            bytes = self.offset,
            "closed parquet file"
        );
        Ok(())
    }

    /// Consumes the writer, returning the underlying sink. Callers should
    /// `close()` first; this does not do it implicitly, matching spec.md
    /// §4.6's explicit three-call lifecycle.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnDef, PhysicalType, Repetition};
    use std::io::Cursor;

    fn open_single_column_writer() -> FileWriter<Cursor<Vec<u8>>> {
        let schema = SchemaDescriptor::try_new(vec![ColumnDef::new(
            "a",
            PhysicalType::Int64,
            Repetition::Required,
        )])
        .unwrap();
        FileWriter::open(Cursor::new(Vec::new()), schema, WriteOptions::default()).unwrap()
    }

    #[test]
    fn file_begins_and_ends_with_magic() {
        let mut writer = open_single_column_writer();
        writer
            .write_row_group(1, &[ColumnData::Int64(&[-1])], None)
            .unwrap();
        writer.close().unwrap();
        let bytes = writer.into_inner().into_inner();
        assert_eq!(&bytes[0..4], b"PAR1");
        assert_eq!(&bytes[bytes.len() - 4..], b"PAR1");
    }

    #[test]
    fn footer_length_prefix_matches_footer_size() {
        let mut writer = open_single_column_writer();
        writer
            .write_row_group(1, &[ColumnData::Int64(&[-1])], None)
            .unwrap();
        writer.close().unwrap();
        let bytes = writer.into_inner().into_inner();
        let len_bytes = &bytes[bytes.len() - 8..bytes.len() - 4];
        let footer_len = u32::from_le_bytes(len_bytes.try_into().unwrap()) as usize;
        let footer_start = bytes.len() - 8 - footer_len;
        assert!(footer_start >= 4);
    }

    #[test]
    fn empty_row_group_is_a_no_op() {
        let mut writer = open_single_column_writer();
        writer.write_row_group(0, &[ColumnData::Int64(&[])], None).unwrap();
        assert_eq!(writer.total_rows(), 0);
        assert!(writer.row_groups.is_empty());
    }

    #[test]
    fn close_is_idempotent() {
        let mut writer = open_single_column_writer();
        writer
            .write_row_group(1, &[ColumnData::Int64(&[7])], None)
            .unwrap();
        writer.close().unwrap();
        let first = writer.into_inner().into_inner();

        let mut writer = open_single_column_writer();
        writer
            .write_row_group(1, &[ColumnData::Int64(&[7])], None)
            .unwrap();
        writer.close().unwrap();
        writer.close().unwrap(); // second close: no-op
        let second = writer.into_inner().into_inner();

        assert_eq!(first, second);
    }

    #[test]
    fn rejects_wrong_column_count() {
        let mut writer = open_single_column_writer();
        let err = writer.write_row_group(1, &[], None).unwrap_err();
        assert!(matches!(err, ParquetError::ColumnCountMismatch { .. }));
    }

    #[test]
    fn second_column_level_failure_writes_no_page_bytes() {
        // column 0 is valid; column 1's definition_levels length mismatches
        // rows, so the whole row group must be rejected before any bytes
        // for column 0 reach the sink.
        let schema = SchemaDescriptor::try_new(vec![
            ColumnDef::new("a", PhysicalType::Int64, Repetition::Required),
            ColumnDef::new("b", PhysicalType::Int32, Repetition::Optional),
        ])
        .unwrap();
        let mut writer =
            FileWriter::open(Cursor::new(Vec::new()), schema, WriteOptions::default()).unwrap();
        let levels = [
            ColumnLevels::none(),
            ColumnLevels {
                definition_levels: Some(&[1]), // wrong length: rows=2
                repetition_levels: None,
            },
        ];
        let err = writer
            .write_row_group(
                2,
                &[ColumnData::Int64(&[1, 2]), ColumnData::Int32(&[1, 2])],
                Some(&levels),
            )
            .unwrap_err();
        assert!(matches!(err, ParquetError::InvalidLevels(..)));
        assert_eq!(writer.offset, PARQUET_MAGIC.len() as u64);
        assert!(writer.row_groups.is_empty());
    }

    #[test]
    fn rejects_wrong_physical_type() {
        let mut writer = open_single_column_writer();
        let err = writer
            .write_row_group(1, &[ColumnData::Int32(&[1])], None)
            .unwrap_err();
        assert!(matches!(err, ParquetError::ColumnTypeMismatch { .. }));
    }

    #[test]
    fn writing_after_close_fails() {
        let mut writer = open_single_column_writer();
        writer.close().unwrap();
        let err = writer
            .write_row_group(1, &[ColumnData::Int64(&[1])], None)
            .unwrap_err();
        assert!(matches!(err, ParquetError::WriterClosed));
    }

    #[test]
    fn two_optional_rows_with_a_null_round_trip_structurally() {
        let schema = SchemaDescriptor::try_new(vec![
            ColumnDef::new("id", PhysicalType::Int32, Repetition::Required),
            ColumnDef::new("name", PhysicalType::ByteArray, Repetition::Optional),
        ])
        .unwrap();
        let mut writer =
            FileWriter::open(Cursor::new(Vec::new()), schema, WriteOptions::default()).unwrap();

        let bytes_buf = b"foobar";
        let offsets = [0u32, 3, 6];
        let levels = [
            ColumnLevels::none(),
            ColumnLevels {
                definition_levels: Some(&[1, 0, 1]),
                repetition_levels: None,
            },
        ];
        writer
            .write_row_group(
                3,
                &[
                    ColumnData::Int32(&[1, 2, 3]),
                    ColumnData::ByteArray {
                        bytes: bytes_buf,
                        offsets: &offsets,
                    },
                ],
                Some(&levels),
            )
            .unwrap();
        writer.close().unwrap();
        assert_eq!(writer.total_rows(), 3);
    }
}
