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

//! Data page assembly: level streams + PLAIN values, compressed, framed with
//! a Thrift page header (spec.md §4.3, §4.4).

use crate::column_data::{ColumnData, ColumnLevels};
use crate::compression;
use crate::encoding::{plain, rle};
use crate::error::{ParquetError, Result};
use crate::schema::{ColumnDef, Compression, Repetition};
use crate::thrift::CompactProtocolWriter;

const DATA_PAGE_TYPE: i32 = 0;
const ENCODING_PLAIN: i32 = 0;
const ENCODING_RLE: i32 = 3;

/// Reusable scratch buffers for page assembly, owned by the writer and
/// reset (not reallocated) across row groups (spec.md §9).
#[derive(Debug, Default)]
pub struct PageScratch {
    levels: Vec<u8>,
    values: Vec<u8>,
    body: Vec<u8>,
    compressed: Vec<u8>,
    header: CompactProtocolWriter,
}

impl PageScratch {
    pub fn new() -> Self {
        Self::default()
    }

    fn reset(&mut self) {
        self.levels.clear();
        self.values.clear();
        self.body.clear();
        self.compressed.clear();
        self.header.reset();
    }
}

/// The bytes to write for one data page, plus the stats the caller needs to
/// build the enclosing `ColumnChunkMeta`.
pub struct PageWriteSpec<'a> {
    pub header_bytes: &'a [u8],
    pub body_bytes: &'a [u8],
    pub uncompressed_size: usize,
    pub compressed_size: usize,
    pub num_values: usize,
}

/// Builds one data page v1 for `data`/`levels` against `column`, writing
/// into `scratch` and returning borrowed slices into it (so the caller
/// writes them to the sink without an extra copy).
pub fn build_data_page<'s>(
    column_index: usize,
    column: &ColumnDef,
    data: &ColumnData<'_>,
    levels: &ColumnLevels<'_>,
    rows: usize,
    compression: Compression,
    scratch: &'s mut PageScratch,
) -> Result<PageWriteSpec<'s>> {
    scratch.reset();

    let value_count = validate_column(column_index, column, data, levels, rows)?;

    let max_def = column.repetition.max_def_level();
    let max_rep = column.repetition.max_rep_level();

    // [rep-levels][def-levels], each framed with a 4-byte LE length prefix
    // when present (data-page v1 framing, spec.md §4.3).
    if let Some(rep) = levels.repetition_levels {
        write_framed_levels(rep, max_rep, &mut scratch.levels);
    }
    if let Some(def) = levels.definition_levels {
        write_framed_levels(def, max_def, &mut scratch.levels);
    }

    encode_plain_values(data, column, &mut scratch.values)?;

    scratch.body.extend_from_slice(&scratch.levels);
    scratch.body.extend_from_slice(&scratch.values);

    let uncompressed_size = scratch.body.len();
    compression::compress(compression, &scratch.body, &mut scratch.compressed)?;
    let compressed_size = scratch.compressed.len();

    check_i32_range(uncompressed_size)?;
    check_i32_range(compressed_size)?;

    let num_values = match column.repetition {
        Repetition::Required => rows,
        _ => levels
            .definition_levels
            .map(|d| d.len())
            .unwrap_or(value_count),
    };
    check_i32_range(num_values)?;

    write_page_header(
        num_values as i32,
        uncompressed_size as i32,
        compressed_size as i32,
        &mut scratch.header,
    )?;

    Ok(PageWriteSpec {
        header_bytes: scratch.header.bytes(),
        body_bytes: &scratch.compressed,
        uncompressed_size,
        compressed_size,
        num_values,
    })
}

fn check_i32_range(size: usize) -> Result<()> {
    if size > i32::MAX as usize {
        Err(ParquetError::PageTooLarge(size))
    } else {
        Ok(())
    }
}

fn write_framed_levels(levels: &[u8], max_level: u32, out: &mut Vec<u8>) {
    let mut encoded = Vec::new();
    rle::encode(levels, max_level, &mut encoded);
    out.extend_from_slice(&(encoded.len() as u32).to_le_bytes());
    out.extend_from_slice(&encoded);
}

fn encode_plain_values(data: &ColumnData<'_>, column: &ColumnDef, out: &mut Vec<u8>) -> Result<()> {
    match data {
        ColumnData::Boolean(v) => plain::encode_boolean(v, out),
        ColumnData::Int32(v) => plain::encode_i32(v, out),
        ColumnData::Int64(v) => plain::encode_i64(v, out),
        ColumnData::Int96(v) => plain::encode_int96(v, out),
        ColumnData::Float(v) => plain::encode_f32(v, out),
        ColumnData::Double(v) => plain::encode_f64(v, out),
        ColumnData::ByteArray { bytes, offsets } => plain::encode_byte_array(bytes, offsets, out)?,
        ColumnData::FixedLenByteArray(bytes) => {
            let expected_len = data.value_count(column.type_length) * column.type_length.max(0) as usize;
            if expected_len != bytes.len() {
                return Err(ParquetError::LengthOverflow(column.name.clone()));
            }
            plain::encode_fixed_len_byte_array(bytes, out)
        }
    }
    Ok(())
}

fn write_page_header(
    num_values: i32,
    uncompressed_page_size: i32,
    compressed_page_size: i32,
    w: &mut CompactProtocolWriter,
) -> Result<()> {
    w.write_struct_begin();
    w.write_i32_field(1, DATA_PAGE_TYPE)?; // type
    w.write_i32_field(2, uncompressed_page_size)?;
    w.write_i32_field(3, compressed_page_size)?;
    w.write_struct_field_header(5)?; // data_page_header
    w.write_struct_begin();
    w.write_i32_field(1, num_values)?;
    w.write_i32_field(2, ENCODING_PLAIN)?;
    w.write_i32_field(3, ENCODING_RLE)?; // definition_level_encoding
    w.write_i32_field(4, ENCODING_RLE)?; // repetition_level_encoding
    w.write_struct_end();
    w.write_struct_end();
    Ok(())
}

pub(crate) fn physical_type_matches(column: &ColumnDef, data: &ColumnData<'_>) -> bool {
    column.physical_type == data.physical_type()
}

/// Validates `data`/`levels` against `column`'s repetition and the declared
/// `rows`, returning the implied value count. Split out from
/// `build_data_page` so a row group's columns can all be validated before
/// any page bytes are written for any of them (spec.md §9's mid-write
/// failure decision).
pub(crate) fn validate_column(
    column_index: usize,
    column: &ColumnDef,
    data: &ColumnData<'_>,
    levels: &ColumnLevels<'_>,
    rows: usize,
) -> Result<usize> {
    let (value_count, row_count) = levels.validate(column, rows)?;
    // `validate` guarantees row_count == rows on every Ok across all three
    // Repetition branches; this is an invariant check, not input validation.
    debug_assert_eq!(row_count, rows);

    let actual_values = data.value_count(column.type_length);
    if actual_values != value_count {
        return Err(ParquetError::RowCountMismatch {
            index: column_index,
            name: column.name.clone(),
            expected: value_count,
            actual: actual_values,
        });
    }
    Ok(value_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnDef, PhysicalType, Repetition};

    #[test]
    fn required_column_has_no_levels_in_body() {
        let column = ColumnDef::new("a", PhysicalType::Int32, Repetition::Required);
        let data = ColumnData::Int32(&[1, 2, 3]);
        let levels = ColumnLevels::none();
        let mut scratch = PageScratch::new();
        let spec = build_data_page(0, &column, &data, &levels, 3, Compression::Uncompressed, &mut scratch)
            .unwrap();
        assert_eq!(spec.num_values, 3);
        // uncompressed body is exactly the PLAIN i32 values, no level framing
        assert_eq!(spec.uncompressed_size, 12);
    }

    #[test]
    fn optional_column_includes_definition_levels() {
        let column = ColumnDef::new("b", PhysicalType::ByteArray, Repetition::Optional);
        let bytes = b"foobar";
        let offsets = [0u32, 3, 6];
        let data = ColumnData::ByteArray {
            bytes,
            offsets: &offsets,
        };
        let levels = ColumnLevels {
            definition_levels: Some(&[1, 1]),
            repetition_levels: None,
        };
        let mut scratch = PageScratch::new();
        let spec = build_data_page(0, &column, &data, &levels, 2, Compression::Uncompressed, &mut scratch)
            .unwrap();
        assert_eq!(spec.num_values, 2);
        assert!(spec.uncompressed_size > 14); // values + framed def levels
    }

    #[test]
    fn row_count_mismatch_is_rejected() {
        let column = ColumnDef::new("a", PhysicalType::Int32, Repetition::Required);
        let data = ColumnData::Int32(&[1, 2, 3]);
        let levels = ColumnLevels::none();
        let mut scratch = PageScratch::new();
        // declared 5 rows but only 3 values for a REQUIRED column
        let result = build_data_page(0, &column, &data, &levels, 5, Compression::Uncompressed, &mut scratch);
        assert!(matches!(result, Err(ParquetError::RowCountMismatch { .. })));
    }

    #[test]
    fn gzip_page_round_trips_through_flate2() {
        let column = ColumnDef::new("a", PhysicalType::Int64, Repetition::Required);
        let values: Vec<i64> = (0..100).collect();
        let data = ColumnData::Int64(&values);
        let levels = ColumnLevels::none();
        let mut scratch = PageScratch::new();
        let spec = build_data_page(0, &column, &data, &levels, 100, Compression::Gzip, &mut scratch).unwrap();
        assert_eq!(spec.compressed_size, spec.body_bytes.len());

        use std::io::Read;
        let mut decoder = flate2::read::GzDecoder::new(spec.body_bytes);
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed).unwrap();
        assert_eq!(decompressed.len(), spec.uncompressed_size);
    }
}
