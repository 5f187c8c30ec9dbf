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

//! In-memory row-group/column-chunk metadata and its Thrift serialization
//! into `FileMetaData` (spec.md §3, §6).

use crate::error::Result;
use crate::schema::{Compression, SchemaDescriptor};
use crate::thrift::{self, CompactProtocolWriter};

/// Per-column-chunk metadata accumulated as the writer emits pages
/// (spec.md §3 `ColumnChunkMeta`). Offsets are absolute in the output
/// stream.
#[derive(Debug, Clone)]
pub struct ColumnChunkMeta {
    pub column_index: usize,
    pub data_page_offset: i64,
    pub total_compressed_size: i64,
    pub total_uncompressed_size: i64,
    pub num_values: i64,
}

impl ColumnChunkMeta {
    /// Serializes this chunk as a Thrift `ColumnChunk` struct (spec.md §6).
    /// Per spec.md §9's open question on `file_offset` vs `data_page_offset`,
    /// this crate sets both to the same value for these single-page chunks.
    pub fn write_thrift(
        &self,
        column: &crate::schema::ColumnDef,
        compression: Compression,
        w: &mut CompactProtocolWriter,
    ) -> Result<()> {
        w.write_struct_begin();
        w.write_i64_field(2, self.data_page_offset)?; // file_offset
        w.write_struct_field_header(3)?; // ColumnMetaData
        self.write_column_meta_data_thrift(column, compression, w)?;
        w.write_struct_end();
        Ok(())
    }

    fn write_column_meta_data_thrift(
        &self,
        column: &crate::schema::ColumnDef,
        compression: Compression,
        w: &mut CompactProtocolWriter,
    ) -> Result<()> {
        w.write_struct_begin();
        w.write_i32_field(1, column.physical_type.code())?; // type
        // encodings: this crate always writes PLAIN values + RLE levels.
        w.write_list_field_header(2, 2, thrift::I32)?;
        w.write_i32(0); // PLAIN
        w.write_i32(3); // RLE
        w.write_list_field_header(3, 1, thrift::BINARY)?; // path_in_schema
        w.write_binary(column.name.as_bytes())?;
        w.write_i32_field(4, compression.code())?; // codec
        w.write_i64_field(5, self.num_values)?;
        w.write_i64_field(6, self.total_uncompressed_size)?;
        w.write_i64_field(7, self.total_compressed_size)?;
        w.write_i64_field(9, self.data_page_offset)?; // data_page_offset
        w.write_struct_end();
        Ok(())
    }
}

/// A row group's accumulated metadata (spec.md §3 `RowGroupMeta`).
#[derive(Debug, Clone)]
pub struct RowGroupMeta {
    pub chunks: Vec<ColumnChunkMeta>,
    pub total_byte_size: i64,
    pub num_rows: i64,
}

impl RowGroupMeta {
    pub fn write_thrift(
        &self,
        schema: &SchemaDescriptor,
        compression: Compression,
        w: &mut CompactProtocolWriter,
    ) -> Result<()> {
        w.write_struct_begin();
        w.write_list_field_header(1, self.chunks.len(), thrift::STRUCT)?; // columns
        for chunk in &self.chunks {
            chunk.write_thrift(&schema.columns()[chunk.column_index], compression, w)?;
        }
        w.write_i64_field(2, self.total_byte_size)?; // total_byte_size
        w.write_i64_field(3, self.num_rows)?; // num_rows
        w.write_struct_end();
        Ok(())
    }
}

/// Serializes the terminal `FileMetaData` Thrift struct (spec.md §4.6/§6):
/// version, schema, total row count, row groups, and a `created_by` label.
pub fn write_file_metadata(
    schema: &SchemaDescriptor,
    compression: Compression,
    version: i32,
    total_rows: i64,
    row_groups: &[RowGroupMeta],
    created_by: &str,
    w: &mut CompactProtocolWriter,
) -> Result<()> {
    w.write_struct_begin();
    w.write_i32_field(1, version)?; // version
    schema.write_thrift_list_field(2, w)?; // schema
    w.write_i64_field(3, total_rows)?; // num_rows
    w.write_list_field_header(4, row_groups.len(), thrift::STRUCT)?; // row_groups
    for rg in row_groups {
        rg.write_thrift(schema, compression, w)?;
    }
    w.write_binary_field(6, created_by.as_bytes())?; // created_by
    w.write_struct_end();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnDef, PhysicalType, Repetition};

    #[test]
    fn file_metadata_serializes_without_error() {
        let schema = SchemaDescriptor::try_new(vec![ColumnDef::new(
            "a",
            PhysicalType::Int64,
            Repetition::Required,
        )])
        .unwrap();
        let chunk = ColumnChunkMeta {
            column_index: 0,
            data_page_offset: 4,
            total_compressed_size: 20,
            total_uncompressed_size: 20,
            num_values: 1,
        };
        let rg = RowGroupMeta {
            chunks: vec![chunk],
            total_byte_size: 20,
            num_rows: 1,
        };
        let mut w = CompactProtocolWriter::new();
        write_file_metadata(&schema, Compression::Uncompressed, 1, 1, &[rg], "parqlog", &mut w)
            .unwrap();
        assert!(!w.is_empty());
    }
}
