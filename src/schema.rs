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

//! Schema model and its Thrift serialization (spec.md §3, §4.6).

use crate::error::{ParquetError, Result};
use crate::thrift::{self, CompactProtocolWriter};

/// The closed set of Parquet physical types, encoded as the integer the
/// Parquet spec assigns (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhysicalType {
    Boolean = 0,
    Int32 = 1,
    Int64 = 2,
    Int96 = 3,
    Float = 4,
    Double = 5,
    ByteArray = 6,
    FixedLenByteArray = 7,
}

impl PhysicalType {
    pub fn code(self) -> i32 {
        self as i32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repetition {
    Required = 0,
    Optional = 1,
    Repeated = 2,
}

impl Repetition {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// The maximum definition/repetition level this crate supports for the
    /// given repetition. Deeper nesting is out of scope (spec.md §9).
    pub fn max_def_level(self) -> u32 {
        match self {
            Repetition::Required => 0,
            Repetition::Optional | Repetition::Repeated => 1,
        }
    }

    pub fn max_rep_level(self) -> u32 {
        match self {
            Repetition::Required | Repetition::Optional => 0,
            Repetition::Repeated => 1,
        }
    }
}

/// Compression codec, with integer codes matching the Parquet spec
/// (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Uncompressed = 0,
    Gzip = 2,
    Zstd = 6,
}

impl Compression {
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Optional logical/converted-type annotation on a column (spec.md §3).
/// Kept intentionally small: this crate does not implement the full
/// logical-type tree (no nested/complex annotations), only the handful a
/// flat leaf column can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalAnnotation {
    Utf8,
    Int(u8, bool), // bit width, signed
    Timestamp,
}

impl LogicalAnnotation {
    /// The legacy `ConvertedType` thrift enum value, used for
    /// `SchemaElement.converted_type` (field 6).
    fn converted_type_code(self) -> i32 {
        match self {
            LogicalAnnotation::Utf8 => 0,
            LogicalAnnotation::Int(8, true) => 1,
            LogicalAnnotation::Int(16, true) => 2,
            LogicalAnnotation::Int(32, true) => 3,
            LogicalAnnotation::Int(64, true) => 4,
            LogicalAnnotation::Int(8, false) => 5,
            LogicalAnnotation::Int(16, false) => 6,
            LogicalAnnotation::Int(32, false) => 7,
            LogicalAnnotation::Int(64, false) => 8,
            LogicalAnnotation::Int(_, _) => 3,
            LogicalAnnotation::Timestamp => 9, // TIMESTAMP_MILLIS
        }
    }
}

/// One column's static definition (spec.md §3). Names are owned by the
/// writer for its lifetime, per spec.md's ownership model.
#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub name: String,
    pub physical_type: PhysicalType,
    pub repetition: Repetition,
    /// Positive when `physical_type == FixedLenByteArray`, ignored otherwise.
    pub type_length: i32,
    pub logical_annotation: Option<LogicalAnnotation>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, physical_type: PhysicalType, repetition: Repetition) -> Self {
        Self {
            name: name.into(),
            physical_type,
            repetition,
            type_length: 0,
            logical_annotation: None,
        }
    }

    pub fn with_type_length(mut self, type_length: i32) -> Self {
        self.type_length = type_length;
        self
    }

    pub fn with_logical_annotation(mut self, annotation: LogicalAnnotation) -> Self {
        self.logical_annotation = Some(annotation);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(ParquetError::InvalidColumnName(self.name.clone()));
        }
        if self.physical_type == PhysicalType::FixedLenByteArray && self.type_length <= 0 {
            return Err(ParquetError::InvalidFixedTypeLength(self.name.clone()));
        }
        Ok(())
    }
}

/// An ordered, validated schema: the list of columns fixed at `open` and
/// never mutated afterwards (spec.md §3 `FileState` invariant).
#[derive(Debug, Clone)]
pub struct SchemaDescriptor {
    columns: Vec<ColumnDef>,
    /// Byte offset of each column's fixed-width slice within a packed
    /// record, and each optional column's null-bitmap byte offset,
    /// precomputed once so the Batch Accumulator (spec.md §4.8) never
    /// recomputes per record.
    pub(crate) record_layout: Vec<ColumnLayout>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ColumnLayout {
    /// Offset, in bytes, of this column's fixed-width value within a record,
    /// *after* the leading null-bitmap region.
    pub value_offset: usize,
    pub value_width: usize,
    /// Byte offset of this column's bit within the record's leading
    /// null-bitmap, valid only when the column is OPTIONAL.
    pub null_bit_index: usize,
}

impl SchemaDescriptor {
    pub fn try_new(columns: Vec<ColumnDef>) -> Result<Self> {
        if columns.is_empty() {
            return Err(ParquetError::InvalidSchema);
        }
        for c in &columns {
            c.validate()?;
        }

        let nullable_count = columns
            .iter()
            .filter(|c| c.repetition != Repetition::Required)
            .count();
        let bitmap_bytes = nullable_count.div_ceil(8);

        let mut record_layout = Vec::with_capacity(columns.len());
        let mut value_cursor = bitmap_bytes;
        let mut null_bit_cursor = 0usize;
        for c in &columns {
            let value_width = fixed_value_width(c.physical_type, c.type_length);
            let null_bit_index = if c.repetition != Repetition::Required {
                let idx = null_bit_cursor;
                null_bit_cursor += 1;
                idx
            } else {
                0
            };
            record_layout.push(ColumnLayout {
                value_offset: value_cursor,
                value_width,
                null_bit_index,
            });
            value_cursor += value_width;
        }

        Ok(Self {
            columns,
            record_layout,
        })
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn nullable_count(&self) -> usize {
        self.columns
            .iter()
            .filter(|c| c.repetition != Repetition::Required)
            .count()
    }

    pub fn null_bitmap_bytes(&self) -> usize {
        self.nullable_count().div_ceil(8)
    }

    pub fn fixed_record_width(&self) -> usize {
        self.null_bitmap_bytes()
            + self
                .columns
                .iter()
                .map(|c| fixed_value_width(c.physical_type, c.type_length))
                .sum::<usize>()
    }

    /// Serializes the schema tree: one root `SchemaElement` with
    /// `num_children = columns.len()`, followed by one leaf per column
    /// (spec.md §4.6 "Schema tree serialization").
    pub fn write_thrift(&self, w: &mut CompactProtocolWriter) -> Result<()> {
        // root
        w.write_struct_begin();
        w.write_i32_field(5, self.columns.len() as i32)?; // num_children
        w.write_binary_field(4, b"schema")?; // name
        w.write_struct_end();

        for c in &self.columns {
            w.write_struct_begin();
            w.write_i32_field(1, c.physical_type.code())?; // type
            if c.physical_type == PhysicalType::FixedLenByteArray {
                w.write_i32_field(2, c.type_length)?; // type_length
            }
            w.write_i32_field(3, c.repetition.code())?; // repetition_type
            w.write_binary_field(4, c.name.as_bytes())?; // name
            if let Some(annotation) = c.logical_annotation {
                w.write_i32_field(6, annotation.converted_type_code())?; // converted_type
            }
            w.write_struct_end();
        }
        Ok(())
    }

    /// Writes the schema as a `list<SchemaElement>` field inside
    /// `FileMetaData` (field id 2, per spec.md §6).
    pub fn write_thrift_list_field(&self, field_id: i16, w: &mut CompactProtocolWriter) -> Result<()> {
        w.write_list_field_header(field_id, self.columns.len() + 1, thrift::STRUCT)?;
        self.write_thrift(w)
    }
}

/// The PLAIN-encoded width, in bytes, of a single value of `physical_type`.
/// `BYTE_ARRAY` has no fixed width (returns 0; its length is carried inline).
fn fixed_value_width(physical_type: PhysicalType, type_length: i32) -> usize {
    match physical_type {
        PhysicalType::Boolean => 1, // one null-or-presence byte slot per record; bits are packed separately during encode
        PhysicalType::Int32 | PhysicalType::Float => 4,
        PhysicalType::Int64 | PhysicalType::Double => 8,
        PhysicalType::Int96 => 12,
        PhysicalType::ByteArray => 0,
        PhysicalType::FixedLenByteArray => type_length.max(0) as usize,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schema() -> SchemaDescriptor {
        SchemaDescriptor::try_new(vec![
            ColumnDef::new("a", PhysicalType::Int32, Repetition::Required),
            ColumnDef::new("b", PhysicalType::ByteArray, Repetition::Optional),
        ])
        .unwrap()
    }

    #[test]
    fn rejects_empty_schema() {
        assert!(SchemaDescriptor::try_new(vec![]).is_err());
    }

    #[test]
    fn rejects_empty_column_name() {
        let cols = vec![ColumnDef::new("", PhysicalType::Int32, Repetition::Required)];
        assert!(SchemaDescriptor::try_new(cols).is_err());
    }

    #[test]
    fn rejects_fixed_len_without_type_length() {
        let cols = vec![ColumnDef::new(
            "x",
            PhysicalType::FixedLenByteArray,
            Repetition::Required,
        )];
        assert!(SchemaDescriptor::try_new(cols).is_err());
    }

    #[test]
    fn accepts_valid_fixed_len() {
        let cols = vec![ColumnDef::new(
            "ticker",
            PhysicalType::FixedLenByteArray,
            Repetition::Required,
        )
        .with_type_length(8)];
        assert!(SchemaDescriptor::try_new(cols).is_ok());
    }

    #[test]
    fn schema_writes_root_and_leaves() {
        let schema = sample_schema();
        let mut w = CompactProtocolWriter::new();
        schema.write_thrift(&mut w).unwrap();
        assert!(!w.is_empty());
    }

    #[test]
    fn null_bitmap_sized_by_nullable_count() {
        let schema = sample_schema();
        assert_eq!(schema.null_bitmap_bytes(), 1);
    }
}
