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

//! Splits fixed-size producer records into per-column buffers the writer
//! can hand to `write_row_group` (spec.md §4.8).
//!
//! Owned exclusively by the drainer thread; producers never touch it
//! (spec.md §4.8, §5).

use crate::column_data::{ColumnData, ColumnLevels};
use crate::error::{ParquetError, Result};
use crate::schema::{PhysicalType, Repetition, SchemaDescriptor};

/// One column's accumulated values, typed so no unsafe reinterpretation of
/// raw record bytes is needed when building [`ColumnData`] for the writer.
enum ColumnBuffer {
    Boolean(Vec<bool>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Int96(Vec<[u8; 12]>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    FixedLenByteArray(Vec<u8>),
}

impl ColumnBuffer {
    fn new(physical_type: PhysicalType) -> Result<Self> {
        Ok(match physical_type {
            PhysicalType::Boolean => ColumnBuffer::Boolean(Vec::new()),
            PhysicalType::Int32 => ColumnBuffer::Int32(Vec::new()),
            PhysicalType::Int64 => ColumnBuffer::Int64(Vec::new()),
            PhysicalType::Int96 => ColumnBuffer::Int96(Vec::new()),
            PhysicalType::Float => ColumnBuffer::Float(Vec::new()),
            PhysicalType::Double => ColumnBuffer::Double(Vec::new()),
            PhysicalType::FixedLenByteArray => ColumnBuffer::FixedLenByteArray(Vec::new()),
            PhysicalType::ByteArray => {
                return Err(ParquetError::General(
                    "variable-length BYTE_ARRAY columns are not supported by the fixed-record \
                     batch accumulator; use the FileWriter API directly for those columns"
                        .to_string(),
                ))
            }
        })
    }

    fn clear(&mut self) {
        match self {
            ColumnBuffer::Boolean(v) => v.clear(),
            ColumnBuffer::Int32(v) => v.clear(),
            ColumnBuffer::Int64(v) => v.clear(),
            ColumnBuffer::Int96(v) => v.clear(),
            ColumnBuffer::Float(v) => v.clear(),
            ColumnBuffer::Double(v) => v.clear(),
            ColumnBuffer::FixedLenByteArray(v) => v.clear(),
        }
    }

    fn push_from_record(&mut self, record: &[u8], type_length: i32) {
        match self {
            ColumnBuffer::Boolean(v) => v.push(record[0] != 0),
            ColumnBuffer::Int32(v) => v.push(i32::from_le_bytes(record[0..4].try_into().unwrap())),
            ColumnBuffer::Int64(v) => v.push(i64::from_le_bytes(record[0..8].try_into().unwrap())),
            ColumnBuffer::Int96(v) => {
                let mut buf = [0u8; 12];
                buf.copy_from_slice(&record[0..12]);
                v.push(buf);
            }
            ColumnBuffer::Float(v) => v.push(f32::from_le_bytes(record[0..4].try_into().unwrap())),
            ColumnBuffer::Double(v) => v.push(f64::from_le_bytes(record[0..8].try_into().unwrap())),
            ColumnBuffer::FixedLenByteArray(v) => {
                v.extend_from_slice(&record[0..type_length as usize]);
            }
        }
    }

    fn as_column_data(&self) -> ColumnData<'_> {
        match self {
            ColumnBuffer::Boolean(v) => ColumnData::Boolean(v),
            ColumnBuffer::Int32(v) => ColumnData::Int32(v),
            ColumnBuffer::Int64(v) => ColumnData::Int64(v),
            ColumnBuffer::Int96(v) => ColumnData::Int96(v),
            ColumnBuffer::Float(v) => ColumnData::Float(v),
            ColumnBuffer::Double(v) => ColumnData::Double(v),
            ColumnBuffer::FixedLenByteArray(v) => ColumnData::FixedLenByteArray(v),
        }
    }
}

/// Accumulates fixed-size records into per-column buffers, tracking a
/// definition-level byte per row for OPTIONAL columns (spec.md §4.8).
pub struct BatchAccumulator {
    schema: SchemaDescriptor,
    columns: Vec<ColumnBuffer>,
    definition_levels: Vec<Vec<u8>>,
    row_count: usize,
}

impl BatchAccumulator {
    pub fn new(schema: SchemaDescriptor) -> Result<Self> {
        let columns = schema
            .columns()
            .iter()
            .map(|c| ColumnBuffer::new(c.physical_type))
            .collect::<Result<Vec<_>>>()?;
        let definition_levels = schema.columns().iter().map(|_| Vec::new()).collect();
        Ok(Self {
            schema,
            columns,
            definition_levels,
            row_count: 0,
        })
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Appends one fixed-size record. `record.len()` must equal
    /// `schema.fixed_record_width()`; the first `null_bitmap_bytes` bytes
    /// are a per-column nullability bitmap (LSB-first per column position
    /// among nullable columns), the rest is each column's fixed-width value
    /// in schema order, laid out per [`SchemaDescriptor`]'s precomputed
    /// offsets (spec.md §4.8).
    pub fn append(&mut self, record: &[u8]) -> Result<()> {
        let expected = self.schema.fixed_record_width();
        if record.len() != expected {
            return Err(ParquetError::RowCountMismatch {
                index: 0,
                name: "<record>".to_string(),
                expected,
                actual: record.len(),
            });
        }
        let bitmap_bytes = self.schema.null_bitmap_bytes();
        let bitmap = &record[..bitmap_bytes];

        for (i, column) in self.schema.columns().iter().enumerate() {
            let layout = self.schema.record_layout[i];
            let present = if column.repetition == Repetition::Required {
                true
            } else {
                let byte = bitmap[layout.null_bit_index / 8];
                (byte >> (layout.null_bit_index % 8)) & 1 == 1
            };

            if column.repetition != Repetition::Required {
                self.definition_levels[i].push(present as u8);
            }

            if present {
                let start = layout.value_offset;
                let end = start + layout.value_width;
                self.columns[i].push_from_record(&record[start..end], column.type_length);
            }
        }
        self.row_count += 1;
        Ok(())
    }

    /// Clears all buffers, retaining their capacity (spec.md §4.8 `reset`).
    pub fn reset(&mut self) {
        for c in &mut self.columns {
            c.clear();
        }
        for d in &mut self.definition_levels {
            d.clear();
        }
        self.row_count = 0;
    }

    /// Borrowed views ready to pass to `FileWriter::write_row_group`.
    pub fn as_row_group(&self) -> (Vec<ColumnData<'_>>, Vec<ColumnLevels<'_>>) {
        let columns = self.columns.iter().map(ColumnBuffer::as_column_data).collect();
        let levels = self
            .schema
            .columns()
            .iter()
            .enumerate()
            .map(|(i, c)| {
                if c.repetition == Repetition::Required {
                    ColumnLevels::none()
                } else {
                    ColumnLevels {
                        definition_levels: Some(&self.definition_levels[i]),
                        repetition_levels: None,
                    }
                }
            })
            .collect();
        (columns, levels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnDef;

    fn schema() -> SchemaDescriptor {
        SchemaDescriptor::try_new(vec![
            ColumnDef::new("id", PhysicalType::Int64, Repetition::Required),
            ColumnDef::new("price", PhysicalType::Double, Repetition::Optional),
        ])
        .unwrap()
    }

    fn record(id: i64, price: Option<f64>) -> Vec<u8> {
        let mut r = vec![0u8]; // 1 nullable column -> 1 bitmap byte
        if price.is_some() {
            r[0] |= 1;
        }
        r.extend_from_slice(&id.to_le_bytes());
        r.extend_from_slice(&price.unwrap_or(0.0).to_le_bytes());
        r
    }

    #[test]
    fn accumulates_rows_and_nulls() {
        let mut acc = BatchAccumulator::new(schema()).unwrap();
        acc.append(&record(1, Some(2.5))).unwrap();
        acc.append(&record(2, None)).unwrap();
        assert_eq!(acc.row_count(), 2);

        let (columns, levels) = acc.as_row_group();
        match &columns[0] {
            ColumnData::Int64(v) => assert_eq!(v, &[1, 2]),
            _ => panic!("wrong variant"),
        }
        match &columns[1] {
            ColumnData::Double(v) => assert_eq!(v, &[2.5]), // only the present value
            _ => panic!("wrong variant"),
        }
        assert_eq!(levels[1].definition_levels, Some(&[1u8, 0u8][..]));
    }

    #[test]
    fn reset_clears_but_keeps_capacity() {
        let mut acc = BatchAccumulator::new(schema()).unwrap();
        acc.append(&record(1, Some(1.0))).unwrap();
        acc.reset();
        assert_eq!(acc.row_count(), 0);
        assert!(acc.is_empty());
    }

    #[test]
    fn rejects_wrong_record_size() {
        let mut acc = BatchAccumulator::new(schema()).unwrap();
        assert!(acc.append(&[0u8; 3]).is_err());
    }

    #[test]
    fn byte_array_schema_is_rejected_at_construction() {
        let schema = SchemaDescriptor::try_new(vec![ColumnDef::new(
            "s",
            PhysicalType::ByteArray,
            Repetition::Required,
        )])
        .unwrap();
        assert!(BatchAccumulator::new(schema).is_err());
    }
}
