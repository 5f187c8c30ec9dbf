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

//! The column value buffers and validity levels producers (or the batch
//! accumulator) hand to the writer for a row group (spec.md §3).

use crate::error::{ParquetError, Result};
use crate::schema::{ColumnDef, PhysicalType, Repetition};

/// A dense value buffer, one variant per [`PhysicalType`]. Producer-supplied
/// buffers are borrowed for the duration of a single `write_row_group` call
/// and never retained (spec.md §3 ownership model), hence the lifetime.
#[derive(Debug)]
pub enum ColumnData<'a> {
    Boolean(&'a [bool]),
    Int32(&'a [i32]),
    Int64(&'a [i64]),
    Int96(&'a [[u8; 12]]),
    Float(&'a [f32]),
    Double(&'a [f64]),
    /// `(bytes, offsets)`: `offsets.len() == value_count + 1`, starts at 0,
    /// is non-decreasing, and ends at `bytes.len()`.
    ByteArray { bytes: &'a [u8], offsets: &'a [u32] },
    /// Concatenated `value_count * type_length` bytes.
    FixedLenByteArray(&'a [u8]),
}

impl<'a> ColumnData<'a> {
    pub fn physical_type(&self) -> PhysicalType {
        match self {
            ColumnData::Boolean(_) => PhysicalType::Boolean,
            ColumnData::Int32(_) => PhysicalType::Int32,
            ColumnData::Int64(_) => PhysicalType::Int64,
            ColumnData::Int96(_) => PhysicalType::Int96,
            ColumnData::Float(_) => PhysicalType::Float,
            ColumnData::Double(_) => PhysicalType::Double,
            ColumnData::ByteArray { .. } => PhysicalType::ByteArray,
            ColumnData::FixedLenByteArray(_) => PhysicalType::FixedLenByteArray,
        }
    }

    /// The number of values this buffer actually carries (not the row
    /// count — for OPTIONAL/REPEATED columns these differ).
    pub fn value_count(&self, type_length: i32) -> usize {
        match self {
            ColumnData::Boolean(v) => v.len(),
            ColumnData::Int32(v) => v.len(),
            ColumnData::Int64(v) => v.len(),
            ColumnData::Int96(v) => v.len(),
            ColumnData::Float(v) => v.len(),
            ColumnData::Double(v) => v.len(),
            ColumnData::ByteArray { offsets, .. } => offsets.len().saturating_sub(1),
            ColumnData::FixedLenByteArray(bytes) => {
                if type_length > 0 {
                    bytes.len() / type_length as usize
                } else {
                    0
                }
            }
        }
    }
}

/// Optional definition/repetition level streams for one column
/// (spec.md §3 `ColumnLevels`).
#[derive(Debug, Default, Clone)]
pub struct ColumnLevels<'a> {
    pub definition_levels: Option<&'a [u8]>,
    pub repetition_levels: Option<&'a [u8]>,
}

impl<'a> ColumnLevels<'a> {
    pub const fn none() -> Self {
        Self {
            definition_levels: None,
            repetition_levels: None,
        }
    }

    /// Validates the level streams against `repetition` and `rows`, and
    /// returns `(value_count, row_count)` as implied by the levels
    /// (spec.md §3 `ColumnLevels` invariants).
    pub(crate) fn validate(
        &self,
        column: &ColumnDef,
        rows: usize,
    ) -> Result<(usize, usize)> {
        match column.repetition {
            Repetition::Required => {
                if self.definition_levels.is_some() || self.repetition_levels.is_some() {
                    return Err(ParquetError::InvalidLevels(
                        column.name.clone(),
                        "REQUIRED columns must not carry definition or repetition levels",
                    ));
                }
                Ok((rows, rows))
            }
            Repetition::Optional => {
                let def = self.definition_levels.ok_or_else(|| {
                    ParquetError::InvalidLevels(
                        column.name.clone(),
                        "OPTIONAL columns require definition_levels",
                    )
                })?;
                if self.repetition_levels.is_some() {
                    return Err(ParquetError::InvalidLevels(
                        column.name.clone(),
                        "OPTIONAL columns (max_def_level=1) must not carry repetition_levels",
                    ));
                }
                if def.len() != rows {
                    return Err(ParquetError::InvalidLevels(
                        column.name.clone(),
                        "definition_levels length must equal row_count",
                    ));
                }
                if def.iter().any(|&v| v > 1) {
                    return Err(ParquetError::InvalidLevels(
                        column.name.clone(),
                        "definition level values must be 0 or 1 (deeper nesting is out of scope)",
                    ));
                }
                let value_count = def.iter().filter(|&&v| v == 1).count();
                Ok((value_count, rows))
            }
            Repetition::Repeated => {
                let def = self.definition_levels.ok_or_else(|| {
                    ParquetError::InvalidLevels(
                        column.name.clone(),
                        "REPEATED columns require definition_levels",
                    )
                })?;
                let rep = self.repetition_levels.ok_or_else(|| {
                    ParquetError::InvalidLevels(
                        column.name.clone(),
                        "REPEATED columns require repetition_levels",
                    )
                })?;
                if def.len() != rep.len() {
                    return Err(ParquetError::InvalidLevels(
                        column.name.clone(),
                        "definition_levels and repetition_levels must have equal length",
                    ));
                }
                if rep.first() != Some(&0) {
                    return Err(ParquetError::InvalidLevels(
                        column.name.clone(),
                        "the first repetition level must be 0",
                    ));
                }
                if def.iter().any(|&v| v > 1) || rep.iter().any(|&v| v > 1) {
                    return Err(ParquetError::InvalidLevels(
                        column.name.clone(),
                        "level values above 1 imply nested groups, out of scope",
                    ));
                }
                let row_count = rep.iter().filter(|&&v| v == 0).count();
                if row_count != rows {
                    return Err(ParquetError::InvalidLevels(
                        column.name.clone(),
                        "row_count derived from repetition_levels must equal the declared rows",
                    ));
                }
                let value_count = def.iter().filter(|&&v| v == 1).count();
                Ok((value_count, row_count))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnDef, PhysicalType, Repetition};

    fn col(repetition: Repetition) -> ColumnDef {
        ColumnDef::new("x", PhysicalType::Int32, repetition)
    }

    #[test]
    fn required_rejects_any_levels() {
        let c = col(Repetition::Required);
        let levels = ColumnLevels {
            definition_levels: Some(&[1, 1]),
            repetition_levels: None,
        };
        assert!(levels.validate(&c, 2).is_err());
    }

    #[test]
    fn required_ok_without_levels() {
        let c = col(Repetition::Required);
        let (values, rows) = ColumnLevels::none().validate(&c, 5).unwrap();
        assert_eq!((values, rows), (5, 5));
    }

    #[test]
    fn optional_counts_ones_as_values() {
        let c = col(Repetition::Optional);
        let levels = ColumnLevels {
            definition_levels: Some(&[1, 0, 1]),
            repetition_levels: None,
        };
        let (values, rows) = levels.validate(&c, 3).unwrap();
        assert_eq!((values, rows), (2, 3));
    }

    #[test]
    fn optional_rejects_repetition_levels() {
        let c = col(Repetition::Optional);
        let levels = ColumnLevels {
            definition_levels: Some(&[1]),
            repetition_levels: Some(&[0]),
        };
        assert!(levels.validate(&c, 1).is_err());
    }

    #[test]
    fn repeated_requires_first_rep_level_zero() {
        let c = col(Repetition::Repeated);
        let levels = ColumnLevels {
            definition_levels: Some(&[1, 1]),
            repetition_levels: Some(&[1, 0]),
        };
        assert!(levels.validate(&c, 1).is_err());
    }

    #[test]
    fn repeated_row_count_is_zero_count_in_rep_levels() {
        let c = col(Repetition::Repeated);
        let levels = ColumnLevels {
            definition_levels: Some(&[1, 1, 1]),
            repetition_levels: Some(&[0, 1, 0]),
        };
        let (values, rows) = levels.validate(&c, 2).unwrap();
        assert_eq!((values, rows), (3, 2));
    }
}
