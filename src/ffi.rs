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

//! The stable-ABI, `extern "C"` façade over [`crate::writer::FileWriter`] and
//! [`crate::sink::LogSink`] (spec.md §6).
//!
//! Every entry point is an opaque-handle function: callers get a `*mut`
//! pointer from a `_create`/`_open` call and must pass it back unchanged to
//! every other function for that handle, finally releasing it with the
//! matching `_destroy`. Every body runs under `catch_unwind` so a panic in
//! Rust (an invariant violation, an allocation failure) turns into a status
//! code instead of unwinding across the FFI boundary, which is undefined
//! behavior.

use std::ffi::{CStr, CString};
use std::fs::File;
use std::os::raw::c_char;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use crate::column_data::{ColumnData, ColumnLevels};
use crate::error::ParquetError;
use crate::schema::{ColumnDef, Compression, PhysicalType, Repetition, SchemaDescriptor};
use crate::sink::{LogSink, SinkConfig};
use crate::writer::{FileWriter, WriteOptions};

pub const PARQLOG_OK: i32 = 0;
pub const PARQLOG_INVALID_ARGUMENT: i32 = 1;
pub const PARQLOG_NOT_OPEN: i32 = 2;
pub const PARQLOG_INTERNAL: i32 = 3;
pub const PARQLOG_OUT_OF_MEMORY: i32 = 4;

fn status_for_error(e: &ParquetError) -> i32 {
    match e {
        ParquetError::NotOpen | ParquetError::WriterClosed => PARQLOG_NOT_OPEN,
        ParquetError::OutOfMemory => PARQLOG_OUT_OF_MEMORY,
        ParquetError::InvalidSchema
        | ParquetError::InvalidColumnName(_)
        | ParquetError::InvalidFixedTypeLength(_)
        | ParquetError::InvalidQueueCapacity(_)
        | ParquetError::InvalidPayloadSize
        | ParquetError::InvalidRowGroupRows
        | ParquetError::ColumnCountMismatch { .. }
        | ParquetError::ColumnTypeMismatch { .. }
        | ParquetError::RowCountMismatch { .. }
        | ParquetError::InvalidOffsets(_)
        | ParquetError::InvalidLevels(_, _)
        | ParquetError::TooManyRows(_)
        | ParquetError::LengthOverflow(_)
        | ParquetError::RecordTooLarge(_)
        | ParquetError::InvalidArgument(_) => PARQLOG_INVALID_ARGUMENT,
        _ => PARQLOG_INTERNAL,
    }
}

/// Runs `body`, converting a Rust panic into `PARQLOG_INTERNAL` instead of
/// unwinding into the caller's frame.
fn guard(body: impl FnOnce() -> i32 + std::panic::UnwindSafe) -> i32 {
    panic::catch_unwind(body).unwrap_or(PARQLOG_INTERNAL)
}

unsafe fn slice_from_raw<'a, T>(ptr: *const T, len: usize) -> &'a [T] {
    if len == 0 {
        &[]
    } else {
        std::slice::from_raw_parts(ptr, len)
    }
}

unsafe fn str_from_c(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

// ---------------------------------------------------------------------
// Writer façade
// ---------------------------------------------------------------------

/// Column-array description for `parqlog_writer_write_row_group`. Numeric
/// variants carry an element count in `data_len`; `ByteArray` and
/// `FixedLenByteArray` carry a raw byte length instead (see field comments).
#[repr(C)]
pub struct ParqlogColumn {
    pub physical_type: i32,
    /// Element count for Boolean/Int32/Int64/Int96/Float/Double; raw byte
    /// length for ByteArray (the concatenated value buffer) and
    /// FixedLenByteArray.
    pub data_len: usize,
    pub data_ptr: *const u8,
    /// `ByteArray` only: `offsets_len == value_count + 1`.
    pub offsets_ptr: *const u32,
    pub offsets_len: usize,
}

#[repr(C)]
pub struct ParqlogLevels {
    pub definition_levels_ptr: *const u8,
    pub definition_levels_len: usize,
    pub repetition_levels_ptr: *const u8,
    pub repetition_levels_len: usize,
}

pub struct ParqlogWriter {
    pending_columns: Vec<ColumnDef>,
    inner: Option<FileWriter<File>>,
    last_error: Option<CString>,
}

impl ParqlogWriter {
    fn set_error(&mut self, message: String) {
        self.last_error = CString::new(message).ok();
    }
}

#[no_mangle]
pub extern "C" fn parqlog_writer_create() -> *mut ParqlogWriter {
    Box::into_raw(Box::new(ParqlogWriter {
        pending_columns: Vec::new(),
        inner: None,
        last_error: None,
    }))
}

/// `physical_type`/`repetition` are the integer codes from [`PhysicalType`]/
/// [`Repetition`]. Must be called before `parqlog_writer_open`.
#[no_mangle]
pub extern "C" fn parqlog_writer_add_column(
    handle: *mut ParqlogWriter,
    name: *const c_char,
    physical_type: i32,
    repetition: i32,
    type_length: i32,
) -> i32 {
    if handle.is_null() {
        return PARQLOG_INVALID_ARGUMENT;
    }
    guard(AssertUnwindSafe(|| {
        let handle = unsafe { &mut *handle };
        let name = match unsafe { str_from_c(name) } {
            Some(n) => n,
            None => return PARQLOG_INVALID_ARGUMENT,
        };
        let physical_type = match decode_physical_type(physical_type) {
            Some(t) => t,
            None => return PARQLOG_INVALID_ARGUMENT,
        };
        let repetition = match decode_repetition(repetition) {
            Some(r) => r,
            None => return PARQLOG_INVALID_ARGUMENT,
        };
        let mut column = ColumnDef::new(name, physical_type, repetition);
        if physical_type == PhysicalType::FixedLenByteArray {
            column = column.with_type_length(type_length);
        }
        handle.pending_columns.push(column);
        PARQLOG_OK
    }))
}

/// Finalizes the schema from the columns added so far, opens `path`, and
/// transitions the handle to the OPEN state.
#[no_mangle]
pub extern "C" fn parqlog_writer_open(
    handle: *mut ParqlogWriter,
    path: *const c_char,
    compression: i32,
) -> i32 {
    if handle.is_null() {
        return PARQLOG_INVALID_ARGUMENT;
    }
    guard(AssertUnwindSafe(|| {
        let handle = unsafe { &mut *handle };
        let path = match unsafe { str_from_c(path) } {
            Some(p) => p,
            None => return PARQLOG_INVALID_ARGUMENT,
        };
        let compression = match decode_compression(compression) {
            Some(c) => c,
            None => return PARQLOG_INVALID_ARGUMENT,
        };
        let schema = match SchemaDescriptor::try_new(std::mem::take(&mut handle.pending_columns)) {
            Ok(s) => s,
            Err(e) => {
                let status = status_for_error(&e);
                handle.set_error(e.to_string());
                return status;
            }
        };
        let file = match File::create(Path::new(&path)) {
            Ok(f) => f,
            Err(e) => {
                handle.set_error(e.to_string());
                return PARQLOG_INTERNAL;
            }
        };
        let options = WriteOptions {
            compression,
            ..WriteOptions::default()
        };
        match FileWriter::open(file, schema, options) {
            Ok(writer) => {
                handle.inner = Some(writer);
                PARQLOG_OK
            }
            Err(e) => {
                let status = status_for_error(&e);
                handle.set_error(e.to_string());
                status
            }
        }
    }))
}

/// Equivalent to calling `parqlog_writer_write_row_group_with_levels` with a
/// null `levels` array (every column is REQUIRED).
#[no_mangle]
pub extern "C" fn parqlog_writer_write_row_group(
    handle: *mut ParqlogWriter,
    rows: usize,
    columns: *const ParqlogColumn,
    columns_len: usize,
) -> i32 {
    parqlog_writer_write_row_group_with_levels(
        handle,
        rows,
        columns,
        columns_len,
        std::ptr::null(),
        0,
    )
}

#[no_mangle]
pub extern "C" fn parqlog_writer_write_row_group_with_levels(
    handle: *mut ParqlogWriter,
    rows: usize,
    columns: *const ParqlogColumn,
    columns_len: usize,
    levels: *const ParqlogLevels,
    levels_len: usize,
) -> i32 {
    if handle.is_null() || (columns.is_null() && columns_len > 0) {
        return PARQLOG_INVALID_ARGUMENT;
    }
    guard(AssertUnwindSafe(|| {
        let handle = unsafe { &mut *handle };
        let writer = match handle.inner.as_mut() {
            Some(w) => w,
            None => return PARQLOG_NOT_OPEN,
        };

        let raw_columns = unsafe { slice_from_raw(columns, columns_len) };
        let column_data: Vec<ColumnData<'_>> = match raw_columns.iter().map(decode_column).collect() {
            Ok(v) => v,
            Err(()) => return PARQLOG_INVALID_ARGUMENT,
        };

        let owned_levels;
        let levels_slice: Option<&[ColumnLevels<'_>]> = if levels.is_null() {
            None
        } else {
            let raw_levels = unsafe { slice_from_raw(levels, levels_len) };
            owned_levels = raw_levels.iter().map(decode_levels).collect::<Vec<_>>();
            Some(owned_levels.as_slice())
        };

        match writer.write_row_group(rows, &column_data, levels_slice) {
            Ok(()) => PARQLOG_OK,
            Err(e) => {
                let status = status_for_error(&e);
                handle.set_error(e.to_string());
                status
            }
        }
    }))
}

#[no_mangle]
pub extern "C" fn parqlog_writer_close(handle: *mut ParqlogWriter) -> i32 {
    if handle.is_null() {
        return PARQLOG_INVALID_ARGUMENT;
    }
    guard(AssertUnwindSafe(|| {
        let handle = unsafe { &mut *handle };
        match handle.inner.as_mut() {
            None => PARQLOG_NOT_OPEN,
            Some(writer) => match writer.close() {
                Ok(()) => PARQLOG_OK,
                Err(e) => {
                    let status = status_for_error(&e);
                    handle.set_error(e.to_string());
                    status
                }
            },
        }
    }))
}

/// Returns a pointer valid until the next call on this handle, or until
/// `parqlog_writer_destroy`. Null if no error has been recorded.
#[no_mangle]
pub extern "C" fn parqlog_writer_last_error(handle: *const ParqlogWriter) -> *const c_char {
    if handle.is_null() {
        return std::ptr::null();
    }
    let handle = unsafe { &*handle };
    match &handle.last_error {
        Some(c) => c.as_ptr(),
        None => std::ptr::null(),
    }
}

#[no_mangle]
pub extern "C" fn parqlog_writer_destroy(handle: *mut ParqlogWriter) {
    if handle.is_null() {
        return;
    }
    let _ = panic::catch_unwind(AssertUnwindSafe(|| unsafe {
        drop(Box::from_raw(handle));
    }));
}

fn decode_physical_type(code: i32) -> Option<PhysicalType> {
    Some(match code {
        0 => PhysicalType::Boolean,
        1 => PhysicalType::Int32,
        2 => PhysicalType::Int64,
        3 => PhysicalType::Int96,
        4 => PhysicalType::Float,
        5 => PhysicalType::Double,
        6 => PhysicalType::ByteArray,
        7 => PhysicalType::FixedLenByteArray,
        _ => return None,
    })
}

fn decode_repetition(code: i32) -> Option<Repetition> {
    Some(match code {
        0 => Repetition::Required,
        1 => Repetition::Optional,
        2 => Repetition::Repeated,
        _ => return None,
    })
}

fn decode_compression(code: i32) -> Option<Compression> {
    Some(match code {
        0 => Compression::Uncompressed,
        2 => Compression::Gzip,
        6 => Compression::Zstd,
        _ => return None,
    })
}

fn decode_column<'a>(c: &'a ParqlogColumn) -> std::result::Result<ColumnData<'a>, ()> {
    let physical_type = decode_physical_type(c.physical_type).ok_or(())?;
    Ok(match physical_type {
        PhysicalType::Boolean => {
            // `&[u8]` cannot be soundly reinterpreted as `&[bool]` across
            // this boundary (bool's representation is not guaranteed), so
            // BOOLEAN columns are not exposed through this zero-copy path.
            return Err(());
        }
        PhysicalType::Int32 => {
            let ptr = c.data_ptr as *const i32;
            ColumnData::Int32(unsafe { slice_from_raw(ptr, c.data_len) })
        }
        PhysicalType::Int64 => {
            let ptr = c.data_ptr as *const i64;
            ColumnData::Int64(unsafe { slice_from_raw(ptr, c.data_len) })
        }
        PhysicalType::Int96 => {
            let ptr = c.data_ptr as *const [u8; 12];
            ColumnData::Int96(unsafe { slice_from_raw(ptr, c.data_len) })
        }
        PhysicalType::Float => {
            let ptr = c.data_ptr as *const f32;
            ColumnData::Float(unsafe { slice_from_raw(ptr, c.data_len) })
        }
        PhysicalType::Double => {
            let ptr = c.data_ptr as *const f64;
            ColumnData::Double(unsafe { slice_from_raw(ptr, c.data_len) })
        }
        PhysicalType::ByteArray => ColumnData::ByteArray {
            bytes: unsafe { slice_from_raw(c.data_ptr, c.data_len) },
            offsets: unsafe { slice_from_raw(c.offsets_ptr, c.offsets_len) },
        },
        PhysicalType::FixedLenByteArray => {
            ColumnData::FixedLenByteArray(unsafe { slice_from_raw(c.data_ptr, c.data_len) })
        }
    })
}

fn decode_levels<'a>(l: &'a ParqlogLevels) -> ColumnLevels<'a> {
    ColumnLevels {
        definition_levels: if l.definition_levels_ptr.is_null() {
            None
        } else {
            Some(unsafe { slice_from_raw(l.definition_levels_ptr, l.definition_levels_len) })
        },
        repetition_levels: if l.repetition_levels_ptr.is_null() {
            None
        } else {
            Some(unsafe { slice_from_raw(l.repetition_levels_ptr, l.repetition_levels_len) })
        },
    }
}

// ---------------------------------------------------------------------
// Streaming-sink façade
// ---------------------------------------------------------------------

pub struct ParqlogSink {
    pending_columns: Vec<ColumnDef>,
    config: SinkConfig,
    inner: Option<LogSink<File>>,
    last_error: Option<CString>,
}

#[no_mangle]
pub extern "C" fn parqlog_sink_create() -> *mut ParqlogSink {
    Box::into_raw(Box::new(ParqlogSink {
        pending_columns: Vec::new(),
        config: SinkConfig::default(),
        inner: None,
        last_error: None,
    }))
}

#[no_mangle]
pub extern "C" fn parqlog_sink_add_column(
    handle: *mut ParqlogSink,
    name: *const c_char,
    physical_type: i32,
    repetition: i32,
    type_length: i32,
) -> i32 {
    if handle.is_null() {
        return PARQLOG_INVALID_ARGUMENT;
    }
    guard(AssertUnwindSafe(|| {
        let handle = unsafe { &mut *handle };
        let name = match unsafe { str_from_c(name) } {
            Some(n) => n,
            None => return PARQLOG_INVALID_ARGUMENT,
        };
        let physical_type = match decode_physical_type(physical_type) {
            Some(t) => t,
            None => return PARQLOG_INVALID_ARGUMENT,
        };
        let repetition = match decode_repetition(repetition) {
            Some(r) => r,
            None => return PARQLOG_INVALID_ARGUMENT,
        };
        let mut column = ColumnDef::new(name, physical_type, repetition);
        if physical_type == PhysicalType::FixedLenByteArray {
            column = column.with_type_length(type_length);
        }
        handle.pending_columns.push(column);
        PARQLOG_OK
    }))
}

/// Sets the ring capacity, row-group threshold, max payload size (in
/// bytes) and idle-flush timeout (in milliseconds). Must be called before
/// `parqlog_sink_start`.
#[no_mangle]
pub extern "C" fn parqlog_sink_configure(
    handle: *mut ParqlogSink,
    ring_capacity: usize,
    row_group_rows: usize,
    max_payload_bytes: usize,
    idle_timeout_millis: u64,
) -> i32 {
    if handle.is_null() {
        return PARQLOG_INVALID_ARGUMENT;
    }
    let handle = unsafe { &mut *handle };
    handle.config = SinkConfig {
        ring_capacity,
        row_group_rows,
        max_payload_bytes,
        idle_timeout: std::time::Duration::from_millis(idle_timeout_millis),
    };
    PARQLOG_OK
}

#[no_mangle]
pub extern "C" fn parqlog_sink_start(
    handle: *mut ParqlogSink,
    path: *const c_char,
    compression: i32,
) -> i32 {
    if handle.is_null() {
        return PARQLOG_INVALID_ARGUMENT;
    }
    guard(AssertUnwindSafe(|| {
        let handle = unsafe { &mut *handle };
        let path = match unsafe { str_from_c(path) } {
            Some(p) => p,
            None => return PARQLOG_INVALID_ARGUMENT,
        };
        let compression = match decode_compression(compression) {
            Some(c) => c,
            None => return PARQLOG_INVALID_ARGUMENT,
        };
        let schema = match SchemaDescriptor::try_new(handle.pending_columns.clone()) {
            Ok(s) => s,
            Err(e) => {
                let status = status_for_error(&e);
                handle.last_error = CString::new(e.to_string()).ok();
                return status;
            }
        };
        let file = match File::create(Path::new(&path)) {
            Ok(f) => f,
            Err(e) => {
                handle.last_error = CString::new(e.to_string()).ok();
                return PARQLOG_INTERNAL;
            }
        };
        let options = WriteOptions {
            compression,
            ..WriteOptions::default()
        };
        let writer = match FileWriter::open(file, schema.clone(), options) {
            Ok(w) => w,
            Err(e) => {
                let status = status_for_error(&e);
                handle.last_error = CString::new(e.to_string()).ok();
                return status;
            }
        };
        let mut sink = match LogSink::new(handle.config) {
            Ok(s) => s,
            Err(e) => {
                let status = status_for_error(&e);
                handle.last_error = CString::new(e.to_string()).ok();
                return status;
            }
        };
        match sink.start(writer, schema) {
            Ok(()) => {
                handle.inner = Some(sink);
                PARQLOG_OK
            }
            Err(e) => {
                let status = status_for_error(&e);
                handle.last_error = CString::new(e.to_string()).ok();
                status
            }
        }
    }))
}

/// Producer-callable, wait-free. Returns 1 if the record was accepted, 0 if
/// it was dropped (oversized, empty, or the ring is full).
#[no_mangle]
pub extern "C" fn parqlog_sink_push(handle: *const ParqlogSink, data: *const u8, len: usize) -> i32 {
    if handle.is_null() {
        return 0;
    }
    let handle = unsafe { &*handle };
    match &handle.inner {
        Some(sink) => {
            let bytes = unsafe { slice_from_raw(data, len) };
            sink.try_record(bytes) as i32
        }
        None => 0,
    }
}

#[no_mangle]
pub extern "C" fn parqlog_sink_stop(handle: *mut ParqlogSink) -> i32 {
    if handle.is_null() {
        return PARQLOG_INVALID_ARGUMENT;
    }
    guard(AssertUnwindSafe(|| {
        let handle = unsafe { &mut *handle };
        match handle.inner.as_mut() {
            None => PARQLOG_NOT_OPEN,
            Some(sink) => match sink.shutdown() {
                Ok(()) => PARQLOG_OK,
                Err(e) => {
                    let status = status_for_error(&e);
                    handle.last_error = CString::new(e.to_string()).ok();
                    status
                }
            },
        }
    }))
}

#[no_mangle]
pub extern "C" fn parqlog_sink_entries_written(handle: *const ParqlogSink) -> u64 {
    if handle.is_null() {
        return 0;
    }
    let handle = unsafe { &*handle };
    handle.inner.as_ref().map(|s| s.entries_written()).unwrap_or(0)
}

#[no_mangle]
pub extern "C" fn parqlog_sink_files_written(handle: *const ParqlogSink) -> u64 {
    if handle.is_null() {
        return 0;
    }
    let handle = unsafe { &*handle };
    handle.inner.as_ref().map(|s| s.files_written()).unwrap_or(0)
}

#[no_mangle]
pub extern "C" fn parqlog_sink_dropped_count(handle: *const ParqlogSink) -> u64 {
    if handle.is_null() {
        return 0;
    }
    let handle = unsafe { &*handle };
    handle.inner.as_ref().map(|s| s.dropped_count()).unwrap_or(0)
}

#[no_mangle]
pub extern "C" fn parqlog_sink_last_error(handle: *const ParqlogSink) -> *const c_char {
    if handle.is_null() {
        return std::ptr::null();
    }
    let handle = unsafe { &*handle };
    match &handle.last_error {
        Some(c) => c.as_ptr(),
        None => std::ptr::null(),
    }
}

#[no_mangle]
pub extern "C" fn parqlog_sink_destroy(handle: *mut ParqlogSink) {
    if handle.is_null() {
        return;
    }
    let _ = panic::catch_unwind(AssertUnwindSafe(|| unsafe {
        drop(Box::from_raw(handle));
    }));
}
