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

//! The background log sink worker: a drainer thread that pulls records off
//! the ring buffer, batches them through the [`BatchAccumulator`], and
//! flushes row groups to a [`FileWriter`] (spec.md §4.9).

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, trace};

use crate::accumulator::BatchAccumulator;
use crate::error::{ParquetError, Result};
use crate::ring::RingBuffer;
use crate::schema::SchemaDescriptor;
use crate::writer::FileWriter;

/// The largest record this sink will carry through the ring buffer. Producer
/// slots are fixed-size so `try_record` never allocates on the hot path;
/// `SinkConfig::max_payload_bytes` must be within this bound (spec.md §4.7's
/// "fixed-capacity record slots" requirement).
pub const MAX_RECORD_BYTES: usize = 256;

#[derive(Clone, Copy)]
struct Slot {
    buf: [u8; MAX_RECORD_BYTES],
    len: u16,
}

impl Slot {
    fn from_bytes(bytes: &[u8]) -> Self {
        let mut buf = [0u8; MAX_RECORD_BYTES];
        buf[..bytes.len()].copy_from_slice(bytes);
        Self {
            buf,
            len: bytes.len() as u16,
        }
    }

    fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len as usize]
    }
}

/// Sink configuration, a plain struct per this crate's configuration style
/// (no serde, no config file — see SPEC_FULL.md).
#[derive(Debug, Clone, Copy)]
pub struct SinkConfig {
    /// Ring buffer capacity; must be a non-zero power of two.
    pub ring_capacity: usize,
    /// Row group size at which the drainer flushes eagerly.
    pub row_group_rows: usize,
    /// Records larger than this are dropped by `try_record` without
    /// touching the ring.
    pub max_payload_bytes: usize,
    /// How long the drainer waits between drain passes when the ring is
    /// idle, before flushing whatever partial row group it has
    /// accumulated (spec.md §4.9 idle-timeout flush).
    pub idle_timeout: Duration,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            ring_capacity: 1024,
            row_group_rows: 4096,
            max_payload_bytes: MAX_RECORD_BYTES,
            idle_timeout: Duration::from_millis(100),
        }
    }
}

impl SinkConfig {
    fn validate(&self) -> Result<()> {
        if self.ring_capacity == 0 || !self.ring_capacity.is_power_of_two() {
            return Err(ParquetError::InvalidQueueCapacity(self.ring_capacity));
        }
        if self.row_group_rows == 0 {
            return Err(ParquetError::InvalidRowGroupRows);
        }
        if self.max_payload_bytes == 0 || self.max_payload_bytes > MAX_RECORD_BYTES {
            return Err(ParquetError::InvalidPayloadSize);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Created,
    Running,
    Stopping,
    Stopped,
}

struct Shared {
    stop: Mutex<bool>,
    wake: Condvar,
    dropped: AtomicU64,
    entries_written: AtomicU64,
    row_groups_written: AtomicU64,
    files_written: AtomicU64,
    faulted: AtomicBool,
}

/// Owns the ring buffer, the drainer thread, and the writer it feeds.
/// `try_record` is callable from the producer thread; everything else
/// (`start`, `shutdown`) is called from whichever thread owns the sink
/// itself (spec.md §4.9, §5).
pub struct LogSink<W: Write + Send + 'static> {
    config: SinkConfig,
    ring: Arc<RingBuffer<Slot>>,
    shared: Arc<Shared>,
    state: State,
    handle: Option<JoinHandle<Result<FileWriter<W>>>>,
    error: Arc<Mutex<Option<String>>>,
}

impl<W: Write + Send + 'static> LogSink<W> {
    /// Builds a sink in the `Created` state. The ring buffer is allocated
    /// here so `try_record` can be called (and will simply drop everything)
    /// even before `start` spawns the drainer thread.
    pub fn new(config: SinkConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ring: Arc::new(RingBuffer::try_new(config.ring_capacity)?),
            shared: Arc::new(Shared {
                stop: Mutex::new(false),
                wake: Condvar::new(),
                dropped: AtomicU64::new(0),
                entries_written: AtomicU64::new(0),
                row_groups_written: AtomicU64::new(0),
                files_written: AtomicU64::new(0),
                faulted: AtomicBool::new(false),
            }),
            state: State::Created,
            handle: None,
            error: Arc::new(Mutex::new(None)),
        })
    }

    /// Producer-callable. Never blocks, allocates, or locks: rejects empty
    /// or oversized payloads and drop-on-full records are all counted the
    /// same way, via an atomic counter (spec.md §4.9, §5 back-pressure).
    pub fn try_record(&self, payload: &[u8]) -> bool {
        if payload.is_empty() || payload.len() > self.config.max_payload_bytes {
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        match self.ring.try_push(Slot::from_bytes(payload)) {
            Ok(()) => true,
            Err(_) => {
                self.shared.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    pub fn dropped_count(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    pub fn entries_written(&self) -> u64 {
        self.shared.entries_written.load(Ordering::Relaxed)
    }

    pub fn row_groups_written(&self) -> u64 {
        self.shared.row_groups_written.load(Ordering::Relaxed)
    }

    /// 0 until the writer has been closed successfully, 1 after (this crate
    /// has no file rotation, so a sink completes at most one file).
    pub fn files_written(&self) -> u64 {
        self.shared.files_written.load(Ordering::Relaxed)
    }

    /// Spawns the drainer thread, transitioning `Created -> Running`
    /// (spec.md §4.9). `writer` must already be open.
    pub fn start(&mut self, writer: FileWriter<W>, schema: SchemaDescriptor) -> Result<()> {
        if self.state != State::Created {
            return Err(ParquetError::General(
                "sink can only be started once, from the Created state".to_string(),
            ));
        }
        let ring = self.ring.clone();
        let shared = self.shared.clone();
        let error = self.error.clone();
        let row_group_rows = self.config.row_group_rows;
        let idle_timeout = self.config.idle_timeout;

        self.handle = Some(thread::spawn(move || {
            let result = drain_loop(writer, schema, ring, shared.clone(), row_group_rows, idle_timeout);
            if let Err(e) = &result {
                shared.faulted.store(true, Ordering::Relaxed);
                *error.lock().unwrap() = Some(e.to_string());
                error!(error = %e, "sink drainer terminated with an error");
            }
            result
        }));
        self.state = State::Running;
        debug!(ring_capacity = self.config.ring_capacity, "sink started");
        Ok(())
    }

    /// Signals the drainer to stop, waits for it to flush and close the
    /// writer, and surfaces any error it captured (spec.md §4.9).
    /// Transitions `Running -> Stopping -> Stopped`. Idempotent once
    /// `Stopped`.
    pub fn shutdown(&mut self) -> Result<()> {
        if self.state == State::Stopped {
            return Ok(());
        }
        self.state = State::Stopping;
        *self.shared.stop.lock().unwrap() = true;
        self.shared.wake.notify_all();

        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(Ok(_writer)) => {}
                Ok(Err(e)) => {
                    self.state = State::Stopped;
                    return Err(e);
                }
                Err(_) => {
                    self.state = State::Stopped;
                    return Err(ParquetError::General("sink drainer thread panicked".to_string()));
                }
            }
        }
        self.state = State::Stopped;
        if let Some(message) = self.error.lock().unwrap().take() {
            return Err(ParquetError::General(message));
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.state == State::Running
    }
}

fn drain_loop<W: Write>(
    mut writer: FileWriter<W>,
    schema: SchemaDescriptor,
    ring: Arc<RingBuffer<Slot>>,
    shared: Arc<Shared>,
    row_group_rows: usize,
    idle_timeout: Duration,
) -> Result<FileWriter<W>> {
    let mut accumulator = BatchAccumulator::new(schema)?;
    let mut batch: Vec<Slot> = Vec::with_capacity(row_group_rows);
    let (lock, condvar) = (&shared.stop, &shared.wake);

    loop {
        batch.clear();
        let drained = ring.drain(&mut batch, row_group_rows.saturating_sub(accumulator.row_count()).max(1));
        for slot in &batch {
            accumulator.append(slot.as_slice())?;
        }

        if accumulator.row_count() >= row_group_rows {
            flush(&mut writer, &mut accumulator, &shared)?;
        }

        let stop_requested = {
            let guard = lock.lock().unwrap();
            *guard
        };

        if stop_requested {
            if ring.is_empty() {
                if !accumulator.is_empty() {
                    flush(&mut writer, &mut accumulator, &shared)?;
                }
                break;
            }
            // keep draining until the ring is empty, then exit the loop above
            continue;
        }

        if drained == 0 {
            // idle: nothing came in this pass. Wait for the timeout (a
            // partial-row-group flush opportunity) or a shutdown signal.
            let guard = lock.lock().unwrap();
            let (guard, timed_out) = condvar.wait_timeout(guard, idle_timeout).unwrap();
            drop(guard);
            if timed_out.timed_out() && !accumulator.is_empty() {
                flush(&mut writer, &mut accumulator, &shared)?;
            }
        }
    }

    writer.close()?;
    shared.files_written.fetch_add(1, Ordering::Relaxed);
    trace!("sink drainer exited cleanly");
    Ok(writer)
}

fn flush<W: Write>(
    writer: &mut FileWriter<W>,
    accumulator: &mut BatchAccumulator,
    shared: &Shared,
) -> Result<()> {
    if accumulator.is_empty() {
        return Ok(());
    }
    let rows = accumulator.row_count();
    let (columns, levels) = accumulator.as_row_group();
    writer.write_row_group(rows, &columns, Some(&levels))?;
    drop(columns);
    drop(levels);
    accumulator.reset();
    shared.entries_written.fetch_add(rows as u64, Ordering::Relaxed);
    shared.row_groups_written.fetch_add(1, Ordering::Relaxed);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnDef, PhysicalType, Repetition};
    use std::io::Cursor;
    use std::thread::sleep;

    fn schema() -> SchemaDescriptor {
        SchemaDescriptor::try_new(vec![ColumnDef::new(
            "v",
            PhysicalType::Int64,
            Repetition::Required,
        )])
        .unwrap()
    }

    fn record(v: i64) -> Vec<u8> {
        v.to_le_bytes().to_vec()
    }

    #[test]
    fn rejects_bad_config() {
        let mut config = SinkConfig::default();
        config.ring_capacity = 3;
        assert!(LogSink::<Cursor<Vec<u8>>>::new(config).is_err());
    }

    #[test]
    fn drops_oversized_and_empty_records_without_starting() {
        let sink = LogSink::<Cursor<Vec<u8>>>::new(SinkConfig::default()).unwrap();
        assert!(!sink.try_record(&[]));
        assert!(!sink.try_record(&vec![0u8; MAX_RECORD_BYTES + 1]));
        assert_eq!(sink.dropped_count(), 2);
    }

    #[test]
    fn flushes_on_idle_timeout_and_on_shutdown() {
        let config = SinkConfig {
            ring_capacity: 16,
            row_group_rows: 100, // higher than what we'll send, forces idle flush
            max_payload_bytes: 64,
            idle_timeout: Duration::from_millis(20),
        };
        let mut sink = LogSink::new(config).unwrap();
        let writer = FileWriter::open(Cursor::new(Vec::new()), schema(), Default::default()).unwrap();
        sink.start(writer, schema()).unwrap();

        for i in 0..5 {
            assert!(sink.try_record(&record(i)));
        }
        sleep(Duration::from_millis(60)); // let the idle timeout fire at least once

        assert_eq!(sink.files_written(), 0);
        sink.shutdown().unwrap();
        assert_eq!(sink.entries_written(), 5);
        assert!(sink.row_groups_written() >= 1);
        assert_eq!(sink.files_written(), 1);
    }

    #[test]
    fn eager_flush_at_row_group_threshold() {
        let config = SinkConfig {
            ring_capacity: 16,
            row_group_rows: 4,
            max_payload_bytes: 64,
            idle_timeout: Duration::from_secs(10),
        };
        let mut sink = LogSink::new(config).unwrap();
        let writer = FileWriter::open(Cursor::new(Vec::new()), schema(), Default::default()).unwrap();
        sink.start(writer, schema()).unwrap();

        for i in 0..4 {
            assert!(sink.try_record(&record(i)));
        }
        sleep(Duration::from_millis(50));
        sink.shutdown().unwrap();
        assert_eq!(sink.entries_written(), 4);
    }

    #[test]
    fn shutdown_is_idempotent() {
        let config = SinkConfig::default();
        let mut sink = LogSink::new(config).unwrap();
        let writer = FileWriter::open(Cursor::new(Vec::new()), schema(), Default::default()).unwrap();
        sink.start(writer, schema()).unwrap();
        sink.shutdown().unwrap();
        sink.shutdown().unwrap();
    }
}
