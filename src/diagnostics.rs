//! Diagnostic journal and panic handling.
//!
//! The journal is an append-only text log kept in NVS as a ring of
//! size-bounded segment slots under the "journal" namespace:
//!
//! ```text
//!   head  ← one byte: index of the active slot
//!   seg0 .. segN  ← N = backups; the slot after `head` is the oldest
//! ```
//!
//! Lines are buffered in RAM and the active slot is rewritten only every
//! `flush_lines` lines, before a rotation, or on [`Journal::flush`].  A
//! rotation advances `head` and erases the slot it lands on, so no segment
//! is ever copied.  A line that would push the active segment past
//! `segment_bytes` rotates first, so no segment ever exceeds the limit.
//!
//! A panic hook journals the panic message and de-energizes both motors
//! before the reset.  Lines still buffered in the running journal at that
//! point are lost.

use log::{error, warn};

use crate::adapters::log_sink::render;
use crate::app::events::AppEvent;
use crate::app::ports::{EventSink, StorageError, StoragePort};

pub const JOURNAL_NAMESPACE: &str = "journal";
/// Key holding the active slot index.
pub const JOURNAL_HEAD_KEY: &str = "head";
/// Most rotated segments a journal keeps.
pub const MAX_BACKUPS: u8 = 16;

/// NVS key of segment slot `index`.
pub fn segment_key(index: u8) -> heapless::String<8> {
    let mut s = heapless::String::new();
    let _ = core::fmt::Write::write_fmt(&mut s, format_args!("seg{}", index));
    s
}

/// Size-rotated, write-buffered journal over a [`StoragePort`].
pub struct Journal<S: StoragePort> {
    storage: S,
    segment_bytes: usize,
    backups: u8,
    flush_lines: u8,
    /// Active slot.
    head: u8,
    /// In-memory copy of the active slot, buffered lines included.
    active: Vec<u8>,
    /// Lines appended since the last write of the active slot.
    pending: u8,
}

impl<S: StoragePort> Journal<S> {
    /// Open the journal, picking up whatever the active slot already holds.
    /// Every line is written through; see [`Journal::with_flush_lines`].
    pub fn open(storage: S, segment_bytes: u32, backups: u8) -> Self {
        let segment_bytes = segment_bytes.max(1) as usize;
        let backups = backups.clamp(1, MAX_BACKUPS);
        let mut head = [0u8; 1];
        let head = match storage.read(JOURNAL_NAMESPACE, JOURNAL_HEAD_KEY, &mut head) {
            Ok(1) => head[0] % (backups + 1),
            _ => 0,
        };
        let active = read_segment(&storage, head, segment_bytes).unwrap_or_default();
        Self {
            storage,
            segment_bytes,
            backups,
            flush_lines: 1,
            head,
            active,
            pending: 0,
        }
    }

    /// Write the active slot only once `lines` lines are buffered.
    pub fn with_flush_lines(mut self, lines: u8) -> Self {
        self.flush_lines = lines.max(1);
        self
    }

    fn slots(&self) -> u8 {
        self.backups + 1
    }

    /// Append one line; a trailing newline is added.
    pub fn append(&mut self, line: &str) -> Result<(), StorageError> {
        let mut record = line.as_bytes().to_vec();
        record.push(b'\n');
        if record.len() > self.segment_bytes {
            record.truncate(self.segment_bytes - 1);
            record.push(b'\n');
        }

        if !self.active.is_empty() && self.active.len() + record.len() > self.segment_bytes {
            self.flush()?;
            self.rotate()?;
        }
        self.active.extend_from_slice(&record);
        self.pending = self.pending.saturating_add(1);
        if self.pending >= self.flush_lines {
            self.flush()?;
        }
        Ok(())
    }

    /// Write buffered lines to the active slot.
    pub fn flush(&mut self) -> Result<(), StorageError> {
        if self.pending == 0 {
            return Ok(());
        }
        self.storage
            .write(JOURNAL_NAMESPACE, &segment_key(self.head), &self.active)?;
        self.pending = 0;
        Ok(())
    }

    /// Lines appended but not yet written.
    pub fn pending_lines(&self) -> u8 {
        self.pending
    }

    /// Move `head` to the next slot, dropping the oldest segment.
    fn rotate(&mut self) -> Result<(), StorageError> {
        let next = (self.head + 1) % self.slots();
        self.storage
            .delete(JOURNAL_NAMESPACE, &segment_key(next))?;
        self.storage
            .write(JOURNAL_NAMESPACE, JOURNAL_HEAD_KEY, &[next])?;
        self.head = next;
        self.active.clear();
        Ok(())
    }

    /// Every journaled line, oldest first, buffered lines included.
    pub fn lines(&self) -> Vec<String> {
        let slots = self.slots();
        let older = (1..slots)
            .map(|i| (self.head + i) % slots)
            .filter_map(|slot| read_segment(&self.storage, slot, self.segment_bytes));
        older
            .chain(core::iter::once(self.active.clone()))
            .flat_map(|seg| {
                String::from_utf8_lossy(&seg)
                    .lines()
                    .map(str::to_owned)
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Drop every segment.
    pub fn clear(&mut self) -> Result<(), StorageError> {
        for index in 0..self.slots() {
            self.storage.delete(JOURNAL_NAMESPACE, &segment_key(index))?;
        }
        self.storage.delete(JOURNAL_NAMESPACE, JOURNAL_HEAD_KEY)?;
        self.head = 0;
        self.active.clear();
        self.pending = 0;
        Ok(())
    }

    /// Segments holding lines, the active one included even if unwritten.
    pub fn segment_count(&self) -> usize {
        (0..self.slots())
            .filter(|i| {
                if *i == self.head {
                    !self.active.is_empty()
                        || self.storage.exists(JOURNAL_NAMESPACE, &segment_key(*i))
                } else {
                    self.storage.exists(JOURNAL_NAMESPACE, &segment_key(*i))
                }
            })
            .count()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Flush and hand back the storage.
    pub fn into_storage(mut self) -> Result<S, StorageError> {
        self.flush()?;
        Ok(self.storage)
    }
}

fn read_segment<S: StoragePort>(storage: &S, index: u8, segment_bytes: usize) -> Option<Vec<u8>> {
    let mut buf = vec![0u8; segment_bytes];
    let len = storage
        .read(JOURNAL_NAMESPACE, &segment_key(index), &mut buf)
        .ok()?;
    buf.truncate(len);
    Some(buf)
}

// ───────────────────────────────────────────────────────────────
// Event sink
// ───────────────────────────────────────────────────────────────

/// Journals the same tagged lines [`LogEventSink`](crate::adapters::log_sink::LogEventSink)
/// prints, with the event time where one is known.
pub struct JournalSink<S: StoragePort> {
    journal: Journal<S>,
    failed: bool,
}

impl<S: StoragePort> JournalSink<S> {
    pub fn new(journal: Journal<S>) -> Self {
        Self {
            journal,
            failed: false,
        }
    }

    pub fn journal(&self) -> &Journal<S> {
        &self.journal
    }
}

impl<S: StoragePort> JournalSink<S> {
    fn record(&mut self, result: Result<(), StorageError>) {
        match result {
            Ok(()) => self.failed = false,
            // Warn once per outage, not once per line.
            Err(e) if !self.failed => {
                warn!("journal: append failed: {e}");
                self.failed = true;
            }
            Err(_) => {}
        }
    }
}

impl<S: StoragePort> EventSink for JournalSink<S> {
    fn emit(&mut self, event: &AppEvent) {
        for (_, line) in render(event) {
            let result = self.journal.append(&line);
            self.record(result);
        }
        // Either may be the last event before the loop stops.
        if matches!(event, AppEvent::Fatal(_) | AppEvent::CalibrationFailed { .. }) {
            let result = self.journal.flush();
            self.record(result);
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Custom panic handler
// ───────────────────────────────────────────────────────────────

/// Install a panic hook that releases both motors and journals the panic.
///
/// Must be called once during init, after NVS is ready.  Motor release
/// goes straight to the ENABLE GPIOs, so it works even when the panic
/// happened while the rig was borrowed.
pub fn install_panic_handler(segment_bytes: u32, backups: u8) {
    std::panic::set_hook(Box::new(move |info| {
        crate::drivers::hw_init::release_all_motors();

        let reason = if let Some(msg) = info.payload().downcast_ref::<&str>() {
            *msg
        } else if let Some(msg) = info.payload().downcast_ref::<String>() {
            msg.as_str()
        } else {
            "unknown panic"
        };
        let location = info
            .location()
            .map(|l| format!(" at {}:{}", l.file(), l.line()))
            .unwrap_or_default();

        error!("PANIC: {}{}", reason, location);

        // The NVS session from main() is still open; a fresh adapter
        // shares it.  If NVS never came up the write fails and is skipped.
        match crate::adapters::nvs::NvsAdapter::new() {
            Ok(nvs) => {
                let mut journal = Journal::open(nvs, segment_bytes, backups);
                if journal
                    .append(&format!("PANIC | {}{}", reason, location))
                    .and_then(|()| journal.flush())
                    .is_err()
                {
                    error!("Panic handler: journal write failed");
                }
            }
            Err(_) => {
                error!("Panic handler: NVS unavailable — panic not journaled");
            }
        }
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ActuatorError, Error, ModelError};
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MockStorage {
        data: RefCell<HashMap<String, Vec<u8>>>,
        write_calls: usize,
        bytes_written: usize,
    }

    impl StoragePort for MockStorage {
        fn read(&self, ns: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
            let k = format!("{ns}::{key}");
            match self.data.borrow().get(&k) {
                Some(v) => {
                    let len = v.len().min(buf.len());
                    buf[..len].copy_from_slice(&v[..len]);
                    Ok(len)
                }
                None => Err(StorageError::NotFound),
            }
        }

        fn write(&mut self, ns: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
            let k = format!("{ns}::{key}");
            self.write_calls += 1;
            self.bytes_written += data.len();
            self.data.borrow_mut().insert(k, data.to_vec());
            Ok(())
        }

        fn delete(&mut self, ns: &str, key: &str) -> Result<(), StorageError> {
            let k = format!("{ns}::{key}");
            self.data.borrow_mut().remove(&k);
            Ok(())
        }

        fn exists(&self, ns: &str, key: &str) -> bool {
            let k = format!("{ns}::{key}");
            self.data.borrow().contains_key(&k)
        }
    }

    #[test]
    fn lines_come_back_in_order() {
        let mut j = Journal::open(MockStorage::default(), 64, 3);
        j.append("one").unwrap();
        j.append("two").unwrap();
        assert_eq!(j.lines(), vec!["one", "two"]);
        assert_eq!(j.segment_count(), 1);
    }

    #[test]
    fn rotates_before_overflowing() {
        // 9-byte records, 20-byte segments: two records per segment.
        let mut j = Journal::open(MockStorage::default(), 20, 3);
        for i in 0..5 {
            j.append(&format!("line-{i:03}")).unwrap();
        }
        assert_eq!(j.segment_count(), 3);
        assert_eq!(j.lines().len(), 5);
        assert_eq!(j.lines()[0], "line-000");
    }

    #[test]
    fn oldest_segment_is_dropped() {
        let mut j = Journal::open(MockStorage::default(), 10, 2);
        for i in 0..6 {
            j.append(&format!("line-{i:03}")).unwrap();
        }
        // One record per segment, active + 2 backups.
        assert_eq!(j.segment_count(), 3);
        assert_eq!(j.lines(), vec!["line-003", "line-004", "line-005"]);
    }

    #[test]
    fn reopen_continues_active_segment() {
        let mut j = Journal::open(MockStorage::default(), 64, 3);
        j.append("before").unwrap();
        let storage = j.into_storage().unwrap();
        let mut j = Journal::open(storage, 64, 3);
        j.append("after").unwrap();
        assert_eq!(j.lines(), vec!["before", "after"]);
    }

    #[test]
    fn oversized_line_is_truncated() {
        let mut j = Journal::open(MockStorage::default(), 16, 1);
        j.append(&"x".repeat(100)).unwrap();
        assert_eq!(j.lines()[0].len(), 15);
    }

    #[test]
    fn clear_erases_everything() {
        let mut j = Journal::open(MockStorage::default(), 10, 2);
        for i in 0..4 {
            j.append(&format!("line-{i:03}")).unwrap();
        }
        j.clear().unwrap();
        assert_eq!(j.segment_count(), 0);
        assert!(j.lines().is_empty());
    }

    #[test]
    fn buffered_lines_wait_for_the_flush_threshold() {
        let mut j = Journal::open(MockStorage::default(), 256, 2).with_flush_lines(3);
        j.append("a").unwrap();
        j.append("b").unwrap();
        assert_eq!(j.storage().write_calls, 0);
        assert_eq!(j.pending_lines(), 2);
        assert_eq!(j.lines(), vec!["a", "b"]);

        j.append("c").unwrap();
        assert_eq!(j.storage().write_calls, 1);
        assert_eq!(j.pending_lines(), 0);
    }

    #[test]
    fn rotation_writes_out_the_buffer_first() {
        // 9-byte records, 20-byte segments.
        let mut j = Journal::open(MockStorage::default(), 20, 2).with_flush_lines(10);
        for i in 0..3 {
            j.append(&format!("line-{i:03}")).unwrap();
        }
        let storage = j.into_storage().unwrap();
        let j = Journal::open(storage, 20, 2);
        assert_eq!(j.lines(), vec!["line-000", "line-001", "line-002"]);
    }

    #[test]
    fn rotation_does_not_copy_segments() {
        let mut j = Journal::open(MockStorage::default(), 20, 3);
        for i in 0..40 {
            j.append(&format!("line-{i:03}")).unwrap();
        }
        // Write-through: one segment write per line, one head write per
        // rotation.  Nothing else.
        let rotations = 40 / 2 - 1;
        assert_eq!(j.storage().write_calls, 40 + rotations);
        assert_eq!(j.lines().len(), 8);
        assert_eq!(j.lines()[0], "line-032");
    }

    #[test]
    fn a_day_of_samples_stays_close_to_its_own_size() {
        let line = format!("SAMPLE | {}", "x".repeat(98));
        let mut j = Journal::open(MockStorage::default(), 4000, 3).with_flush_lines(24);
        for _ in 0..1440 {
            j.append(&line).unwrap();
        }
        let logical = 1440 * (line.len() + 1);
        let storage = j.storage();
        assert!(
            storage.bytes_written < 2 * logical,
            "{} bytes written for {} logged",
            storage.bytes_written,
            logical
        );
        assert!(storage.write_calls < 1440 / 8, "{} writes", storage.write_calls);
    }

    #[test]
    fn reopen_resumes_at_the_stored_head() {
        let mut j = Journal::open(MockStorage::default(), 10, 2);
        for i in 0..4 {
            j.append(&format!("line-{i:03}")).unwrap();
        }
        let storage = j.into_storage().unwrap();
        let mut j = Journal::open(storage, 10, 2);
        j.append("line-004").unwrap();
        assert_eq!(j.lines(), vec!["line-002", "line-003", "line-004"]);
    }

    #[test]
    fn fatal_event_flushes_the_sink() {
        let journal = Journal::open(MockStorage::default(), 256, 3).with_flush_lines(50);
        let mut sink = JournalSink::new(journal);
        sink.emit(&AppEvent::Started {
            steps_per_revolution: 200,
        });
        assert_eq!(sink.journal().pending_lines(), 1);

        sink.emit(&AppEvent::Fatal(Error::from(ModelError::OrbitOutOfRange(200.0))));
        assert_eq!(sink.journal().pending_lines(), 0);
        assert_eq!(sink.journal().storage().write_calls, 1);
    }

    #[test]
    fn backlog_is_capped() {
        let mut j = Journal::open(MockStorage::default(), 10, u8::MAX);
        for i in 0..40 {
            j.append(&format!("line-{i:03}")).unwrap();
        }
        assert_eq!(j.segment_count(), usize::from(MAX_BACKUPS) + 1);
        assert_eq!(j.lines().last().map(String::as_str), Some("line-039"));
    }

    #[test]
    fn sink_journals_rendered_events() {
        let mut sink = JournalSink::new(Journal::open(MockStorage::default(), 256, 3));
        sink.emit(&AppEvent::Started {
            steps_per_revolution: 200,
        });
        sink.emit(&AppEvent::Fault(Error::from(ActuatorError::StepWriteFailed)));
        assert_eq!(
            sink.journal().lines(),
            vec![
                "START | steps_per_revolution=200",
                "FAULT | actuator: STEP write failed"
            ]
        );
    }
}
