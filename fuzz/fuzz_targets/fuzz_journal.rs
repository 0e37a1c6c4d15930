//! Fuzz target: rotating journal
//!
//! Appends arbitrary lines with fuzz-chosen segment sizes and checks:
//! - No panics under arbitrary byte inputs
//! - At most `backups + 1` segments are ever stored
//! - The newest line is always readable
//!
//! cargo fuzz run fuzz_journal

#![no_main]

use std::collections::HashMap;

use libfuzzer_sys::fuzz_target;
use orrery::app::ports::{StorageError, StoragePort};
use orrery::diagnostics::Journal;

// ── In-memory StoragePort for fuzz testing ────────────────────

struct MemStore {
    data: HashMap<String, Vec<u8>>,
}

impl StoragePort for MemStore {
    fn read(&self, ns: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        match self.data.get(&format!("{ns}::{key}")) {
            Some(v) => {
                let n = v.len().min(buf.len());
                buf[..n].copy_from_slice(&v[..n]);
                Ok(n)
            }
            None => Err(StorageError::NotFound),
        }
    }

    fn write(&mut self, ns: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.data.insert(format!("{ns}::{key}"), data.to_vec());
        Ok(())
    }

    fn exists(&self, ns: &str, key: &str) -> bool {
        self.data.contains_key(&format!("{ns}::{key}"))
    }

    fn delete(&mut self, ns: &str, key: &str) -> Result<(), StorageError> {
        self.data.remove(&format!("{ns}::{key}"));
        Ok(())
    }
}

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let segment_bytes = 16 + u32::from(data[0]);
    let backups = 1 + data[1] % 8;
    let store = MemStore {
        data: HashMap::new(),
    };
    let mut journal = Journal::open(store, segment_bytes, backups);

    // Newline-free chunks so every append is exactly one line.
    let text = String::from_utf8_lossy(&data[2..]).replace('\n', " ");
    for chunk in text.as_bytes().chunks(24) {
        let line = String::from_utf8_lossy(chunk);
        journal.append(&line).expect("in-memory append");
    }

    assert!(
        journal.segment_count() <= usize::from(backups) + 1,
        "{} segments with {} backups",
        journal.segment_count(),
        backups
    );
    if !text.is_empty() {
        assert!(!journal.lines().is_empty(), "newest line lost");
    }
});
