// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Durable at-least-once outbox: in-memory map that spills to disk under
//! pressure and reloads spilled records back in.

use crate::wire::PostRecord;
use dashmap::DashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

const HIGH: usize = 10_000;
const LOW: usize = 5_000;

/// In-memory, disk-backed store of posts awaiting acknowledgment.
pub struct Outbox {
    records: DashMap<i64, PostRecord>,
    dir: PathBuf,
}

impl Outbox {
    /// Spill files are written under `dir` (created if missing).
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            records: DashMap::new(),
            dir,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Inserts `record`, spilling to disk if the in-memory map now exceeds
    /// `HIGH`.
    pub fn add(&self, id: i64, record: PostRecord) -> std::io::Result<()> {
        self.records.insert(id, record);
        if self.records.len() > HIGH {
            self.spill()?;
        }
        Ok(())
    }

    /// Removes `id`. No-op if absent.
    pub fn delete(&self, id: i64) {
        self.records.remove(&id);
    }

    pub fn get(&self, id: i64) -> Option<PostRecord> {
        self.records.get(&id).map(|r| r.clone())
    }

    /// Returns a snapshot of every currently buffered record.
    pub fn snapshot(&self) -> Vec<PostRecord> {
        self.records.iter().map(|e| e.value().clone()).collect()
    }

    /// Writes every current record as one JSON line per record to
    /// `<unix-seconds>.udb`, then drops them from memory.
    pub fn spill(&self) -> std::io::Result<()> {
        if self.records.is_empty() {
            return Ok(());
        }
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before unix epoch")
            .as_secs();
        let path = self.dir.join(format!("{}.udb", secs));

        let mut lines = String::new();
        let ids: Vec<i64> = self.records.iter().map(|e| *e.key()).collect();
        for id in &ids {
            if let Some(rec) = self.records.get(id) {
                lines.push_str(&serde_json::to_string(rec.value())?);
                lines.push('\n');
            }
        }
        fs::write(&path, lines)?;
        for id in ids {
            self.records.remove(&id);
        }
        tracing::debug!(path = %path.display(), "spilled outbox to disk");
        Ok(())
    }

    /// Scans the spill directory for `*.udb` files, reloading up to
    /// `HIGH/2` records. Empty files are unlinked; partially-consumed files
    /// are rewritten with their remaining lines. Stops once the in-memory
    /// map exceeds `LOW`.
    pub fn load(&self) -> std::io::Result<usize> {
        let mut loaded = 0usize;
        let budget = HIGH / 2;

        let mut entries: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map(|e| e == "udb").unwrap_or(false))
            .collect();
        entries.sort();

        for path in entries {
            if self.records.len() > LOW {
                break;
            }
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                fs::remove_file(&path)?;
                continue;
            }

            let lines: Vec<&str> = content.lines().collect();
            let mut remaining = Vec::new();
            for line in lines {
                if loaded >= budget || self.records.len() > LOW {
                    remaining.push(line);
                    continue;
                }
                match serde_json::from_str::<PostRecord>(line) {
                    Ok(rec) => {
                        self.records.insert(rec.id, rec);
                        loaded += 1;
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "dropping unparsable outbox line");
                    }
                }
            }

            if remaining.is_empty() {
                fs::remove_file(&path)?;
            } else {
                fs::write(&path, remaining.join("\n") + "\n")?;
            }
        }

        Ok(loaded)
    }

    pub fn spill_dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: i64) -> PostRecord {
        PostRecord {
            id,
            label: "l".into(),
            body: vec![1, 2, 3],
        }
    }

    #[test]
    fn add_then_delete() {
        let dir = tempfile::tempdir().unwrap();
        let ob = Outbox::new(dir.path()).unwrap();
        ob.add(1, rec(1)).unwrap();
        assert_eq!(ob.len(), 1);
        ob.delete(1);
        assert_eq!(ob.len(), 0);
        ob.delete(1); // idempotent
    }

    #[test]
    fn spill_then_load_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let ob = Outbox::new(dir.path()).unwrap();
        for i in 0..50 {
            ob.add(i, rec(i)).unwrap();
        }
        ob.spill().unwrap();
        assert_eq!(ob.len(), 0);

        let files: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);

        let ob2 = Outbox::new(dir.path()).unwrap();
        let loaded = ob2.load().unwrap();
        assert_eq!(loaded, 50);
        assert_eq!(ob2.len(), 50);
        assert_eq!(ob2.get(10).unwrap().id, 10);
    }

    #[test]
    fn spill_of_empty_outbox_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let ob = Outbox::new(dir.path()).unwrap();
        ob.spill().unwrap();
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn load_unlinks_empty_spill_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("0.udb"), "").unwrap();
        let ob = Outbox::new(dir.path()).unwrap();
        let loaded = ob.load().unwrap();
        assert_eq!(loaded, 0);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn add_past_high_triggers_spill() {
        let dir = tempfile::tempdir().unwrap();
        let ob = Outbox::new(dir.path()).unwrap();
        for i in 0..=(HIGH as i64) {
            ob.add(i, rec(i)).unwrap();
        }
        assert_eq!(ob.len(), 0);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
