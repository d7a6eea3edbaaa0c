//! Warm tier: a single-writer, local, crash-safe append file. Modeled
//! on the teacher's Redis-streams append/read/trim shape, retargeted
//! from XADD/XREAD/XTRIM to a JSONL file opened in append mode.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::core::Purpose;
use super::record::Record;

/// Rotate to a fresh file once the current one exceeds this size.
const ROTATION_BYTES: u64 = 1_000_000_000; // 1 GB, per §5 resource limits

#[derive(Debug)]
pub struct WarmTier {
    path: PathBuf,
}

impl WarmTier {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn open_append(&self) -> std::io::Result<File> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        OpenOptions::new().create(true).append(true).open(&self.path)
    }

    /// Append one record as a JSON line.
    pub fn insert(&self, record: &Record) -> std::io::Result<()> {
        let mut file = self.open_append()?;
        let line = serde_json::to_string(record)?;
        writeln!(file, "{line}")?;
        self.rotate_if_needed()
    }

    /// Read every record currently on disk. A missing file reads as
    /// empty, never an error.
    #[must_use]
    pub fn read_all(&self) -> Vec<Record> {
        let Ok(file) = File::open(&self.path) else {
            return Vec::new();
        };
        BufReader::new(file)
            .lines()
            .map_while(Result::ok)
            .filter_map(|line| serde_json::from_str(&line).ok())
            .collect()
    }

    #[must_use]
    pub fn get(&self, trace_id: &str) -> Option<Record> {
        self.read_all().into_iter().find(|r| r.trace_id == trace_id)
    }

    #[must_use]
    pub fn query(&self, purpose: Purpose, limit: usize) -> Vec<Record> {
        self.read_all()
            .into_iter()
            .filter(|r| r.purpose == purpose)
            .take(limit)
            .collect()
    }

    /// Delete a record by rewriting the file without it. Warm is a
    /// single-writer append log; removal is rare (promotion-on-read,
    /// or demotion to cold) so a full rewrite is an acceptable cost.
    pub fn remove(&self, trace_id: &str) -> std::io::Result<Option<Record>> {
        let records = self.read_all();
        let Some(found) = records.iter().find(|r| r.trace_id == trace_id).cloned() else {
            return Ok(None);
        };
        let remaining: Vec<&Record> = records.iter().filter(|r| r.trace_id != trace_id).collect();
        self.rewrite(&remaining)?;
        Ok(Some(found))
    }

    fn rewrite(&self, records: &[&Record]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = File::create(&self.path)?;
        for record in records {
            let line = serde_json::to_string(record)?;
            writeln!(file, "{line}")?;
        }
        Ok(())
    }

    fn rotate_if_needed(&self) -> std::io::Result<()> {
        let Ok(meta) = std::fs::metadata(&self.path) else {
            return Ok(());
        };
        if meta.len() < ROTATION_BYTES {
            return Ok(());
        }
        let rotated = rotated_path(&self.path);
        std::fs::rename(&self.path, rotated)
    }
}

fn rotated_path(path: &Path) -> PathBuf {
    let stamp = chrono::Utc::now().format("%Y%m%d%H%M%S");
    let mut rotated = path.to_path_buf();
    rotated.set_extension(format!("{stamp}.jsonl"));
    rotated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Hint, Trace, TraceOptions, VectorClock};
    use chrono::Utc;

    fn sample_record(id: &str) -> Record {
        let trace = Trace::new(
            id,
            Purpose::Observation,
            Hint::new(),
            VectorClock::new(),
            Utc::now(),
            TraceOptions::default(),
        );
        Record::from_trace(&trace, id, Utc::now())
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("kudzu-warm-test-{}-{name}", std::process::id()))
    }

    #[test]
    fn insert_and_read_all_round_trips() {
        let path = temp_path("insert-read");
        let tier = WarmTier::new(&path);
        let record = sample_record("a");
        tier.insert(&record).unwrap();
        let all = tier.read_all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].trace_id, record.trace_id);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_file_reads_empty() {
        let path = temp_path("missing");
        let tier = WarmTier::new(&path);
        assert!(tier.read_all().is_empty());
    }

    #[test]
    fn remove_deletes_matching_record_only() {
        let path = temp_path("remove");
        let tier = WarmTier::new(&path);
        tier.insert(&sample_record("a")).unwrap();
        tier.insert(&sample_record("b")).unwrap();
        let removed = tier.remove(&sample_record("a").trace_id).unwrap();
        assert!(removed.is_some());
        let remaining = tier.read_all();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].trace_id, sample_record("b").trace_id);
        let _ = std::fs::remove_file(&path);
    }
}
