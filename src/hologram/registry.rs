//! Persistent hologram registry (spec.md §4.5 design note): one record
//! per hologram with enough to reconstruct it on startup. Peer
//! proximities and traces are not part of this record — they reload
//! from the tiered storage controller instead.
//!
//! File shape follows the warm tier's JSONL-append convention
//! (`storage::warm`), rewritten wholesale on every save since registry
//! churn is rare compared to trace volume.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constitution::Constitution;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HologramRecord {
    pub id: String,
    pub purpose: String,
    pub constitution: Constitution,
    pub desires: Vec<String>,
    pub cognition_enabled: bool,
    pub model: Option<String>,
}

#[derive(Debug)]
pub struct HologramRegistry {
    path: PathBuf,
}

impl HologramRegistry {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Reconstruct every hologram record found on disk. A missing or
    /// corrupt file starts empty rather than erroring — the node cold
    /// starts with no holograms, same as encoder persistence (§4.3).
    #[must_use]
    pub fn load_all(&self) -> Vec<HologramRecord> {
        let Ok(file) = File::open(&self.path) else {
            return Vec::new();
        };
        BufReader::new(file)
            .lines()
            .map_while(Result::ok)
            .filter_map(|line| serde_json::from_str(&line).ok())
            .collect()
    }

    /// Upsert one hologram's record by rewriting the full file. Rare
    /// enough (registry changes on hologram creation/destruction or
    /// constitution change, not per-trace) that a full rewrite is fine.
    pub fn upsert(&self, record: &HologramRecord) -> std::io::Result<()> {
        let mut records = self.load_all();
        if let Some(existing) = records.iter_mut().find(|r| r.id == record.id) {
            *existing = record.clone();
        } else {
            records.push(record.clone());
        }
        self.rewrite(&records)
    }

    pub fn remove(&self, id: &str) -> std::io::Result<()> {
        let remaining: Vec<HologramRecord> = self.load_all().into_iter().filter(|r| r.id != id).collect();
        self.rewrite(&remaining)
    }

    fn rewrite(&self, records: &[HologramRecord]) -> std::io::Result<()> {
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
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("kudzu-registry-test-{}-{name}.jsonl", std::process::id()))
    }

    fn sample(id: &str) -> HologramRecord {
        HologramRecord {
            id: id.to_string(),
            purpose: "general".to_string(),
            constitution: Constitution::MeshRepublic,
            desires: vec![],
            cognition_enabled: true,
            model: None,
        }
    }

    #[test]
    fn upsert_then_load_round_trips() {
        let path = temp_path("upsert");
        let registry = HologramRegistry::new(&path);
        registry.upsert(&sample("h1")).unwrap();
        let loaded = registry.load_all();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "h1");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn upsert_replaces_existing_record() {
        let path = temp_path("replace");
        let registry = HologramRegistry::new(&path);
        registry.upsert(&sample("h1")).unwrap();
        let mut updated = sample("h1");
        updated.cognition_enabled = false;
        registry.upsert(&updated).unwrap();
        let loaded = registry.load_all();
        assert_eq!(loaded.len(), 1);
        assert!(!loaded[0].cognition_enabled);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_file_loads_empty() {
        let path = temp_path("missing");
        let registry = HologramRegistry::new(&path);
        assert!(registry.load_all().is_empty());
    }

    #[test]
    fn remove_drops_only_matching_id() {
        let path = temp_path("remove");
        let registry = HologramRegistry::new(&path);
        registry.upsert(&sample("h1")).unwrap();
        registry.upsert(&sample("h2")).unwrap();
        registry.remove("h1").unwrap();
        let loaded = registry.load_all();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "h2");
        let _ = std::fs::remove_file(&path);
    }
}
