//! Hot tier: a shared, lock-free-for-readers concurrent map. The
//! storage controller is the sole writer; everyone else only reads.

use dashmap::DashMap;

use crate::core::Purpose;
use super::record::Record;

#[derive(Debug, Default)]
pub struct HotTier {
    records: DashMap<String, Record>,
}

impl HotTier {
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    pub fn insert(&self, record: Record) {
        self.records.insert(record.trace_id.clone(), record);
    }

    #[must_use]
    pub fn get(&self, trace_id: &str) -> Option<Record> {
        self.records.get(trace_id).map(|r| r.clone())
    }

    #[must_use]
    pub fn remove(&self, trace_id: &str) -> Option<Record> {
        self.records.remove(trace_id).map(|(_, r)| r)
    }

    #[must_use]
    pub fn query(&self, purpose: Purpose, limit: usize) -> Vec<Record> {
        self.records
            .iter()
            .filter(|entry| entry.purpose == purpose)
            .take(limit)
            .map(|entry| entry.clone())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records, for the aging loop to scan.
    #[must_use]
    pub fn all(&self) -> Vec<Record> {
        self.records.iter().map(|entry| entry.clone()).collect()
    }
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

    #[test]
    fn insert_and_get_round_trips() {
        let hot = HotTier::new();
        let record = sample_record("a");
        let id = record.trace_id.clone();
        hot.insert(record);
        assert!(hot.get(&id).is_some());
    }

    #[test]
    fn remove_deletes_from_tier() {
        let hot = HotTier::new();
        let record = sample_record("a");
        let id = record.trace_id.clone();
        hot.insert(record);
        assert!(hot.remove(&id).is_some());
        assert!(hot.get(&id).is_none());
    }

    #[test]
    fn query_filters_by_purpose() {
        let hot = HotTier::new();
        hot.insert(sample_record("a"));
        let results = hot.query(Purpose::Observation, 10);
        assert_eq!(results.len(), 1);
        let empty = hot.query(Purpose::Memory, 10);
        assert!(empty.is_empty());
    }
}
