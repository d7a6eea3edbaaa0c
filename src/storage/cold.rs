//! Cold tier: replicated, mesh-wide, long-term storage. Backed by
//! Qdrant, re-scoped from the teacher's 768-dim sentence-embedding
//! collection to store each trace's HRR content vector instead
//! (dimension = `hrr.dimension`, default 512).
//!
//! Reads try the local Qdrant collection first; a short peer fan-out
//! for records not found locally is the mesh's job (`crate::mesh`),
//! not this module's — cold tier here only talks to its own node's
//! Qdrant instance.

use std::collections::HashMap;

use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, Distance, Filter, PointStruct, ScrollPointsBuilder,
    UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use thiserror::Error;

use crate::core::Purpose;
use crate::hrr::Vector;
use super::record::Record;

const COLLECTION: &str = "kudzu_cold";

#[derive(Debug, Error)]
pub enum ColdTierError {
    #[error("qdrant error: {0}")]
    Qdrant(#[from] qdrant_client::QdrantError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ColdTierError>;

/// The replicated cold tier. One instance per node; the mesh module
/// fans queries out to peers' instances when a local miss occurs.
pub struct ColdTier {
    client: Qdrant,
    dimension: usize,
}

impl ColdTier {
    /// Connect to a local Qdrant instance.
    ///
    /// # Errors
    /// Returns an error if the connection cannot be established.
    pub fn connect(url: &str, dimension: usize) -> Result<Self> {
        let client = Qdrant::from_url(url).build()?;
        Ok(Self { client, dimension })
    }

    /// Create the collection if it doesn't already exist.
    ///
    /// # Errors
    /// Returns an error if Qdrant rejects the collection creation call.
    pub async fn init_collection(&self) -> Result<()> {
        if !self.client.collection_exists(COLLECTION).await? {
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(COLLECTION)
                        .vectors_config(VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine)),
                )
                .await?;
        }
        Ok(())
    }

    /// Fire-and-forget write: upsert the record with its HRR content
    /// vector as payload-carrying point.
    ///
    /// # Errors
    /// Returns an error if the upsert call fails.
    pub async fn insert(&self, record: &Record, content_vector: &Vector) -> Result<()> {
        let payload: HashMap<String, serde_json::Value> =
            serde_json::from_value(serde_json::to_value(record)?)?;
        let point = PointStruct::new(record.trace_id.clone(), content_vector.clone(), payload);

        self.client
            .upsert_points(UpsertPointsBuilder::new(COLLECTION, vec![point]).wait(true))
            .await?;
        Ok(())
    }

    /// Local-only point lookup by trace id.
    ///
    /// # Errors
    /// Returns an error if the scroll call fails.
    pub async fn get(&self, trace_id: &str) -> Result<Option<Record>> {
        let scrolled = self
            .client
            .scroll(
                ScrollPointsBuilder::new(COLLECTION)
                    .filter(Filter::must([Condition::matches(
                        "trace_id",
                        trace_id.to_string(),
                    )]))
                    .with_payload(true)
                    .limit(1),
            )
            .await?;

        let Some(point) = scrolled.result.into_iter().next() else {
            return Ok(None);
        };
        let record: Record = serde_json::from_value(serde_json::to_value(point.payload)?)?;
        Ok(Some(record))
    }

    /// Local-only delete, used after a successful promotion.
    ///
    /// # Errors
    /// Returns an error if the delete call fails.
    pub async fn remove(&self, trace_id: &str) -> Result<()> {
        use qdrant_client::qdrant::{points_selector::PointsSelectorOneOf, DeletePointsBuilder, PointsSelector};

        let selector = PointsSelector {
            points_selector_one_of: Some(PointsSelectorOneOf::Filter(Filter::must([
                Condition::matches("trace_id", trace_id.to_string()),
            ]))),
        };
        self.client
            .delete_points(DeletePointsBuilder::new(COLLECTION).points(selector))
            .await?;
        Ok(())
    }

    /// Local-only purpose scan, up to `limit` records.
    ///
    /// # Errors
    /// Returns an error if the scroll call fails.
    pub async fn query(&self, purpose: Purpose, limit: u32) -> Result<Vec<Record>> {
        let scrolled = self
            .client
            .scroll(
                ScrollPointsBuilder::new(COLLECTION)
                    .filter(Filter::must([Condition::matches(
                        "purpose",
                        purpose.as_str().to_string(),
                    )]))
                    .with_payload(true)
                    .limit(limit),
            )
            .await?;

        let mut records = Vec::with_capacity(scrolled.result.len());
        for point in scrolled.result {
            if let Ok(record) = serde_json::from_value(serde_json::to_value(point.payload)?) {
                records.push(record);
            }
        }
        Ok(records)
    }
}

/// Local-only stub used by tests and single-node deployments: no
/// network, no Qdrant dependency, an in-memory table playing the same
/// role as [`ColdTier`]. Satisfies §4.4's "implementers must provide
/// either a local-only stub (tests) or a replicated table" allowance.
#[derive(Debug, Default)]
pub struct LocalColdStub {
    records: std::sync::Mutex<Vec<(Record, Vector)>>,
}

impl LocalColdStub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: Record, content_vector: Vector) {
        let mut guard = self.records.lock().expect("cold stub lock poisoned");
        guard.retain(|(r, _)| r.trace_id != record.trace_id);
        guard.push((record, content_vector));
    }

    #[must_use]
    pub fn get(&self, trace_id: &str) -> Option<Record> {
        self.records
            .lock()
            .expect("cold stub lock poisoned")
            .iter()
            .find(|(r, _)| r.trace_id == trace_id)
            .map(|(r, _)| r.clone())
    }

    #[must_use]
    pub fn remove(&self, trace_id: &str) -> Option<Record> {
        let mut guard = self.records.lock().expect("cold stub lock poisoned");
        let idx = guard.iter().position(|(r, _)| r.trace_id == trace_id)?;
        Some(guard.remove(idx).0)
    }

    #[must_use]
    pub fn query(&self, purpose: Purpose, limit: usize) -> Vec<Record> {
        self.records
            .lock()
            .expect("cold stub lock poisoned")
            .iter()
            .filter(|(r, _)| r.purpose == purpose)
            .take(limit)
            .map(|(r, _)| r.clone())
            .collect()
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
            Purpose::Memory,
            Hint::new(),
            VectorClock::new(),
            Utc::now(),
            TraceOptions::default(),
        );
        Record::from_trace(&trace, id, Utc::now())
    }

    #[test]
    fn local_stub_insert_get_remove() {
        let stub = LocalColdStub::new();
        let record = sample_record("a");
        let id = record.trace_id.clone();
        stub.insert(record, vec![0.0; 8]);
        assert!(stub.get(&id).is_some());
        assert!(stub.remove(&id).is_some());
        assert!(stub.get(&id).is_none());
    }

    #[test]
    fn local_stub_query_filters_by_purpose() {
        let stub = LocalColdStub::new();
        stub.insert(sample_record("a"), vec![0.0; 8]);
        let results = stub.query(Purpose::Memory, 10);
        assert_eq!(results.len(), 1);
        assert!(stub.query(Purpose::Observation, 10).is_empty());
    }
}
