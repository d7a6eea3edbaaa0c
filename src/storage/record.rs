//! The storage tier's own record shape — distinct from [`crate::core::Trace`]
//! because storage tracks access bookkeeping (`last_accessed`,
//! `access_count`) independently of the trace's own salience, and
//! because a record is what moves between tiers, not the trace itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{Hint, Importance, Purpose, Trace, VectorClock};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub trace_id: String,
    pub hologram_id: String,
    pub purpose: Purpose,
    pub reconstruction_hint: Hint,
    pub origin: String,
    pub path: Vec<String>,
    pub clock: VectorClock,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub access_count: u64,
    pub importance: Importance,
}

impl Record {
    #[must_use]
    pub fn from_trace(trace: &Trace, hologram_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            trace_id: trace.id.clone(),
            hologram_id: hologram_id.to_string(),
            purpose: trace.purpose,
            reconstruction_hint: trace.reconstruction_hint.clone(),
            origin: trace.origin.clone(),
            path: trace.path.clone(),
            clock: trace.timestamp.clone(),
            created_at: trace.salience.created_at,
            last_accessed: now,
            access_count: 0,
            importance: trace.salience.importance,
        }
    }

    /// Bump access bookkeeping; called before promotion on every
    /// below-hot retrieve hit.
    pub fn record_access(&mut self, now: DateTime<Utc>) {
        self.last_accessed = now;
        self.access_count += 1;
    }

    #[must_use]
    pub fn hours_since_access(&self, now: DateTime<Utc>) -> f64 {
        (now - self.last_accessed).num_seconds() as f64 / 3600.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Trace, TraceOptions};

    #[test]
    fn from_trace_copies_identity_fields() {
        let clock = VectorClock::new().increment("h1");
        let trace = Trace::new(
            "h1",
            Purpose::Memory,
            Hint::new(),
            clock,
            Utc::now(),
            TraceOptions::default(),
        );
        let record = Record::from_trace(&trace, "h1", Utc::now());
        assert_eq!(record.trace_id, trace.id);
        assert_eq!(record.origin, "h1");
        assert_eq!(record.access_count, 0);
    }

    #[test]
    fn record_access_increments_count() {
        let clock = VectorClock::new();
        let trace = Trace::new("a", Purpose::Observation, Hint::new(), clock, Utc::now(), TraceOptions::default());
        let mut record = Record::from_trace(&trace, "a", Utc::now());
        let later = Utc::now() + chrono::Duration::seconds(5);
        record.record_access(later);
        assert_eq!(record.access_count, 1);
        assert_eq!(record.last_accessed, later);
    }
}
