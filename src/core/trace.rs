//! Traces and salience
//!
//! A trace is the atomic unit of memory: not the knowledge itself, a
//! cue to reconstruct it. Content-addressable by default, so recording
//! the same observation twice collapses to one record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::clock::VectorClock;

/// A reconstruction hint: a heterogeneous, JSON-shaped map of cues.
/// `serde_json::Map` without the `preserve_order` feature is
/// backed by a `BTreeMap`, so iteration is already key-sorted -
/// exactly what canonical hashing needs.
pub type Hint = serde_json::Map<String, serde_json::Value>;

/// The closed set of purpose tags a trace may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    Observation,
    Thought,
    Memory,
    Discovery,
    Research,
    Learning,
    SessionContext,
    Decision,
    Stimulus,
    ActionAudit,
    ConstitutionChange,
    ActionDenied,
    Relationship,
}

impl Purpose {
    /// Every purpose tag, for callers that must enumerate the closed
    /// set (e.g. the consolidation daemon's deep cycle).
    pub const ALL: [Self; 13] = [
        Self::Observation,
        Self::Thought,
        Self::Memory,
        Self::Discovery,
        Self::Research,
        Self::Learning,
        Self::SessionContext,
        Self::Decision,
        Self::Stimulus,
        Self::ActionAudit,
        Self::ConstitutionChange,
        Self::ActionDenied,
        Self::Relationship,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Observation => "observation",
            Self::Thought => "thought",
            Self::Memory => "memory",
            Self::Discovery => "discovery",
            Self::Research => "research",
            Self::Learning => "learning",
            Self::SessionContext => "session_context",
            Self::Decision => "decision",
            Self::Stimulus => "stimulus",
            Self::ActionAudit => "action_audit",
            Self::ConstitutionChange => "constitution_change",
            Self::ActionDenied => "action_denied",
            Self::Relationship => "relationship",
        }
    }
}

impl std::fmt::Display for Purpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Importance tier; scales the final salience score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    Critical,
    High,
    #[default]
    Normal,
    Low,
    Trivial,
}

impl Importance {
    #[must_use]
    pub const fn weight(self) -> f32 {
        match self {
            Self::Critical => 3.0,
            Self::High => 2.0,
            Self::Normal => 1.0,
            Self::Low => 0.5,
            Self::Trivial => 0.25,
        }
    }
}

/// A trace's priority score: recency, frequency, novelty, emotion, and
/// associative strength, scaled by importance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Salience {
    pub novelty: f32,
    pub access_count: u64,
    pub valence: f32,
    pub associative_strength: f32,
    pub importance: Importance,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub last_consolidated: Option<DateTime<Utc>>,
    pub consolidation_count: u64,
}

impl Salience {
    #[must_use]
    pub fn new(now: DateTime<Utc>, importance: Importance) -> Self {
        Self {
            novelty: 1.0,
            access_count: 0,
            valence: 0.0,
            associative_strength: 0.0,
            importance,
            created_at: now,
            last_accessed: now,
            last_consolidated: None,
            consolidation_count: 0,
        }
    }

    /// The weighted, importance-scaled score, evaluated as of `now`.
    #[must_use]
    pub fn score(&self, now: DateTime<Utc>) -> f32 {
        let hours_since_access =
            (now - self.last_accessed).num_seconds() as f32 / 3600.0;
        let hours_since_created =
            (now - self.created_at).num_seconds() as f32 / 3600.0;

        let recency_factor = 0.5f32.powf(hours_since_access / 24.0);
        let frequency_factor =
            (((self.access_count + 1) as f32).ln() / 100f32.ln()).min(1.0);
        let novelty_factor =
            (self.novelty * (hours_since_created + 1.0).powf(-0.5)).max(0.01);
        let emotional_factor = self.valence.abs();

        let weighted = 0.25 * recency_factor
            + 0.20 * frequency_factor
            + 0.20 * novelty_factor
            + 0.15 * emotional_factor
            + 0.20 * self.associative_strength;

        (weighted * self.importance.weight()).clamp(0.01, 1.0)
    }

    /// Record an access: bump recency, increment the access count, and
    /// reinforce novelty (capped at 1.0).
    pub fn on_access(&mut self, now: DateTime<Utc>) {
        self.last_accessed = now;
        self.access_count += 1;
        self.novelty = (self.novelty * 1.1).min(1.0);
    }

    /// Record a consolidation pass: timestamp it, bump the counter, and
    /// let novelty fade slightly.
    pub fn on_consolidation(&mut self, now: DateTime<Utc>) {
        self.last_consolidated = Some(now);
        self.consolidation_count += 1;
        self.novelty *= 0.95;
    }
}

/// Errors that can arise from trace operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TraceError {
    #[error("cannot merge traces with differing origin or purpose")]
    IncompatibleTraces,
}

/// Construction options for [`Trace::new`].
#[derive(Debug, Clone, Copy)]
pub struct TraceOptions {
    pub content_addressable: bool,
    pub importance: Importance,
}

impl Default for TraceOptions {
    fn default() -> Self {
        Self {
            content_addressable: true,
            importance: Importance::Normal,
        }
    }
}

/// The atomic unit of memory: a cue, not the knowledge itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub id: String,
    pub origin: String,
    pub timestamp: VectorClock,
    pub purpose: Purpose,
    pub path: Vec<String>,
    pub reconstruction_hint: Hint,
    pub salience: Salience,
    pub content_hash: String,
}

/// Canonical "origin|purpose|sorted-hint-entries" string hashed for
/// content addressing.
#[must_use]
pub fn canonical_string(origin: &str, purpose: Purpose, hint: &Hint) -> String {
    let entries = hint
        .iter()
        .map(|(k, v)| format!("{k}:{v}"))
        .collect::<Vec<_>>()
        .join(",");
    format!("{origin}|{}|{entries}", purpose.as_str())
}

/// SHA-256 of the canonical string, hex-encoded.
#[must_use]
pub fn compute_content_hash(origin: &str, purpose: Purpose, hint: &Hint) -> String {
    let canonical = canonical_string(origin, purpose, hint);
    let digest = Sha256::digest(canonical.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

impl Trace {
    /// Construct a trace. `clock` is the creating agent's vector clock
    /// *after* its own increment (the hologram owns incrementing its
    /// clock before calling this).
    #[must_use]
    pub fn new(
        origin: &str,
        purpose: Purpose,
        hint: Hint,
        clock: VectorClock,
        now: DateTime<Utc>,
        opts: TraceOptions,
    ) -> Self {
        let content_hash = compute_content_hash(origin, purpose, &hint);
        let id = if opts.content_addressable {
            content_hash.clone()
        } else {
            uuid::Uuid::new_v4().to_string()
        };

        Self {
            id,
            origin: origin.to_string(),
            timestamp: clock,
            purpose,
            path: vec![origin.to_string()],
            reconstruction_hint: hint,
            salience: Salience::new(now, opts.importance),
            content_hash,
        }
    }

    /// Recompute the content hash from the trace's own fields and
    /// compare against the stored one.
    #[must_use]
    pub fn verify_integrity(&self) -> bool {
        compute_content_hash(&self.origin, self.purpose, &self.reconstruction_hint)
            == self.content_hash
    }

    /// Append `follower_id` to the path (unless it's already the last
    /// hop) and bump the clock for that follower. Returns a new trace;
    /// the id and content hash are untouched (the content never changes
    /// by being forwarded).
    #[must_use]
    pub fn follow(&self, follower_id: &str) -> Self {
        let mut path = self.path.clone();
        if path.last().map(String::as_str) != Some(follower_id) {
            path.push(follower_id.to_string());
        }
        Self {
            path,
            timestamp: self.timestamp.increment(follower_id),
            ..self.clone()
        }
    }

    /// Merge this trace's clock with another's. Fails if the two traces
    /// don't represent the same underlying content (origin/purpose
    /// differ).
    pub fn merge_clock(&self, other: &Self) -> Result<Self, TraceError> {
        if self.origin != other.origin || self.purpose != other.purpose {
            return Err(TraceError::IncompatibleTraces);
        }
        Ok(Self {
            timestamp: self.timestamp.merge(&other.timestamp),
            ..self.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::VectorClock;

    fn hint_with_content(content: &str) -> Hint {
        let mut h = Hint::new();
        h.insert("content".to_string(), serde_json::json!(content));
        h
    }

    #[test]
    fn content_hash_matches_literal_scenario() {
        // spec.md §8 scenario 1: record_trace("H1", :memory, {content: "hello world"})
        let hash = compute_content_hash("H1", Purpose::Memory, &hint_with_content("hello world"));
        assert_eq!(
            hash,
            "eb9045030faf8c70c2e840c2a0ea034fcbd2c6f117b24571d80bf120c948f20b"
        );
    }

    #[test]
    fn identical_origin_purpose_hint_dedups_to_same_id() {
        let clock = VectorClock::new().increment("H1");
        let now = Utc::now();
        let t1 = Trace::new(
            "H1",
            Purpose::Memory,
            hint_with_content("hello world"),
            clock.clone(),
            now,
            TraceOptions::default(),
        );
        let t2 = Trace::new(
            "H1",
            Purpose::Memory,
            hint_with_content("hello world"),
            clock,
            now,
            TraceOptions::default(),
        );
        assert_eq!(t1.id, t2.id);
        assert_eq!(t1.id, "eb9045030faf8c70c2e840c2a0ea034fcbd2c6f117b24571d80bf120c948f20b");
    }

    #[test]
    fn non_content_addressable_uses_random_id() {
        let clock = VectorClock::new();
        let now = Utc::now();
        let opts = TraceOptions {
            content_addressable: false,
            importance: Importance::Normal,
        };
        let t1 = Trace::new("a", Purpose::Observation, Hint::new(), clock.clone(), now, opts);
        let t2 = Trace::new("a", Purpose::Observation, Hint::new(), clock, now, opts);
        assert_ne!(t1.id, t2.id);
    }

    #[test]
    fn verify_integrity_holds_for_unmodified_trace() {
        let clock = VectorClock::new().increment("a");
        let t = Trace::new(
            "a",
            Purpose::Observation,
            hint_with_content("x"),
            clock,
            Utc::now(),
            TraceOptions::default(),
        );
        assert!(t.verify_integrity());
    }

    #[test]
    fn path_starts_with_origin() {
        let clock = VectorClock::new().increment("a");
        let t = Trace::new("a", Purpose::Observation, Hint::new(), clock, Utc::now(), TraceOptions::default());
        assert_eq!(t.path.first(), Some(&"a".to_string()));
    }

    #[test]
    fn follow_appends_unless_already_last() {
        let clock = VectorClock::new().increment("a");
        let t = Trace::new("a", Purpose::Observation, Hint::new(), clock, Utc::now(), TraceOptions::default());
        let t2 = t.follow("b");
        assert_eq!(t2.path, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(t2.timestamp.get("b"), 1);

        let t3 = t2.follow("b");
        assert_eq!(t3.path, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn merge_clock_fails_on_incompatible_traces() {
        let clock = VectorClock::new();
        let t1 = Trace::new("a", Purpose::Observation, Hint::new(), clock.clone(), Utc::now(), TraceOptions::default());
        let t2 = Trace::new("b", Purpose::Observation, Hint::new(), clock, Utc::now(), TraceOptions::default());
        assert_eq!(t1.merge_clock(&t2), Err(TraceError::IncompatibleTraces));
    }

    #[test]
    fn serialize_deserialize_is_identity() {
        let clock = VectorClock::new().increment("a");
        let t = Trace::new(
            "a",
            Purpose::Discovery,
            hint_with_content("round trip"),
            clock,
            Utc::now(),
            TraceOptions::default(),
        );
        let json = serde_json::to_string(&t).unwrap();
        let back: Trace = serde_json::from_str(&json).unwrap();
        assert_eq!(t, back);
    }

    #[test]
    fn salience_clamped_and_importance_scaled() {
        let now = Utc::now();
        let s = Salience::new(now, Importance::Critical);
        let score = s.score(now);
        assert!(score <= 1.0 && score >= 0.01);
    }

    #[test]
    fn salience_on_access_bumps_recency_and_count() {
        let now = Utc::now();
        let mut s = Salience::new(now, Importance::Normal);
        let later = now + chrono::Duration::hours(1);
        s.on_access(later);
        assert_eq!(s.access_count, 1);
        assert_eq!(s.last_accessed, later);
        assert!(s.novelty > 1.0 - f32::EPSILON || s.novelty == 1.0); // capped at 1.0
    }

    #[test]
    fn salience_on_consolidation_decays_novelty() {
        let now = Utc::now();
        let mut s = Salience::new(now, Importance::Normal);
        s.on_consolidation(now);
        assert_eq!(s.consolidation_count, 1);
        assert!(s.last_consolidated.is_some());
        assert!((s.novelty - 0.95).abs() < 1e-6);
    }
}
