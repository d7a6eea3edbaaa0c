//! Silo & relationship layer (spec.md §4.7): an expertise hologram per
//! domain, storing subject-relation-object triples as traces and
//! answering similarity-scored probes against them. Built directly on
//! the hologram engine (§4.5) and HRR math (§4.2) — no separate graph
//! store, since a relationship here is a trace, not a graph-DB edge
//! (see DESIGN.md on the dropped `graph::GraphClient`).

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::constitution::Constitution;
use crate::core::{Hint, Purpose};
use crate::hologram::HologramEngine;
use crate::hrr::{self, Vector};

const HIGH_CONFIDENCE: f32 = 0.7;
const MODERATE_CONFIDENCE: f32 = 0.4;

/// §4.7's three confidence bands. The brain uses these to decide
/// whether to act on a silo answer or escalate to Tier 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceBand {
    High,
    Moderate,
    Low,
}

#[must_use]
pub fn confidence_band(similarity: f32) -> ConfidenceBand {
    if similarity > HIGH_CONFIDENCE {
        ConfidenceBand::High
    } else if similarity >= MODERATE_CONFIDENCE {
        ConfidenceBand::Moderate
    } else {
        ConfidenceBand::Low
    }
}

fn concept_vector(term: &str, dimension: usize) -> Vector {
    hrr::seeded_vector(&format!("concept_v1_{}", term.to_lowercase()), dimension)
}

fn relation_vector(term: &str, dimension: usize) -> Vector {
    hrr::seeded_vector(&format!("relation_v1_{}", term.to_lowercase()), dimension)
}

/// Deterministic relationship encoding: `bind(subject, bind(relation, object))`.
///
/// # Errors
/// Propagates [`hrr::HrrError`] if binding fails (dimension mismatch
/// never occurs here since every vector shares `dimension`, but the
/// underlying FFT step can still reject non-power-of-two dimensions).
pub fn encode_relationship(
    subject: &str,
    relation: &str,
    object: &str,
    dimension: usize,
) -> Result<Vector, hrr::HrrError> {
    let subject_vec = concept_vector(subject, dimension);
    let relation_vec = relation_vector(relation, dimension);
    let object_vec = concept_vector(object, dimension);
    hrr::bind(&subject_vec, &hrr::bind(&relation_vec, &object_vec)?)
}

fn silo_purpose(domain: &str) -> String {
    format!("expertise:{domain}")
}

/// One expertise silo: a hologram whose purpose is `expertise:{domain}`,
/// created with constitution `kudzu_evolve` and cognition disabled.
pub struct Silo {
    pub hologram: HologramEngine,
    pub dimension: usize,
}

impl Silo {
    #[must_use]
    pub fn new(id: impl Into<String>, domain: &str, dimension: usize) -> Self {
        Self {
            hologram: HologramEngine::new(id, silo_purpose(domain), Constitution::KudzuEvolve, false),
            dimension,
        }
    }

    /// Record one relationship triple as a `relationship`-purposed
    /// trace. (§4.7's prose names `discovery`; the trace purpose enum
    /// carries a dedicated `relationship` tag, so triples use that —
    /// see DESIGN.md's Open Question resolution.)
    pub fn record_relationship(&mut self, subject: &str, relation: &str, object: &str, now: DateTime<Utc>) -> crate::core::Trace {
        let mut hint = Hint::new();
        hint.insert("type".to_string(), json!("relationship"));
        hint.insert("subject".to_string(), json!(subject));
        hint.insert("relation".to_string(), json!(relation));
        hint.insert("object".to_string(), json!(object));
        self.hologram.record_trace(Purpose::Relationship, hint, now)
    }

    /// `probe(query)`: score every stored relationship trace's subject
    /// concept vector against `query`'s, sorted descending.
    #[must_use]
    pub fn probe(&self, query: &str) -> Vec<(Hint, f32)> {
        let query_vec = concept_vector(query, self.dimension);
        let mut scored: Vec<(Hint, f32)> = self
            .hologram
            .recall(Purpose::Relationship)
            .into_iter()
            .filter_map(|trace| {
                let subject = trace.reconstruction_hint.get("subject")?.as_str()?.to_string();
                let subject_vec = concept_vector(&subject, self.dimension);
                Some((trace.reconstruction_hint, hrr::similarity(&query_vec, &subject_vec)))
            })
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored
    }
}

/// The set of live silos on a node: create-or-find by domain.
#[derive(Default)]
pub struct SiloRegistry {
    silos: std::collections::HashMap<String, Silo>,
    dimension: usize,
}

impl SiloRegistry {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self { silos: std::collections::HashMap::new(), dimension }
    }

    /// Create-or-find: the first lookup for a domain spawns a silo;
    /// subsequent lookups return the same one.
    pub fn find_or_create(&mut self, domain: &str) -> &mut Silo {
        let dimension = self.dimension;
        self.silos
            .entry(domain.to_string())
            .or_insert_with(|| Silo::new(format!("silo:{domain}"), domain, dimension))
    }

    #[must_use]
    pub fn get(&self, domain: &str) -> Option<&Silo> {
        self.silos.get(domain)
    }

    /// Fan `probe` out to every live silo, merging by descending
    /// similarity.
    #[must_use]
    pub fn cross_silo_query(&self, query: &str) -> Vec<(String, Hint, f32)> {
        let mut merged: Vec<(String, Hint, f32)> = self
            .silos
            .iter()
            .flat_map(|(domain, silo)| {
                silo.probe(query)
                    .into_iter()
                    .map(move |(hint, score)| (domain.clone(), hint, score))
            })
            .collect();
        merged.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_bands_match_thresholds() {
        assert_eq!(confidence_band(0.9), ConfidenceBand::High);
        assert_eq!(confidence_band(0.7001), ConfidenceBand::High);
        assert_eq!(confidence_band(0.5), ConfidenceBand::Moderate);
        assert_eq!(confidence_band(0.4), ConfidenceBand::Moderate);
        assert_eq!(confidence_band(0.1), ConfidenceBand::Low);
    }

    #[test]
    fn encode_relationship_is_deterministic() {
        let a = encode_relationship("rust", "is_a", "language", 64).unwrap();
        let b = encode_relationship("rust", "is_a", "language", 64).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn find_or_create_returns_same_silo_on_repeat_lookup() {
        let mut registry = SiloRegistry::new(64);
        let id1 = registry.find_or_create("biology").hologram.id.clone();
        let id2 = registry.find_or_create("biology").hologram.id.clone();
        assert_eq!(id1, id2);
    }

    #[test]
    fn new_silo_has_cognition_disabled_and_kudzu_evolve() {
        let mut registry = SiloRegistry::new(64);
        let silo = registry.find_or_create("chemistry");
        assert!(!silo.hologram.cognition_enabled);
        assert_eq!(silo.hologram.constitution, Constitution::KudzuEvolve);
    }

    #[test]
    fn probe_scores_and_sorts_by_similarity() {
        let mut registry = SiloRegistry::new(64);
        let silo = registry.find_or_create("biology");
        silo.record_relationship("cell", "contains", "nucleus", Utc::now());
        silo.record_relationship("rust", "is_a", "language", Utc::now());
        let results = silo.probe("cell");
        assert_eq!(results[0].0.get("subject").unwrap(), "cell");
    }

    #[test]
    fn cross_silo_query_merges_across_domains() {
        let mut registry = SiloRegistry::new(64);
        registry.find_or_create("biology").record_relationship("cell", "contains", "nucleus", Utc::now());
        registry.find_or_create("chemistry").record_relationship("water", "contains", "hydrogen", Utc::now());
        let results = registry.cross_silo_query("cell");
        assert_eq!(results.len(), 2);
    }
}
