//! Thought process (spec.md §4.8): an ephemeral, recursive probe
//! across silos that resolves a stimulus into a reasoning chain with a
//! confidence score. Grounded on `actors/thought/mod.rs`'s chain
//! traversal and depth-bounding, retargeted from parent-id lookups in
//! a cache to cross-silo concept probing.

use std::time::{Duration, Instant};

use crate::brain::working_memory::ChainLink;
use crate::encoder::tokenizer;
use crate::silo::SiloRegistry;

pub const DEFAULT_MAX_DEPTH: u32 = 3;
pub const DEFAULT_MAX_BREADTH: usize = 5;
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;
pub const SUB_THOUGHT_TIMEOUT_MS: u64 = 2000;
const ACTIVATION_THRESHOLD: f32 = 0.3;
const FOUND_THRESHOLD: f32 = 0.6;
const PARTIAL_THRESHOLD: f32 = 0.3;
const LENGTH_BONUS_CAP: f32 = 0.2;
const LENGTH_BONUS_DIVISOR: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Found,
    Partial,
    NoMatch,
    Timeout,
}

#[derive(Debug, Clone)]
pub struct ThoughtRequest {
    pub input: String,
    pub max_depth: u32,
    pub max_breadth: usize,
    pub timeout: Duration,
}

impl ThoughtRequest {
    #[must_use]
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            max_depth: DEFAULT_MAX_DEPTH,
            max_breadth: DEFAULT_MAX_BREADTH,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ThoughtResult {
    pub id: String,
    pub chain: Vec<ChainLink>,
    pub confidence: f32,
    pub resolution: Resolution,
}

/// Resolve one thought request against the live silo set. `priming`
/// supplies working-memory concepts to probe alongside terms extracted
/// from `input`.
#[must_use]
pub fn resolve(id: String, request: &ThoughtRequest, priming: &[String], silos: &SiloRegistry, depth: u32) -> ThoughtResult {
    let deadline = Instant::now() + request.timeout;
    resolve_inner(id, request, priming, silos, depth, deadline)
}

fn resolve_inner(
    id: String,
    request: &ThoughtRequest,
    priming: &[String],
    silos: &SiloRegistry,
    depth: u32,
    deadline: Instant,
) -> ThoughtResult {
    if Instant::now() >= deadline {
        return ThoughtResult { id, chain: Vec::new(), confidence: 0.0, resolution: Resolution::Timeout };
    }

    let mut terms: Vec<String> = tokenizer::extract_terms(&request.input);
    terms.extend(priming.iter().cloned());

    let mut activations: Vec<ChainLink> = Vec::new();
    for term in &terms {
        for (domain, hint, similarity) in silos.cross_silo_query(term) {
            if similarity < ACTIVATION_THRESHOLD {
                continue;
            }
            let Some(concept) = hint.get("subject").and_then(|v| v.as_str()) else {
                continue;
            };
            if activations.iter().any(|link| link.concept == concept) {
                continue;
            }
            activations.push(ChainLink { concept: concept.to_string(), similarity, source: domain });
        }
    }
    activations.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap_or(std::cmp::Ordering::Equal));
    activations.truncate(request.max_breadth);

    let mut chain = vec![ChainLink { concept: request.input.clone(), similarity: 1.0, source: "input".to_string() }];
    chain.extend(activations.iter().cloned());

    if depth < request.max_depth && Instant::now() < deadline {
        if let Some(top) = activations.first() {
            let sub_request = ThoughtRequest {
                input: top.concept.clone(),
                max_depth: request.max_depth,
                max_breadth: request.max_breadth.saturating_sub(1).max(1),
                timeout: Duration::from_millis(SUB_THOUGHT_TIMEOUT_MS),
            };
            let sub = resolve_inner(format!("{id}/sub"), &sub_request, &[], silos, depth + 1, deadline.min(Instant::now() + sub_request.timeout));
            chain.extend(sub.chain);
        }
    }

    if Instant::now() >= deadline {
        return ThoughtResult { id, chain, confidence: 0.0, resolution: Resolution::Timeout };
    }

    let confidence = score_chain(&chain);
    let resolution = if confidence > FOUND_THRESHOLD {
        Resolution::Found
    } else if confidence > PARTIAL_THRESHOLD {
        Resolution::Partial
    } else {
        Resolution::NoMatch
    };

    ThoughtResult { id, chain, confidence, resolution }
}

fn score_chain(chain: &[ChainLink]) -> f32 {
    if chain.len() <= 1 {
        return 0.0;
    }
    let average: f32 = chain.iter().map(|l| l.similarity).sum::<f32>() / chain.len() as f32;
    let length_bonus = (chain.len() as f32 / LENGTH_BONUS_DIVISOR).min(LENGTH_BONUS_CAP);
    (average + length_bonus).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn single_link_chain_has_zero_confidence() {
        let silos = SiloRegistry::new(64);
        let request = ThoughtRequest::new("nothing matches this at all");
        let result = resolve("t1".to_string(), &request, &[], &silos, 0);
        assert_eq!(result.chain.len(), 1);
        assert!((result.confidence).abs() < f32::EPSILON);
        assert_eq!(result.resolution, Resolution::NoMatch);
    }

    #[test]
    fn matching_silo_content_raises_confidence() {
        let mut silos = SiloRegistry::new(64);
        silos.find_or_create("biology").record_relationship("cell", "contains", "nucleus", Utc::now());
        let request = ThoughtRequest::new("cell");
        let result = resolve("t1".to_string(), &request, &[], &silos, 0);
        assert!(result.chain.len() >= 2);
        assert!(result.confidence > 0.0);
    }

    #[test]
    fn already_past_deadline_returns_timeout() {
        let silos = SiloRegistry::new(64);
        let mut request = ThoughtRequest::new("cell");
        request.timeout = Duration::from_millis(0);
        std::thread::sleep(Duration::from_millis(1));
        let result = resolve("t1".to_string(), &request, &[], &silos, 0);
        assert_eq!(result.resolution, Resolution::Timeout);
    }
}
