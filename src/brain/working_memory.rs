//! Bounded working memory (spec.md §4.8): active concepts, recent
//! reasoning chains, pending questions. Every field is capped; the
//! brain never accumulates unbounded state across wake cycles.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};

const MAX_ACTIVE_CONCEPTS: usize = 20;
const EVICTION_THRESHOLD: f32 = 0.1;
const MAX_RECENT_CHAINS: usize = 10;
const MAX_PENDING_QUESTIONS: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct ConceptActivation {
    pub score: f32,
    pub source: String,
    pub timestamp: DateTime<Utc>,
}

/// One link in a reasoning chain: a concept plus the similarity that
/// brought it in, and where it came from (a silo domain, or
/// `"dead_end"` when a thought's probe came up empty).
#[derive(Debug, Clone, PartialEq)]
pub struct ChainLink {
    pub concept: String,
    pub similarity: f32,
    pub source: String,
}

#[derive(Debug, Clone, Default)]
pub struct WorkingMemory {
    active_concepts: BTreeMap<String, ConceptActivation>,
    recent_chains: VecDeque<Vec<ChainLink>>,
    pending_questions: VecDeque<String>,
    pub context: String,
}

impl WorkingMemory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or reinforce a concept. An existing concept takes the max
    /// of its old and new score; a full table evicts the
    /// lowest-scored entry to make room.
    pub fn activate_concept(&mut self, concept: &str, score: f32, source: &str, now: DateTime<Utc>) {
        if let Some(existing) = self.active_concepts.get_mut(concept) {
            if score > existing.score {
                existing.score = score;
                existing.source = source.to_string();
                existing.timestamp = now;
            }
            return;
        }

        if self.active_concepts.len() >= MAX_ACTIVE_CONCEPTS {
            if let Some(lowest) = self
                .active_concepts
                .iter()
                .min_by(|a, b| a.1.score.partial_cmp(&b.1.score).unwrap_or(std::cmp::Ordering::Equal))
                .map(|(k, _)| k.clone())
            {
                self.active_concepts.remove(&lowest);
            }
        }

        self.active_concepts.insert(
            concept.to_string(),
            ConceptActivation { score, source: source.to_string(), timestamp: now },
        );
    }

    /// Subtract `amount` from every score, then drop anything below
    /// the eviction threshold.
    pub fn decay(&mut self, amount: f32) {
        for activation in self.active_concepts.values_mut() {
            activation.score -= amount;
        }
        self.active_concepts.retain(|_, a| a.score >= EVICTION_THRESHOLD);
    }

    /// Top-`n` concepts by score, for priming future thoughts.
    #[must_use]
    pub fn top_concepts(&self, n: usize) -> Vec<String> {
        let mut ranked: Vec<(&String, &ConceptActivation)> = self.active_concepts.iter().collect();
        ranked.sort_by(|a, b| b.1.score.partial_cmp(&a.1.score).unwrap_or(std::cmp::Ordering::Equal));
        ranked.into_iter().take(n).map(|(k, _)| k.clone()).collect()
    }

    pub fn push_chain(&mut self, chain: Vec<ChainLink>) {
        if self.recent_chains.len() >= MAX_RECENT_CHAINS {
            self.recent_chains.pop_front();
        }
        self.recent_chains.push_back(chain);
    }

    #[must_use]
    pub fn recent_chains(&self) -> &VecDeque<Vec<ChainLink>> {
        &self.recent_chains
    }

    pub fn push_question(&mut self, question: String) {
        if self.pending_questions.len() >= MAX_PENDING_QUESTIONS {
            self.pending_questions.pop_front();
        }
        self.pending_questions.push_back(question);
    }

    #[must_use]
    pub fn pending_questions(&self) -> &VecDeque<String> {
        &self.pending_questions
    }

    pub fn pop_question(&mut self) -> Option<String> {
        self.pending_questions.pop_front()
    }
}
