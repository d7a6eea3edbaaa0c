//! Distillation (spec.md §4.8): after a Tier 3 completion, pull
//! relationship triples, reflex candidates, and knowledge gaps out of
//! the model's free text, feeding the silo layer and working memory
//! without another model round-trip.

use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;

use crate::brain::working_memory::WorkingMemory;
use crate::encoder::tokenizer;
use crate::silo::SiloRegistry;

/// Fixed relational patterns, each capturing a `(subject, object)` pair
/// around a named relation. Order matters: the first pattern to match
/// a sentence wins.
static RELATION_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    vec![
        ("is_caused_by", Regex::new(r"(?i)(.+?)\s+is caused by\s+(.+)").unwrap()),
        ("because", Regex::new(r"(?i)(.+?)\s+because\s+(.+)").unwrap()),
        ("leads_to", Regex::new(r"(?i)(.+?)\s+leads to\s+(.+)").unwrap()),
        ("requires", Regex::new(r"(?i)(.+?)\s+requires\s+(.+)").unwrap()),
        ("uses", Regex::new(r"(?i)(.+?)\s+uses\s+(.+)").unwrap()),
        ("is_a", Regex::new(r"(?i)(.+?)\s+is a\s+(.+)").unwrap()),
        ("contains", Regex::new(r"(?i)(.+?)\s+contains\s+(.+)").unwrap()),
        ("relates_to", Regex::new(r"(?i)(.+?)\s+relates to\s+(.+)").unwrap()),
        ("produces", Regex::new(r"(?i)(.+?)\s+produces\s+(.+)").unwrap()),
        ("provides", Regex::new(r"(?i)(.+?)\s+provides\s+(.+)").unwrap()),
    ]
});

const GAP_SIMILARITY_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct RelationTriple {
    pub subject: String,
    pub relation: String,
    pub object: String,
}

/// A causal chain whose object names a currently available action,
/// proposed for monarch approval as a new reflex rule.
#[derive(Debug, Clone, PartialEq)]
pub struct ReflexCandidate {
    pub trigger: String,
    pub action_name: String,
}

#[derive(Debug, Clone, Default)]
pub struct DistillationResult {
    pub triples: Vec<RelationTriple>,
    pub reflex_candidates: Vec<ReflexCandidate>,
    pub knowledge_gaps: Vec<String>,
}

fn normalize_term(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join("_").to_lowercase()
}

/// Extract every relational triple found in `text`, one sentence at a
/// time, trying each pattern in order and taking the first match.
#[must_use]
pub fn extract_triples(text: &str) -> Vec<RelationTriple> {
    let mut triples = Vec::new();
    for sentence in text.split(['.', '\n']) {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }
        for (relation, pattern) in RELATION_PATTERNS.iter() {
            if let Some(captures) = pattern.captures(sentence) {
                let subject = normalize_term(&captures[1]);
                let object = normalize_term(&captures[2]);
                if subject.is_empty() || object.is_empty() {
                    continue;
                }
                triples.push(RelationTriple { subject, relation: (*relation).to_string(), object });
                break;
            }
        }
    }
    triples
}

/// Causal triples (`is_caused_by`, `because`, `leads_to`) whose object
/// matches one of `available_actions` become reflex candidates.
#[must_use]
pub fn reflex_candidates(triples: &[RelationTriple], available_actions: &[String]) -> Vec<ReflexCandidate> {
    const CAUSAL_RELATIONS: &[&str] = &["is_caused_by", "because", "leads_to"];
    triples
        .iter()
        .filter(|t| CAUSAL_RELATIONS.contains(&t.relation.as_str()))
        .filter_map(|t| {
            available_actions
                .iter()
                .find(|action| action.as_str() == t.object)
                .map(|action| ReflexCandidate { trigger: t.subject.clone(), action_name: action.clone() })
        })
        .collect()
}

/// Significant terms in `text` absent from every silo and never
/// returned above [`GAP_SIMILARITY_THRESHOLD`] by a cross-silo query
/// become knowledge gaps, pushed onto working memory as curiosity
/// questions.
pub fn record_knowledge_gaps(text: &str, silos: &SiloRegistry, memory: &mut WorkingMemory) -> Vec<String> {
    let mut gaps = Vec::new();
    for term in tokenizer::extract_terms(text) {
        let best = silos
            .cross_silo_query(&term)
            .into_iter()
            .map(|(_, _, score)| score)
            .fold(0.0_f32, f32::max);
        if best < GAP_SIMILARITY_THRESHOLD {
            let question = format!("what is {term}?");
            memory.push_question(question.clone());
            gaps.push(question);
        }
    }
    gaps
}

/// Run the full distillation pass over one Tier 3 completion.
pub fn distill(
    text: &str,
    available_actions: &[String],
    silos: &mut SiloRegistry,
    memory: &mut WorkingMemory,
    now: DateTime<Utc>,
) -> DistillationResult {
    let triples = extract_triples(text);
    let candidates = reflex_candidates(&triples, available_actions);
    let gaps = record_knowledge_gaps(text, silos, memory);

    for triple in &triples {
        let domain = triple.relation.as_str();
        silos.find_or_create(domain).record_relationship(&triple.subject, &triple.relation, &triple.object, now);
    }

    DistillationResult { triples, reflex_candidates: candidates, knowledge_gaps: gaps }
}
