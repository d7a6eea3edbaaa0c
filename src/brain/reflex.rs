//! Tier 1 reflex dispatch (spec.md §4.8): a static rule table matched
//! against pre-check anomalies before any HRR or external-model
//! reasoning is attempted.

use serde_json::{json, Value};

/// The closed set of anomalies the wake cycle's pre-check can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnomalyKind {
    ConsolidationStale,
    NoHolograms,
    StorageUnreachable,
}

#[derive(Debug, Clone)]
pub struct Anomaly {
    pub kind: AnomalyKind,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReflexAction {
    Act { payload: Value },
    Escalate { alert: String },
}

struct Rule {
    matches: AnomalyKind,
    action: ReflexAction,
}

/// The reflex rule table. Executes every matched rule's action;
/// `pass` (an empty result) means nothing matched and the wake cycle
/// should escalate to Tier 2.
pub struct ReflexTable {
    rules: Vec<Rule>,
}

impl ReflexTable {
    #[must_use]
    pub fn default_rules() -> Self {
        Self {
            rules: vec![
                Rule {
                    matches: AnomalyKind::ConsolidationStale,
                    action: ReflexAction::Act { payload: json!({ "trigger": "consolidation_light_cycle" }) },
                },
                Rule {
                    matches: AnomalyKind::NoHolograms,
                    action: ReflexAction::Act { payload: json!({ "trigger": "spawn_default_hologram" }) },
                },
                Rule {
                    matches: AnomalyKind::StorageUnreachable,
                    action: ReflexAction::Escalate { alert: "storage tier unreachable".to_string() },
                },
            ],
        }
    }

    /// Run every rule against `anomalies`. Returns every action from a
    /// rule whose `matches` kind is present.
    #[must_use]
    pub fn dispatch(&self, anomalies: &[Anomaly]) -> Vec<ReflexAction> {
        self.rules
            .iter()
            .filter(|rule| anomalies.iter().any(|a| a.kind == rule.matches))
            .map(|rule| rule.action.clone())
            .collect()
    }
}
