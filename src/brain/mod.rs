//! The brain / sovereign (spec.md §4.8): the per-node wake loop that
//! ties the reflex table, the Thought process, the external-model
//! tier, the budget tracker, and the distiller into one cooperative
//! cycle. Grounded on `core/cognitive_loop/mod.rs`'s `CognitiveLoop`
//! state machine, retargeted from a fixed perception/decision/action
//! loop to Kudzu's three-tier reasoning dispatch.

pub mod budget;
pub mod distiller;
pub mod reflex;
pub mod thought;
pub mod working_memory;

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};

use crate::silo::SiloRegistry;

pub use budget::{BudgetTracker, Usage};
pub use reflex::{Anomaly, AnomalyKind, ReflexAction, ReflexTable};
pub use thought::{Resolution, ThoughtRequest, ThoughtResult};
pub use working_memory::{ChainLink, ConceptActivation, WorkingMemory};

const DEFAULT_CYCLE_INTERVAL_MS: u64 = 300_000;
const DECAY_PER_CYCLE: f32 = 0.05;
const THOUGHT_ACT_THRESHOLD: f32 = 0.7;
const MAX_CURIOSITY_QUESTIONS: usize = 5;
const CURIOSITY_GAP_SCORE: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrainStatus {
    Sleeping,
    Reasoning,
    Acting,
}

#[derive(Debug, Clone)]
pub struct BrainConfig {
    pub model: String,
    pub api_key: String,
    pub max_turns: u32,
    pub monthly_budget_limit_usd: f64,
    pub cycle_interval_ms: u64,
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet".to_string(),
            api_key: String::new(),
            max_turns: 6,
            monthly_budget_limit_usd: 20.0,
            cycle_interval_ms: DEFAULT_CYCLE_INTERVAL_MS,
        }
    }
}

/// Reports what a Tier 3 (external-model) call produced, so the brain
/// can feed it into the distiller and budget tracker without depending
/// on the tool-use client's concrete type.
#[derive(Debug, Clone)]
pub struct ExternalCompletion {
    pub text: String,
    pub usage: Usage,
}

/// Injected so the brain engine stays free of a live model endpoint;
/// implemented over `crate::tools::client` in production and with a
/// canned responder in tests. Mirrors `hologram::CognitionBackend`.
#[ractor::async_trait]
pub trait ExternalModel: Send + Sync {
    async fn complete(&self, prompt: &str, max_turns: u32) -> Result<ExternalCompletion, String>;
}

/// One wake-cycle outcome, returned to the caller (the `ractor::Actor`
/// shell, or a test) so it can decide what traces to record and how
/// soon to schedule the next cycle.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub status: BrainStatus,
    pub reflex_actions: Vec<ReflexAction>,
    pub thought: Option<ThoughtResult>,
    pub external: Option<ExternalCompletion>,
    pub distillation: Option<distiller::DistillationResult>,
    pub next_wake_in: Duration,
}

/// The brain's own state. Free functions below (`run_cycle`,
/// `generate_curiosity_questions`) operate on this so that the async
/// Tier 3 call isn't tangled with the `ractor::Actor` message loop —
/// same split as [`crate::hologram::HologramEngine`].
pub struct BrainEngine {
    pub hologram_id: String,
    pub desires: VecDeque<String>,
    pub status: BrainStatus,
    pub cycle_count: u64,
    pub working_memory: WorkingMemory,
    pub budget: BudgetTracker,
    pub config: BrainConfig,
    pub silos: SiloRegistry,
    pub reflexes: ReflexTable,
    pub available_actions: Vec<String>,
}

impl BrainEngine {
    #[must_use]
    pub fn new(hologram_id: impl Into<String>, config: BrainConfig, dimension: usize, now: DateTime<Utc>) -> Self {
        Self {
            hologram_id: hologram_id.into(),
            desires: VecDeque::new(),
            status: BrainStatus::Sleeping,
            cycle_count: 0,
            working_memory: WorkingMemory::new(),
            budget: BudgetTracker::new(now),
            config,
            silos: SiloRegistry::new(dimension),
            reflexes: ReflexTable::default_rules(),
            available_actions: Vec::new(),
        }
    }
}

/// A pure function over desires, working-memory gaps, and salience
/// hints: never calls out to a model. Capped at
/// [`MAX_CURIOSITY_QUESTIONS`], desires first, then any pending
/// questions already queued in working memory.
#[must_use]
pub fn generate_curiosity_questions(desires: &VecDeque<String>, memory: &WorkingMemory) -> Vec<String> {
    let mut questions: Vec<String> = desires.iter().map(|d| format!("how do I satisfy: {d}?")).collect();
    for pending in memory.pending_questions() {
        if questions.len() >= MAX_CURIOSITY_QUESTIONS {
            break;
        }
        questions.push(pending.clone());
    }
    questions.truncate(MAX_CURIOSITY_QUESTIONS);
    questions
}

/// Run one wake cycle. `pending_query` is an external-caller question
/// (from the thin-collaborator API surface) that, when present,
/// supersedes anomaly pre-checks and curiosity generation as the
/// cycle's input.
///
/// # Errors
/// Returns the external model's error string unchanged if Tier 3 is
/// invoked and fails; the caller decides whether that is fatal to the
/// cycle.
pub async fn run_cycle(
    engine: &mut BrainEngine,
    anomalies: &[Anomaly],
    pending_query: Option<String>,
    model: &dyn ExternalModel,
    now: DateTime<Utc>,
) -> Result<CycleOutcome, String> {
    engine.status = BrainStatus::Reasoning;
    engine.cycle_count += 1;

    let reflex_actions = engine.reflexes.dispatch(anomalies);
    if !reflex_actions.is_empty() {
        engine.status = BrainStatus::Sleeping;
        return Ok(CycleOutcome {
            status: BrainStatus::Acting,
            reflex_actions,
            thought: None,
            external: None,
            distillation: None,
            next_wake_in: Duration::from_millis(engine.config.cycle_interval_ms),
        });
    }

    let input = match pending_query {
        Some(query) => query,
        None => generate_curiosity_questions(&engine.desires, &engine.working_memory)
            .into_iter()
            .next()
            .unwrap_or_else(|| "what should I learn next?".to_string()),
    };

    let priming = engine.working_memory.top_concepts(5);
    let request = ThoughtRequest::new(input.clone());
    let thought = thought::resolve(format!("{}:{}", engine.hologram_id, engine.cycle_count), &request, &priming, &engine.silos, 0);

    for link in &thought.chain {
        engine.working_memory.activate_concept(&link.concept, link.similarity, &link.source, now);
    }
    engine.working_memory.push_chain(thought.chain.clone());

    let mut external = None;
    let mut distillation = None;

    if thought.confidence > THOUGHT_ACT_THRESHOLD {
        engine.status = BrainStatus::Acting;
    } else if engine.budget.within_budget(engine.config.monthly_budget_limit_usd, now) {
        engine.status = BrainStatus::Reasoning;
        let completion = model.complete(&input, engine.config.max_turns).await?;
        engine.budget.record_usage(completion.usage, now);
        distillation = Some(distiller::distill(&completion.text, &engine.available_actions, &mut engine.silos, &mut engine.working_memory, now));
        external = Some(completion);
    }

    engine.working_memory.decay(DECAY_PER_CYCLE);
    engine.status = BrainStatus::Sleeping;

    Ok(CycleOutcome {
        status: engine.status,
        reflex_actions: Vec::new(),
        thought: Some(thought),
        external,
        distillation,
        next_wake_in: Duration::from_millis(engine.config.cycle_interval_ms),
    })
}

pub enum BrainMsg {
    WakeCycle { anomalies: Vec<Anomaly>, pending_query: Option<String>, reply: RpcReplyPort<Result<CycleOutcome, String>> },
    GetStatus { reply: RpcReplyPort<BrainStatus> },
    AddDesire { desire: String },
    PushQuery { query: String, reply: RpcReplyPort<()> },
}

pub struct BrainActor<M: ExternalModel> {
    pub model: M,
}

#[ractor::async_trait]
impl<M: ExternalModel + 'static> Actor for BrainActor<M> {
    type Msg = BrainMsg;
    type State = BrainEngine;
    type Arguments = BrainEngine;

    async fn pre_start(&self, _myself: ActorRef<Self::Msg>, args: Self::Arguments) -> Result<Self::State, ActorProcessingErr> {
        Ok(args)
    }

    async fn handle(&self, _myself: ActorRef<Self::Msg>, message: Self::Msg, state: &mut Self::State) -> Result<(), ActorProcessingErr> {
        match message {
            BrainMsg::WakeCycle { anomalies, pending_query, reply } => {
                let outcome = run_cycle(state, &anomalies, pending_query, &self.model, Utc::now()).await;
                let _ = reply.send(outcome);
            }
            BrainMsg::GetStatus { reply } => {
                let _ = reply.send(state.status);
            }
            BrainMsg::AddDesire { desire } => {
                state.desires.push_back(desire);
            }
            BrainMsg::PushQuery { query, reply } => {
                state.working_memory.push_question(query);
                let _ = reply.send(());
            }
        }
        Ok(())
    }
}
