//! Constitution policy tables (spec.md §3, §4.5, §9 Design Note "Open
//! constitution in production"). A thin collaborator: a static decision
//! table over a closed set of framework tags, with no novel design of
//! its own.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The four pluggable decision frameworks a hologram may run under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constitution {
    MeshRepublic,
    Cautious,
    Open,
    KudzuEvolve,
}

impl Constitution {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MeshRepublic => "mesh_republic",
            Self::Cautious => "cautious",
            Self::Open => "open",
            Self::KudzuEvolve => "kudzu_evolve",
        }
    }
}

impl std::fmt::Display for Constitution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether this node is running as a production deployment. Read at
/// the point of a constitution change, never cached at module load,
/// so integration tests can flip it mid-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeploymentMode {
    Production,
    Development,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConstitutionError {
    #[error("open constitution is rejected in production deployments")]
    OpenBlockedInProduction,
}

/// The closed set of action tags a cognition backend may emit.
/// Untrusted wire input must validate against this set rather than
/// constructing a variant dynamically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    FileWrite { path: String },
    NetworkCall { url: String },
    ToolInvoke { tool: String, args: serde_json::Value },
    SendMessage { to: String, content: String },
}

impl Action {
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::FileWrite { .. } => "file_write",
            Self::NetworkCall { .. } => "network_call",
            Self::ToolInvoke { .. } => "tool_invoke",
            Self::SendMessage { .. } => "send_message",
        }
    }
}

/// The state the constitution evaluates an action against. A minimal
/// snapshot (not the full hologram) so the gate can be pure.
#[derive(Debug, Clone, Copy)]
pub struct HologramState {
    pub cognition_enabled: bool,
}

/// Result of `Constitution::permitted`.
#[derive(Debug, Clone)]
pub enum Decision {
    Permitted,
    Denied { reason: String },
    RequiresConsensus { threshold: f32 },
}

impl Constitution {
    /// `permitted?(framework, action, state)` from §4.5's action
    /// execution pipeline.
    #[must_use]
    pub fn permitted(self, action: &Action, state: HologramState) -> Decision {
        match self {
            Self::Open => Decision::Permitted,
            Self::KudzuEvolve => match action {
                Action::FileWrite { .. } => Decision::RequiresConsensus { threshold: 0.66 },
                _ => Decision::Permitted,
            },
            Self::MeshRepublic => match action {
                Action::NetworkCall { .. } | Action::SendMessage { .. } => Decision::Permitted,
                Action::ToolInvoke { .. } => {
                    if state.cognition_enabled {
                        Decision::Permitted
                    } else {
                        Decision::Denied {
                            reason: "tool invocation requires cognition to be enabled".to_string(),
                        }
                    }
                }
                Action::FileWrite { .. } => Decision::RequiresConsensus { threshold: 0.5 },
            },
            Self::Cautious => match action {
                Action::SendMessage { .. } => Decision::Permitted,
                Action::ToolInvoke { .. } => Decision::RequiresConsensus { threshold: 0.75 },
                Action::FileWrite { .. } | Action::NetworkCall { .. } => Decision::Denied {
                    reason: format!("{} is not permitted under the cautious constitution", action.tag()),
                },
            },
        }
    }

    /// §9 Design Note: a constitution set to `open` is rejected when
    /// the deployment is marked production. Callers pass the current
    /// mode explicitly rather than reading a module-level flag.
    ///
    /// # Errors
    /// Returns [`ConstitutionError::OpenBlockedInProduction`] if `self`
    /// is `Open` and `mode` is `Production`.
    pub fn validate_for_deployment(self, mode: DeploymentMode) -> Result<(), ConstitutionError> {
        if self == Self::Open && mode == DeploymentMode::Production {
            return Err(ConstitutionError::OpenBlockedInProduction);
        }
        Ok(())
    }
}

impl PartialEq for Decision {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Permitted, Self::Permitted) => true,
            (Self::Denied { reason: a }, Self::Denied { reason: b }) => a == b,
            (
                Self::RequiresConsensus { threshold: a },
                Self::RequiresConsensus { threshold: b },
            ) => (a - b).abs() < f32::EPSILON,
            _ => false,
        }
    }
}
