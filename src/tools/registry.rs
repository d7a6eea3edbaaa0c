//! Tool registry (spec.md §4.10.1): a closed, append-only catalog
//! built once at initialization and never mutated at runtime.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no tool named {0}")]
    NotFound(String),
    #[error("duplicate tool name {0}")]
    DuplicateName(String),
}

/// One catalog entry. `input_schema` is a JSON-Schema–shaped object
/// describing parameters, required fields, and types.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// The static catalog. Built with [`ToolRegistry::build`] at
/// initialization; `lookup` is the only way callers touch it
/// afterward.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolRegistry {
    tools: Vec<ToolDefinition>,
}

impl ToolRegistry {
    /// Build a registry from a list of definitions, project-prefixing
    /// every name (e.g. `kudzu.store_trace`) and rejecting duplicates.
    ///
    /// # Errors
    /// Returns [`RegistryError::DuplicateName`] if two entries share a
    /// name after prefixing.
    pub fn build(project_prefix: &str, entries: Vec<(&str, &str, Value)>) -> Result<Self, RegistryError> {
        let mut tools = Vec::with_capacity(entries.len());
        for (name, description, input_schema) in entries {
            let prefixed = format!("{project_prefix}.{name}");
            if tools.iter().any(|t: &ToolDefinition| t.name == prefixed) {
                return Err(RegistryError::DuplicateName(prefixed));
            }
            tools.push(ToolDefinition { name: prefixed, description: description.to_string(), input_schema });
        }
        Ok(Self { tools })
    }

    /// # Errors
    /// Returns [`RegistryError::NotFound`] if no tool has that name.
    pub fn lookup(&self, name: &str) -> Result<&ToolDefinition, RegistryError> {
        self.tools.iter().find(|t| t.name == name).ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    #[must_use]
    pub fn all(&self) -> &[ToolDefinition] {
        &self.tools
    }
}

/// The default Kudzu tool catalog: the subset of the Public Operation
/// Surface (spec.md §6) a brain's Tier 3 conversation can invoke.
#[must_use]
pub fn default_registry() -> ToolRegistry {
    ToolRegistry::build(
        "kudzu",
        vec![
            (
                "record_trace",
                "Record a new navigational trace in the hologram's memory.",
                serde_json::json!({
                    "type": "object",
                    "properties": {
                        "purpose": {"type": "string"},
                        "hint": {"type": "object"}
                    },
                    "required": ["purpose", "hint"]
                }),
            ),
            (
                "recall",
                "Recall traces of a given purpose from the hologram's own memory.",
                serde_json::json!({
                    "type": "object",
                    "properties": {
                        "purpose": {"type": "string"}
                    },
                    "required": []
                }),
            ),
            (
                "query_peer",
                "Query a peer hologram's memory, bounded by a hop count.",
                serde_json::json!({
                    "type": "object",
                    "properties": {
                        "peer_id": {"type": "string"},
                        "purpose": {"type": "string"},
                        "max_hops": {"type": "integer"}
                    },
                    "required": ["peer_id", "purpose"]
                }),
            ),
            (
                "semantic_query",
                "Query consolidated memory by meaning above a similarity threshold.",
                serde_json::json!({
                    "type": "object",
                    "properties": {
                        "text": {"type": "string"},
                        "threshold": {"type": "number"}
                    },
                    "required": ["text"]
                }),
            ),
        ],
    )
    .expect("default tool names are distinct")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_prefixes_every_name() {
        let registry = default_registry();
        assert!(registry.all().iter().all(|t| t.name.starts_with("kudzu.")));
    }

    #[test]
    fn lookup_finds_a_known_tool() {
        let registry = default_registry();
        assert!(registry.lookup("kudzu.recall").is_ok());
    }

    #[test]
    fn lookup_unknown_tool_is_not_found() {
        let registry = default_registry();
        assert_eq!(registry.lookup("kudzu.nonexistent"), Err(RegistryError::NotFound("kudzu.nonexistent".to_string())));
    }

    #[test]
    fn build_rejects_duplicate_names() {
        let result = ToolRegistry::build("kudzu", vec![("a", "desc", serde_json::json!({})), ("a", "desc2", serde_json::json!({}))]);
        assert_eq!(result, Err(RegistryError::DuplicateName("kudzu.a".to_string())));
    }
}
