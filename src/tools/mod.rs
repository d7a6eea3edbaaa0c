//! Tool registry & external-model client (spec.md §4.10): the static
//! tool catalog and the bounded tool-use loop that invokes it against
//! an external reasoning service during the brain's Tier 3.

pub mod client;
pub mod registry;

pub use client::{run_tool_loop, ClientError, ClientOptions, RunLoopArgs, ToolExecutor};
pub use registry::{default_registry, RegistryError, ToolDefinition, ToolRegistry};
