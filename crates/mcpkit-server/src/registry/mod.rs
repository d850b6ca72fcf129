//! Primitive registries: tools, resources, prompts.
//!
//! Registries are concurrently readable; mutation serializes behind a write
//! lock. A combined [`RegistrySet`] implements the capability registry's
//! counts provider so the advertised capabilities track live registrations.

pub mod prompts;
pub mod resources;
pub mod tools;

pub use prompts::{PromptRegistration, PromptRegistry};
pub use resources::{ResourceRegistration, ResourceRegistry};
pub use tools::{ToolRegistration, ToolRegistry};

use lazy_static::lazy_static;
use mcpkit_core::error::{McpError, McpResult, RegistryError};
use mcpkit_core::protocol::PrimitiveCounts;
use regex::Regex;
use std::sync::Arc;

lazy_static! {
    /// Tool and prompt names: lowercase alphanumeric start, then `a-z0-9_-`.
    static ref PRIMITIVE_NAME_RE: Regex = Regex::new(r"^[a-z0-9][a-z0-9_-]*$").unwrap();
}

/// Validate a tool or prompt name against the naming rule.
pub(crate) fn validate_primitive_name(kind: &'static str, name: &str) -> McpResult<()> {
    if PRIMITIVE_NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(McpError::Registry(RegistryError::InvalidName {
            kind,
            name: name.to_string(),
        }))
    }
}

/// The three registries a server carries, bundled for capability derivation.
#[derive(Clone)]
pub struct RegistrySet {
    pub tools: Arc<ToolRegistry>,
    pub resources: Arc<ResourceRegistry>,
    pub prompts: Arc<PromptRegistry>,
}

impl Default for RegistrySet {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistrySet {
    pub fn new() -> Self {
        Self {
            tools: Arc::new(ToolRegistry::new()),
            resources: Arc::new(ResourceRegistry::new()),
            prompts: Arc::new(PromptRegistry::new()),
        }
    }
}

impl PrimitiveCounts for RegistrySet {
    fn tool_count(&self) -> usize {
        self.tools.len()
    }

    fn resource_count(&self) -> usize {
        self.resources.len()
    }

    fn prompt_count(&self) -> usize {
        self.prompts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_rule() {
        assert!(validate_primitive_name("tool", "add_note").is_ok());
        assert!(validate_primitive_name("tool", "a2-b_c").is_ok());
        assert!(validate_primitive_name("tool", "9lives").is_ok());

        assert!(validate_primitive_name("tool", "").is_err());
        assert!(validate_primitive_name("tool", "_leading").is_err());
        assert!(validate_primitive_name("tool", "CamelCase").is_err());
        assert!(validate_primitive_name("tool", "has space").is_err());
        assert!(validate_primitive_name("tool", "-dash").is_err());
    }
}
