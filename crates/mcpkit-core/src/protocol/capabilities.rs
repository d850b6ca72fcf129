//! Capability declaration and dynamic derivation.
//!
//! Server capabilities have a static part (declared options such as
//! `resources.subscribe`) and a dynamic part: the `tools`, `resources`, and
//! `prompts` entries are advertised only while at least one primitive of the
//! kind is registered. The registry therefore holds a counts provider and
//! recomputes the advertised set each time an `initialize` response is built,
//! which is what makes post-start registrations visible on re-handshake.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

/// Client capabilities offered during initialization. Carried opaquely
/// except for the well-known entries.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ClientCapabilities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roots: Option<RootsCapability>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sampling: Option<serde_json::Value>,

    /// Entries this framework does not interpret.
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RootsCapability {
    #[serde(rename = "listChanged", skip_serializing_if = "Option::is_none")]
    pub list_changed: Option<bool>,
}

/// Server capabilities advertised in the `initialize` response.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ServerCapabilities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsCapability>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourcesCapability>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompts: Option<PromptsCapability>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingCapability>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ToolsCapability {
    #[serde(rename = "listChanged", skip_serializing_if = "Option::is_none")]
    pub list_changed: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ResourcesCapability {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscribe: Option<bool>,

    #[serde(rename = "listChanged", skip_serializing_if = "Option::is_none")]
    pub list_changed: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PromptsCapability {
    #[serde(rename = "listChanged", skip_serializing_if = "Option::is_none")]
    pub list_changed: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct LoggingCapability {}

/// Live primitive counts, implemented by the registries.
pub trait PrimitiveCounts: Send + Sync {
    fn tool_count(&self) -> usize;
    fn resource_count(&self) -> usize;
    fn prompt_count(&self) -> usize;
}

/// Aggregates declared capability options and derives the advertised set.
pub struct CapabilityRegistry {
    declared: RwLock<ServerCapabilities>,
    counts: RwLock<Option<Arc<dyn PrimitiveCounts>>>,
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self {
            declared: RwLock::new(ServerCapabilities::default()),
            counts: RwLock::new(None),
        }
    }

    /// Replace the statically declared options.
    pub fn declare(&self, capabilities: ServerCapabilities) {
        *self.declared.write().expect("capability lock poisoned") = capabilities;
    }

    pub fn declared(&self) -> ServerCapabilities {
        self.declared
            .read()
            .expect("capability lock poisoned")
            .clone()
    }

    /// Attach the live primitive counts provider.
    pub fn set_counts_provider(&self, provider: Arc<dyn PrimitiveCounts>) {
        *self.counts.write().expect("capability lock poisoned") = Some(provider);
    }

    /// Compute the advertised capabilities: declared options gated by the
    /// current primitive counts. Without a provider the declared set is
    /// advertised as-is.
    pub fn advertised(&self) -> ServerCapabilities {
        let declared = self.declared();
        let counts = self.counts.read().expect("capability lock poisoned");
        let Some(provider) = counts.as_ref() else {
            return declared;
        };

        let mut advertised = declared.clone();
        advertised.tools = if provider.tool_count() > 0 {
            Some(declared.tools.unwrap_or_default())
        } else {
            None
        };
        advertised.resources = if provider.resource_count() > 0 {
            Some(declared.resources.unwrap_or_default())
        } else {
            None
        };
        advertised.prompts = if provider.prompt_count() > 0 {
            Some(declared.prompts.unwrap_or_default())
        } else {
            None
        };
        advertised
    }
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("declared", &self.declared())
            .finish()
    }
}
