//! Prompt table: insertion-ordered, name-keyed.

use crate::handlers::{PromptHandler, PromptValidator};
use crate::registry::validate_primitive_name;
use mcpkit_core::error::{McpError, McpResult, RegistryError};
use mcpkit_core::types::{ListPromptsResponse, Prompt};
use mcpkit_core::utils::pagination::{paginate, DEFAULT_PAGE_SIZE};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// A prompt definition bound to its handler and optional validator.
pub struct PromptRegistration {
    pub prompt: Prompt,
    pub handler: Arc<dyn PromptHandler>,
    pub validator: Option<Arc<dyn PromptValidator>>,
}

#[derive(Default)]
struct PromptTable {
    order: Vec<String>,
    by_name: HashMap<String, Arc<PromptRegistration>>,
}

/// Registry behind `prompts/list` and `prompts/get`.
pub struct PromptRegistry {
    table: RwLock<PromptTable>,
}

impl Default for PromptRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptRegistry {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(PromptTable::default()),
        }
    }

    pub fn register(
        &self,
        prompt: Prompt,
        handler: Arc<dyn PromptHandler>,
        validator: Option<Arc<dyn PromptValidator>>,
    ) -> McpResult<()> {
        validate_primitive_name("prompt", &prompt.name)?;
        let mut table = self.table.write().expect("prompt registry lock poisoned");
        if table.by_name.contains_key(&prompt.name) {
            return Err(McpError::Registry(RegistryError::Duplicate {
                kind: "prompt",
                name: prompt.name.clone(),
            }));
        }
        let name = prompt.name.clone();
        table.order.push(name.clone());
        table.by_name.insert(
            name,
            Arc::new(PromptRegistration {
                prompt,
                handler,
                validator,
            }),
        );
        Ok(())
    }

    pub fn unregister(&self, name: &str) -> bool {
        let mut table = self.table.write().expect("prompt registry lock poisoned");
        if table.by_name.remove(name).is_some() {
            table.order.retain(|n| n != name);
            true
        } else {
            false
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<PromptRegistration>> {
        self.table
            .read()
            .expect("prompt registry lock poisoned")
            .by_name
            .get(name)
            .cloned()
    }

    /// Page through prompts in registration order.
    pub fn list(&self, cursor: Option<&str>) -> McpResult<ListPromptsResponse> {
        let snapshot: Vec<Prompt> = {
            let table = self.table.read().expect("prompt registry lock poisoned");
            table
                .order
                .iter()
                .filter_map(|name| table.by_name.get(name))
                .map(|registration| registration.prompt.clone())
                .collect()
        };
        let page = paginate(&snapshot, cursor, DEFAULT_PAGE_SIZE)
            .map_err(|_| McpError::invalid_params("unrecognized cursor"))?;
        Ok(ListPromptsResponse {
            prompts: page.items,
            next_cursor: page.next_cursor,
        })
    }

    pub fn len(&self) -> usize {
        self.table
            .read()
            .expect("prompt registry lock poisoned")
            .order
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut table = self.table.write().expect("prompt registry lock poisoned");
        table.order.clear();
        table.by_name.clear();
    }
}

impl std::fmt::Debug for PromptRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptRegistry").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestContext;
    use async_trait::async_trait;
    use mcpkit_core::types::{GetPromptResponse, PromptMessage};

    struct StaticPrompt;

    #[async_trait]
    impl PromptHandler for StaticPrompt {
        async fn generate(
            &self,
            _args: Option<serde_json::Map<String, serde_json::Value>>,
            _ctx: &mut RequestContext,
        ) -> McpResult<GetPromptResponse> {
            Ok(GetPromptResponse {
                description: None,
                messages: vec![PromptMessage::user("hi")],
            })
        }
    }

    #[test]
    fn test_register_and_duplicate() {
        let registry = PromptRegistry::new();
        registry
            .register(Prompt::new("summarize"), Arc::new(StaticPrompt), None)
            .unwrap();
        assert_eq!(registry.len(), 1);

        let err = registry
            .register(Prompt::new("summarize"), Arc::new(StaticPrompt), None)
            .unwrap_err();
        assert!(matches!(
            err,
            McpError::Registry(RegistryError::Duplicate { .. })
        ));
    }

    #[test]
    fn test_listing_order_and_unregister() {
        let registry = PromptRegistry::new();
        for name in ["one", "two", "three"] {
            registry
                .register(Prompt::new(name), Arc::new(StaticPrompt), None)
                .unwrap();
        }
        registry.unregister("two");

        let listing = registry.list(None).unwrap();
        let names: Vec<_> = listing.prompts.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["one", "three"]);
    }
}
