//! Tool table: insertion-ordered, name-keyed.

use crate::handlers::ToolHandler;
use crate::registry::validate_primitive_name;
use mcpkit_core::error::{McpError, McpResult, RegistryError};
use mcpkit_core::types::{ListToolsResponse, Tool};
use mcpkit_core::utils::pagination::{paginate, DEFAULT_PAGE_SIZE};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// A tool definition bound to its handler.
pub struct ToolRegistration {
    pub tool: Tool,
    pub handler: Arc<dyn ToolHandler>,
}

#[derive(Default)]
struct ToolTable {
    /// Registration order, the `tools/list` ordering.
    order: Vec<String>,
    by_name: HashMap<String, Arc<ToolRegistration>>,
}

/// Registry behind `tools/list` and `tools/call`.
pub struct ToolRegistry {
    table: RwLock<ToolTable>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(ToolTable::default()),
        }
    }

    /// Register a tool. Names must match the naming rule and be unique.
    pub fn register(&self, tool: Tool, handler: Arc<dyn ToolHandler>) -> McpResult<()> {
        validate_primitive_name("tool", &tool.name)?;
        let mut table = self.table.write().expect("tool registry lock poisoned");
        if table.by_name.contains_key(&tool.name) {
            return Err(McpError::Registry(RegistryError::Duplicate {
                kind: "tool",
                name: tool.name.clone(),
            }));
        }
        let name = tool.name.clone();
        table.order.push(name.clone());
        table
            .by_name
            .insert(name, Arc::new(ToolRegistration { tool, handler }));
        Ok(())
    }

    /// Remove a tool by name; true when something was removed.
    pub fn unregister(&self, name: &str) -> bool {
        let mut table = self.table.write().expect("tool registry lock poisoned");
        if table.by_name.remove(name).is_some() {
            table.order.retain(|n| n != name);
            true
        } else {
            false
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<ToolRegistration>> {
        self.table
            .read()
            .expect("tool registry lock poisoned")
            .by_name
            .get(name)
            .cloned()
    }

    /// Page through tools in registration order.
    pub fn list(&self, cursor: Option<&str>) -> McpResult<ListToolsResponse> {
        let snapshot: Vec<Tool> = {
            let table = self.table.read().expect("tool registry lock poisoned");
            table
                .order
                .iter()
                .filter_map(|name| table.by_name.get(name))
                .map(|registration| registration.tool.clone())
                .collect()
        };
        let page = paginate(&snapshot, cursor, DEFAULT_PAGE_SIZE)
            .map_err(|_| McpError::invalid_params("unrecognized cursor"))?;
        Ok(ListToolsResponse {
            tools: page.items,
            next_cursor: page.next_cursor,
        })
    }

    pub fn len(&self) -> usize {
        self.table
            .read()
            .expect("tool registry lock poisoned")
            .order
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut table = self.table.write().expect("tool registry lock poisoned");
        table.order.clear();
        table.by_name.clear();
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry").field("len", &self.len()).finish()
    }
}
