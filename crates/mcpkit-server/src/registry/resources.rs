//! Resource table: pattern-keyed, with URI matching and subscriptions.
//!
//! Lookup selects among patterns whose scheme matches exactly: an exact path
//! match wins, then the longest literal prefix, then the earliest
//! registration. `resources/list` orders by pattern string, lexicographic.

use crate::handlers::{ResourceProvider, UriValidator};
use mcpkit_core::error::{McpError, McpResult, RegistryError};
use mcpkit_core::types::{ListResourcesResponse, Resource};
use mcpkit_core::utils::pagination::{paginate, DEFAULT_PAGE_SIZE};
use mcpkit_core::utils::{select_pattern, Uri, UriPattern};
use std::collections::HashSet;
use std::sync::{Arc, RwLock};

/// A resource definition bound to its compiled pattern, provider, and
/// optional URI validator.
pub struct ResourceRegistration {
    pub resource: Resource,
    pub pattern: UriPattern,
    pub provider: Arc<dyn ResourceProvider>,
    pub validator: Option<Arc<dyn UriValidator>>,
}

#[derive(Default)]
struct ResourceTable {
    /// Registration order; the matcher's tie-break.
    entries: Vec<Arc<ResourceRegistration>>,
    subscriptions: HashSet<String>,
}

/// Registry behind `resources/list`, `resources/read`, and
/// `resources/subscribe`.
pub struct ResourceRegistry {
    table: RwLock<ResourceTable>,
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(ResourceTable::default()),
        }
    }

    /// Register a resource pattern. The pattern string must compile and be
    /// unique.
    pub fn register(
        &self,
        resource: Resource,
        provider: Arc<dyn ResourceProvider>,
        validator: Option<Arc<dyn UriValidator>>,
    ) -> McpResult<()> {
        let pattern = UriPattern::compile(&resource.uri_pattern)?;
        let mut table = self.table.write().expect("resource registry lock poisoned");
        if table
            .entries
            .iter()
            .any(|entry| entry.resource.uri_pattern == resource.uri_pattern)
        {
            return Err(McpError::Registry(RegistryError::Duplicate {
                kind: "resource",
                name: resource.uri_pattern.clone(),
            }));
        }
        table.entries.push(Arc::new(ResourceRegistration {
            resource,
            pattern,
            provider,
            validator,
        }));
        Ok(())
    }

    /// Remove a resource by its pattern string; true when removed.
    pub fn unregister(&self, uri_pattern: &str) -> bool {
        let mut table = self.table.write().expect("resource registry lock poisoned");
        let before = table.entries.len();
        table
            .entries
            .retain(|entry| entry.resource.uri_pattern != uri_pattern);
        table.entries.len() != before
    }

    /// Resolve the registration answering for `uri`.
    pub fn lookup(&self, uri: &Uri) -> Option<Arc<ResourceRegistration>> {
        let table = self.table.read().expect("resource registry lock poisoned");
        select_pattern(
            table
                .entries
                .iter()
                .map(|entry| (&entry.pattern, entry.clone())),
            uri,
        )
    }

    /// Page through resources ordered by pattern string.
    pub fn list(&self, cursor: Option<&str>) -> McpResult<ListResourcesResponse> {
        let mut snapshot: Vec<Resource> = {
            let table = self.table.read().expect("resource registry lock poisoned");
            table
                .entries
                .iter()
                .map(|entry| entry.resource.clone())
                .collect()
        };
        snapshot.sort_by(|a, b| a.uri_pattern.cmp(&b.uri_pattern));

        let page = paginate(&snapshot, cursor, DEFAULT_PAGE_SIZE)
            .map_err(|_| McpError::invalid_params("unrecognized cursor"))?;
        Ok(ListResourcesResponse {
            resources: page.items,
            next_cursor: page.next_cursor,
        })
    }

    /// Record a subscription for a URI that matches some registration.
    pub fn subscribe(&self, uri: &Uri) -> McpResult<()> {
        if self.lookup(uri).is_none() {
            return Err(McpError::invalid_params(format!(
                "no resource matches URI '{uri}'"
            )));
        }
        let mut table = self.table.write().expect("resource registry lock poisoned");
        table.subscriptions.insert(uri.as_str().to_string());
        Ok(())
    }

    pub fn is_subscribed(&self, uri: &Uri) -> bool {
        self.table
            .read()
            .expect("resource registry lock poisoned")
            .subscriptions
            .contains(uri.as_str())
    }

    pub fn len(&self) -> usize {
        self.table
            .read()
            .expect("resource registry lock poisoned")
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut table = self.table.write().expect("resource registry lock poisoned");
        table.entries.clear();
        table.subscriptions.clear();
    }
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("len", &self.len())
            .finish()
    }
}
