//! Cache-backed resource provider.
//!
//! `ResourceStore` wraps the core LRU store under one lock and speaks the
//! [`ResourceProvider`] contract: hits come back with `cached: true`, misses
//! as `None`, and listing enumerates cached entry metadata ordered by URI.

use crate::context::RequestContext;
use crate::handlers::ResourceProvider;
use async_trait::async_trait;
use mcpkit_core::cache::{LruStats, LruStore};
use mcpkit_core::error::McpResult;
use mcpkit_core::types::{ResourceHit, ResourceMetadata};
use mcpkit_core::utils::pagination::{paginate, DEFAULT_PAGE_SIZE};
use mcpkit_core::utils::Uri;
use mcpkit_core::McpError;
use serde_json::Value;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Clone)]
struct CachedEntry {
    data: Value,
    metadata: ResourceMetadata,
}

/// LRU-backed resource content store.
pub struct ResourceStore {
    cache: Mutex<LruStore<String, CachedEntry>>,
}

impl ResourceStore {
    pub fn new(max_items: NonZeroUsize) -> Self {
        Self {
            cache: Mutex::new(LruStore::new(max_items)),
        }
    }

    /// Rebuild with a default TTL for inserted entries.
    pub fn with_default_ttl(self, ttl: Duration) -> Self {
        let store = self.cache.into_inner().expect("resource store lock poisoned");
        Self {
            cache: Mutex::new(store.with_default_ttl(ttl)),
        }
    }

    /// Rebuild with statistics collection enabled.
    pub fn with_stats(self) -> Self {
        let store = self.cache.into_inner().expect("resource store lock poisoned");
        Self {
            cache: Mutex::new(store.with_stats()),
        }
    }

    /// Cache content for a URI. Metadata defaults to just the URI.
    pub fn insert(
        &self,
        uri: impl Into<String>,
        data: Value,
        metadata: Option<ResourceMetadata>,
        ttl: Option<Duration>,
    ) {
        let uri = uri.into();
        let metadata = metadata.unwrap_or_else(|| ResourceMetadata::new(uri.clone()));
        self.cache
            .lock()
            .expect("resource store lock poisoned")
            .set(uri, CachedEntry { data, metadata }, ttl);
    }

    pub fn remove(&self, uri: &str) -> bool {
        self.cache
            .lock()
            .expect("resource store lock poisoned")
            .remove(&uri.to_string())
            .is_some()
    }

    pub fn clear(&self) {
        self.cache
            .lock()
            .expect("resource store lock poisoned")
            .clear();
    }

    pub fn len(&self) -> usize {
        self.cache.lock().expect("resource store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> Option<LruStats> {
        self.cache
            .lock()
            .expect("resource store lock poisoned")
            .stats()
    }
}

#[async_trait]
impl ResourceProvider for ResourceStore {
    async fn get(&self, uri: &Uri, _ctx: &mut RequestContext) -> McpResult<Option<ResourceHit>> {
        let mut cache = self.cache.lock().expect("resource store lock poisoned");
        Ok(cache.get(&uri.as_str().to_string()).cloned().map(|entry| {
            ResourceHit {
                data: entry.data,
                metadata: entry.metadata,
                cached: true,
            }
        }))
    }

    async fn list(
        &self,
        cursor: Option<String>,
        _ctx: &mut RequestContext,
    ) -> McpResult<(Vec<ResourceMetadata>, Option<String>)> {
        let mut snapshot: Vec<ResourceMetadata> = {
            let mut cache = self.cache.lock().expect("resource store lock poisoned");
            cache
                .values()
                .into_iter()
                .map(|entry| entry.metadata.clone())
                .collect()
        };
        snapshot.sort_by(|a, b| a.uri.cmp(&b.uri));

        let page = paginate(&snapshot, cursor.as_deref(), DEFAULT_PAGE_SIZE)
            .map_err(|_| McpError::invalid_params("unrecognized cursor"))?;
        Ok((page.items, page.next_cursor))
    }
}
