// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! Cache adapter
//!
//! Optional write-through event cache. `store` is called fire-and-forget
//! on every dispatched event; `query` pre-populates subscriptions before
//! relays answer.

use core::fmt;

use async_trait::async_trait;
use nostrkit::{Event, Filter};

/// Opaque cache backend error
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct CacheError(Box<dyn std::error::Error + Send + Sync>);

impl CacheError {
    /// Wrap a backend error
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self(Box::new(error))
    }
}

/// Event cache seam
#[async_trait]
pub trait CacheAdapter: fmt::Debug + Send + Sync {
    /// Store an event
    async fn store(&self, event: &Event) -> Result<(), CacheError>;

    /// Query events matching any of the filters
    async fn query(&self, filters: &[Filter]) -> Result<Vec<Event>, CacheError>;
}
