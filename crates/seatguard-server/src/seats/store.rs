//! Session storage backends.
//!
//! A backend stores one encoded `SessionSet` per license key and replaces it
//! wholesale on `store`, which is what makes a per-key rewrite all-or-nothing.
//! Serialization of concurrent rewrites is the table's job, not the store's.

use async_trait::async_trait;
use dashmap::DashMap;

use seatguard_core::error::Result;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Encoded set for `key`, or `None` when nothing is stored.
    async fn load(&self, key: &str) -> Result<Option<String>>;
    /// Atomically replace the encoded set for `key`.
    async fn store(&self, key: &str, encoded: String) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
    /// Every key that currently has a stored set.
    async fn keys(&self) -> Result<Vec<String>>;
}

/// In-process backend.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sets: DashMap<String, String>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self { sets: DashMap::new() }
    }

    /// Raw access for seeding and inspection.
    pub fn insert_raw(&self, key: impl Into<String>, encoded: impl Into<String>) {
        self.sets.insert(key.into(), encoded.into());
    }

    pub fn get_raw(&self, key: &str) -> Option<String> {
        self.sets.get(key).map(|r| r.value().clone())
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get_raw(key))
    }

    async fn store(&self, key: &str, encoded: String) -> Result<()> {
        self.sets.insert(key.to_owned(), encoded);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.sets.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.sets.iter().map(|e| e.key().clone()).collect())
    }
}
