//! In-memory parameter store for local development and testing.
//!
//! Values live in a `BTreeMap` behind a `std::sync::Mutex` and can be changed
//! while the dev server is running to exercise cache refreshes.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use release_router_core::parameter::{ParameterError, ParameterStore};

pub struct MemoryParameterStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryParameterStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            values: Mutex::new(BTreeMap::new()),
        }
    }

    /// Create a store seeded with `(name, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let values = pairs
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();
        Self {
            values: Mutex::new(values),
        }
    }

    /// Lock the inner map, converting a poisoned lock into `ParameterError`.
    fn lock_values(&self) -> Result<MutexGuard<'_, BTreeMap<String, String>>, ParameterError> {
        self.values
            .lock()
            .map_err(|_| ParameterError::Internal(anyhow::anyhow!("parameter store lock poisoned")))
    }

    pub fn set(&self, name: &str, value: &str) -> Result<(), ParameterError> {
        self.lock_values()?
            .insert(name.to_string(), value.to_string());
        Ok(())
    }
}

impl Default for MemoryParameterStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ParameterStore for MemoryParameterStore {
    async fn get_parameter(&self, name: &str) -> Result<String, ParameterError> {
        self.lock_values()?
            .get(name)
            .cloned()
            .ok_or_else(|| ParameterError::NotFound {
                name: name.to_string(),
            })
    }
}
