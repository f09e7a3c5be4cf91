//! Provider-neutral remote parameter store abstraction.
//!
//! # Architecture
//!
//! ```text
//!  CachedResolver ──► ReleaseCache (fresh?) ──► Arc<dyn ParameterStore>
//!                                                      │
//!                                       ┌──────────────┴──────────────┐
//!                                       ▼                             ▼
//!                             MemoryParameterStore            SsmParameterStore
//!                               (axum adapter)                 (lambda adapter)
//! ```
//!
//! The router only ever reads a single named parameter. Stores are read-only
//! from the router's point of view; there is no write path.
//!
//! # Consistency Model
//!
//! Each process keeps its own cached copy of the parameter, so different edge
//! locations may serve different defaults until each one refreshes.

use std::sync::Arc;

use async_trait::async_trait;

/// Name of the parameter holding the default release.
pub const DEFAULT_PARAMETER_NAME: &str = "targetRelease";

/// Errors returned by parameter store lookups.
#[derive(Debug, thiserror::Error)]
pub enum ParameterError {
    /// The parameter does not exist or has no value.
    #[error("parameter not found: {name}")]
    NotFound { name: String },

    /// The store could not be reached.
    #[error("parameter store unavailable")]
    Unavailable,

    /// Any other backend failure.
    #[error("parameter store error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Object-safe interface for parameter store backends.
///
/// Implementations handle their own concurrency; the router shares one
/// instance across all invocations in a process.
#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Read the current value of `name`.
    async fn get_parameter(&self, name: &str) -> Result<String, ParameterError>;
}

#[async_trait]
impl<T> ParameterStore for Arc<T>
where
    T: ParameterStore + ?Sized,
{
    async fn get_parameter(&self, name: &str) -> Result<String, ParameterError> {
        (**self).get_parameter(name).await
    }
}

/// Generate a suite of contract tests for any [`ParameterStore`] implementation.
///
/// The factory receives the parameters to seed as owned `(name, value)` pairs
/// and returns a store exposing them.
///
/// # Example
///
/// ```rust,ignore
/// release_router_core::parameter_store_contract_tests!(memory_contract, |seed| {
///     MemoryParameterStore::from_pairs(seed)
/// });
/// ```
#[macro_export]
macro_rules! parameter_store_contract_tests {
    ($mod_name:ident, $factory:expr) => {
        mod $mod_name {
            use super::*;
            use $crate::parameter::{ParameterError, ParameterStore};

            fn run<F: std::future::Future>(f: F) -> F::Output {
                futures::executor::block_on(f)
            }

            fn seeded(pairs: &[(&str, &str)]) -> impl ParameterStore {
                let owned: Vec<(String, String)> = pairs
                    .iter()
                    .map(|(name, value)| (name.to_string(), value.to_string()))
                    .collect();
                ($factory)(owned)
            }

            #[test]
            fn contract_get_existing() {
                let store = seeded(&[("targetRelease", "1.2.3")]);
                run(async {
                    assert_eq!(store.get_parameter("targetRelease").await.unwrap(), "1.2.3");
                });
            }

            #[test]
            fn contract_get_missing_is_not_found() {
                let store = seeded(&[]);
                run(async {
                    let err = store.get_parameter("targetRelease").await.unwrap_err();
                    match err {
                        ParameterError::NotFound { name } => assert_eq!(name, "targetRelease"),
                        other => panic!("expected NotFound, got {other:?}"),
                    }
                });
            }

            #[test]
            fn contract_names_are_independent() {
                let store = seeded(&[("targetRelease", "1.0.0"), ("canaryRelease", "2.0.0")]);
                run(async {
                    assert_eq!(store.get_parameter("targetRelease").await.unwrap(), "1.0.0");
                    assert_eq!(store.get_parameter("canaryRelease").await.unwrap(), "2.0.0");
                });
            }

            #[test]
            fn contract_repeated_reads_are_stable() {
                let store = seeded(&[("targetRelease", "4.5.6")]);
                run(async {
                    for _ in 0..3 {
                        assert_eq!(store.get_parameter("targetRelease").await.unwrap(), "4.5.6");
                    }
                });
            }
        }
    };
}
