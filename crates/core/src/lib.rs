//! Core utilities for the GoSend shipping rate tools
//!
//! This crate provides the shared plumbing used by the rate engine, the
//! distance matrix client and the CLI:
//!
//! - **Error handling**: errors with codes, context and recovery suggestions
//! - **Configuration**: TOML discovery and loading
//! - **Caching**: TTL cache with an in-memory layer and an optional disk layer
//! - **Retry**: exponential backoff and a circuit breaker for flaky services
//! - **Validation**: fluent validator used when settings are loaded
//!
//! # Example
//!
//! ```rust,no_run
//! use gosend_core::cache::{Cache, CacheConfig};
//! use std::time::Duration;
//!
//! let cache = Cache::new(CacheConfig::memory_only()).expect("cache");
//! cache.set("distance:a|b", &12.5_f64, Some(Duration::from_secs(3600))).expect("set");
//! let hit: Option<f64> = cache.get("distance:a|b").expect("get");
//! assert_eq!(hit, Some(12.5));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod config;
pub mod error;
pub mod retry;
pub mod validation;

pub use error::{Error, ErrorCode, Result, ResultExt};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::cache::{Cache, CacheConfig};
    pub use crate::config::ConfigFile;
    pub use crate::error::{exit_codes, Error, ErrorCode, Result, ResultExt};
    pub use crate::retry::{CircuitBreaker, CircuitBreakerConfig, CircuitState, RetryConfig};
    pub use crate::validation::{ValidationResult, Validator};
}
