//! Google Distance Matrix client for the GoSend rate engine
//!
//! This crate provides a resilient HTTP client for the Distance Matrix API
//! and a blocking adapter that plugs into
//! [`gosend_rates::distance::DistanceProvider`].
//!
//! # Features
//!
//! - **Settings configuration**: built from the `[api]` section
//! - **Retry with exponential backoff**: Automatic retry for transient failures
//! - **Circuit breaker**: Stop calling the API during outages
//! - **Request correlation**: Track requests with unique IDs for debugging
//! - **Key masking**: The API key never reaches the logs
//!
//! # Example
//!
//! ```rust,no_run
//! use gosend_distance::{BlockingClient, ClientConfig};
//! use gosend_rates::distance::{DistanceProvider, DistanceRequest, Location, RouteOptions};
//!
//! let client = BlockingClient::new(ClientConfig::default().with_api_key("AIza..."))?;
//! let request = DistanceRequest {
//!     origin: Location::parse("-6.1747,106.8271"),
//!     destination: Location::Address("Jl. Thamrin 10, Jakarta, ID".into()),
//!     options: RouteOptions::default(),
//! };
//! let result = client.distance(&request)?;
//! println!("{} ({})", result.distance_text, result.duration_text);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod blocking;
pub mod client;
pub mod config;
pub mod error;
pub mod response;

pub use blocking::BlockingClient;
pub use client::DistanceMatrixClient;
pub use config::ClientConfig;
pub use error::{ApiError, ApiResult};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::blocking::BlockingClient;
    pub use crate::client::DistanceMatrixClient;
    pub use crate::config::ClientConfig;
    pub use crate::error::{ApiError, ApiResult};
}
