//! Synchronous adapter for the rate engine's `DistanceProvider` boundary

use crate::client::DistanceMatrixClient;
use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};
use gosend_rates::distance::{
    DistanceProvider, DistanceRequest, DistanceResult, RouteCandidate, RouteOptions,
};
use gosend_rates::DistanceError;
use tokio::runtime::{Builder, Runtime};

/// Blocking distance matrix client.
///
/// Owns a small multi-threaded runtime, so it must not be called from
/// inside another tokio runtime.
pub struct BlockingClient {
    client: DistanceMatrixClient,
    runtime: Runtime,
}

impl std::fmt::Debug for BlockingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingClient")
            .field("config", self.client.config())
            .finish_non_exhaustive()
    }
}

impl BlockingClient {
    /// Create a blocking client
    pub fn new(config: ClientConfig) -> ApiResult<Self> {
        let client = DistanceMatrixClient::with_config(config)?;
        let runtime = Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("gosend-distance")
            .enable_all()
            .build()
            .map_err(|e| ApiError::config(format!("failed to start async runtime: {e}")))?;

        Ok(Self { client, runtime })
    }

    /// The async client underneath
    #[must_use]
    pub fn client(&self) -> &DistanceMatrixClient {
        &self.client
    }

    /// Check the API key with a fixed route
    pub fn check_key(&self, options: &RouteOptions) -> ApiResult<DistanceResult> {
        self.runtime.block_on(self.client.check_key(options))
    }
}

impl DistanceProvider for BlockingClient {
    fn routes(&self, request: &DistanceRequest) -> Result<Vec<RouteCandidate>, DistanceError> {
        self.runtime
            .block_on(self.client.routes(request))
            .map_err(DistanceError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gosend_core::retry::RetryConfig;
    use gosend_rates::distance::Location;

    #[test]
    fn test_blocking_provider_maps_errors() {
        let config = ClientConfig::default()
            .with_api_key("k")
            .with_api_url("http://127.0.0.1:9/json")
            .with_retry(RetryConfig::no_retry());
        let provider = BlockingClient::new(config).unwrap();

        let request = DistanceRequest {
            origin: Location::parse("-6.2,106.8"),
            destination: Location::Address("Jakarta".into()),
            options: RouteOptions::default(),
        };

        assert!(matches!(
            provider.distance(&request),
            Err(DistanceError::Unavailable(_))
        ));
    }

    #[test]
    fn test_requires_key() {
        assert!(BlockingClient::new(ClientConfig::default()).is_err());
    }
}
