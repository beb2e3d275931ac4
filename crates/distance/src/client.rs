//! Distance matrix client implementation

use crate::config::{ClientConfig, MASKED_KEY};
use crate::error::{ApiError, ApiResult};
use crate::response::parse_body;
use gosend_core::retry::{CircuitBreaker, CircuitState};
use gosend_rates::distance::{
    DistanceRequest, DistanceResult, Location, RouteCandidate, RouteOptions, choose_route,
};
use gosend_rates::{Coordinate, DistanceError};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, Response};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Request correlation ID header
const X_REQUEST_ID: &str = "X-Request-ID";

/// Origin used when checking an API key
pub const DEFAULT_LAT: f64 = -6.174_773_738_034_97;
/// Origin used when checking an API key
pub const DEFAULT_LNG: f64 = 106.827_174_257_672_13;
/// Destination used when checking an API key
pub const TEST_LAT: f64 = -6.181_472_315_327_319;
/// Destination used when checking an API key
pub const TEST_LNG: f64 = 106.817_046_236_431_9;

/// Query parameters for one request, in send order.
pub type QueryParams = Vec<(&'static str, String)>;

/// Distance Matrix client with built-in resilience patterns
///
/// This client wraps `reqwest` and adds:
/// - Automatic retry with exponential backoff
/// - Circuit breaker to prevent cascading failures
/// - Request correlation IDs for tracing
#[derive(Clone)]
pub struct DistanceMatrixClient {
    inner: Client,
    config: Arc<ClientConfig>,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl DistanceMatrixClient {
    /// Create a new client with specific configuration
    pub fn with_config(config: ClientConfig) -> ApiResult<Self> {
        config.validate()?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        default_headers.insert(USER_AGENT, HeaderValue::from_static("gosend-distance/1.4"));

        let inner = Client::builder()
            .timeout(config.timeout)
            .default_headers(default_headers)
            .build()
            .map_err(ApiError::Request)?;

        let circuit_breaker = Arc::new(CircuitBreaker::new(config.circuit_breaker.clone()));

        Ok(Self {
            inner,
            config: Arc::new(config),
            circuit_breaker,
        })
    }

    /// Get the current configuration
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get circuit breaker state
    #[must_use]
    pub fn circuit_state(&self) -> CircuitState {
        self.circuit_breaker.state()
    }

    /// Reset the circuit breaker
    pub fn reset_circuit(&self) {
        self.circuit_breaker.reset();
    }

    /// Query parameters for `request`, including the API key.
    #[must_use]
    pub fn query_params(&self, request: &DistanceRequest) -> QueryParams {
        let options = &request.options;
        let mut params = vec![
            ("origins", request.origin.to_string()),
            ("destinations", request.destination.to_string()),
            ("key", self.config.api_key.clone()),
            ("mode", options.travel_mode.as_str().to_string()),
            ("units", options.units.as_str().to_string()),
            ("language", options.language.clone()),
        ];
        if !options.avoid.as_str().is_empty() {
            params.push(("avoid", options.avoid.as_str().to_string()));
        }
        params
    }

    /// Candidate routes for `request`
    #[instrument(skip(self, request), fields(request_id))]
    pub async fn routes(&self, request: &DistanceRequest) -> ApiResult<Vec<RouteCandidate>> {
        let request_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("request_id", request_id.as_str());

        let params = self.query_params(request);
        let masked = mask_key(&params);
        if self.config.debug {
            info!(request_id = %request_id, params = ?masked, "Distance matrix request");
        } else {
            debug!(request_id = %request_id, params = ?masked, "Distance matrix request");
        }

        if !self.circuit_breaker.can_execute() {
            warn!(
                request_id = %request_id,
                "Circuit breaker is open, rejecting request"
            );
            return Err(ApiError::CircuitOpen);
        }

        self.execute_with_retry(&request_id, &params).await
    }

    /// Look up, choose and convert in one step
    pub async fn distance(&self, request: &DistanceRequest) -> ApiResult<DistanceResult> {
        let routes = self.routes(request).await?;
        let route = choose_route(&routes, request.options.preferred_route)
            .ok_or(ApiError::Distance(DistanceError::NoResults))?;
        Ok(DistanceResult::from_route(route, &request.options))
    }

    /// Check the API key with a short fixed route in central Jakarta
    pub async fn check_key(&self, options: &RouteOptions) -> ApiResult<DistanceResult> {
        let request = DistanceRequest {
            origin: Location::Coordinates(Coordinate::new(DEFAULT_LAT, DEFAULT_LNG)),
            destination: Location::Coordinates(Coordinate::new(TEST_LAT, TEST_LNG)),
            options: options.clone(),
        };
        self.distance(&request).await
    }

    /// Execute request with retry logic
    async fn execute_with_retry(
        &self,
        request_id: &str,
        params: &QueryParams,
    ) -> ApiResult<Vec<RouteCandidate>> {
        let retry_config = &self.config.retry;
        let mut last_error: Option<ApiError> = None;

        for attempt in 0..retry_config.max_attempts {
            // Wait before retry (except first attempt)
            if attempt > 0 {
                let delay = retry_config.delay_for_attempt(attempt);
                debug!(
                    request_id = %request_id,
                    attempt = attempt,
                    delay_ms = delay.as_millis(),
                    "Retrying after delay"
                );
                tokio::time::sleep(delay).await;
            }

            let start = Instant::now();
            let result = self.execute_single_request(request_id, params).await;
            let elapsed = start.elapsed();

            match result {
                Ok(routes) => {
                    self.circuit_breaker.record_success();
                    debug!(
                        request_id = %request_id,
                        attempt = attempt + 1,
                        elapsed_ms = elapsed.as_millis(),
                        routes = routes.len(),
                        "Request succeeded"
                    );
                    return Ok(routes);
                }
                Err(e) => {
                    // only transient failures count against the breaker
                    if e.is_retryable() {
                        self.circuit_breaker.record_failure();
                    } else {
                        self.circuit_breaker.record_success();
                    }

                    if e.is_retryable() && attempt + 1 < retry_config.max_attempts {
                        debug!(
                            request_id = %request_id,
                            attempt = attempt + 1,
                            error = %e,
                            "Request failed, will retry"
                        );
                        last_error = Some(e);
                    } else {
                        warn!(
                            request_id = %request_id,
                            attempt = attempt + 1,
                            error = %e,
                            "Request failed, not retrying"
                        );
                        return Err(e);
                    }
                }
            }
        }

        Err(ApiError::RetriesExhausted {
            attempts: retry_config.max_attempts,
            last_error: last_error.map_or_else(|| "Unknown error".to_string(), |e| e.to_string()),
        })
    }

    /// Execute a single request without retry
    async fn execute_single_request(
        &self,
        request_id: &str,
        params: &QueryParams,
    ) -> ApiResult<Vec<RouteCandidate>> {
        let response = self
            .inner
            .get(&self.config.api_url)
            .query(params)
            .header(X_REQUEST_ID, request_id)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Handle HTTP response and parse the body
    async fn handle_response(&self, response: Response) -> ApiResult<Vec<RouteCandidate>> {
        let status = response.status();

        if status.is_success() {
            let body = response.text().await?;
            parse_body(&body)
        } else {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(ApiError::api_response(status.as_u16(), message))
        }
    }
}

/// Copy of `params` with the API key replaced by asterisks.
#[must_use]
pub fn mask_key(params: &QueryParams) -> QueryParams {
    params
        .iter()
        .map(|(name, value)| {
            if *name == "key" {
                (*name, MASKED_KEY.to_string())
            } else {
                (*name, value.clone())
            }
        })
        .collect()
}
