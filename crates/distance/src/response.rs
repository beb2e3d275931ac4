//! Distance Matrix response body

use crate::error::{ApiError, ApiResult};
use gosend_rates::distance::RouteCandidate;
use gosend_rates::DistanceError;
use serde::Deserialize;

/// Top-level response
#[derive(Debug, Clone, Deserialize)]
pub struct MatrixResponse {
    /// `OK` or a request-level error such as `REQUEST_DENIED`
    #[serde(default)]
    pub status: String,
    /// Explanation for a request-level error
    #[serde(default)]
    pub error_message: Option<String>,
    /// One row per origin
    #[serde(default)]
    pub rows: Vec<MatrixRow>,
}

/// Results for one origin
#[derive(Debug, Clone, Deserialize)]
pub struct MatrixRow {
    /// One element per destination
    #[serde(default)]
    pub elements: Vec<MatrixElement>,
}

/// One origin/destination pairing
#[derive(Debug, Clone, Deserialize)]
pub struct MatrixElement {
    /// `OK`, `NOT_FOUND`, `ZERO_RESULTS` or `MAX_ROUTE_LENGTH_EXCEEDED`
    #[serde(default)]
    pub status: String,
    /// Metres
    pub distance: Option<TextValue>,
    /// Seconds
    pub duration: Option<TextValue>,
}

/// A value with its formatted text
#[derive(Debug, Clone, Deserialize)]
pub struct TextValue {
    /// Formatted text
    #[serde(default)]
    pub text: String,
    /// Raw value
    pub value: f64,
}

impl MatrixResponse {
    /// Successful elements as route candidates.
    ///
    /// With no successful element, the first element status with a known
    /// meaning decides the error.
    pub fn into_routes(self) -> Result<Vec<RouteCandidate>, DistanceError> {
        if self.status != "OK" {
            let message = match self.error_message.filter(|m| !m.is_empty()) {
                Some(detail) => format!("{} - {detail}", self.status),
                None => self.status,
            };
            return Err(DistanceError::Api(message));
        }

        let mut errors = Vec::new();
        let mut routes = Vec::new();

        for element in self.rows.into_iter().flat_map(|row| row.elements) {
            match (element.status.as_str(), element.distance, element.duration) {
                ("OK", Some(distance), Some(duration)) => routes.push(RouteCandidate {
                    distance_meters: distance.value,
                    distance_text: distance.text,
                    duration_seconds: duration.value,
                    duration_text: duration.text,
                }),
                (status, ..) => errors.push(status.to_string()),
            }
        }

        if !routes.is_empty() {
            return Ok(routes);
        }

        Err(errors
            .iter()
            .find_map(|status| DistanceError::from_element_status(status))
            .unwrap_or(DistanceError::NoResults))
    }
}

/// Parse a raw response body.
pub fn parse_body(body: &str) -> ApiResult<Vec<RouteCandidate>> {
    if body.trim().is_empty() {
        return Err(ApiError::Distance(DistanceError::Api(
            "API response is empty".to_string(),
        )));
    }

    let response: MatrixResponse = serde_json::from_str(body)?;
    Ok(response.into_routes()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_ROUTES: &str = r#"{
        "destination_addresses": ["Jl. Thamrin, Jakarta"],
        "origin_addresses": ["Monas, Jakarta"],
        "rows": [{
            "elements": [
                {"status": "OK", "distance": {"text": "3.2 km", "value": 3215}, "duration": {"text": "11 mins", "value": 660}},
                {"status": "ZERO_RESULTS"},
                {"status": "OK", "distance": {"text": "2.9 km", "value": 2890}, "duration": {"text": "14 mins", "value": 840}}
            ]
        }],
        "status": "OK"
    }"#;

    #[test]
    fn test_ok_elements_become_routes() {
        let routes = parse_body(TWO_ROUTES).unwrap();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].distance_meters, 3215.0);
        assert_eq!(routes[0].duration_text, "11 mins");
        assert_eq!(routes[1].distance_text, "2.9 km");
    }

    #[test]
    fn test_request_level_error() {
        let body = r#"{"status": "REQUEST_DENIED", "error_message": "The provided API key is invalid.", "rows": []}"#;
        let err = parse_body(body).unwrap_err();
        assert_eq!(
            err.to_string(),
            "API response error: REQUEST_DENIED - The provided API key is invalid."
        );
    }

    #[test]
    fn test_first_known_element_status_wins() {
        let body = r#"{"status": "OK", "rows": [{"elements": [
            {"status": "SOMETHING_NEW"},
            {"status": "MAX_ROUTE_LENGTH_EXCEEDED"},
            {"status": "NOT_FOUND"}
        ]}]}"#;
        assert!(matches!(
            parse_body(body),
            Err(ApiError::Distance(DistanceError::MaxRouteLengthExceeded))
        ));
    }

    #[test]
    fn test_no_results() {
        let body = r#"{"status": "OK", "rows": []}"#;
        assert!(matches!(
            parse_body(body),
            Err(ApiError::Distance(DistanceError::NoResults))
        ));
    }

    #[test]
    fn test_empty_and_malformed_bodies() {
        assert!(matches!(
            parse_body("  "),
            Err(ApiError::Distance(DistanceError::Api(m))) if m.contains("empty")
        ));
        assert!(matches!(parse_body("<html>"), Err(ApiError::Json(_))));
    }
}
