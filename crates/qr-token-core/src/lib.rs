#![warn(missing_docs)]
//! # qr-token-core
//!
//! ## Purpose
//! Defines the pure data model shared across the `qr-token` workspace.
//!
//! ## Responsibilities
//! - Represent token requests, coordinates, and token-service responses.
//! - Own the closed set of user-facing token error messages.
//! - Validate identifiers and coordinate pairs before anything reaches the
//!   network.
//!
//! ## Data flow
//! Input collects raw strings -> [`TokenRequest::new`] validates them ->
//! client sends the request -> service JSON decodes into [`TokenResponse`] or
//! the failure is mapped into a [`TokenError`].
//!
//! ## Ownership and lifetimes
//! All values own their strings so requests can move into spawned tasks
//! without borrowing from the input surface.
//!
//! ## Error model
//! Local input problems are [`ValidationError`]. Remote problems are
//! [`TokenError`], which always carries a display-ready message.
//!
//! ## Example
//! ```rust
//! use qr_token_core::{Coordinates, TokenRequest};
//!
//! let coordinates = Coordinates::new(40.7, -74.0).expect("valid coordinates");
//! let request = TokenRequest::new("+15551234567", Some(coordinates)).expect("valid request");
//! assert_eq!(request.query_pairs().len(), 3);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message shown for HTTP 403.
pub const MESSAGE_ACCESS_DENIED: &str = "Access denied. Your ID may not exist or is blacklisted.";
/// Message shown for HTTP 404.
pub const MESSAGE_NOT_FOUND: &str = "Token service not found.";
/// Message shown for HTTP 429.
pub const MESSAGE_RATE_LIMITED: &str = "Too many requests. Please try again later.";
/// Message shown for HTTP 5xx.
pub const MESSAGE_SERVER_ERROR: &str = "Server error. Please try again later.";
/// Message shown when no response arrived or the status has no dedicated bucket.
pub const MESSAGE_FAILED_TO_RETRIEVE: &str = "Failed to retrieve token";
/// Message shown for any other failure.
pub const MESSAGE_UNKNOWN: &str = "Unknown error occurred";
/// Message shown when submit is attempted without an identifier.
pub const MESSAGE_MISSING_IDENTIFIER: &str = "Please enter a unique ID (e.g., phone number)";

/// Status used when a failure carries no HTTP status of its own.
pub const DEFAULT_FAILURE_STATUS: u16 = 500;

/// Query parameter carrying the identifier.
pub const QUERY_UNIQUE_ID: &str = "uniqueId";
/// Query parameter carrying latitude.
pub const QUERY_LATITUDE: &str = "latitude";
/// Query parameter carrying longitude.
pub const QUERY_LONGITUDE: &str = "longitude";

/// Geographic position. Latitude and longitude always travel together.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in degrees, `[-90, 90]`.
    pub latitude: f64,
    /// Longitude in degrees, `[-180, 180]`.
    pub longitude: f64,
}

impl Coordinates {
    /// Constructs validated coordinates.
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidCoordinate`] for non-finite or
    /// out-of-range values.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ValidationError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(ValidationError::InvalidCoordinate(format!(
                "latitude {latitude} is outside [-90, 90]"
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(ValidationError::InvalidCoordinate(format!(
                "longitude {longitude} is outside [-180, 180]"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Parses a pair of raw text fields.
    ///
    /// Both blank means "no coordinates". Exactly one blank is rejected.
    ///
    /// # Errors
    /// Returns [`ValidationError::IncompleteCoordinates`] when only one side is
    /// filled, or [`ValidationError::InvalidCoordinate`] when a side does not
    /// parse as a number in range.
    pub fn parse_pair(latitude: &str, longitude: &str) -> Result<Option<Self>, ValidationError> {
        let latitude = latitude.trim();
        let longitude = longitude.trim();
        match (latitude.is_empty(), longitude.is_empty()) {
            (true, true) => Ok(None),
            (false, false) => {
                let lat = parse_degrees("latitude", latitude)?;
                let lon = parse_degrees("longitude", longitude)?;
                Self::new(lat, lon).map(Some)
            }
            _ => Err(ValidationError::IncompleteCoordinates),
        }
    }
}

fn parse_degrees(field: &str, raw: &str) -> Result<f64, ValidationError> {
    raw.parse::<f64>()
        .map_err(|_| ValidationError::InvalidCoordinate(format!("{field} '{raw}' is not a number")))
}

/// Validated request for one token.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenRequest {
    identifier: String,
    coordinates: Option<Coordinates>,
}

impl TokenRequest {
    /// Builds a request. The identifier is sent exactly as given; only a
    /// blank one is rejected.
    ///
    /// # Errors
    /// Returns [`ValidationError::EmptyIdentifier`] for a blank identifier.
    pub fn new(
        identifier: impl Into<String>,
        coordinates: Option<Coordinates>,
    ) -> Result<Self, ValidationError> {
        let identifier = identifier.into();
        if identifier.trim().is_empty() {
            return Err(ValidationError::EmptyIdentifier);
        }
        Ok(Self {
            identifier,
            coordinates,
        })
    }

    /// Returns the identifier.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Returns the optional coordinate pair.
    pub fn coordinates(&self) -> Option<Coordinates> {
        self.coordinates
    }

    /// Returns the `getToken` query parameters in wire order.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![(QUERY_UNIQUE_ID, self.identifier.clone())];
        if let Some(coordinates) = self.coordinates {
            pairs.push((QUERY_LATITUDE, coordinates.latitude.to_string()));
            pairs.push((QUERY_LONGITUDE, coordinates.longitude.to_string()));
        }
        pairs
    }
}

/// Token payload returned by the token service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Opaque token encoded into the QR code.
    pub token: String,
    /// Absolute expiration instant in unix seconds.
    #[serde(rename = "expiration")]
    pub expires_at: i64,
}

impl TokenResponse {
    /// Decodes the service JSON body.
    ///
    /// # Errors
    /// Returns [`serde_json::Error`] when the body is not a token payload.
    pub fn from_json_bytes(raw: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(raw)
    }

    /// Encodes into the service JSON shape.
    ///
    /// # Errors
    /// Returns [`serde_json::Error`] if serialization fails.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Returns `true` when the token carries a usable payload.
    pub fn has_token(&self) -> bool {
        !self.token.trim().is_empty()
    }
}

/// Display-ready failure of a token request.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message} (status {status_code})")]
#[serde(rename_all = "camelCase")]
pub struct TokenError {
    /// HTTP status, or [`DEFAULT_FAILURE_STATUS`] when none applies.
    pub status_code: u16,
    /// Fixed human-readable message.
    pub message: String,
}

impl TokenError {
    /// Maps a non-success HTTP status onto its fixed message bucket.
    pub fn from_status(status_code: u16) -> Self {
        let message = match status_code {
            403 => MESSAGE_ACCESS_DENIED,
            404 => MESSAGE_NOT_FOUND,
            429 => MESSAGE_RATE_LIMITED,
            500.. => MESSAGE_SERVER_ERROR,
            _ => MESSAGE_FAILED_TO_RETRIEVE,
        };
        Self {
            status_code,
            message: message.to_string(),
        }
    }

    /// Failure where no response arrived (connect error, timeout).
    pub fn no_response() -> Self {
        Self {
            status_code: DEFAULT_FAILURE_STATUS,
            message: MESSAGE_FAILED_TO_RETRIEVE.to_string(),
        }
    }

    /// Failure that fits no other bucket.
    pub fn unknown() -> Self {
        Self {
            status_code: DEFAULT_FAILURE_STATUS,
            message: MESSAGE_UNKNOWN.to_string(),
        }
    }
}

/// Local input problems that never reach the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Identifier is missing or blank.
    #[error("{}", MESSAGE_MISSING_IDENTIFIER)]
    EmptyIdentifier,
    /// Only one of latitude/longitude was supplied.
    #[error("latitude and longitude must be provided together")]
    IncompleteCoordinates,
    /// A coordinate failed to parse or is out of range.
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(String),
}

#[cfg(test)]
mod tests {
    //! Unit tests for request validation and status mapping.

    use super::*;

    #[test]
    fn blank_identifier_is_rejected() {
        assert_eq!(
            TokenRequest::new("   ", None),
            Err(ValidationError::EmptyIdentifier)
        );
        assert_eq!(
            ValidationError::EmptyIdentifier.to_string(),
            MESSAGE_MISSING_IDENTIFIER
        );
    }

    #[test]
    fn coordinates_only_travel_as_a_pair() {
        assert_eq!(Coordinates::parse_pair("", " "), Ok(None));
        assert_eq!(
            Coordinates::parse_pair("12.5", ""),
            Err(ValidationError::IncompleteCoordinates)
        );
        assert!(matches!(
            Coordinates::parse_pair("abc", "1"),
            Err(ValidationError::InvalidCoordinate(_))
        ));
        assert!(Coordinates::new(91.0, 0.0).is_err());
        assert!(Coordinates::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn query_pairs_omit_coordinates_when_absent() {
        let request = TokenRequest::new("+15551234567", None).expect("valid request");
        assert_eq!(
            request.query_pairs(),
            vec![(QUERY_UNIQUE_ID, "+15551234567".to_string())]
        );
    }

    #[test]
    fn status_buckets_map_to_fixed_messages() {
        assert_eq!(TokenError::from_status(403).message, MESSAGE_ACCESS_DENIED);
        assert_eq!(TokenError::from_status(404).message, MESSAGE_NOT_FOUND);
        assert_eq!(TokenError::from_status(429).message, MESSAGE_RATE_LIMITED);
        assert_eq!(TokenError::from_status(500).message, MESSAGE_SERVER_ERROR);
        assert_eq!(TokenError::from_status(503).status_code, 503);
        assert_eq!(
            TokenError::from_status(400).message,
            MESSAGE_FAILED_TO_RETRIEVE
        );
    }
}
