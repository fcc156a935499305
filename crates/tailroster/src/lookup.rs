//! Single-registration lookup.
//!
//! [`AircraftLookup`] is the seam the roster aggregator fans out over.
//! [`HttpLookup`] implements it against an adsbdb-compatible HTTP API:
//!
//! ```text
//! GET {base_url}/aircraft/{registration}
//!
//! { "response": { "aircraft": { "type": "...", "manufacturer": "...", ... } } }
//! ```
//!
//! Unknown registrations come back without an `aircraft` object (adsbdb sends
//! `"response": "unknown aircraft"`), which is reported as
//! [`FetchError::NoAircraft`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, trace};

use crate::aircraft::{AircraftRecord, Identifier};
use crate::config::Config;
use crate::error::{Error, Result};

/// Why one lookup produced no record.
///
/// These never escape the aggregator; they are logged and the identifier is
/// left out of the roster.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request could not be sent or the connection failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("unexpected status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// The body was not the expected JSON.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The response was well-formed but carried no aircraft.
    #[error("no aircraft in response")]
    NoAircraft,
}

/// Result of a single lookup.
pub type LookupResult = std::result::Result<AircraftRecord, FetchError>;

impl FetchError {
    /// Check if the upstream answered but had nothing to offer.
    #[must_use]
    pub fn is_no_aircraft(&self) -> bool {
        matches!(self, Self::NoAircraft)
    }
}

/// Resolves one identifier to an aircraft record.
#[async_trait]
pub trait AircraftLookup: Send + Sync {
    /// Look up a single identifier.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] when no record can be produced.
    async fn lookup(&self, identifier: &Identifier) -> LookupResult;
}

#[async_trait]
impl<T: AircraftLookup + ?Sized> AircraftLookup for Arc<T> {
    async fn lookup(&self, identifier: &Identifier) -> LookupResult {
        (**self).lookup(identifier).await
    }
}

/// Adapts an async closure into an [`AircraftLookup`].
pub struct LookupFn<F>(F);

/// Wrap an async function of one identifier as a lookup.
///
/// ```
/// use tailroster::lookup::{lookup_fn, FetchError};
/// use tailroster::AircraftRecord;
///
/// let offline = lookup_fn(|_id| async { Err::<AircraftRecord, _>(FetchError::NoAircraft) });
/// # let _ = offline;
/// ```
pub fn lookup_fn<F, Fut>(f: F) -> LookupFn<F>
where
    F: Fn(Identifier) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = LookupResult> + Send + 'static,
{
    LookupFn(f)
}

impl<F> std::fmt::Debug for LookupFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LookupFn").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut> AircraftLookup for LookupFn<F>
where
    F: Fn(Identifier) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = LookupResult> + Send + 'static,
{
    async fn lookup(&self, identifier: &Identifier) -> LookupResult {
        (self.0)(identifier.clone()).await
    }
}

/// Response envelope. `response` is an object for known aircraft and a bare
/// string otherwise.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    response: serde_json::Value,
}

/// The `response.aircraft` object. Every field is nullable upstream.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AircraftPayload {
    #[serde(rename = "type")]
    aircraft_type: Option<String>,
    manufacturer: Option<String>,
    registration: Option<String>,
    registered_owner: Option<String>,
    registered_owner_country_name: Option<String>,
    url_photo_thumbnail: Option<String>,
}

impl AircraftPayload {
    fn into_record(self, requested: &Identifier) -> AircraftRecord {
        let identifier = self
            .registration
            .filter(|r| !r.trim().is_empty())
            .map_or_else(|| requested.clone(), Identifier::new);

        AircraftRecord::new(
            identifier,
            self.aircraft_type.unwrap_or_default(),
            self.manufacturer.unwrap_or_default(),
            self.registered_owner.unwrap_or_default(),
            self.registered_owner_country_name.unwrap_or_default(),
            self.url_photo_thumbnail.filter(|u| !u.is_empty()),
        )
    }
}

/// Parse a lookup response body into a record.
///
/// # Errors
///
/// Returns [`FetchError::Malformed`] if the body is not JSON of the expected
/// shape, or [`FetchError::NoAircraft`] if it carries no aircraft object.
pub fn parse_response(requested: &Identifier, body: &[u8]) -> LookupResult {
    let envelope: Envelope =
        serde_json::from_slice(body).map_err(|e| FetchError::Malformed(e.to_string()))?;

    let aircraft = match envelope.response.get("aircraft") {
        Some(value) if value.is_object() => value.clone(),
        _ => return Err(FetchError::NoAircraft),
    };

    let payload: AircraftPayload =
        serde_json::from_value(aircraft).map_err(|e| FetchError::Malformed(e.to_string()))?;
    Ok(payload.into_record(requested))
}

/// Looks up registrations over HTTP.
#[derive(Debug, Clone)]
pub struct HttpLookup {
    http: Client,
    base_url: String,
    endpoint: Url,
}

impl HttpLookup {
    /// Create a lookup client against `base_url` with default timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigValidation`] if `base_url` is not a usable base
    /// URL, or [`Error::HttpClient`] if the client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::build(
            base_url.into(),
            Duration::from_secs(30),
            Duration::from_secs(10),
            None,
        )
    }

    /// Create a lookup client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigValidation`] if the base URL is not usable, or
    /// [`Error::HttpClient`] if the client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::build(
            config.lookup.base_url.clone(),
            config.request_timeout(),
            config.connect_timeout(),
            config.lookup.user_agent.clone(),
        )
    }

    fn build(
        base_url: String,
        timeout: Duration,
        connect_timeout: Duration,
        user_agent: Option<String>,
    ) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let endpoint = Url::parse(&base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| Error::ConfigValidation {
                message: format!("lookup base URL '{base_url}' is not a valid base URL"),
            })?;

        let user_agent = user_agent
            .unwrap_or_else(|| format!("tailroster/{}", env!("CARGO_PKG_VERSION")));

        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| Error::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            endpoint,
        })
    }

    /// Get the base URL (without trailing slash).
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the request URL for an identifier. The identifier is
    /// percent-encoded as a single path segment.
    #[must_use]
    pub fn url_for(&self, identifier: &Identifier) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push("aircraft")
                .push(identifier.as_str());
        }
        url
    }
}

#[async_trait]
impl AircraftLookup for HttpLookup {
    async fn lookup(&self, identifier: &Identifier) -> LookupResult {
        let url = self.url_for(identifier);
        trace!(url = %url, "Requesting aircraft");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            debug!(%identifier, status = status.as_u16(), "Lookup returned non-success status");
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        parse_response(identifier, &body)
    }
}
