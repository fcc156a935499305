//! Core aircraft types for tailroster.
//!
//! This module defines the lookup key ([`Identifier`]) and the normalized
//! result of one successful lookup ([`AircraftRecord`]).

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Image shown when a record has no usable photo.
pub const PLACEHOLDER_PHOTO_URL: &str = "https://via.placeholder.com/300x200";

/// Accepted shape for user-supplied registrations.
fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Z0-9][A-Z0-9-]{1,9}$").expect("identifier pattern is a valid regex")
    })
}

/// An opaque lookup key, such as an aircraft tail number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Create an identifier without validating it.
    ///
    /// Surrounding whitespace is trimmed and letters are uppercased.
    #[must_use]
    pub fn new(value: impl AsRef<str>) -> Self {
        Self(value.as_ref().trim().to_ascii_uppercase())
    }

    /// Parse and validate an identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentifier`] unless the normalized value is 2 to
    /// 10 characters of `A-Z`, `0-9` or `-`, starting with a letter or digit.
    pub fn parse(value: &str) -> Result<Self> {
        let identifier = Self::new(value);
        if identifier.0.is_empty() {
            return Err(Error::invalid_identifier(value, "identifier is empty"));
        }
        if !identifier_pattern().is_match(&identifier.0) {
            return Err(Error::invalid_identifier(
                value,
                "expected 2-10 characters of A-Z, 0-9 or '-'",
            ));
        }
        Ok(identifier)
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Identifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The normalized result of one successful lookup.
///
/// Records are immutable once built. `id` is generated per record and exists
/// only to give consumers a stable list identity distinct from `identifier`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AircraftRecord {
    /// Generated unique id for list identity.
    pub id: Uuid,

    /// The registration / tail number.
    pub identifier: Identifier,

    /// Aircraft type, e.g. "A320 214".
    pub aircraft_type: String,

    /// Aircraft manufacturer.
    pub manufacturer: String,

    /// Registered owner.
    pub registered_owner: String,

    /// Country of the registered owner.
    pub owner_country: String,

    /// Photo thumbnail URL as returned upstream (may be absent or invalid).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,

    /// When this record was built.
    pub fetched_at: DateTime<Utc>,
}

impl AircraftRecord {
    /// Create a new record with a fresh id, stamped now.
    #[must_use]
    pub fn new(
        identifier: Identifier,
        aircraft_type: impl Into<String>,
        manufacturer: impl Into<String>,
        registered_owner: impl Into<String>,
        owner_country: impl Into<String>,
        photo_url: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            identifier,
            aircraft_type: aircraft_type.into(),
            manufacturer: manufacturer.into(),
            registered_owner: registered_owner.into(),
            owner_country: owner_country.into(),
            photo_url,
            fetched_at: Utc::now(),
        }
    }

    /// Get the photo URL if it looks usable.
    #[must_use]
    pub fn photo_url(&self) -> Option<&str> {
        self.photo_url
            .as_deref()
            .filter(|url| url.starts_with("http"))
    }

    /// Get the photo URL, or the placeholder image when none is usable.
    #[must_use]
    pub fn display_photo_url(&self) -> &str {
        self.photo_url().unwrap_or(PLACEHOLDER_PHOTO_URL)
    }
}
