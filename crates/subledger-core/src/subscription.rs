//! Submission payloads and their normalization

use crate::error::IngestError;
use serde::{Deserialize, Serialize};
use subledger_store::NewSubscription;

/// Required fields, in validation order
pub const REQUIRED_FIELDS: [&str; 3] = ["name", "email", "source"];

/// Raw interest-form submission
///
/// Every field is optional at this stage; `null` and absence are the same
/// thing. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionPayload {
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Company
    #[serde(default)]
    pub company: Option<String>,
    /// Email, the identity key once normalized
    #[serde(default)]
    pub email: Option<String>,
    /// Acquisition source tag
    #[serde(default)]
    pub source: Option<String>,
}

impl SubscriptionPayload {
    /// Payload with the three required fields set
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            company: None,
            email: Some(email.into()),
            source: Some(source.into()),
        }
    }

    /// Set company
    #[must_use]
    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = Some(company.into());
        self
    }

    /// Parse a JSON request body
    ///
    /// # Errors
    /// `MalformedPayload` unless the body is a JSON object with string or
    /// null fields
    pub fn from_json(body: &str) -> Result<Self, IngestError> {
        serde_json::from_str(body).map_err(|e| IngestError::MalformedPayload(e.to_string()))
    }

    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "name" => self.name.as_deref(),
            "company" => self.company.as_deref(),
            "email" => self.email.as_deref(),
            "source" => self.source.as_deref(),
            _ => None,
        }
    }

    /// First required field that is absent or blank after trimming
    #[must_use]
    pub fn first_missing_field(&self) -> Option<&'static str> {
        REQUIRED_FIELDS
            .into_iter()
            .find(|field| self.field(field).map_or(true, |v| v.trim().is_empty()))
    }

    /// Validate and normalize into a row
    ///
    /// Trims every field, lower-cases the email and defaults company to "".
    ///
    /// # Errors
    /// `MissingField` naming the first of name, email, source that is blank
    pub fn normalize(&self, origin_address: &str) -> Result<NewSubscription, IngestError> {
        if let Some(field) = self.first_missing_field() {
            return Err(IngestError::MissingField(field));
        }

        let trimmed = |value: &Option<String>| value.as_deref().unwrap_or_default().trim().to_string();
        Ok(NewSubscription {
            name: trimmed(&self.name),
            company: trimmed(&self.company),
            email: trimmed(&self.email).to_lowercase(),
            source: trimmed(&self.source),
            origin_address: origin_address.trim().to_string(),
        })
    }
}

/// Resolve the requester address
///
/// The first non-empty entry of a comma-separated forwarded-for header wins,
/// then the peer address, then "".
#[must_use]
pub fn origin_address(forwarded_for: Option<&str>, peer: Option<&str>) -> String {
    forwarded_for
        .into_iter()
        .flat_map(|header| header.split(','))
        .map(str::trim)
        .find(|entry| !entry.is_empty())
        .or_else(|| peer.map(str::trim).filter(|p| !p.is_empty()))
        .unwrap_or_default()
        .to_string()
}
