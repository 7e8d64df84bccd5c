//! Resolved caller identity and its cached snapshot.
//!
//! [`Identity`] is derived from the orchestrator's profile endpoint and is
//! validated at the boundary: the wire form accepts the orchestrator's
//! snake_case spellings, while the gateway always emits schema version 1 in
//! camelCase. [`IdentitySnapshot`] is the cached subset used to pre-render
//! profile chrome and is never trusted for authorisation.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Identity schema version emitted by the gateway.
pub const IDENTITY_SCHEMA_VERSION: u32 = 1;

/// Commercial mode of the account behind a credential.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AccountMode {
    /// Paid account without seat restrictions.
    Full,
    /// Trial account restricted to a single seat.
    #[default]
    Demo,
}

/// How many seats an action implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatUsage {
    /// The action stays within one seat.
    SingleSeat,
    /// The action provisions or spans more than one seat.
    MultiSeat,
}

impl AccountMode {
    /// Whether an account in this mode may perform an action of the given usage.
    pub fn allows(self, usage: SeatUsage) -> bool {
        !matches!((self, usage), (Self::Demo, SeatUsage::MultiSeat))
    }
}

/// Lifecycle status reported by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, ToSchema)]
pub enum IdentityStatus {
    /// The account is usable.
    Active,
    /// The account was suspended by an operator.
    Suspended,
    /// The account was deactivated.
    Inactive,
    /// Any status this gateway does not recognise.
    Unknown(String),
}

impl IdentityStatus {
    /// Only active identities may hold a session.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl From<String> for IdentityStatus {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => Self::Active,
            "suspended" => Self::Suspended,
            "inactive" => Self::Inactive,
            _ => Self::Unknown(value),
        }
    }
}

impl From<IdentityStatus> for String {
    fn from(value: IdentityStatus) -> Self {
        match value {
            IdentityStatus::Active => "active".to_owned(),
            IdentityStatus::Suspended => "suspended".to_owned(),
            IdentityStatus::Inactive => "inactive".to_owned(),
            IdentityStatus::Unknown(raw) => raw,
        }
    }
}

impl Serialize for IdentityStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from(self.clone()))
    }
}

impl<'de> Deserialize<'de> for IdentityStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}

/// Validation failures for identity payloads crossing the orchestrator boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityValidationError {
    /// `id` was missing or blank.
    #[error("identity id must not be empty")]
    EmptyId,
    /// `name` was missing or blank.
    #[error("identity name must not be empty")]
    EmptyName,
    /// The payload declared a schema version this gateway does not speak.
    #[error("unsupported identity schema version {0}")]
    UnsupportedVersion(u32),
}

/// Orchestrator-confirmed profile bound to a credential.
///
/// # Examples
/// ```
/// use console_gateway::domain::{AccountMode, Identity};
///
/// let identity: Identity = serde_json::from_str(
///     r#"{"id":"p-1","name":"Acme","email":"ops@acme.test","account_mode":"demo","status":"active"}"#,
/// )
/// .unwrap();
/// assert_eq!(identity.account_mode(), AccountMode::Demo);
/// assert!(identity.status().is_active());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "IdentityWire", into = "IdentityRepr")]
pub struct Identity {
    id: String,
    name: String,
    email: String,
    account_mode: AccountMode,
    status: IdentityStatus,
    created_at: Option<DateTime<Utc>>,
}

impl Identity {
    /// Validate and construct an identity.
    pub fn try_new(
        id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        account_mode: AccountMode,
        status: IdentityStatus,
    ) -> Result<Self, IdentityValidationError> {
        let id = id.into().trim().to_owned();
        if id.is_empty() {
            return Err(IdentityValidationError::EmptyId);
        }
        let name = name.into().trim().to_owned();
        if name.is_empty() {
            return Err(IdentityValidationError::EmptyName);
        }
        Ok(Self {
            id,
            name,
            email: email.into().trim().to_owned(),
            account_mode,
            status,
            created_at: None,
        })
    }

    /// Attach the creation timestamp reported by the orchestrator.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Orchestrator identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Contact email; empty when the orchestrator has none.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Commercial account mode.
    pub fn account_mode(&self) -> AccountMode {
        self.account_mode
    }

    /// Lifecycle status.
    pub fn status(&self) -> &IdentityStatus {
        &self.status
    }

    /// Creation timestamp, when known.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    /// Provisional snapshot for pre-rendering profile chrome.
    pub fn snapshot(&self) -> IdentitySnapshot {
        IdentitySnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            account_mode: self.account_mode,
            provisional: true,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl From<RawId> for String {
    fn from(value: RawId) -> Self {
        match value {
            RawId::Text(text) => text,
            RawId::Number(number) => number.to_string(),
        }
    }
}

/// Wire form of the profile payload.
///
/// The orchestrator mixes camelCase and snake_case spellings across its
/// routers, so both are accepted side by side; the camelCase field wins.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityWire {
    #[serde(default)]
    version: Option<u32>,
    id: RawId,
    name: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default, rename = "contact_email")]
    contact_email: Option<String>,
    #[serde(default)]
    account_mode: Option<AccountMode>,
    #[serde(default, rename = "account_mode")]
    account_mode_snake: Option<AccountMode>,
    status: IdentityStatus,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default, rename = "created_at")]
    created_at_snake: Option<DateTime<Utc>>,
}

impl TryFrom<IdentityWire> for Identity {
    type Error = IdentityValidationError;

    fn try_from(value: IdentityWire) -> Result<Self, Self::Error> {
        if let Some(version) = value.version.filter(|v| *v != IDENTITY_SCHEMA_VERSION) {
            return Err(IdentityValidationError::UnsupportedVersion(version));
        }
        let mut identity = Self::try_new(
            value.id,
            value.name,
            value.email.or(value.contact_email).unwrap_or_default(),
            value
                .account_mode
                .or(value.account_mode_snake)
                .unwrap_or_default(),
            value.status,
        )?;
        identity.created_at = value.created_at.or(value.created_at_snake);
        Ok(identity)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IdentityRepr {
    version: u32,
    id: String,
    name: String,
    email: String,
    account_mode: AccountMode,
    status: IdentityStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
}

impl From<Identity> for IdentityRepr {
    fn from(value: Identity) -> Self {
        Self {
            version: IDENTITY_SCHEMA_VERSION,
            id: value.id,
            name: value.name,
            email: value.email,
            account_mode: value.account_mode,
            status: value.status,
            created_at: value.created_at,
        }
    }
}

/// Cached identity subset used only to pre-render profile chrome.
///
/// Always provisional: nothing may authorise an action from a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IdentitySnapshot {
    /// Orchestrator identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Account mode at the time the snapshot was taken.
    pub account_mode: AccountMode,
    /// Always `true`; marks the data as unverified.
    #[serde(default = "provisional")]
    pub provisional: bool,
}

const fn provisional() -> bool {
    true
}
