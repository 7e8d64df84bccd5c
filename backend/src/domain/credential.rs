//! Opaque caller credentials and header extraction.
//!
//! A [`Credential`] is never parsed or verified here: validity is the
//! orchestrator's call. The gateway only checks presence, carries the value
//! verbatim, and logs a truncated fingerprint instead of the secret.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;
use zeroize::Zeroizing;

/// Length of a credential fingerprint in bytes before hex encoding.
const FINGERPRINT_BYTES: usize = 8;

/// Variant of credential a console stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    /// Server-issued session token; the console checks presence only.
    CookieSession,
    /// Caller-supplied shared secret sent verbatim on every request.
    ApiKey,
}

/// Validation errors for raw credential input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialValidationError {
    /// The value was empty or whitespace only.
    #[error("credential must not be empty")]
    Empty,
    /// The value contains characters that cannot travel in an HTTP header.
    #[error("credential contains characters that are not valid in a header")]
    InvalidCharacters,
}

/// Opaque caller credential.
///
/// ## Invariants
/// - Never blank.
/// - Values submitted to the session endpoints ([`Credential::new`]) are
///   trimmed and contain only visible ASCII.
/// - Values taken from relay headers ([`Credential::presented`]) are kept
///   exactly as sent.
///
/// `Debug` never prints the secret.
///
/// # Examples
/// ```
/// use console_gateway::domain::Credential;
///
/// let credential = Credential::new(" sk_demo_123 ").unwrap();
/// assert_eq!(credential.expose(), "sk_demo_123");
/// assert!(!format!("{credential:?}").contains("sk_demo_123"));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(Zeroizing<String>);

impl Credential {
    /// Validate and wrap a raw credential value.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, CredentialValidationError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(CredentialValidationError::Empty);
        }
        if !trimmed.bytes().all(|byte| byte.is_ascii_graphic()) {
            return Err(CredentialValidationError::InvalidCharacters);
        }
        Ok(Self(Zeroizing::new(trimmed.to_owned())))
    }

    /// Wrap a header value that is present, without inspecting it.
    ///
    /// Returns `None` only for blank values. Anything else is forwarded
    /// verbatim; the orchestrator decides whether it is valid.
    ///
    /// # Examples
    /// ```
    /// use console_gateway::domain::Credential;
    ///
    /// let credential = Credential::presented("pk live 1").unwrap();
    /// assert_eq!(credential.expose(), "pk live 1");
    /// assert!(Credential::presented("  ").is_none());
    /// ```
    pub fn presented(raw: &str) -> Option<Self> {
        (!raw.trim().is_empty()).then(|| Self(Zeroizing::new(raw.to_owned())))
    }

    /// Borrow the raw secret for forwarding to the orchestrator.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    /// Truncated SHA-256 fingerprint suitable for logs.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        hex::encode(&digest[..FINGERPRINT_BYTES])
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential")
            .field(&format_args!("fp:{}", self.fingerprint()))
            .finish()
    }
}

/// Ordered set of header names a relay accepts a credential under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialHeaders {
    accepted: &'static [&'static str],
}

impl CredentialHeaders {
    /// Wrap an accepted-header list; earlier names win.
    pub const fn new(accepted: &'static [&'static str]) -> Self {
        Self { accepted }
    }

    /// Accepted header names in priority order.
    pub fn accepted(&self) -> &'static [&'static str] {
        self.accepted
    }

    /// Find the first accepted header carrying a credential.
    ///
    /// Header names match case-insensitively. This is a presence check only:
    /// blank values are skipped so a later header in the priority order can
    /// still match, and any other value is returned untouched. If nothing is
    /// present the caller must fail closed.
    ///
    /// # Examples
    /// ```
    /// use console_gateway::domain::CredentialHeaders;
    ///
    /// let headers = CredentialHeaders::new(&["X-Client-API-Key", "X-Api-Key"]);
    /// let found = headers
    ///     .extract([("x-api-key", "fallback"), ("X-CLIENT-API-KEY", "primary")])
    ///     .unwrap();
    /// assert_eq!(found.expose(), "primary");
    /// ```
    pub fn extract<'a, I>(&self, headers: I) -> Option<Credential>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let pairs: Vec<(&str, &str)> = headers.into_iter().collect();
        self.accepted.iter().find_map(|accepted| {
            pairs
                .iter()
                .filter(|(name, _)| name.eq_ignore_ascii_case(accepted))
                .find_map(|(_, value)| Credential::presented(value))
        })
    }
}
