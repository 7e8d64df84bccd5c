//! Navigation-time session guard.
//!
//! [`SessionGuard::decide`] is a pure function of the requested path and
//! whether a credential is present. It never inspects the credential itself;
//! an invalid credential is discovered later by identity resolution, which
//! logs the caller out rather than blocking navigation here.
//!
//! Paths are classified in canonical form (see [`canonical_path`]) so an
//! encoded or oddly spelled protected path cannot pass as public.

use std::borrow::Cow;

use percent_encoding::percent_decode_str;
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::ConsoleProfile;

/// Outcome of a guard check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GuardDecision {
    /// Let the navigation proceed.
    Allow,
    /// Protected path without a credential: send the caller to the entry page.
    RedirectToLogin,
    /// Authenticated caller hit the entry page: send them home.
    RedirectToHome,
}

/// Ordered set of path prefixes that require a credential.
///
/// Matching is plain string-prefix matching so `/dashboard` protects
/// `/dashboard`, `/dashboard/`, `/dashboard/assets/1`, and also
/// `/dashboard-export`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedPaths {
    prefixes: Vec<String>,
}

impl ProtectedPaths {
    /// Build from prefixes; blank prefixes are ignored because they would
    /// protect everything, including the entry page.
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let prefixes = prefixes
            .into_iter()
            .map(|prefix| prefix.as_ref().trim().to_owned())
            .filter(|prefix| !prefix.is_empty() && prefix != "/")
            .collect();
        Self { prefixes }
    }

    /// Whether `path` falls under any protected prefix.
    pub fn protects(&self, path: &str) -> bool {
        self.prefixes.iter().any(|prefix| path.starts_with(prefix))
    }
}

/// Guard configuration for one console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionGuard {
    protected: ProtectedPaths,
    entry_path: String,
    home_path: String,
}

impl SessionGuard {
    /// Construct a guard from explicit paths.
    pub fn new(
        protected: ProtectedPaths,
        entry_path: impl Into<String>,
        home_path: impl Into<String>,
    ) -> Self {
        Self {
            protected,
            entry_path: entry_path.into(),
            home_path: home_path.into(),
        }
    }

    /// Guard matching a console profile.
    ///
    /// # Examples
    /// ```
    /// use console_gateway::domain::{ConsoleKind, GuardDecision, SessionGuard};
    ///
    /// let guard = SessionGuard::for_console(ConsoleKind::Client.profile());
    /// assert_eq!(guard.decide("/dashboard/home", false), GuardDecision::RedirectToLogin);
    /// assert_eq!(guard.decide("/login", true), GuardDecision::RedirectToHome);
    /// assert_eq!(guard.decide("/login", false), GuardDecision::Allow);
    /// ```
    pub fn for_console(profile: &ConsoleProfile) -> Self {
        Self::new(
            ProtectedPaths::new(profile.protected_prefixes),
            profile.entry_path,
            profile.home_path,
        )
    }

    /// Classify a navigation. `path` may be raw; it is canonicalised first.
    pub fn decide(&self, path: &str, credential_present: bool) -> GuardDecision {
        let path = canonical_path(path);
        if credential_present && self.is_entry(&path) {
            GuardDecision::RedirectToHome
        } else if !credential_present && self.protected.protects(&path) {
            GuardDecision::RedirectToLogin
        } else {
            GuardDecision::Allow
        }
    }

    /// Public entry path.
    pub fn entry_path(&self) -> &str {
        &self.entry_path
    }

    /// Landing path for authenticated callers.
    pub fn home_path(&self) -> &str {
        &self.home_path
    }

    fn is_entry(&self, path: &str) -> bool {
        let normalised = path.trim_end_matches('/');
        let entry = self.entry_path.trim_end_matches('/');
        if entry.is_empty() {
            normalised.is_empty()
        } else {
            normalised == entry
        }
    }
}

/// Rounds of percent-decoding before a path is taken as stable.
const MAX_DECODE_ROUNDS: usize = 4;

/// Canonical form of a request path for guard decisions.
///
/// Percent-escapes are decoded until the path stops changing, repeated
/// slashes collapse, and `.`/`..` segments are resolved.
///
/// # Examples
/// ```
/// use console_gateway::domain::canonical_path;
///
/// assert_eq!(canonical_path("/%64ashboard/overview"), "/dashboard/overview");
/// assert_eq!(canonical_path("//dashboard///overview/"), "/dashboard/overview/");
/// assert_eq!(canonical_path("/login/../dashboard"), "/dashboard");
/// ```
pub fn canonical_path(raw: &str) -> String {
    let mut decoded = raw.to_owned();
    for _ in 0..MAX_DECODE_ROUNDS {
        let next: Cow<'_, str> = percent_decode_str(&decoded).decode_utf8_lossy();
        if next == decoded {
            break;
        }
        decoded = next.into_owned();
    }

    let trailing_slash = decoded.ends_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    let mut canonical = format!("/{}", segments.join("/"));
    if trailing_slash && !segments.is_empty() {
        canonical.push('/');
    }
    canonical
}
