//! Domain types for the console session and relay layer.
//!
//! Purpose: model credentials, identities, the per-console session state
//! machine, the navigation guard, and relay policy without depending on the
//! HTTP framework. Adapters reach the orchestrator only through [`ports`].
//!
//! Public surface:
//! - [`ConsoleKind`] / [`ConsoleProfile`]: per-console constants.
//! - [`Credential`] / [`CredentialHeaders`]: opaque caller tokens and header
//!   extraction.
//! - [`Identity`] / [`IdentitySnapshot`]: the resolved profile and its cache.
//! - [`IdentityContext`]: the single writer of session state.
//! - [`SessionGuard`]: pure navigation decisions.
//! - [`Relay`]: fail-closed credential relay.
//! - [`Error`] / [`ErrorCode`]: transport-agnostic error payload.

pub mod auth;
pub mod console;
pub mod credential;
pub mod error;
pub mod guard;
pub mod identity;
pub mod identity_context;
pub mod ports;
pub mod relay;

pub use self::auth::{LoginCredentials, LoginValidationError};
pub use self::console::{ConsoleKind, ConsoleProfile, LoginExchange, ResolutionPolicy, UnknownConsole};
pub use self::credential::{Credential, CredentialHeaders, CredentialKind, CredentialValidationError};
pub use self::error::{Error, ErrorCode};
pub use self::guard::{GuardDecision, ProtectedPaths, SessionGuard, canonical_path};
pub use self::identity::{
    AccountMode, IDENTITY_SCHEMA_VERSION, Identity, IdentitySnapshot, IdentityStatus,
    IdentityValidationError, SeatUsage,
};
pub use self::identity_context::{
    IdentityContext, InvalidationReason, RenderGate, ResolutionOutcome, SessionState,
    SessionStateKind,
};
pub use self::relay::{Relay, RelayRequest, normalise_body, relay_path};

/// HTTP header carrying the request trace identifier.
pub const TRACE_ID_HEADER: &str = "trace-id";

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use console_gateway::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<()> {
///     Err(Error::forbidden("nope"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
