//! Single-writer identity context for one console session.
//!
//! The context owns the session state machine
//! `anonymous → resolving → {authenticated | invalid}` and is the only code
//! that writes to the [`CredentialStore`]. Every credential change bumps a
//! generation counter under the state lock; a resolution only commits if the
//! generation it started with is still current, so the most recent
//! `set_credential` wins regardless of completion order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::domain::ports::{CredentialStore, ProfileSource, ProfileSourceError};
use crate::domain::{ConsoleProfile, Credential, Error, Identity, IdentitySnapshot, SeatUsage};

/// Why a session was invalidated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum InvalidationReason {
    /// The orchestrator refused the credential.
    Rejected,
    /// The identity exists but is not active.
    Suspended,
    /// The orchestrator could not confirm the credential.
    Unavailable,
    /// The profile call timed out.
    Timeout,
    /// The profile did not match the identity schema.
    MalformedProfile,
    /// The credential could not be written to the store.
    StorageFailure,
}

impl From<&ProfileSourceError> for InvalidationReason {
    fn from(value: &ProfileSourceError) -> Self {
        match value {
            ProfileSourceError::Rejected { .. } => Self::Rejected,
            ProfileSourceError::UpstreamStatus { .. } | ProfileSourceError::Transport { .. } => {
                Self::Unavailable
            }
            ProfileSourceError::Timeout { .. } => Self::Timeout,
            ProfileSourceError::Decode { .. } => Self::MalformedProfile,
        }
    }
}

impl From<InvalidationReason> for Error {
    fn from(value: InvalidationReason) -> Self {
        match value {
            InvalidationReason::Rejected => Error::unauthorized("credential rejected"),
            InvalidationReason::Suspended => Error::forbidden("account is not active"),
            InvalidationReason::Unavailable => Error::bad_gateway("orchestrator unavailable"),
            InvalidationReason::Timeout => Error::gateway_timeout("orchestrator timed out"),
            InvalidationReason::MalformedProfile => {
                Error::bad_gateway("orchestrator returned an invalid profile")
            }
            InvalidationReason::StorageFailure => Error::internal("session storage failed"),
        }
    }
}

/// Session state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No credential.
    Anonymous,
    /// A credential is stored but not yet confirmed.
    Resolving {
        /// Credential awaiting confirmation.
        credential: Credential,
    },
    /// The orchestrator confirmed the credential.
    Authenticated {
        /// Confirmed credential.
        credential: Credential,
        /// Identity bound to the credential.
        identity: Identity,
    },
    /// Resolution failed; the store has been cleared.
    Invalid {
        /// Failure category.
        reason: InvalidationReason,
    },
}

/// Serialisable state label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionStateKind {
    /// See [`SessionState::Anonymous`].
    Anonymous,
    /// See [`SessionState::Resolving`].
    Resolving,
    /// See [`SessionState::Authenticated`].
    Authenticated,
    /// See [`SessionState::Invalid`].
    Invalid,
}

/// What a protected page may render for a given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RenderGate {
    /// Send the caller to the entry page.
    RedirectToLogin,
    /// Render the neutral loading state.
    Loading,
    /// Render primary content.
    Render,
}

impl SessionState {
    /// Label for this state.
    pub fn kind(&self) -> SessionStateKind {
        match self {
            Self::Anonymous => SessionStateKind::Anonymous,
            Self::Resolving { .. } => SessionStateKind::Resolving,
            Self::Authenticated { .. } => SessionStateKind::Authenticated,
            Self::Invalid { .. } => SessionStateKind::Invalid,
        }
    }

    /// Current credential, if one is held.
    pub fn credential(&self) -> Option<&Credential> {
        match self {
            Self::Resolving { credential } | Self::Authenticated { credential, .. } => {
                Some(credential)
            }
            Self::Anonymous | Self::Invalid { .. } => None,
        }
    }

    /// Current identity, only when authenticated.
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Authenticated { identity, .. } => Some(identity),
            _ => None,
        }
    }

    /// Pure render decision for protected pages.
    pub fn render_gate(&self) -> RenderGate {
        match self {
            Self::Anonymous | Self::Invalid { .. } => RenderGate::RedirectToLogin,
            Self::Resolving { .. } => RenderGate::Loading,
            Self::Authenticated { .. } => RenderGate::Render,
        }
    }
}

/// Result of one resolution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    /// The credential was confirmed.
    Authenticated(Identity),
    /// The session was invalidated and the store cleared.
    Invalidated(InvalidationReason),
    /// A newer credential change, a logout, or a cancellation made this
    /// result stale; nothing was written.
    Superseded,
    /// There was no credential to resolve.
    NoCredential,
}

/// Identity context for one console session.
///
/// # Examples
/// ```
/// use std::sync::Arc;
///
/// use console_gateway::domain::ports::{FixtureProfileSource, MemoryCredentialStore};
/// use console_gateway::domain::{
///     ConsoleKind, Credential, IdentityContext, RenderGate, ResolutionOutcome,
/// };
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let context = IdentityContext::new(
///     ConsoleKind::Client.profile(),
///     MemoryCredentialStore::default(),
///     Arc::new(FixtureProfileSource::default()),
/// );
/// let outcome = context
///     .set_credential(Credential::new("sk_demo_123").unwrap())
///     .await;
/// assert!(matches!(outcome, ResolutionOutcome::Authenticated(_)));
/// assert_eq!(context.render_gate(), RenderGate::Render);
///
/// context.logout();
/// assert!(context.credential().is_none());
/// # });
/// ```
pub struct IdentityContext<S> {
    console: &'static ConsoleProfile,
    store: S,
    profiles: Arc<dyn ProfileSource>,
    state: Mutex<SessionState>,
    generation: AtomicU64,
}

impl<S: CredentialStore> IdentityContext<S> {
    /// Create an anonymous context over `store`.
    pub fn new(
        console: &'static ConsoleProfile,
        store: S,
        profiles: Arc<dyn ProfileSource>,
    ) -> Self {
        Self {
            console,
            store,
            profiles,
            state: Mutex::new(SessionState::Anonymous),
            generation: AtomicU64::new(0),
        }
    }

    /// Console this context serves.
    pub fn console(&self) -> &'static ConsoleProfile {
        self.console
    }

    /// Re-hydrate the credential from the store without resolving it.
    ///
    /// An unreadable stored value is cleared and the context stays anonymous.
    pub fn hydrate(&self) -> SessionStateKind {
        let mut state = self.lock_state();
        match self.store.load_credential() {
            Ok(Some(credential)) => {
                *state = SessionState::Resolving { credential };
            }
            Ok(None) => {
                *state = SessionState::Anonymous;
            }
            Err(error) => {
                warn!(console = %self.console.kind, %error, "discarding unreadable credential");
                self.store.clear();
                *state = SessionState::Anonymous;
            }
        }
        state.kind()
    }

    /// Persist `credential` and resolve it into an identity.
    ///
    /// Any failure invalidates the session immediately: the store is cleared
    /// and no credential is left without an identity.
    pub async fn set_credential(&self, credential: Credential) -> ResolutionOutcome {
        let generation = {
            let mut state = self.lock_state();
            let generation = self.bump_generation();
            if let Err(error) = self.store.save_credential(&credential) {
                warn!(console = %self.console.kind, %error, "failed to persist credential");
                return self.invalidate(&mut state, InvalidationReason::StorageFailure);
            }
            *state = SessionState::Resolving {
                credential: credential.clone(),
            };
            generation
        };
        self.resolve_generation(generation, credential).await
    }

    /// Resolve the credential currently held, if it is still unconfirmed.
    ///
    /// Already authenticated sessions return their identity without another
    /// orchestrator call.
    pub async fn resolve(&self) -> ResolutionOutcome {
        let (generation, credential) = {
            let state = self.lock_state();
            match &*state {
                SessionState::Resolving { credential } => {
                    (self.generation.load(Ordering::SeqCst), credential.clone())
                }
                SessionState::Authenticated { identity, .. } => {
                    return ResolutionOutcome::Authenticated(identity.clone());
                }
                SessionState::Invalid { reason } => {
                    return ResolutionOutcome::Invalidated(*reason);
                }
                SessionState::Anonymous => return ResolutionOutcome::NoCredential,
            }
        };
        self.resolve_generation(generation, credential).await
    }

    /// Clear the credential and identity. Safe to call in any state.
    pub fn logout(&self) {
        let mut state = self.lock_state();
        self.bump_generation();
        self.store.clear();
        *state = SessionState::Anonymous;
    }

    /// Discard any in-flight resolution without touching stored state.
    ///
    /// The credential stays stored, so a later [`Self::resolve`] starts a
    /// fresh attempt.
    pub fn cancel_pending(&self) {
        let state = self.lock_state();
        if matches!(*state, SessionState::Resolving { .. }) {
            self.bump_generation();
        }
    }

    /// Report an orchestrator status seen on a data call.
    ///
    /// `401` and `403` end the session; every other status, including server
    /// errors, leaves it intact. Returns whether the session was ended.
    pub fn observe_upstream_status(&self, status: u16) -> bool {
        if !matches!(status, 401 | 403) {
            return false;
        }
        let mut state = self.lock_state();
        if state.credential().is_none() {
            return false;
        }
        self.bump_generation();
        self.invalidate(&mut state, InvalidationReason::Rejected);
        true
    }

    /// Check that the authenticated identity may perform an action.
    pub fn authorize(&self, usage: SeatUsage) -> Result<Identity, Error> {
        let state = self.lock_state();
        let identity = state
            .identity()
            .ok_or_else(|| Error::unauthorized("no authenticated session"))?;
        if identity.account_mode().allows(usage) {
            Ok(identity.clone())
        } else {
            Err(Error::forbidden("demo accounts are limited to a single seat"))
        }
    }

    /// Current credential.
    pub fn credential(&self) -> Option<Credential> {
        self.lock_state().credential().cloned()
    }

    /// Current identity.
    pub fn identity(&self) -> Option<Identity> {
        self.lock_state().identity().cloned()
    }

    /// Copy of the current state.
    pub fn state(&self) -> SessionState {
        self.lock_state().clone()
    }

    /// Render decision for the current state.
    pub fn render_gate(&self) -> RenderGate {
        self.lock_state().render_gate()
    }

    /// Provisional snapshot for pre-rendering, only while a credential is held.
    pub fn snapshot(&self) -> Option<IdentitySnapshot> {
        if self.lock_state().credential().is_none() {
            return None;
        }
        self.store.load_snapshot().ok().flatten()
    }

    async fn resolve_generation(
        &self,
        generation: u64,
        credential: Credential,
    ) -> ResolutionOutcome {
        let result = self.profiles.fetch_profile(&credential).await;

        let mut state = self.lock_state();
        if self.generation.load(Ordering::SeqCst) != generation {
            return ResolutionOutcome::Superseded;
        }
        match result {
            Ok(identity) if identity.status().is_active() => {
                if let Err(error) = self.store.save_snapshot(&identity.snapshot()) {
                    warn!(console = %self.console.kind, %error, "failed to cache identity snapshot");
                }
                info!(
                    console = %self.console.kind,
                    credential = %credential.fingerprint(),
                    identity = %identity.id(),
                    "session authenticated"
                );
                *state = SessionState::Authenticated {
                    credential,
                    identity: identity.clone(),
                };
                ResolutionOutcome::Authenticated(identity)
            }
            Ok(identity) => {
                info!(
                    console = %self.console.kind,
                    identity = %identity.id(),
                    "identity is not active"
                );
                self.invalidate(&mut state, InvalidationReason::Suspended)
            }
            Err(error) => {
                warn!(
                    console = %self.console.kind,
                    credential = %credential.fingerprint(),
                    %error,
                    "identity resolution failed"
                );
                self.invalidate(&mut state, InvalidationReason::from(&error))
            }
        }
    }

    fn invalidate(
        &self,
        state: &mut MutexGuard<'_, SessionState>,
        reason: InvalidationReason,
    ) -> ResolutionOutcome {
        self.store.clear();
        **state = SessionState::Invalid { reason };
        ResolutionOutcome::Invalidated(reason)
    }

    fn bump_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
