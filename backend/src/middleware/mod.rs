//! Request middleware.
//!
//! Purpose: request lifecycle concerns shared by every route: trace
//! correlation and the navigation session guard.

pub mod session_guard;
pub mod trace;

pub use session_guard::SessionGuardMiddleware;
pub use trace::Trace;
