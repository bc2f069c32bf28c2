//! Client-side session state for the Quill blog.
//!
//! This crate provides:
//! - [`SessionStore`], the single source of truth for who is signed in,
//!   driven by an explicit state machine
//! - [`RouteGuard`] for views that require a signed-in user
//! - Startup verification of a stored token with retry on transient errors

mod error;
mod guard;
mod session_fsm;
mod store;

#[cfg(test)]
mod test_support;

pub use error::{SessionError, SessionResult};
pub use guard::{evaluate, GuardDecision, Guarded, RouteGuard};
pub use session_fsm::session_machine;
pub use session_fsm::{
    RetryConfig, SessionMachine, SessionMachineInput, SessionMachineState, SessionPhase,
};
pub use store::{SessionSnapshot, SessionStore};
