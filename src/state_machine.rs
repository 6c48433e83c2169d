//! Per-user tutoring mode state machine
//!
//! Pure transitions in the Elm style: the store owns the state, feeds events
//! through [`transition`], and keeps whatever comes back.

pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use event::Event;
pub use state::{AutoDetectPolicy, SessionContext, UserSession};
pub use transition::{transition, Outcome, TransitionResult};
