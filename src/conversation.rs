//! Client-side conversation state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions:
//! the view feeds [`Event`]s into [`transition`] and executes the returned
//! [`Effect`]s. History and the pending flag only change here.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::{ChatContext, ChatState, ClearPolicy};
pub use transition::{transition, TransitionError, TransitionResult};
