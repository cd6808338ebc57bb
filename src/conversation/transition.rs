//! Pure state transition function

use super::{ChatContext, ChatState, ClearPolicy, Effect, Event};
use crate::api::Turn;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ChatState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ChatState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Reasons an event is rejected. A rejected event changes nothing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("A request is already in flight")]
    RequestPending,
    #[error("Message is empty")]
    EmptyInput,
    #[error("History is already empty")]
    NothingToClear,
    #[error("Clear confirmation is open")]
    ConfirmationOpen,
    #[error("Invalid transition: {0}")]
    InvalidTransition(&'static str),
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs, with no I/O.
pub fn transition(
    state: &ChatState,
    context: &ChatContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match event {
        // ============================================================
        // Submission
        // ============================================================
        Event::Submit { text } => {
            if state.pending {
                return Err(TransitionError::RequestPending);
            }
            if state.confirming_clear {
                return Err(TransitionError::ConfirmationOpen);
            }
            if text.trim().is_empty() {
                return Err(TransitionError::EmptyInput);
            }

            let prior = state.history.clone();
            let mut next = state.clone();
            next.history.push(Turn::user(text.clone()));
            next.pending = true;

            Ok(TransitionResult::new(next)
                .with_effect(Effect::ClearInput)
                .with_effect(Effect::SendToGateway {
                    message: text,
                    history: prior,
                })
                .with_effect(Effect::ScrollToBottom))
        }

        // ============================================================
        // Gateway outcomes
        // ============================================================
        Event::ReplyReceived { text } => {
            if !state.pending {
                return Err(TransitionError::InvalidTransition(
                    "reply received with no request in flight",
                ));
            }

            let mut next = state.clone();
            next.history.push(Turn::model(text));
            next.pending = false;

            Ok(TransitionResult::new(next).with_effect(Effect::ScrollToBottom))
        }

        // The user turn stays; no model turn and no visible error.
        Event::RequestFailed { message } => {
            if !state.pending {
                return Err(TransitionError::InvalidTransition(
                    "failure received with no request in flight",
                ));
            }

            let mut next = state.clone();
            next.pending = false;

            Ok(TransitionResult::new(next)
                .with_effect(Effect::LogFailure { message })
                .with_effect(Effect::ScrollToBottom))
        }

        // ============================================================
        // Clearing history
        // ============================================================
        Event::ClearRequested => {
            if state.pending {
                return Err(TransitionError::RequestPending);
            }
            if state.history.is_empty() {
                return Err(TransitionError::NothingToClear);
            }
            if state.confirming_clear {
                return Err(TransitionError::ConfirmationOpen);
            }

            let mut next = state.clone();
            next.confirming_clear = true;
            Ok(TransitionResult::new(next))
        }

        Event::ClearConfirmed => {
            if !state.confirming_clear {
                return Err(TransitionError::InvalidTransition("no clear prompt open"));
            }
            Ok(cleared(state))
        }

        Event::ClearCancelled => {
            if !state.confirming_clear {
                return Err(TransitionError::InvalidTransition("no clear prompt open"));
            }
            match context.clear_policy {
                ClearPolicy::Confirm => {
                    let mut next = state.clone();
                    next.confirming_clear = false;
                    Ok(TransitionResult::new(next))
                }
                ClearPolicy::Unconditional => Ok(cleared(state)),
            }
        }
    }
}

fn cleared(state: &ChatState) -> TransitionResult {
    let mut next = state.clone();
    next.history.clear();
    next.confirming_clear = false;
    TransitionResult::new(next).with_effect(Effect::ScrollToBottom)
}
