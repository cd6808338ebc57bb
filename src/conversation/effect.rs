//! Effects produced by state transitions

use crate::api::Turn;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Empty the input field
    ClearInput,

    /// Ask the gateway to complete `message` against `history`.
    /// `history` never includes the turn holding `message`.
    SendToGateway { message: String, history: Vec<Turn> },

    /// Scroll the transcript to the newest turn or the typing indicator
    ScrollToBottom,

    /// Record a failed exchange for diagnostics. Never shown as a turn.
    LogFailure { message: String },
}
