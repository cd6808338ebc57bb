//! Conversation state types

use crate::api::Turn;
use std::str::FromStr;

/// What answering "no" to the clear prompt does
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClearPolicy {
    /// History is cleared only when the user confirms
    #[default]
    Confirm,
    /// History is cleared whatever the user answers; the prompt is advisory
    Unconditional,
}

impl FromStr for ClearPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "confirm" => Ok(Self::Confirm),
            "unconditional" => Ok(Self::Unconditional),
            other => Err(format!(
                "unknown clear policy {other:?} (expected \"confirm\" or \"unconditional\")"
            )),
        }
    }
}

/// Fixed settings a conversation runs under
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatContext {
    pub clear_policy: ClearPolicy,
}

impl ChatContext {
    pub fn new(clear_policy: ClearPolicy) -> Self {
        Self { clear_policy }
    }
}

/// Conversation state owned by the client for the whole session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatState {
    pub(super) history: Vec<Turn>,
    pub(super) pending: bool,
    pub(super) confirming_clear: bool,
}

impl ChatState {
    pub fn new() -> Self {
        Self::default()
    }

    /// All turns so far, in conversation order
    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// True while a request is in flight
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// True while the clear-history prompt is open
    pub fn is_confirming_clear(&self) -> bool {
        self.confirming_clear
    }
}
