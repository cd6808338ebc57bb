//! Events that can occur in a conversation

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // User events
    Submit { text: String },
    ClearRequested,
    ClearConfirmed,
    ClearCancelled,

    // Gateway events
    ReplyReceived { text: String },
    RequestFailed { message: String },
}
