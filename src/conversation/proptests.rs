//! Property-based tests for the conversation state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::*;
use crate::api::{Role, Turn};
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_message() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9?!.,| `*#-]{0,12}[a-zA-Z0-9?]{1,3}"
}

fn arb_blank() -> impl Strategy<Value = String> {
    "[ \t\n]{0,6}"
}

fn arb_clear_policy() -> impl Strategy<Value = ClearPolicy> {
    prop_oneof![Just(ClearPolicy::Confirm), Just(ClearPolicy::Unconditional)]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        arb_message().prop_map(|text| Event::Submit { text }),
        arb_blank().prop_map(|text| Event::Submit { text }),
        arb_message().prop_map(|text| Event::ReplyReceived { text }),
        "[a-z ]{1,20}".prop_map(|message| Event::RequestFailed { message }),
        Just(Event::ClearRequested),
        Just(Event::ClearConfirmed),
        Just(Event::ClearCancelled),
    ]
}

/// Apply an event, keeping the old state when it is rejected
fn step(state: ChatState, context: &ChatContext, event: Event) -> (ChatState, Vec<Effect>) {
    match transition(&state, context, event) {
        Ok(result) => (result.new_state, result.effects),
        Err(_) => (state, vec![]),
    }
}

fn is_strictly_alternating(history: &[Turn]) -> bool {
    history.iter().enumerate().all(|(i, turn)| {
        let expected = if i % 2 == 0 { Role::User } else { Role::Model };
        turn.role == expected
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// N successful exchanges yield 2N turns alternating user/model.
    #[test]
    fn successful_exchanges_alternate(
        exchanges in proptest::collection::vec((arb_message(), arb_message()), 0..12)
    ) {
        let ctx = ChatContext::default();
        let mut state = ChatState::new();

        for (question, answer) in &exchanges {
            state = transition(&state, &ctx, Event::Submit { text: question.clone() })
                .unwrap()
                .new_state;
            state = transition(&state, &ctx, Event::ReplyReceived { text: answer.clone() })
                .unwrap()
                .new_state;
        }

        prop_assert_eq!(state.history().len(), exchanges.len() * 2);
        prop_assert!(is_strictly_alternating(state.history()));
        prop_assert!(!state.is_pending());
        for (i, (question, answer)) in exchanges.iter().enumerate() {
            prop_assert_eq!(&state.history()[2 * i].text(), question);
            prop_assert_eq!(&state.history()[2 * i + 1].text(), answer);
        }
    }

    /// A failed exchange adds exactly the user turn and resets pending.
    #[test]
    fn failure_adds_only_user_turn(
        prior in 0usize..4,
        text in arb_message(),
        reason in "[a-z ]{1,20}",
    ) {
        let ctx = ChatContext::default();
        let mut state = ChatState::new();
        for i in 0..prior {
            state = transition(&state, &ctx, Event::Submit { text: format!("q{i}") }).unwrap().new_state;
            state = transition(&state, &ctx, Event::ReplyReceived { text: format!("a{i}") }).unwrap().new_state;
        }
        let before = state.history().len();

        state = transition(&state, &ctx, Event::Submit { text: text.clone() }).unwrap().new_state;
        state = transition(&state, &ctx, Event::RequestFailed { message: reason }).unwrap().new_state;

        prop_assert_eq!(state.history().len(), before + 1);
        prop_assert_eq!(state.history().last().cloned(), Some(Turn::user(text)));
        prop_assert!(!state.is_pending());
    }

    /// Submitting while pending changes nothing and issues no request.
    #[test]
    fn submit_while_pending_is_noop(first in arb_message(), second in arb_message()) {
        let ctx = ChatContext::default();
        let pending = transition(&ChatState::new(), &ctx, Event::Submit { text: first })
            .unwrap()
            .new_state;

        let (after, effects) = step(pending.clone(), &ctx, Event::Submit { text: second });

        prop_assert_eq!(after, pending);
        prop_assert!(effects.is_empty());
    }

    /// Whitespace-only input never creates a turn or a request.
    #[test]
    fn blank_input_is_noop(text in arb_blank(), prior in 0usize..3) {
        let ctx = ChatContext::default();
        let mut state = ChatState::new();
        for i in 0..prior {
            state = transition(&state, &ctx, Event::Submit { text: format!("q{i}") }).unwrap().new_state;
            state = transition(&state, &ctx, Event::ReplyReceived { text: format!("a{i}") }).unwrap().new_state;
        }

        let (after, effects) = step(state.clone(), &ctx, Event::Submit { text });

        prop_assert_eq!(after, state);
        prop_assert!(effects.is_empty());
    }

    /// Under any event sequence: at most one request in flight, the history
    /// is append-only between clears, and every request carries exactly the
    /// turns that preceded it.
    #[test]
    fn random_sequences_preserve_invariants(
        policy in arb_clear_policy(),
        events in proptest::collection::vec(arb_event(), 0..40),
    ) {
        let ctx = ChatContext::new(policy);
        let mut state = ChatState::new();
        let mut in_flight = 0usize;

        for event in events {
            let before = state.clone();
            let is_clear = matches!(event, Event::ClearConfirmed | Event::ClearCancelled);
            let (next, effects) = step(state, &ctx, event);

            for effect in &effects {
                match effect {
                    Effect::SendToGateway { message, history } => {
                        in_flight += 1;
                        prop_assert_eq!(history.as_slice(), before.history());
                        prop_assert_eq!(
                            next.history().last().cloned(),
                            Some(Turn::user(message.clone()))
                        );
                    }
                    Effect::LogFailure { .. } | Effect::ClearInput | Effect::ScrollToBottom => {}
                }
            }
            if before.is_pending() && !next.is_pending() {
                in_flight -= 1;
            }
            prop_assert!(in_flight <= 1);
            prop_assert_eq!(next.is_pending(), in_flight == 1);

            if !(is_clear && next.history().is_empty()) {
                prop_assert!(next.history().len() >= before.history().len());
                prop_assert_eq!(&next.history()[..before.history().len()], before.history());
            }

            // Never two model turns in a row, and pending means a user turn is last
            for pair in next.history().windows(2) {
                prop_assert!(!(pair[0].role == Role::Model && pair[1].role == Role::Model));
            }
            if next.is_pending() {
                prop_assert_eq!(next.history().last().map(|t| t.role), Some(Role::User));
            }
            prop_assert!(next.history().iter().all(|t| !t.parts.is_empty()));

            state = next;
        }
    }

    /// Under the confirm policy, declining never loses history.
    #[test]
    fn declining_clear_keeps_history(n in 1usize..5) {
        let ctx = ChatContext::new(ClearPolicy::Confirm);
        let mut state = ChatState::new();
        for i in 0..n {
            state = transition(&state, &ctx, Event::Submit { text: format!("q{i}") }).unwrap().new_state;
            state = transition(&state, &ctx, Event::ReplyReceived { text: format!("a{i}") }).unwrap().new_state;
        }
        let before = state.history().to_vec();

        state = transition(&state, &ctx, Event::ClearRequested).unwrap().new_state;
        state = transition(&state, &ctx, Event::ClearCancelled).unwrap().new_state;

        prop_assert_eq!(state.history(), before.as_slice());
    }
}
