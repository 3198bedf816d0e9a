//! Property tests for the Paxos state machine invariants.
//!
//! Drives arbitrary inbound message sequences through a single member's state
//! and checks the acceptor invariants after every step:
//! - the promised number never decreases
//! - an accepted value always has an accepted number, bounded by the promise
//! - acceptor traffic never triggers a learner broadcast
//! - a chosen value is propagated at most once

use curia_paxos::{MemberId, Message, Outbound, PaxosState, ProposalNumber};
use proptest::prelude::*;

fn arb_value() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Member 2".to_string()),
        Just("Member 5".to_string()),
        Just("Member 8".to_string()),
    ]
}

/// Messages an acceptor can receive from remote proposers.
fn arb_acceptor_msg() -> impl Strategy<Value = Message> {
    let number = (1u64..=16).prop_map(ProposalNumber);
    let from = (2u32..=9).prop_map(MemberId);
    prop_oneof![
        (number.clone(), from.clone()).prop_map(|(number, from)| Message::Prepare { number, from }),
        (number, arb_value(), from).prop_map(|(number, value, from)| Message::AcceptRequest {
            number,
            value,
            from
        }),
    ]
}

proptest! {
    #[test]
    fn acceptor_invariants_hold(seq in proptest::collection::vec(arb_acceptor_msg(), 1..64)) {
        let mut state = PaxosState::new(MemberId(1), 9);
        let mut prev_promised: Option<ProposalNumber> = None;

        for msg in seq {
            let out = state.handle(msg);

            // Acceptor-side traffic replies; it never floods the council.
            let is_broadcast = matches!(out, Some(Outbound::Broadcast { .. }));
            prop_assert!(!is_broadcast);

            let promised = state.promised_proposal_number();

            // Promises only move up, and never disappear.
            if let Some(prev) = prev_promised {
                prop_assert!(promised.is_some());
                prop_assert!(promised.unwrap() >= prev);
            }

            // A value implies a number, bounded by the current promise.
            if state.accepted_value().is_some() {
                let accepted = state.accepted_proposal_number();
                prop_assert!(accepted.is_some());
                prop_assert!(promised.is_some());
                prop_assert!(accepted.unwrap() <= promised.unwrap());
            }
            if state.accepted_proposal_number().is_some() {
                prop_assert!(state.accepted_value().is_some());
            }

            prev_promised = promised;
        }
    }

    #[test]
    fn winner_propagates_at_most_once(froms in proptest::collection::vec(2u32..=9, 1..32)) {
        let mut state = PaxosState::new(MemberId(1), 9);
        let mut broadcasts = 0;

        for from in froms {
            let out = state.handle(Message::Accepted {
                number: ProposalNumber(1),
                value: "Member 1".to_string(),
                from: MemberId(from),
            });
            if matches!(out, Some(Outbound::Broadcast { .. })) {
                broadcasts += 1;
            }
        }

        prop_assert!(broadcasts <= 1);
    }

    #[test]
    fn redelivered_accept_request_is_idempotent(
        number in 1u64..=16,
        value in arb_value(),
        repeats in 2usize..6,
    ) {
        let mut state = PaxosState::new(MemberId(1), 9);
        let number = ProposalNumber(number);

        for _ in 0..repeats {
            let out = state.handle(Message::AcceptRequest {
                number,
                value: value.clone(),
                from: MemberId(2),
            });
            // Every delivery re-confirms with an ACCEPTED reply, nothing more.
            let is_accepted_reply = matches!(
                out,
                Some(Outbound::Reply { message: Message::Accepted { .. }, .. })
            );
            prop_assert!(is_accepted_reply);
            prop_assert_eq!(state.accepted_value(), Some(value.as_str()));
            prop_assert_eq!(state.accepted_proposal_number(), Some(number));
        }
    }
}
