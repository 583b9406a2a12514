use paxoskv::paxos::*;

fn store() -> AcceptorStore<String> {
    AcceptorStore::new(0, 3)
}

fn prepare(slot: Slot, number: u64, peer: PeerId) -> PrepareArgs {
    PrepareArgs {
        slot,
        round: Round { number, peer },
        sender: peer,
        done: None,
    }
}

fn accept(slot: Slot, number: u64, peer: PeerId, value: &str) -> AcceptArgs<String> {
    AcceptArgs {
        slot,
        round: Round { number, peer },
        value: value.to_string(),
        sender: peer,
        done: None,
    }
}

fn decide(slot: Slot, number: u64, peer: PeerId, value: &str) -> DecideArgs<String> {
    DecideArgs {
        slot,
        round: Round { number, peer },
        value: value.to_string(),
        sender: peer,
        done: None,
    }
}

#[test]
fn test_round_ordering_is_unique_per_peer() {
    let a = Round::initial(0);
    let b = Round::initial(1);
    assert_ne!(a, b);
    assert!(a < b);

    let next = a.next_above(Some(Round { number: 7, peer: 2 }));
    assert_eq!(next, Round { number: 8, peer: 0 });
    assert!(next > Round { number: 7, peer: 2 });

    let bumped = a.next_above(None);
    assert_eq!(bumped.number, 2);
}

#[test]
fn test_quorum_size() {
    assert_eq!(quorum(1), 1);
    assert_eq!(quorum(3), 2);
    assert_eq!(quorum(4), 3);
    assert_eq!(quorum(5), 3);
}

#[test]
fn test_prepare_promises_higher_round() {
    let mut s = store();
    let reply = s.prepare(&prepare(0, 1, 1));
    assert!(reply.ok);
    assert_eq!(reply.promised, Some(Round { number: 1, peer: 1 }));
    assert!(reply.accepted.is_none());
}

#[test]
fn test_prepare_rejects_equal_or_lower_round() {
    let mut s = store();
    assert!(s.prepare(&prepare(0, 5, 1)).ok);

    let same = s.prepare(&prepare(0, 5, 1));
    assert!(!same.ok);

    let lower = s.prepare(&prepare(0, 4, 2));
    assert!(!lower.ok);
    assert_eq!(lower.promised, Some(Round { number: 5, peer: 1 }));
}

#[test]
fn test_rejected_prepare_discloses_accepted_value() {
    let mut s = store();
    assert!(s.prepare(&prepare(0, 5, 1)).ok);
    assert!(s.accept(&accept(0, 5, 1, "x")).ok);

    let reply = s.prepare(&prepare(0, 3, 2));
    assert!(!reply.ok);
    let (n_a, v_a) = reply.accepted.unwrap();
    assert_eq!(n_a, Round { number: 5, peer: 1 });
    assert_eq!(v_a, "x");
}

#[test]
fn test_accept_respects_promise() {
    let mut s = store();
    assert!(s.prepare(&prepare(0, 5, 1)).ok);

    let low = s.accept(&accept(0, 4, 2, "low"));
    assert!(!low.ok);
    assert_eq!(low.promised, Some(Round { number: 5, peer: 1 }));

    let equal = s.accept(&accept(0, 5, 1, "ok"));
    assert!(equal.ok);

    let instance = s.instance(0).unwrap();
    let (n_a, v_a) = instance.accepted.clone().unwrap();
    assert_eq!(v_a, "ok");
    assert!(Some(n_a) <= instance.promised);
}

#[test]
fn test_accept_without_prepare_raises_promise() {
    let mut s = store();
    assert!(s.accept(&accept(3, 2, 1, "v")).ok);

    let instance = s.instance(3).unwrap();
    assert_eq!(instance.promised, Some(Round { number: 2, peer: 1 }));
    assert!(!s.prepare(&prepare(3, 2, 0)).ok);
    assert!(s.prepare(&prepare(3, 3, 0)).ok);
}

#[test]
fn test_decide_marks_slot_and_keeps_first_value() {
    let mut s = store();
    assert_eq!(s.status(0), Fate::Pending);

    s.decide(&decide(0, 4, 1, "first"));
    assert_eq!(s.status(0), Fate::Decided("first".to_string()));

    s.decide(&decide(0, 9, 2, "second"));
    assert_eq!(s.status(0), Fate::Decided("first".to_string()));
}

#[test]
fn test_decided_value_disclosed_to_later_prepare() {
    let mut s = store();
    s.decide(&decide(2, 4, 1, "chosen"));

    let reply = s.prepare(&prepare(2, 10, 2));
    assert!(reply.ok);
    assert_eq!(reply.accepted.map(|(_, v)| v), Some("chosen".to_string()));
}

#[test]
fn test_max_tracks_highest_slot() {
    let mut s = store();
    assert_eq!(s.max(), None);

    s.prepare(&prepare(4, 1, 1));
    s.touch(9);
    s.prepare(&prepare(2, 1, 1));
    assert_eq!(s.max(), Some(9));
}

#[test]
fn test_begin_proposal_once_per_slot() {
    let mut s = store();
    assert!(s.begin_proposal(1));
    assert!(!s.begin_proposal(1));

    s.end_proposal(1);
    assert!(s.begin_proposal(1));

    s.decide(&decide(2, 1, 0, "v"));
    assert!(!s.begin_proposal(2));
}

#[test]
fn test_done_piggybacked_on_messages_collects_garbage() {
    let mut s = store();
    for slot in 0..5 {
        s.decide(&decide(slot, 1, 1, "v"));
    }
    assert_eq!(s.len(), 5);

    s.mark_done(2);
    assert_eq!(s.min(), 0);

    let mut from_one = prepare(9, 1, 1);
    from_one.done = Some(2);
    s.prepare(&from_one);
    assert_eq!(s.min(), 0);

    let mut from_two = prepare(9, 2, 2);
    from_two.done = Some(3);
    s.prepare(&from_two);

    assert_eq!(s.min(), 3);
    assert_eq!(s.status(0), Fate::Forgotten);
    assert_eq!(s.status(2), Fate::Forgotten);
    assert_eq!(s.status(3), Fate::Decided("v".to_string()));
    assert!(s.instance(2).is_none());
    assert!(s.instance(3).is_some());
}

#[test]
fn test_forgotten_slots_are_not_resurrected() {
    let mut s = AcceptorStore::<String>::new(0, 1);
    s.decide(&decide(0, 1, 0, "v"));
    s.mark_done(0);
    assert_eq!(s.min(), 1);
    assert!(s.is_empty());

    assert!(!s.prepare(&prepare(0, 50, 0)).ok);
    assert!(!s.accept(&accept(0, 50, 0, "late")).ok);
    s.decide(&decide(0, 50, 0, "late"));

    assert!(s.is_empty());
    assert_eq!(s.status(0), Fate::Forgotten);
}
