use system::{
    allowed_actions, decode_snapshot, encode_event, CardState, MeetingEvent, ParticipantAction,
    Participation, Role, SnapshotStore,
};

#[test]
fn it_follows_a_meeting_through_card_changes_and_removal() {
    let mut store = SnapshotStore::new();

    // A joins and raises warm
    store.replace(
        decode_snapshot(
            r#"{
                "participants": [
                    {"id": "a", "name": "Ada", "role": "member", "card_state": "warm"},
                    {"id": "b", "name": "Grace", "role": "host", "card_state": "none"}
                ],
                "questions": []
            }"#,
        )
        .expect("must decode"),
    );
    assert_eq!(store.state_count(CardState::Warm), 1);
    assert!(store.speaker_queue().is_empty());

    // A switches to question; the server moves them into the queue
    store.replace(
        decode_snapshot(
            r#"{
                "participants": [
                    {"id": "a", "name": "Ada", "role": "member", "card_state": "question"},
                    {"id": "b", "name": "Grace", "role": "host", "card_state": "none"}
                ],
                "questions": ["a"]
            }"#,
        )
        .expect("must decode"),
    );
    assert_eq!(store.state_count(CardState::Warm), 0);
    let queue = store.speaker_queue();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].id, "a");

    // host B may lower A's card or remove them; the lower event targets A
    let host = Participation {
        id: "b".into(),
        name: "Grace".into(),
        role: Role::Host,
    };
    let target = store.participant("a").expect("a is present");
    let actions = allowed_actions(&host, target);
    assert!(actions.contains(&ParticipantAction::LowerCard));
    assert!(actions.contains(&ParticipantAction::Remove));
    let lower = MeetingEvent::CardChange {
        pid: target.id.clone(),
        state: CardState::None,
    };
    assert_eq!(
        serde_json::from_str::<serde_json::Value>(&encode_event(&lower)).unwrap(),
        serde_json::json!({"event": "card_change", "pid": "a", "state": "none"}),
    );

    // B removes A; the stale queue id is tolerated as a miss, never a crash
    store.replace(
        decode_snapshot(
            r#"{
                "participants": [
                    {"id": "b", "name": "Grace", "role": "host", "card_state": "none"}
                ],
                "questions": ["a"]
            }"#,
        )
        .expect("must decode"),
    );
    assert!(store.participant("a").is_none());
    assert!(store.speaker_queue().is_empty());
}
