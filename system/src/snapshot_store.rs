use std::collections::HashMap;

use crate::card_state::CardState;
use crate::message::{MeetingParticipant, MeetingSnapshot};
use crate::types::ParticipantId;

/// Holds the latest server-pushed [`MeetingSnapshot`] (or none, before first
/// receipt) and answers every UI-visible aggregate from it. Replace-only:
/// consistency comes from trusting the latest full snapshot, never from
/// reconciling deltas.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: Option<MeetingSnapshot>,
    by_id: HashMap<ParticipantId, usize>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a new snapshot wholesale. The previous one is discarded; the
    /// latest message always fully supersedes it.
    pub fn replace(&mut self, snapshot: MeetingSnapshot) {
        self.by_id = snapshot
            .participants
            .iter()
            .enumerate()
            .map(|(index, participant)| (participant.id.clone(), index))
            .collect();
        self.current = Some(snapshot);
    }

    pub fn snapshot(&self) -> Option<&MeetingSnapshot> {
        self.current.as_ref()
    }

    /// Count of participants currently holding `state`.
    pub fn state_count(&self, state: CardState) -> usize {
        self.current.as_ref().map_or(0, |snapshot| {
            snapshot
                .participants
                .iter()
                .filter(|participant| participant.card_state == state)
                .count()
        })
    }

    /// Lookup by id. A miss is a normal outcome, e.g. a questioner who has
    /// since left the meeting.
    pub fn participant(&self, id: &str) -> Option<&MeetingParticipant> {
        let snapshot = self.current.as_ref()?;
        self.by_id
            .get(id)
            .and_then(|&index| snapshot.participants.get(index))
    }

    /// The speaker queue in server-assigned order. Ids that no longer resolve
    /// are dropped silently; the order is never re-sorted client-side — this
    /// is the single place where who-asked-first fairness is preserved.
    pub fn speaker_queue(&self) -> Vec<&MeetingParticipant> {
        self.current.as_ref().map_or_else(Vec::new, |snapshot| {
            snapshot
                .questions
                .iter()
                .filter_map(|id| self.participant(id))
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::decode_snapshot;

    fn snapshot(raw: &str) -> MeetingSnapshot {
        decode_snapshot(raw).expect("must decode")
    }

    const TWO_QUESTIONERS: &str = r#"{
        "participants": [
            {"id": "p1", "name": "Ada", "card_state": "question"},
            {"id": "p2", "name": "Grace", "card_state": "question_cool"},
            {"id": "p3", "name": "Edsger", "card_state": "warm"}
        ],
        "questions": ["p2", "p1"]
    }"#;

    #[test]
    fn it_counts_states() {
        let mut store = SnapshotStore::new();
        assert_eq!(store.state_count(CardState::Warm), 0);

        store.replace(snapshot(TWO_QUESTIONERS));
        assert_eq!(store.state_count(CardState::Warm), 1);
        assert_eq!(store.state_count(CardState::Question), 1);
        assert_eq!(store.state_count(CardState::Cool), 0);
    }

    #[test]
    fn it_preserves_speaker_queue_order_verbatim() {
        let mut store = SnapshotStore::new();
        store.replace(snapshot(TWO_QUESTIONERS));

        // p2 asked first even though p1 sorts first in the participant list
        let queue = store.speaker_queue();
        let ids: Vec<&str> = queue.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p2", "p1"]);
    }

    #[test]
    fn it_treats_replacement_as_idempotent() {
        let mut store = SnapshotStore::new();
        store.replace(snapshot(TWO_QUESTIONERS));
        store.replace(snapshot(TWO_QUESTIONERS));

        assert_eq!(store.state_count(CardState::Warm), 1);
        assert_eq!(store.speaker_queue().len(), 2);
    }

    #[test]
    fn it_drops_stale_queue_ids() {
        let mut store = SnapshotStore::new();
        store.replace(snapshot(
            r#"{
                "participants": [{"id": "p1", "name": "Ada", "card_state": "none"}],
                "questions": ["p1", "gone"]
            }"#,
        ));

        assert!(store.participant("gone").is_none());
        let queue = store.speaker_queue();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].id, "p1");
    }

    #[test]
    fn it_is_empty_before_first_receipt() {
        let store = SnapshotStore::new();
        assert!(store.snapshot().is_none());
        assert!(store.participant("p1").is_none());
        assert!(store.speaker_queue().is_empty());
    }
}
