use serde::{Deserialize, Deserializer, Serialize};

use crate::card_state::CardState;
use crate::types::ParticipantId;

/// Role of one attendee within a meeting. Hosts moderate; members signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Host,
    Member,
}

impl Default for Role {
    fn default() -> Self {
        Role::Member
    }
}

/// Unknown roles degrade to `Member`, the least-privileged one.
impl<'de> Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "host" => Role::Host,
            "member" => Role::Member,
            other => {
                log::warn!("Unknown role on the wire: {:?}", other);
                Role::Member
            }
        })
    }
}

/// The caller's own identity within one meeting, as returned by the join
/// endpoint. `id` is stable for the connection's lifetime; `role` may be
/// promoted during the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participation {
    pub id: ParticipantId,
    pub name: String,
    pub role: Role,
}

/// One attendee as carried in a meeting snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingParticipant {
    pub id: ParticipantId,
    pub name: String,
    // older service builds omit the role on the wire
    #[serde(default)]
    pub role: Role,
    pub card_state: CardState,
}

/// Authoritative, server-pushed view of a meeting at one instant. Replaced
/// wholesale on every inbound message; there is no delta merging. `questions`
/// is the speaker queue in server-assigned order, first asked first served.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingSnapshot {
    pub participants: Vec<MeetingParticipant>,
    pub questions: Vec<ParticipantId>,
}

/// Outgoing participant event. `pid` is the acting participant for
/// self-originated events; host moderation carries the target's pid. The
/// server is the authority that validates either way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MeetingEvent {
    CardChange {
        pid: ParticipantId,
        state: CardState,
    },
    LowerAllCards {
        pid: ParticipantId,
    },
}

/// Serialize an outgoing event to one JSON text frame.
pub fn encode_event(event: &MeetingEvent) -> String {
    serde_json::to_string(event).expect("must succeed")
}

/// Decode one inbound text frame. Malformed JSON is a recoverable error:
/// callers log, discard the frame and keep the previous snapshot.
pub fn decode_snapshot(raw: &str) -> Result<MeetingSnapshot, serde_json::Error> {
    serde_json::from_str(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_encodes_a_card_change() {
        let event = MeetingEvent::CardChange {
            pid: "p1".into(),
            state: CardState::QuestionWarm,
        };
        let value: serde_json::Value = serde_json::from_str(&encode_event(&event)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "event": "card_change",
                "pid": "p1",
                "state": "question_warm",
            })
        );
    }

    #[test]
    fn it_encodes_lower_all_cards() {
        let event = MeetingEvent::LowerAllCards { pid: "p1".into() };
        let value: serde_json::Value = serde_json::from_str(&encode_event(&event)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "event": "lower_all_cards",
                "pid": "p1",
            })
        );
    }

    #[test]
    fn it_decodes_a_snapshot() {
        let snapshot = decode_snapshot(
            r#"{
                "participants": [
                    {"id": "p1", "name": "Ada", "role": "host", "card_state": "warm"},
                    {"id": "p2", "name": "Grace", "card_state": "question"}
                ],
                "questions": ["p2"]
            }"#,
        )
        .expect("must decode");

        assert_eq!(snapshot.participants.len(), 2);
        assert_eq!(snapshot.participants[0].role, Role::Host);
        assert_eq!(snapshot.participants[0].card_state, CardState::Warm);
        // missing role defaults to member
        assert_eq!(snapshot.participants[1].role, Role::Member);
        assert_eq!(snapshot.questions, vec!["p2".to_string()]);
    }

    #[test]
    fn it_rejects_a_malformed_frame() {
        assert!(decode_snapshot("{\"participants\": [").is_err());
    }

    #[test]
    fn it_degrades_unknown_roles_to_member() {
        let snapshot = decode_snapshot(
            r#"{
                "participants": [{"id": "p1", "name": "Ada", "role": "overlord", "card_state": "none"}],
                "questions": []
            }"#,
        )
        .expect("must decode");
        assert_eq!(snapshot.participants[0].role, Role::Member);
    }
}
