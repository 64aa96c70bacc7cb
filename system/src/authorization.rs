use crate::card_state::CardState;
use crate::message::{MeetingParticipant, Participation, Role};

/// Moderation actions a host may attempt against another participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantAction {
    LowerCard,
    PromoteToHost,
    Remove,
}

/// Which controls to offer `actor` against `target`. Advisory only: the
/// meeting service independently re-validates every mutating request, so
/// this is a UX aid and never a security boundary.
pub fn allowed_actions(
    actor: &Participation,
    target: &MeetingParticipant,
) -> Vec<ParticipantAction> {
    // Only hosts moderate, and nobody self-moderates through this path.
    if actor.role != Role::Host || actor.id == target.id {
        return Vec::new();
    }
    let mut actions = Vec::new();
    if target.card_state != CardState::None {
        actions.push(ParticipantAction::LowerCard);
    }
    if target.role != Role::Host {
        actions.push(ParticipantAction::PromoteToHost);
    }
    actions.push(ParticipantAction::Remove);
    actions
}
