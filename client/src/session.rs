use tokio::sync::mpsc;

use system::{
    allowed_actions, CardState, MeetingEvent, MeetingParticipant, MeetingSnapshot,
    ParticipantAction, Participation, SnapshotStore,
};

use crate::connection::{
    ClientError, ConnectionEvent, MeetingConfig, MeetingConnection,
};

/// Everything the meeting view reads and pokes: the caller's identity, the
/// channel, the latest snapshot and the locally selected card. Owned by the
/// presentation layer for exactly the lifetime of the meeting view.
pub struct MeetingSession {
    participation: Participation,
    card_state: CardState,
    store: SnapshotStore,
    connection: MeetingConnection,
    disconnected: bool,
}

impl MeetingSession {
    pub fn connect(config: MeetingConfig) -> (Self, mpsc::Receiver<ConnectionEvent>) {
        let participation = config.participation.clone();
        let (connection, events) = MeetingConnection::connect(config);
        (Self::with_connection(participation, connection), events)
    }

    /// Wrap an already-started connection. Tests use this to inject a mock
    /// transport.
    pub fn with_connection(participation: Participation, connection: MeetingConnection) -> Self {
        Self {
            participation,
            card_state: CardState::None,
            store: SnapshotStore::new(),
            connection,
            disconnected: false,
        }
    }

    /// Pick a card. Any state may follow any other; legality is entirely
    /// about encoding, not sequencing.
    pub fn select_card(&mut self, state: CardState) -> Result<(), ClientError> {
        self.card_state = state;
        self.connection.select_card(state)
    }

    /// Host action: clear another participant's card.
    pub fn lower_card(&mut self, target: &MeetingParticipant) -> Result<(), ClientError> {
        self.connection.send_event(MeetingEvent::CardChange {
            pid: target.id.clone(),
            state: CardState::None,
        })
    }

    /// Host action: clear every card in the meeting.
    pub fn lower_all_cards(&mut self) -> Result<(), ClientError> {
        self.connection.send_event(MeetingEvent::LowerAllCards {
            pid: self.participation.id.clone(),
        })
    }

    /// Feed one lifecycle notification through the session.
    pub fn handle_event(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Open => {
                self.disconnected = false;
            }
            ConnectionEvent::Snapshot(snapshot) => {
                self.store.replace(snapshot);
            }
            ConnectionEvent::Closed { reason } => {
                log::info!("Meeting channel closed: {:?}", reason);
                self.disconnected = true;
            }
        }
    }

    pub fn participation(&self) -> &Participation {
        &self.participation
    }

    /// The locally selected card, which may be ahead of the shared view until
    /// the next snapshot reflects it.
    pub fn card_state(&self) -> CardState {
        self.card_state
    }

    /// True once the channel is permanently down; rendered as a passive
    /// indicator, never as a hard failure.
    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }

    pub fn snapshot(&self) -> Option<&MeetingSnapshot> {
        self.store.snapshot()
    }

    pub fn state_count(&self, state: CardState) -> usize {
        self.store.state_count(state)
    }

    pub fn participant(&self, id: &str) -> Option<&MeetingParticipant> {
        self.store.participant(id)
    }

    pub fn speaker_queue(&self) -> Vec<&MeetingParticipant> {
        self.store.speaker_queue()
    }

    /// Which moderation controls to show for `target`. Advisory; the service
    /// re-validates every request.
    pub fn actions_for(&self, target: &MeetingParticipant) -> Vec<ParticipantAction> {
        allowed_actions(&self.participation, target)
    }

    /// Tear the channel down. Safe to call on any exit path.
    pub async fn shutdown(&mut self) {
        self.connection.shutdown().await;
    }
}
