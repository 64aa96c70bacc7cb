/// Server-issued identifier of one meeting attendee. Opaque to the client and
/// stable for the lifetime of the participation.
pub type ParticipantId = String;

/// Human-shareable identifier of a meeting session, used in the channel URL.
pub type ShortCode = String;
