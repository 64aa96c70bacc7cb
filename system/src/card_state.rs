use serde::{Deserialize, Deserializer, Serialize};

/// One discrete sentiment state per participant. `QuestionWarm` and
/// `QuestionCool` mean "has a pending question AND currently warm/cool";
/// `MoveOn` means warm and cool at once, a facilitation signal rather than a
/// contradiction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CardState {
    None,
    Warm,
    Cool,
    Question,
    QuestionWarm,
    QuestionCool,
    MoveOn,
}

/// The legacy three-boolean encoding of a card state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardFlags {
    pub warm: bool,
    pub cool: bool,
    pub question: bool,
}

impl CardState {
    /// Collapse the legacy boolean triple into a single state. The mapping is
    /// lossy; precedence is fixed: move-on, then the question composites,
    /// then single flags.
    pub fn from_flags(flags: CardFlags) -> Self {
        if flags.warm && flags.cool {
            CardState::MoveOn
        } else if flags.warm && flags.question {
            CardState::QuestionWarm
        } else if flags.cool && flags.question {
            CardState::QuestionCool
        } else if flags.warm {
            CardState::Warm
        } else if flags.cool {
            CardState::Cool
        } else if flags.question {
            CardState::Question
        } else {
            CardState::None
        }
    }

    pub fn flags(self) -> CardFlags {
        match self {
            CardState::None => CardFlags::default(),
            CardState::Warm => CardFlags {
                warm: true,
                ..CardFlags::default()
            },
            CardState::Cool => CardFlags {
                cool: true,
                ..CardFlags::default()
            },
            CardState::Question => CardFlags {
                question: true,
                ..CardFlags::default()
            },
            CardState::QuestionWarm => CardFlags {
                warm: true,
                question: true,
                ..CardFlags::default()
            },
            CardState::QuestionCool => CardFlags {
                cool: true,
                question: true,
                ..CardFlags::default()
            },
            CardState::MoveOn => CardFlags {
                warm: true,
                cool: true,
                ..CardFlags::default()
            },
        }
    }

    /// True for the states that keep a participant in the speaker queue.
    pub fn is_question(self) -> bool {
        matches!(
            self,
            CardState::Question | CardState::QuestionWarm | CardState::QuestionCool
        )
    }

    /// Display meaning of each state. The composite labels are product
    /// decisions baked into the encoding.
    pub fn label(self) -> &'static str {
        match self {
            CardState::None => "No card",
            CardState::Warm => "Warm",
            CardState::Cool => "Cool",
            CardState::Question => "Question",
            CardState::QuestionWarm => "Speak for",
            CardState::QuestionCool => "Speak against",
            CardState::MoveOn => "Move on",
        }
    }

    fn from_wire(raw: &str) -> Option<Self> {
        match raw {
            "none" => Some(CardState::None),
            "warm" => Some(CardState::Warm),
            "cool" => Some(CardState::Cool),
            "question" => Some(CardState::Question),
            "question_warm" => Some(CardState::QuestionWarm),
            "question_cool" => Some(CardState::QuestionCool),
            "move_on" => Some(CardState::MoveOn),
            _ => None,
        }
    }
}

impl Default for CardState {
    fn default() -> Self {
        CardState::None
    }
}

/// Unrecognized wire values decode to `None` instead of failing the whole
/// snapshot, so a newer service cannot corrupt the view.
impl<'de> Deserialize<'de> for CardState {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(CardState::from_wire(&raw).unwrap_or_else(|| {
            log::warn!("Unknown card state on the wire: {:?}", raw);
            CardState::None
        }))
    }
}
