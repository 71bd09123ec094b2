//! Participant state machine
//!
//! One contestant's client. It joins a room, then bounces between waiting
//! and the prompts the server sends:
//!
//! ```text
//! Joining ──ok──► Waiting ──answer──► Answering ──ok──► Waiting
//!    │               │                                     │
//!  error             └──vote──► Voting ──ok──► Waiting ◄───┘
//!    ▼
//! Joining (rejected, connection closed)
//! ```
//!
//! Answers and votes are sent as soon as they are submitted; the server
//! decides whether they count. The input is cleared straight away but the
//! phase only changes when the server acknowledges, and a second submission
//! is refused until then.

use web_time::Instant;

use crate::{
    codec::Message,
    protocol::{Ballot, Command, JoinRequest, ParticipantEvent, Results, Text},
    render::{PhaseData, PhaseName},
    roster::{Standing, standings},
    session::{ActionError, Effect, Machine},
};

/// Phases of the Participant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantPhase {
    /// Waiting for the server to accept the join
    Joining,
    /// Between prompts
    Waiting,
    /// Writing an answer
    Answering,
    /// Choosing an answer to vote for
    Voting,
}

impl From<ParticipantPhase> for PhaseName {
    fn from(phase: ParticipantPhase) -> Self {
        match phase {
            ParticipantPhase::Joining => Self::Joining,
            ParticipantPhase::Waiting => Self::Waiting,
            ParticipantPhase::Answering => Self::Answering,
            ParticipantPhase::Voting => Self::Voting,
        }
    }
}

/// Phase together with what it shows
#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Joining {
        error: Option<String>,
    },
    Waiting,
    Answering {
        prompt: String,
        draft: String,
        error: Option<String>,
    },
    Voting {
        ballot: Ballot,
        error: Option<String>,
    },
}

/// A contestant's client
#[derive(Debug)]
pub struct Participant {
    name: String,
    room_code: String,
    state: State,
    pending: Option<String>,
    standings: Vec<Standing>,
}

impl Participant {
    /// Creates a client that will join `room_code` as `name`
    pub fn new(name: impl Into<String>, room_code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            room_code: room_code.into(),
            state: State::Joining { error: None },
            pending: None,
            standings: Vec::new(),
        }
    }

    /// The current phase
    pub fn phase(&self) -> ParticipantPhase {
        match self.state {
            State::Joining { .. } => ParticipantPhase::Joining,
            State::Waiting => ParticipantPhase::Waiting,
            State::Answering { .. } => ParticipantPhase::Answering,
            State::Voting { .. } => ParticipantPhase::Voting,
        }
    }

    /// The submission awaiting acknowledgement, if any
    pub fn pending(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    /// Submits an answer to the current prompt
    ///
    /// The answer is sent immediately; validity is the server's call.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Unavailable`] outside `Answering` and
    /// [`ActionError::SubmissionPending`] while a previous submission is
    /// unacknowledged.
    pub fn submit_answer(&mut self, text: impl Into<String>) -> Result<Vec<Effect>, ActionError> {
        if !matches!(self.state, State::Answering { .. }) {
            return Err(self.unavailable("answer"));
        }
        if self.pending.is_some() {
            return Err(ActionError::SubmissionPending);
        }

        let text = text.into();
        if let State::Answering { draft, error, .. } = &mut self.state {
            draft.clear();
            *error = None;
        }
        self.pending = Some(text.clone());

        Ok(vec![
            Effect::Send(Command::Answer(Text { text })),
            Effect::Render(self.view()),
        ])
    }

    /// Votes for one of the answers on the ballot
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Unavailable`] outside `Voting` and
    /// [`ActionError::SubmissionPending`] while a previous submission is
    /// unacknowledged.
    pub fn submit_vote(&mut self, text: impl Into<String>) -> Result<Vec<Effect>, ActionError> {
        if !matches!(self.state, State::Voting { .. }) {
            return Err(self.unavailable("vote"));
        }
        if self.pending.is_some() {
            return Err(ActionError::SubmissionPending);
        }

        let text = text.into();
        if let State::Voting { error, .. } = &mut self.state {
            *error = None;
        }
        self.pending = Some(text.clone());

        Ok(vec![
            Effect::Send(Command::Vote(Text { text })),
            Effect::Render(self.view()),
        ])
    }

    fn unavailable(&self, action: &'static str) -> ActionError {
        ActionError::Unavailable {
            action,
            phase: self.phase().into(),
        }
    }

    fn view(&self) -> PhaseData {
        match &self.state {
            State::Joining { error } => PhaseData::Joining {
                error: error.clone(),
            },
            State::Waiting => PhaseData::Waiting,
            State::Answering {
                prompt,
                draft,
                error,
            } => PhaseData::Answering {
                prompt: prompt.clone(),
                draft: draft.clone(),
                pending: self.pending.is_some(),
                error: error.clone(),
            },
            State::Voting { ballot, error } => PhaseData::Voting {
                ballot: ballot.clone(),
                pending: self.pending.is_some(),
                error: error.clone(),
            },
        }
    }

    fn enter(&mut self, state: State) -> Vec<Effect> {
        tracing::debug!(from = ?self.phase(), "participant transition");
        self.state = state;
        self.pending = None;
        vec![Effect::Render(self.view())]
    }

    fn on_joining(&mut self, event: ParticipantEvent) -> Vec<Effect> {
        match event {
            ParticipantEvent::Ok => self.enter(State::Waiting),
            ParticipantEvent::Error(Text { text }) => {
                tracing::info!(%text, "join rejected");
                self.state = State::Joining {
                    error: Some(text.clone()),
                };
                vec![
                    Effect::RenderError(text),
                    Effect::Render(self.view()),
                    Effect::Close,
                ]
            }
            event => {
                tracing::warn!(kind = event.kind(), "ignored while joining");
                Vec::new()
            }
        }
    }

    fn on_waiting(&mut self, event: ParticipantEvent) -> Vec<Effect> {
        match event {
            ParticipantEvent::AnswerPrompt(Text { text }) => self.enter(State::Answering {
                prompt: text,
                draft: String::new(),
                error: None,
            }),
            ParticipantEvent::VotePrompt(ballot) => self.enter(State::Voting {
                ballot,
                error: None,
            }),
            ParticipantEvent::Results(Results { points, .. }) => {
                self.standings = standings(points.into_iter().map(|p| (p.player, p.total)));
                self.enter(State::Waiting)
            }
            ParticipantEvent::Complete => {
                let mut effects = self.enter(State::Waiting);
                effects.push(Effect::Render(PhaseData::Complete {
                    standings: self.standings.clone(),
                }));
                effects
            }
            ParticipantEvent::Error(Text { text }) => vec![Effect::RenderError(text)],
            ParticipantEvent::Ok => {
                tracing::debug!("stray acknowledgement while waiting");
                Vec::new()
            }
        }
    }

    fn on_answering(&mut self, event: ParticipantEvent) -> Vec<Effect> {
        match event {
            ParticipantEvent::Ok => self.enter(State::Waiting),
            ParticipantEvent::Error(Text { text }) => {
                let rejected = self.pending.take();
                if let State::Answering { draft, error, .. } = &mut self.state {
                    if let Some(rejected) = rejected {
                        *draft = rejected;
                    }
                    *error = Some(text.clone());
                }
                vec![Effect::RenderError(text), Effect::Render(self.view())]
            }
            event => {
                tracing::debug!(kind = event.kind(), "answering falls back to waiting");
                self.on_waiting(event)
            }
        }
    }

    fn on_voting(&mut self, event: ParticipantEvent) -> Vec<Effect> {
        match event {
            ParticipantEvent::Ok => self.enter(State::Waiting),
            ParticipantEvent::Error(Text { text }) => {
                self.pending = None;
                if let State::Voting { error, .. } = &mut self.state {
                    *error = Some(text.clone());
                }
                vec![Effect::RenderError(text), Effect::Render(self.view())]
            }
            event => {
                tracing::debug!(kind = event.kind(), "voting falls back to waiting");
                self.on_waiting(event)
            }
        }
    }
}

impl Machine for Participant {
    type Event = ParticipantEvent;

    fn on_open(&mut self, _now: Instant) -> Vec<Effect> {
        self.state = State::Joining { error: None };
        self.pending = None;
        vec![
            Effect::Send(Command::Join(JoinRequest {
                name: self.name.clone(),
                room_code: self.room_code.clone(),
            })),
            Effect::Render(self.view()),
        ]
    }

    fn on_close(&mut self, reason: &str) -> Vec<Effect> {
        let error = match &self.state {
            State::Joining {
                error: Some(rejection),
            } => rejection.clone(),
            _ => "Connection closed".to_string(),
        };
        tracing::debug!(%reason, "participant reset");

        self.state = State::Joining {
            error: Some(error),
        };
        self.pending = None;
        self.standings.clear();
        vec![Effect::Render(self.view())]
    }

    fn apply(&mut self, event: ParticipantEvent, _now: Instant) -> Vec<Effect> {
        match self.phase() {
            ParticipantPhase::Joining => self.on_joining(event),
            ParticipantPhase::Waiting => self.on_waiting(event),
            ParticipantPhase::Answering => self.on_answering(event),
            ParticipantPhase::Voting => self.on_voting(event),
        }
    }

    fn initial_view(&self) -> PhaseData {
        self.view()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::protocol::{Player, Points};

    fn text(text: &str) -> Text {
        Text {
            text: text.to_string(),
        }
    }

    fn joined() -> Participant {
        let mut participant = Participant::new("Alice", "ABCD");
        participant.on_open(Instant::now());
        participant.apply(ParticipantEvent::Ok, Instant::now());
        participant
    }

    fn answering() -> Participant {
        let mut participant = joined();
        participant.apply(
            ParticipantEvent::AnswerPrompt(text("What colour is the sky?")),
            Instant::now(),
        );
        participant
    }

    fn sent(effects: &[Effect]) -> Vec<&Command> {
        effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::Send(command) => Some(command),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_open_sends_join() {
        let mut participant = Participant::new("Alice", "ABCD");

        let effects = participant.on_open(Instant::now());

        assert_eq!(
            sent(&effects),
            vec![&Command::Join(JoinRequest {
                name: "Alice".to_string(),
                room_code: "ABCD".to_string(),
            })]
        );
        assert_eq!(participant.phase(), ParticipantPhase::Joining);
    }

    #[test]
    fn test_join_ok_moves_to_waiting() {
        let participant = joined();

        assert_eq!(participant.phase(), ParticipantPhase::Waiting);
    }

    #[test]
    fn test_join_error_closes() {
        let mut participant = Participant::new("Alice", "ZZZZ");
        participant.on_open(Instant::now());

        let effects = participant.apply(
            ParticipantEvent::Error(text("Room not found")),
            Instant::now(),
        );

        assert_eq!(participant.phase(), ParticipantPhase::Joining);
        assert_eq!(effects.first(), Some(&Effect::RenderError("Room not found".to_string())));
        assert_eq!(effects.last(), Some(&Effect::Close));

        let effects = participant.on_close("closed by client");
        assert_eq!(
            effects,
            vec![Effect::Render(PhaseData::Joining {
                error: Some("Room not found".to_string())
            })]
        );
    }

    #[test]
    fn test_answer_round_trip() {
        let mut participant = answering();
        assert_eq!(participant.phase(), ParticipantPhase::Answering);

        let effects = participant.submit_answer("Blue").unwrap();
        assert_eq!(sent(&effects), vec![&Command::Answer(text("Blue"))]);
        assert_eq!(participant.phase(), ParticipantPhase::Answering);
        assert_eq!(participant.pending(), Some("Blue"));
        assert!(effects.contains(&Effect::Render(PhaseData::Answering {
            prompt: "What colour is the sky?".to_string(),
            draft: String::new(),
            pending: true,
            error: None,
        })));

        participant.apply(ParticipantEvent::Ok, Instant::now());
        assert_eq!(participant.phase(), ParticipantPhase::Waiting);
        assert_eq!(participant.pending(), None);
    }

    #[test]
    fn test_second_submission_is_refused() {
        let mut participant = answering();
        participant.submit_answer("Blue").unwrap();

        assert_eq!(
            participant.submit_answer("Green"),
            Err(ActionError::SubmissionPending)
        );
        assert_eq!(participant.pending(), Some("Blue"));
    }

    #[test]
    fn test_answer_error_keeps_input() {
        let mut participant = answering();
        participant.submit_answer("Blue").unwrap();

        let effects = participant.apply(ParticipantEvent::Error(text("Too late")), Instant::now());

        assert_eq!(participant.phase(), ParticipantPhase::Answering);
        assert_eq!(participant.pending(), None);
        assert_eq!(
            effects,
            vec![
                Effect::RenderError("Too late".to_string()),
                Effect::Render(PhaseData::Answering {
                    prompt: "What colour is the sky?".to_string(),
                    draft: "Blue".to_string(),
                    pending: false,
                    error: Some("Too late".to_string()),
                }),
            ]
        );

        assert!(participant.submit_answer("Blue!").is_ok());
    }

    #[test]
    fn test_cannot_submit_while_waiting() {
        let mut participant = joined();

        assert_eq!(
            participant.submit_answer("Blue"),
            Err(ActionError::Unavailable {
                action: "answer",
                phase: PhaseName::Waiting,
            })
        );
        assert!(matches!(
            participant.submit_vote("Blue"),
            Err(ActionError::Unavailable { .. })
        ));
    }

    #[test]
    fn test_cannot_vote_while_answering() {
        let mut participant = answering();

        assert!(matches!(
            participant.submit_vote("Blue"),
            Err(ActionError::Unavailable {
                action: "vote",
                phase: PhaseName::Answering,
            })
        ));
    }

    #[test]
    fn test_vote_flow() {
        let mut participant = joined();
        participant.apply(
            ParticipantEvent::VotePrompt(Ballot {
                text: "What colour is the sky?".to_string(),
                answers: vec!["BLUE".to_string(), "GREEN".to_string()],
            }),
            Instant::now(),
        );
        assert_eq!(participant.phase(), ParticipantPhase::Voting);

        let effects = participant.submit_vote("GREEN").unwrap();
        assert_eq!(sent(&effects), vec![&Command::Vote(text("GREEN"))]);

        participant.apply(ParticipantEvent::Error(text("Cannot vote for your own answer")), Instant::now());
        assert_eq!(participant.phase(), ParticipantPhase::Voting);
        assert_eq!(participant.pending(), None);

        participant.submit_vote("BLUE").unwrap();
        participant.apply(ParticipantEvent::Ok, Instant::now());
        assert_eq!(participant.phase(), ParticipantPhase::Waiting);
    }

    #[test]
    fn test_answering_falls_back_to_waiting_handler() {
        let mut participant = answering();

        participant.apply(
            ParticipantEvent::VotePrompt(Ballot {
                text: "What colour is the sky?".to_string(),
                answers: vec!["BLUE".to_string()],
            }),
            Instant::now(),
        );

        assert_eq!(participant.phase(), ParticipantPhase::Voting);
    }

    #[test]
    fn test_results_and_complete_stay_waiting() {
        let mut participant = joined();
        let alice = Player {
            id: "a".to_string(),
            name: "Alice".to_string(),
        };

        participant.apply(
            ParticipantEvent::Results(Results {
                points: vec![Points {
                    player: alice.clone(),
                    total: 900,
                }],
                offsets: vec![],
            }),
            Instant::now(),
        );
        assert_eq!(participant.phase(), ParticipantPhase::Waiting);

        let effects = participant.apply(ParticipantEvent::Complete, Instant::now());
        assert_eq!(participant.phase(), ParticipantPhase::Waiting);
        assert_eq!(
            effects.last(),
            Some(&Effect::Render(PhaseData::Complete {
                standings: vec![Standing {
                    position: 0,
                    player: alice,
                    total: 900,
                }]
            }))
        );
    }

    #[test]
    fn test_joining_ignores_prompts() {
        let mut participant = Participant::new("Alice", "ABCD");
        participant.on_open(Instant::now());

        let effects = participant.apply(ParticipantEvent::AnswerPrompt(text("Q?")), Instant::now());

        assert!(effects.is_empty());
        assert_eq!(participant.phase(), ParticipantPhase::Joining);
    }

    #[test]
    fn test_close_resets_to_joining() {
        let mut participant = answering();
        participant.submit_answer("Blue").unwrap();

        let effects = participant.on_close("connection reset");

        assert_eq!(participant.phase(), ParticipantPhase::Joining);
        assert_eq!(participant.pending(), None);
        assert_eq!(
            effects,
            vec![Effect::Render(PhaseData::Joining {
                error: Some("Connection closed".to_string())
            })]
        );
    }
}
