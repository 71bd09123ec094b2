//! Controller state machine
//!
//! The shared-display client that paces the game:
//!
//! ```text
//! Creating ─create─► Lobby ─question─► CollectingAnswers ─► CollectingVotes ─► Results ─► Summary
//!                                            ▲                                              │
//!                                            └──────────────────question────────────────────┤
//!                                                                                complete ──┴─► Complete
//! ```
//!
//! Each collection phase ends either when the server reports that everyone
//! has responded or when the round's phase clock runs out, whichever is
//! applied first. Both paths cancel the clock before sending anything, so a
//! phase is ended exactly once.

use std::time::Duration;

use enum_map::EnumMap;
use web_time::Instant;

use crate::{
    codec::Message,
    config::TimedPhase,
    protocol::{Collected, Command, ControllerEvent, Joined, QuestionPayload, Results, Text},
    render::{PhaseData, PhaseName},
    roster::{Roster, Upsert},
    round::Round,
    session::{ActionError, Effect, Machine},
};

/// Phases of the Controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerPhase {
    /// Waiting for the server to create the room
    Creating,
    /// Contestants are joining
    Lobby,
    /// Contestants are writing answers
    CollectingAnswers,
    /// Contestants are voting
    CollectingVotes,
    /// Waiting for, then showing, the round's results
    Results,
    /// Showing standings between rounds
    Summary,
    /// The game is over
    Complete,
}

impl From<ControllerPhase> for PhaseName {
    fn from(phase: ControllerPhase) -> Self {
        match phase {
            ControllerPhase::Creating => Self::Creating,
            ControllerPhase::Lobby => Self::Lobby,
            ControllerPhase::CollectingAnswers => Self::CollectingAnswers,
            ControllerPhase::CollectingVotes => Self::CollectingVotes,
            ControllerPhase::Results => Self::Results,
            ControllerPhase::Summary => Self::Summary,
            ControllerPhase::Complete => Self::Complete,
        }
    }
}

/// The host's client
#[derive(Debug)]
pub struct Controller {
    phase: ControllerPhase,
    durations: EnumMap<TimedPhase, Duration>,
    room_code: Option<String>,
    roster: Roster,
    round: Option<Round>,
    shown_remaining: Option<u64>,
}

impl Controller {
    /// Creates a Controller with the given phase timings
    pub fn new(durations: EnumMap<TimedPhase, Duration>) -> Self {
        Self {
            phase: ControllerPhase::Creating,
            durations,
            room_code: None,
            roster: Roster::default(),
            round: None,
            shown_remaining: None,
        }
    }

    /// The current phase
    pub fn phase(&self) -> ControllerPhase {
        self.phase
    }

    /// Code of the room, once created
    pub fn room_code(&self) -> Option<&str> {
        self.room_code.as_deref()
    }

    /// Contestants in the room
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// The current round, if one is running
    pub fn round(&self) -> Option<&Round> {
        self.round.as_ref()
    }

    /// Starts the game
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Unavailable`] outside the lobby.
    pub fn begin(&mut self) -> Result<Vec<Effect>, ActionError> {
        if self.phase != ControllerPhase::Lobby {
            return Err(ActionError::Unavailable {
                action: "begin",
                phase: self.phase.into(),
            });
        }

        tracing::info!(players = self.roster.len(), "starting game");
        Ok(vec![Effect::Send(Command::Begin)])
    }

    fn view(&self, now: Instant) -> PhaseData {
        match (self.phase, &self.round) {
            (ControllerPhase::Creating, _) => PhaseData::Creating,
            (ControllerPhase::CollectingAnswers, Some(round)) => {
                PhaseData::CollectingAnswers(round.collection(now))
            }
            (ControllerPhase::CollectingVotes, Some(round)) => {
                PhaseData::CollectingVotes(round.collection(now))
            }
            (ControllerPhase::Results, Some(round)) => PhaseData::Results {
                question: round.question().clone(),
                offsets: round.offsets().to_vec(),
                standings: self.roster.standings(),
            },
            (ControllerPhase::Summary, _) => PhaseData::Summary {
                standings: self.roster.standings(),
            },
            (ControllerPhase::Complete, _) => PhaseData::Complete {
                standings: self.roster.standings(),
            },
            (
                ControllerPhase::Lobby
                | ControllerPhase::CollectingAnswers
                | ControllerPhase::CollectingVotes
                | ControllerPhase::Results,
                _,
            ) => PhaseData::Lobby {
                room_code: self.room_code.clone().unwrap_or_default(),
                players: self.roster.players().to_vec(),
            },
        }
    }

    fn enter(&mut self, phase: ControllerPhase, now: Instant) -> Vec<Effect> {
        tracing::debug!(from = ?self.phase, to = ?phase, "controller transition");
        self.phase = phase;
        self.render(now)
    }

    fn render(&mut self, now: Instant) -> Vec<Effect> {
        self.shown_remaining = self
            .round
            .as_ref()
            .and_then(|round| round.clock().remaining_secs(now));
        vec![Effect::Render(self.view(now))]
    }

    fn ignore(&self, event: &ControllerEvent) -> Vec<Effect> {
        tracing::warn!(kind = event.kind(), phase = ?self.phase, "ignoring event");
        Vec::new()
    }

    /// Arms the round's clock for `phase`
    fn arm(&mut self, phase: TimedPhase, now: Instant) {
        let duration = self.durations[phase];
        if let Some(round) = &mut self.round {
            round.arm(now, duration, phase);
        }
    }

    /// Ends the running collection phase
    ///
    /// Shared by the completion signal and the clock deadline. The clock is
    /// cancelled before the command is sent.
    fn end_collection(&mut self, now: Instant) -> Vec<Effect> {
        if let Some(round) = &mut self.round {
            round.cancel();
        }

        let next = match self.phase {
            ControllerPhase::CollectingAnswers => {
                let expected = self.roster.len();
                if let Some(round) = &mut self.round {
                    round.start_collection(expected);
                }
                self.arm(TimedPhase::Votes, now);
                ControllerPhase::CollectingVotes
            }
            ControllerPhase::CollectingVotes => ControllerPhase::Results,
            phase => {
                tracing::warn!(?phase, "no collection to end");
                return Vec::new();
            }
        };

        let mut effects = vec![Effect::Send(Command::Stop)];
        effects.extend(self.enter(next, now));
        effects
    }

    fn on_question(&mut self, question: QuestionPayload, now: Instant) -> Vec<Effect> {
        self.round = Some(Round::new(question.question, self.roster.len()));
        self.arm(TimedPhase::Answers, now);
        self.enter(ControllerPhase::CollectingAnswers, now)
    }

    fn on_collected(&mut self, collected: Collected, now: Instant) -> Vec<Effect> {
        let Some(round) = &mut self.round else {
            return Vec::new();
        };

        // Answers collected before the server saw our `stop` arrive after we
        // already moved on. They must not end the vote collection.
        if self.phase == ControllerPhase::CollectingVotes && !round.is_voting_open() {
            tracing::debug!(complete = collected.complete, "late answer collection signal");
            return Vec::new();
        }

        round.record(collected.player.as_ref());

        if collected.complete {
            tracing::debug!("everyone responded");
            self.end_collection(now)
        } else {
            self.render(now)
        }
    }

    fn on_vote(&mut self, question: QuestionPayload, now: Instant) -> Vec<Effect> {
        if self.phase == ControllerPhase::CollectingAnswers {
            tracing::debug!("server opened voting");
            let expected = self.roster.len();
            if let Some(round) = &mut self.round {
                round.start_collection(expected);
            }
            self.arm(TimedPhase::Votes, now);
            self.phase = ControllerPhase::CollectingVotes;
        }

        if let Some(round) = &mut self.round {
            round.open_voting();
            round.set_question(question.question);
        }
        self.render(now)
    }

    fn on_results(&mut self, results: &Results, now: Instant) -> Vec<Effect> {
        self.roster.apply_points(&results.points);
        if let Some(round) = &mut self.round {
            round.attach_results(results);
        }
        self.arm(TimedPhase::Results, now);
        self.enter(ControllerPhase::Results, now)
    }

    fn on_complete(&mut self, results: &Results, now: Instant) -> Vec<Effect> {
        if !results.points.is_empty() {
            self.roster.apply_points(&results.points);
        }
        self.round = None;
        tracing::info!("game complete");
        self.enter(ControllerPhase::Complete, now)
    }

    fn on_deadline(&mut self, deadline: TimedPhase, now: Instant) -> Vec<Effect> {
        tracing::debug!(?deadline, "phase clock ran out");

        match (self.phase, deadline) {
            (ControllerPhase::CollectingAnswers, TimedPhase::Answers)
            | (ControllerPhase::CollectingVotes, TimedPhase::Votes) => self.end_collection(now),
            (ControllerPhase::Results, TimedPhase::Results) => {
                let mut effects = vec![Effect::Send(Command::Next)];
                effects.extend(self.enter(ControllerPhase::Summary, now));
                effects
            }
            (phase, deadline) => {
                tracing::warn!(?phase, ?deadline, "stale deadline");
                Vec::new()
            }
        }
    }
}

impl Machine for Controller {
    type Event = ControllerEvent;

    fn on_open(&mut self, now: Instant) -> Vec<Effect> {
        let mut effects = vec![Effect::Send(Command::Create)];
        effects.extend(self.enter(ControllerPhase::Creating, now));
        effects
    }

    fn on_close(&mut self, reason: &str) -> Vec<Effect> {
        tracing::debug!(%reason, phase = ?self.phase, "controller reset");

        self.phase = ControllerPhase::Creating;
        self.room_code = None;
        self.roster.clear();
        self.round = None;
        self.shown_remaining = None;

        vec![
            Effect::RenderError("Connection closed".to_string()),
            Effect::Render(PhaseData::Creating),
        ]
    }

    fn apply(&mut self, event: ControllerEvent, now: Instant) -> Vec<Effect> {
        use ControllerPhase as P;

        match (self.phase, event) {
            (_, ControllerEvent::Error(Text { text })) => {
                tracing::info!(%text, "server error");
                vec![Effect::RenderError(text)]
            }
            (P::Creating, ControllerEvent::Create(created)) => {
                tracing::info!(room_code = %created.room_code, "room created");
                self.room_code = Some(created.room_code);
                self.enter(P::Lobby, now)
            }
            (P::Creating | P::Complete, event) => self.ignore(&event),
            (_, ControllerEvent::Joined(Joined { player })) => {
                tracing::debug!(id = %player.id, name = %player.name, "player joined");
                match self.roster.upsert(player) {
                    Upsert::Unchanged => Vec::new(),
                    Upsert::Added | Upsert::Renamed => self.render(now),
                }
            }
            (_, ControllerEvent::Question(question)) => self.on_question(question, now),
            (P::CollectingAnswers | P::CollectingVotes, ControllerEvent::Collected(collected)) => {
                self.on_collected(collected, now)
            }
            (P::CollectingAnswers | P::CollectingVotes, ControllerEvent::Vote(question)) => {
                self.on_vote(question, now)
            }
            (P::CollectingVotes | P::Results, ControllerEvent::Results(results)) => {
                self.on_results(&results, now)
            }
            (_, ControllerEvent::Complete(results)) => self.on_complete(&results, now),
            (
                P::Lobby | P::CollectingAnswers | P::CollectingVotes | P::Results | P::Summary,
                event @ (ControllerEvent::Create(_)
                | ControllerEvent::Collected(_)
                | ControllerEvent::Vote(_)
                | ControllerEvent::Results(_)),
            ) => self.ignore(&event),
        }
    }

    fn tick(&mut self, now: Instant) -> Vec<Effect> {
        let Some(round) = &mut self.round else {
            return Vec::new();
        };

        if let Some(deadline) = round.poll(now) {
            return self.on_deadline(deadline, now);
        }

        let remaining = round.clock().remaining_secs(now);
        let counting = matches!(
            self.phase,
            ControllerPhase::CollectingAnswers | ControllerPhase::CollectingVotes
        );
        if counting && remaining != self.shown_remaining {
            return self.render(now);
        }

        Vec::new()
    }

    fn initial_view(&self) -> PhaseData {
        PhaseData::Creating
    }
}
