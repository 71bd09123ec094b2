//! Render bridge
//!
//! The state machines never draw anything themselves. After every transition
//! they describe the view that should be on screen as a [`PhaseData`] value
//! and hand it to whatever implements [`RenderBridge`]: a terminal printer,
//! a canvas, a recording double in tests.

use derive_more::Display;

use crate::{
    protocol::{AnswerOffsets, Ballot, Player, Question},
    roster::Standing,
};

/// Names of the views a client can show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum PhaseName {
    /// Participant: entering a name and room code, or rejected
    #[display("joining")]
    Joining,
    /// Participant: between prompts
    #[display("waiting")]
    Waiting,
    /// Participant: writing an answer
    #[display("answering")]
    Answering,
    /// Participant: choosing an answer to vote for
    #[display("voting")]
    Voting,
    /// Controller: waiting for the room to be created
    #[display("creating")]
    Creating,
    /// Controller: showing the room code and who has joined
    #[display("lobby")]
    Lobby,
    /// Controller: contestants are writing answers
    #[display("collecting answers")]
    CollectingAnswers,
    /// Controller: contestants are voting
    #[display("collecting votes")]
    CollectingVotes,
    /// Controller: showing the round's results
    #[display("results")]
    Results,
    /// Controller: showing cumulative standings between rounds
    #[display("summary")]
    Summary,
    /// Both: the game is over
    #[display("complete")]
    Complete,
}

/// Progress of a timed collection phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    /// The question being collected for
    pub question: Question,
    /// Contestants who have responded so far
    pub responded: usize,
    /// Contestants in the room
    pub expected: usize,
    /// Whole seconds left on the phase clock
    pub remaining: u64,
}

/// Everything a view needs to draw one phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseData {
    /// Join form, with the reason the last attempt ended if there was one
    Joining {
        /// Rejection or disconnection message
        error: Option<String>,
    },
    /// Idle screen between prompts
    Waiting,
    /// Answer form
    Answering {
        /// The question to answer
        prompt: String,
        /// Text to prefill the input with
        draft: String,
        /// Whether a submission is awaiting acknowledgement
        pending: bool,
        /// Inline rejection of the last submission
        error: Option<String>,
    },
    /// Ballot
    Voting {
        /// The question and the answers that can be voted for
        ballot: Ballot,
        /// Whether a vote is awaiting acknowledgement
        pending: bool,
        /// Inline rejection of the last vote
        error: Option<String>,
    },
    /// Waiting for the server to create a room
    Creating,
    /// Room code and roster
    Lobby {
        /// Code contestants type in to join
        room_code: String,
        /// Contestants in join order
        players: Vec<Player>,
    },
    /// Answer collection in progress
    CollectingAnswers(Collection),
    /// Vote collection in progress
    CollectingVotes(Collection),
    /// Round results
    Results {
        /// The question with its tallied answers
        question: Question,
        /// Points each answer earned, per contestant
        offsets: Vec<AnswerOffsets>,
        /// Standings after this round
        standings: Vec<Standing>,
    },
    /// Standings between rounds
    Summary {
        /// Contestants ordered by total points
        standings: Vec<Standing>,
    },
    /// Final standings
    Complete {
        /// Contestants ordered by total points
        standings: Vec<Standing>,
    },
}

impl PhaseData {
    /// The view this data is drawn by
    pub fn name(&self) -> PhaseName {
        match self {
            Self::Joining { .. } => PhaseName::Joining,
            Self::Waiting => PhaseName::Waiting,
            Self::Answering { .. } => PhaseName::Answering,
            Self::Voting { .. } => PhaseName::Voting,
            Self::Creating => PhaseName::Creating,
            Self::Lobby { .. } => PhaseName::Lobby,
            Self::CollectingAnswers(_) => PhaseName::CollectingAnswers,
            Self::CollectingVotes(_) => PhaseName::CollectingVotes,
            Self::Results { .. } => PhaseName::Results,
            Self::Summary { .. } => PhaseName::Summary,
            Self::Complete { .. } => PhaseName::Complete,
        }
    }
}

/// Presentation callbacks the state machines drive
///
/// Implementations only draw; nothing they do is fed back into the state
/// machines.
pub trait RenderBridge {
    /// Draws the view for a phase
    ///
    /// # Arguments
    ///
    /// * `name` - The view to draw
    /// * `data` - Everything the view shows
    fn render_phase(&mut self, name: PhaseName, data: &PhaseData);

    /// Shows an error message on top of the current view
    ///
    /// # Arguments
    ///
    /// * `text` - The message to show
    fn render_error(&mut self, text: &str);
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_phase_name_display() {
        assert_eq!(PhaseName::Waiting.to_string(), "waiting");
        assert_eq!(PhaseName::CollectingAnswers.to_string(), "collecting answers");
        assert_eq!(PhaseName::Complete.to_string(), "complete");
    }

    #[test]
    fn test_data_names_its_view() {
        assert_eq!(PhaseData::Waiting.name(), PhaseName::Waiting);
        assert_eq!(
            PhaseData::Joining { error: None }.name(),
            PhaseName::Joining
        );
        assert_eq!(
            PhaseData::Summary { standings: vec![] }.name(),
            PhaseName::Summary
        );
        assert_eq!(
            PhaseData::CollectingVotes(Collection {
                question: Question {
                    text: "Q?".to_string(),
                    multiplier: None,
                    answers: vec![],
                },
                responded: 0,
                expected: 3,
                remaining: 30,
            })
            .name(),
            PhaseName::CollectingVotes
        );
    }
}
