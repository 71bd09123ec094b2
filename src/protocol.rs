//! Wire protocol between the clients and the game server
//!
//! Every message travels as an envelope `{ "kind": ..., "data": ... }`. This
//! module defines the payload shapes and the three message families: the
//! [`Command`]s both clients send, the [`ParticipantEvent`]s a contestant's
//! device receives and the [`ControllerEvent`]s the shared display receives.
//! Converting between these enums and envelopes is the job of
//! [`crate::codec`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::skip_serializing_none;

use crate::codec::{Message, data, payload};

/// A contestant as identified by the server
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Player {
    /// Server-assigned identity, stable for the lifetime of the room
    pub id: String,
    /// Display name chosen when joining
    pub name: String,
}

/// One candidate answer to a question
///
/// The server fills in correctness, authorship and votes progressively, and
/// distinguishes "not assigned yet" (`null`) from "not sent" (absent). The
/// double options keep that distinction: `None` is absent, `Some(None)` is
/// `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    /// The answer text
    pub text: String,
    /// Whether this is the true answer
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub correct: Option<Option<bool>>,
    /// The contestant who wrote this answer, if any
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub player: Option<Option<Player>>,
    /// Contestants who voted for this answer
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub votes: Option<Option<Vec<Player>>>,
}

impl Answer {
    /// Returns `true` if the server marked this answer as the true one
    pub fn is_correct(&self) -> bool {
        matches!(self.correct, Some(Some(true)))
    }

    /// Number of votes this answer received so far
    pub fn vote_count(&self) -> usize {
        self.votes
            .as_ref()
            .and_then(Option::as_ref)
            .map_or(0, Vec::len)
    }
}

/// A trivia question with its candidate answers
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// The question text
    pub text: String,
    /// Score multiplier applied to this round
    pub multiplier: Option<u32>,
    /// Candidate answers in display order
    #[serde(default)]
    pub answers: Vec<Answer>,
}

/// Cumulative score of one contestant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Points {
    /// The contestant
    pub player: Player,
    /// Total points after the latest round
    pub total: i64,
}

/// Points awarded to one contestant by one answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offset {
    /// The contestant receiving the points
    pub player: Player,
    /// Points gained this round
    pub offset: i64,
}

/// All point changes caused by one answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOffsets {
    /// The answer the points were awarded for
    pub answer: Answer,
    /// Per-contestant point deltas
    #[serde(default)]
    pub offsets: Vec<Offset>,
}

/// Payload of `join`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    /// Name the contestant wants to play under
    pub name: String,
    /// Code of the room to join
    pub room_code: String,
}

/// Payload carrying a single piece of text (`answer`, `vote`, `error`, the
/// answer prompt)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Text {
    /// The text
    pub text: String,
}

/// Payload of the Participant's `vote` prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    /// The question being voted on
    pub text: String,
    /// Answers the contestant may vote for
    #[serde(default)]
    pub answers: Vec<String>,
}

/// Payload of the Controller's `create` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomCreated {
    /// Code contestants type in to join
    pub room_code: String,
}

/// Payload of `joined`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Joined {
    /// The contestant who joined or renamed
    pub player: Player,
}

/// Payload of the Controller's `question` and `vote` events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionPayload {
    /// The question in its current state
    pub question: Question,
}

/// Payload of `collected`
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collected {
    /// The contestant whose response was collected
    pub player: Option<Player>,
    /// Whether every contestant has now responded
    #[serde(default)]
    pub complete: bool,
}

/// Payload of `results` (and optionally `complete`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Results {
    /// Cumulative totals for every contestant
    #[serde(default)]
    pub points: Vec<Points>,
    /// Point deltas grouped by answer
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub offsets: Vec<AnswerOffsets>,
}

/// Commands sent from either client to the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Join a room as a contestant
    Join(JoinRequest),
    /// Create a new room as the Controller
    Create,
    /// Start the game
    Begin,
    /// Submit an answer
    Answer(Text),
    /// Submit a vote
    Vote(Text),
    /// End the collection phase currently running on the server
    Stop,
    /// Advance to the next question
    Next,
}

/// Events received by a Participant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticipantEvent {
    /// The previous join or submission was accepted
    Ok,
    /// The previous join or submission was rejected
    Error(Text),
    /// Prompt to write an answer to the question
    AnswerPrompt(Text),
    /// Prompt to vote for one of the answers
    VotePrompt(Ballot),
    /// Results of the round
    Results(Results),
    /// The game is over
    Complete,
}

/// Events received by the Controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    /// The room was created
    Create(RoomCreated),
    /// A contestant joined the room
    Joined(Joined),
    /// A new question opens answer collection
    Question(QuestionPayload),
    /// Vote collection opened; carries every candidate answer
    Vote(QuestionPayload),
    /// A response was collected
    Collected(Collected),
    /// Results of the round
    Results(Results),
    /// The game is over, optionally with final totals
    Complete(Results),
    /// The server rejected a Controller command
    Error(Text),
}

impl Message for Command {
    fn kind(&self) -> &'static str {
        match self {
            Self::Join(_) => "join",
            Self::Create => "create",
            Self::Begin => "begin",
            Self::Answer(_) => "answer",
            Self::Vote(_) => "vote",
            Self::Stop => "stop",
            Self::Next => "next",
        }
    }

    fn to_data(&self) -> serde_json::Result<Value> {
        match self {
            Self::Join(request) => data(request),
            Self::Answer(text) | Self::Vote(text) => data(text),
            Self::Create | Self::Begin | Self::Stop | Self::Next => Ok(Value::Null),
        }
    }

    fn from_data(kind: &str, data: Value) -> serde_json::Result<Option<Self>> {
        Ok(Some(match kind {
            "join" => Self::Join(payload(data)?),
            "create" => Self::Create,
            "begin" => Self::Begin,
            "answer" => Self::Answer(payload(data)?),
            "vote" => Self::Vote(payload(data)?),
            "stop" => Self::Stop,
            "next" => Self::Next,
            _ => return Ok(None),
        }))
    }
}

impl Message for ParticipantEvent {
    fn kind(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error(_) => "error",
            Self::AnswerPrompt(_) => "answer",
            Self::VotePrompt(_) => "vote",
            Self::Results(_) => "results",
            Self::Complete => "complete",
        }
    }

    fn to_data(&self) -> serde_json::Result<Value> {
        match self {
            Self::Error(text) | Self::AnswerPrompt(text) => data(text),
            Self::VotePrompt(ballot) => data(ballot),
            Self::Results(results) => data(results),
            Self::Ok | Self::Complete => Ok(Value::Null),
        }
    }

    fn from_data(kind: &str, data: Value) -> serde_json::Result<Option<Self>> {
        Ok(Some(match kind {
            "ok" => Self::Ok,
            "error" => Self::Error(payload(data)?),
            "answer" => Self::AnswerPrompt(payload(data)?),
            "vote" => Self::VotePrompt(payload(data)?),
            "results" => Self::Results(payload(data)?),
            "complete" => Self::Complete,
            _ => return Ok(None),
        }))
    }
}

impl Message for ControllerEvent {
    fn kind(&self) -> &'static str {
        match self {
            Self::Create(_) => "create",
            Self::Joined(_) => "joined",
            Self::Question(_) => "question",
            Self::Vote(_) => "vote",
            Self::Collected(_) => "collected",
            Self::Results(_) => "results",
            Self::Complete(_) => "complete",
            Self::Error(_) => "error",
        }
    }

    fn to_data(&self) -> serde_json::Result<Value> {
        match self {
            Self::Create(created) => data(created),
            Self::Joined(joined) => data(joined),
            Self::Question(question) | Self::Vote(question) => data(question),
            Self::Collected(collected) => data(collected),
            Self::Results(results) => data(results),
            Self::Complete(results) if results.points.is_empty() && results.offsets.is_empty() => {
                Ok(Value::Null)
            }
            Self::Complete(results) => data(results),
            Self::Error(text) => data(text),
        }
    }

    fn from_data(kind: &str, data: Value) -> serde_json::Result<Option<Self>> {
        Ok(Some(match kind {
            "create" => Self::Create(payload(data)?),
            "joined" => Self::Joined(payload(data)?),
            "question" => Self::Question(payload(data)?),
            "vote" => Self::Vote(payload(data)?),
            "collected" => Self::Collected(payload(data)?),
            "results" => Self::Results(payload(data)?),
            "complete" => Self::Complete(payload(data)?),
            "error" => Self::Error(payload(data)?),
            _ => return Ok(None),
        }))
    }
}
