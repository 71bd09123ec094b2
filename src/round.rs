//! The Controller's view of one question cycle
//!
//! A [`Round`] starts with a `question` event and lives until the next one
//! (or the end of the game). It owns the only phase clock the Controller
//! has, so replacing the round also discards whatever clock the old round
//! had armed.

use std::{collections::HashSet, time::Duration};

use web_time::Instant;

use crate::{
    clock::PhaseClock,
    config::TimedPhase,
    protocol::{AnswerOffsets, Player, Question, Results},
    render::Collection,
};

/// One question from prompt to scored results
#[derive(Debug)]
pub struct Round {
    question: Question,
    expected: usize,
    responded: HashSet<String>,
    anonymous: usize,
    offsets: Vec<AnswerOffsets>,
    clock: PhaseClock<TimedPhase>,
    voting_open: bool,
}

impl Round {
    /// Starts a round for `question` in a room of `expected` contestants
    pub fn new(question: Question, expected: usize) -> Self {
        Self {
            question,
            expected,
            responded: HashSet::new(),
            anonymous: 0,
            offsets: Vec::new(),
            clock: PhaseClock::default(),
            voting_open: false,
        }
    }

    /// The question in its latest known state
    pub fn question(&self) -> &Question {
        &self.question
    }

    /// Swaps in the server's newer copy of the question
    pub fn set_question(&mut self, question: Question) {
        self.question = question;
    }

    /// Counts one collected response
    ///
    /// Responses from the same contestant are only counted once.
    pub fn record(&mut self, player: Option<&Player>) {
        match player {
            Some(player) => {
                self.responded.insert(player.id.clone());
            }
            None => self.anonymous += 1,
        }
    }

    /// Responses collected in the current phase
    pub fn responded(&self) -> usize {
        self.responded.len() + self.anonymous
    }

    /// Contestants expected to respond
    pub fn expected(&self) -> usize {
        self.expected
    }

    /// Clears the response count for the next collection phase
    ///
    /// Voting counts as closed until [`Round::open_voting`] is called.
    pub fn start_collection(&mut self, expected: usize) {
        self.expected = expected;
        self.responded.clear();
        self.anonymous = 0;
        self.voting_open = false;
    }

    /// Records that the server sent the ballot
    pub fn open_voting(&mut self) {
        self.voting_open = true;
    }

    /// Whether the server has sent the ballot for this round
    ///
    /// Until it has, `collected` signals still belong to the answer phase.
    pub fn is_voting_open(&self) -> bool {
        self.voting_open
    }

    /// Attaches the server's tallies to the round
    ///
    /// Answers carried by the offsets replace the question's answers of the
    /// same text, so correctness, authorship and votes show up on the
    /// results view.
    pub fn attach_results(&mut self, results: &Results) {
        for AnswerOffsets { answer, .. } in &results.offsets {
            if let Some(known) = self
                .question
                .answers
                .iter_mut()
                .find(|known| known.text == answer.text)
            {
                *known = answer.clone();
            }
        }
        self.offsets.clone_from(&results.offsets);
    }

    /// Point deltas of this round, grouped by answer
    pub fn offsets(&self) -> &[AnswerOffsets] {
        &self.offsets
    }

    /// Arms the round's clock, replacing any countdown already running
    pub fn arm(&mut self, now: Instant, duration: Duration, phase: TimedPhase) {
        self.clock.arm(now, duration, phase);
    }

    /// Disarms the round's clock
    pub fn cancel(&mut self) -> bool {
        self.clock.cancel()
    }

    /// The round's clock
    pub fn clock(&self) -> &PhaseClock<TimedPhase> {
        &self.clock
    }

    /// Fires the round's clock if its deadline has passed
    pub fn poll(&mut self, now: Instant) -> Option<TimedPhase> {
        self.clock.poll(now)
    }

    /// Progress of the running collection phase, for display
    pub fn collection(&self, now: Instant) -> Collection {
        Collection {
            question: self.question.clone(),
            responded: self.responded(),
            expected: self.expected,
            remaining: self.clock.remaining_secs(now).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::protocol::{Answer, Offset};

    fn player(id: &str) -> Player {
        Player {
            id: id.to_string(),
            name: id.to_uppercase(),
        }
    }

    fn answer(text: &str) -> Answer {
        Answer {
            text: text.to_string(),
            correct: None,
            player: None,
            votes: None,
        }
    }

    fn question() -> Question {
        Question {
            text: "In the city of Manchester the Irk and Medlock join which river?".to_string(),
            multiplier: Some(1),
            answers: vec![answer("IRWELL"), answer("FOO")],
        }
    }

    #[test]
    fn test_record_counts_each_player_once() {
        let mut round = Round::new(question(), 3);

        round.record(Some(&player("a")));
        round.record(Some(&player("a")));
        round.record(Some(&player("b")));
        round.record(None);

        assert_eq!(round.responded(), 3);
        assert_eq!(round.expected(), 3);
    }

    #[test]
    fn test_start_collection_resets_counts() {
        let mut round = Round::new(question(), 2);
        round.record(Some(&player("a")));

        round.start_collection(4);

        assert_eq!(round.responded(), 0);
        assert_eq!(round.expected(), 4);
    }

    #[test]
    fn test_voting_opens_per_collection() {
        let mut round = Round::new(question(), 2);
        assert!(!round.is_voting_open());

        round.open_voting();
        assert!(round.is_voting_open());

        round.start_collection(2);
        assert!(!round.is_voting_open());
    }

    #[test]
    fn test_attach_results_updates_answers() {
        let mut round = Round::new(question(), 2);
        let mut irwell = answer("IRWELL");
        irwell.correct = Some(Some(true));
        irwell.votes = Some(Some(vec![player("a")]));

        round.attach_results(&Results {
            points: vec![],
            offsets: vec![AnswerOffsets {
                answer: irwell,
                offsets: vec![Offset {
                    player: player("a"),
                    offset: 1000,
                }],
            }],
        });

        assert!(round.question().answers[0].is_correct());
        assert_eq!(round.question().answers[0].vote_count(), 1);
        assert_eq!(round.question().answers[1], answer("FOO"));
        assert_eq!(round.offsets().len(), 1);
    }

    #[test]
    fn test_collection_reports_remaining_seconds() {
        let mut round = Round::new(question(), 2);
        let t0 = Instant::now();
        round.arm(t0, Duration::from_secs(30), TimedPhase::Answers);
        round.record(Some(&player("a")));

        let view = round.collection(t0 + Duration::from_secs(10));

        assert_eq!(view.remaining, 20);
        assert_eq!(view.responded, 1);
        assert_eq!(view.expected, 2);
    }

    #[test]
    fn test_single_clock_slot() {
        let mut round = Round::new(question(), 2);
        let t0 = Instant::now();
        round.arm(t0, Duration::from_secs(5), TimedPhase::Answers);
        round.arm(t0, Duration::from_secs(30), TimedPhase::Votes);

        assert_eq!(round.poll(t0 + Duration::from_secs(5)), None);
        assert_eq!(
            round.poll(t0 + Duration::from_secs(30)),
            Some(TimedPhase::Votes)
        );
    }
}
