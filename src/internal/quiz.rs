use std::time::Duration;

use super::models::{QuizChallenge, QuizOutcome};

/// Holder for the at-most-one in-flight quiz challenge.
///
/// Owned by the app and handed to the invite/question/result views; any view
/// that finds it empty redirects to the feed. Set by the watch session when a
/// record response carries a quiz, cleared on decline or result close.
#[derive(Debug, Default)]
pub struct QuizSession {
    active: Option<QuizChallenge>,
}

impl QuizSession {
    pub fn set(&mut self, challenge: QuizChallenge) {
        self.active = Some(challenge);
    }

    pub fn clear(&mut self) {
        self.active = None;
    }

    pub fn active(&self) -> Option<&QuizChallenge> {
        self.active.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }
}

/// How the round left the Running state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Running,
    Answered,
}

/// Timed question state machine: Running -> Answered -> (after the result
/// delay) resolved into a [`QuizOutcome`].
///
/// Only the first answer event is honored, whether it is a selection, the
/// countdown reaching zero, or the absolute safety timeout. The safety
/// timeout exists purely as a fallback for a stalled countdown; the visible
/// contract is the countdown.
#[derive(Debug)]
pub struct QuizRound {
    time_left: u32,
    duration: u32,
    correct_index: usize,
    selected: Option<usize>,
    phase: Phase,
    time_expired: bool,
    generation: u64,
}

impl QuizRound {
    pub fn new(challenge: &QuizChallenge, duration_secs: u32, generation: u64) -> Self {
        Self {
            time_left: duration_secs,
            duration: duration_secs,
            correct_index: challenge.question.correct_index(),
            selected: None,
            phase: Phase::Running,
            time_expired: false,
            generation,
        }
    }

    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_answered(&self) -> bool {
        self.phase == Phase::Answered
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    /// One countdown second elapsed. Returns the outcome when the timer ran
    /// out and the round thereby ends with no selection.
    pub fn tick(&mut self) -> Option<QuizOutcome> {
        if self.phase == Phase::Answered {
            return None;
        }
        self.time_left = self.time_left.saturating_sub(1);
        if self.time_left == 0 {
            return self.expire();
        }
        None
    }

    /// The viewer picked an option. Ignored once the round is answered.
    pub fn select(&mut self, index: usize) -> Option<QuizOutcome> {
        if self.phase == Phase::Answered || index > 3 {
            return None;
        }
        self.phase = Phase::Answered;
        self.selected = Some(index);
        Some(self.outcome())
    }

    /// The absolute safety timeout fired (countdown stalled). Same terminal
    /// shape as the countdown reaching zero.
    pub fn force_expire(&mut self) -> Option<QuizOutcome> {
        if self.phase == Phase::Answered {
            return None;
        }
        self.expire()
    }

    fn expire(&mut self) -> Option<QuizOutcome> {
        self.phase = Phase::Answered;
        self.time_expired = true;
        self.selected = None;
        Some(self.outcome())
    }

    fn outcome(&self) -> QuizOutcome {
        QuizOutcome {
            is_correct: self.selected == Some(self.correct_index),
            selected: self.selected,
            correct_index: self.correct_index,
            time_expired: self.time_expired,
        }
    }
}

/// Fixed delays around the quiz flow. The safety timeout is deliberately far
/// beyond the countdown; under normal conditions the countdown always wins.
pub const QUIZ_SAFETY_TIMEOUT: Duration = Duration::from_secs(120);
pub const RESULT_DELAY: Duration = Duration::from_secs(2);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::internal::models::QuizQuestion;

    fn challenge(answer: &str) -> QuizChallenge {
        QuizChallenge {
            media_id: "m-1".to_string(),
            reward: 250,
            question: QuizQuestion {
                id: "q-1".to_string(),
                question: "Which?".to_string(),
                answer: answer.to_string(),
                option_a: "A".to_string(),
                option_b: "B".to_string(),
                option_c: "C".to_string(),
                option_d: "D".to_string(),
            },
        }
    }

    #[test]
    fn test_session_set_clear_replace() {
        let mut session = QuizSession::default();
        assert!(!session.is_active());
        session.set(challenge("A"));
        session.set(challenge("B"));
        assert_eq!(session.active().unwrap().question.answer, "B");
        session.clear();
        assert!(session.active().is_none());
    }

    #[test]
    fn test_correct_selection() {
        let mut round = QuizRound::new(&challenge("C"), 30, 1);
        let outcome = round.select(2).unwrap();
        assert!(outcome.is_correct);
        assert_eq!(outcome.selected, Some(2));
        assert_eq!(outcome.correct_index, 2);
        assert!(!outcome.time_expired);
    }

    #[test]
    fn test_wrong_selection() {
        let mut round = QuizRound::new(&challenge("C"), 30, 1);
        let outcome = round.select(1).unwrap();
        assert!(!outcome.is_correct);
        assert_eq!(outcome.selected, Some(1));
    }

    #[test]
    fn test_first_answer_wins() {
        let mut round = QuizRound::new(&challenge("A"), 30, 1);
        let first = round.select(3).unwrap();
        assert!(round.select(0).is_none());
        assert!(round.tick().is_none());
        assert!(round.force_expire().is_none());
        assert_eq!(round.selected(), Some(3));
        assert!(!first.is_correct);
    }

    #[test]
    fn test_countdown_expiry_yields_no_selection() {
        let mut round = QuizRound::new(&challenge("B"), 3, 1);
        assert!(round.tick().is_none());
        assert!(round.tick().is_none());
        let outcome = round.tick().unwrap();
        assert!(outcome.time_expired);
        assert_eq!(outcome.selected, None);
        // None never equals the correct index.
        assert!(!outcome.is_correct);
        assert_eq!(round.time_left(), 0);
    }

    #[test]
    fn test_safety_timeout_terminal() {
        let mut round = QuizRound::new(&challenge("D"), 30, 1);
        let outcome = round.force_expire().unwrap();
        assert!(outcome.time_expired);
        assert!(round.is_answered());
        // Late countdown ticks after the safety timeout are inert.
        assert!(round.tick().is_none());
    }

    #[test]
    fn test_out_of_range_selection_ignored() {
        let mut round = QuizRound::new(&challenge("A"), 30, 1);
        assert!(round.select(4).is_none());
        assert!(!round.is_answered());
    }
}
