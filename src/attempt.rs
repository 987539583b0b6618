// src/attempt.rs
//
// Client-local state machine for one quiz attempt:
// Loading -> InProgress -> Submitted (terminal).
//
// `QuizAttempt::load` covers the Loading state: it consumes the fetched quiz
// and question list and either starts the attempt or refuses. From then on the
// host drives the machine with answer selection, navigation and a once-per-
// second `tick`. Submission happens at most once per attempt, enforced by a
// test-and-set flag, whether triggered manually or by the countdown.
//
// The scoring rules live here so the server-side submission handler grades
// with exactly the same logic.

use crate::models::quiz::{Question, Quiz};

/// Fixed point value per question.
pub const POINTS_PER_QUESTION: i64 = 10;

/// Compares a stored correct-answer letter against a given answer.
/// Case-insensitive; a missing or blank answer is never correct.
pub fn is_correct(correct: &str, given: &str) -> bool {
    let given = given.trim();
    !given.is_empty() && correct.trim().eq_ignore_ascii_case(given)
}

/// Grades an answered/unanswered slot list against a question list.
/// Returns the number of correct answers.
pub fn count_correct<'a, I>(questions: &[Question], answers: I) -> i64
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    questions
        .iter()
        .zip(answers)
        .filter(|(q, a)| matches!(a, Some(given) if is_correct(&q.correct_answer, given)))
        .count() as i64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    InProgress,
    Submitted,
}

/// Final outcome of an attempt, ready to be persisted as a result row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptSummary {
    pub quiz_id: i64,
    pub score: i64,
    pub total_points: i64,
    pub correct_answers: i64,
    pub total_questions: i64,
    pub completion_time_seconds: i64,
}

#[derive(Debug, PartialEq, Eq)]
pub enum AttemptError {
    /// The quiz has no questions; the attempt never starts.
    NoQuestions,
    /// Manual submission is only offered from the last question.
    NotOnLastQuestion,
    /// Manual submission requires the current question to be answered.
    CurrentQuestionUnanswered,
    /// The one-shot submission guard already fired.
    AlreadySubmitted,
}

impl std::fmt::Display for AttemptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            AttemptError::NoQuestions => "This quiz has no questions",
            AttemptError::NotOnLastQuestion => "Submission is only available on the last question",
            AttemptError::CurrentQuestionUnanswered => "Please select an answer before submitting",
            AttemptError::AlreadySubmitted => "This attempt has already been submitted",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for AttemptError {}

#[derive(Debug)]
pub struct QuizAttempt {
    quiz: Quiz,
    questions: Vec<Question>,
    /// One slot per question; `None` until the student picks a letter.
    answers: Vec<Option<char>>,
    current: usize,
    remaining_seconds: i64,
    elapsed_seconds: i64,
    state: AttemptState,
    /// One-shot guard: the save-and-summarize sequence runs at most once even
    /// if timeout and a manual click race.
    submit_fired: bool,
}

impl QuizAttempt {
    /// Ends the Loading phase: takes the fetched quiz and questions and moves
    /// to InProgress. Refuses to start an attempt with no questions.
    pub fn load(quiz: Quiz, questions: Vec<Question>) -> Result<Self, AttemptError> {
        if questions.is_empty() {
            return Err(AttemptError::NoQuestions);
        }

        let remaining_seconds = quiz.time_limit_minutes * 60;
        let slots = questions.len();

        Ok(QuizAttempt {
            quiz,
            questions,
            answers: vec![None; slots],
            current: 0,
            remaining_seconds,
            elapsed_seconds: 0,
            state: AttemptState::InProgress,
            submit_fired: false,
        })
    }

    pub fn state(&self) -> AttemptState {
        self.state
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> &Question {
        &self.questions[self.current]
    }

    pub fn is_last_question(&self) -> bool {
        self.current == self.questions.len() - 1
    }

    pub fn remaining_seconds(&self) -> i64 {
        self.remaining_seconds
    }

    /// Timer text in MM:SS form.
    pub fn format_remaining(&self) -> String {
        let clamped = self.remaining_seconds.max(0);
        format!("{:02}:{:02}", clamped / 60, clamped % 60)
    }

    /// Records an answer for the current question, overwriting any previous
    /// pick for that slot. Ignored once submitted.
    pub fn select_answer(&mut self, letter: char) {
        if self.state == AttemptState::Submitted {
            return;
        }
        self.answers[self.current] = Some(letter.to_ascii_uppercase());
    }

    pub fn selected_answer(&self) -> Option<char> {
        self.answers[self.current]
    }

    /// Moves to the next question. Selections persist across navigation.
    pub fn next(&mut self) -> bool {
        if self.state == AttemptState::Submitted || self.is_last_question() {
            return false;
        }
        self.current += 1;
        true
    }

    /// Moves back to the previous question. Selections persist.
    pub fn previous(&mut self) -> bool {
        if self.state == AttemptState::Submitted || self.current == 0 {
            return false;
        }
        self.current -= 1;
        true
    }

    /// Advances the countdown by one second. Returns the final summary when
    /// the clock reaches zero and the attempt auto-submits; `None` otherwise.
    pub fn tick(&mut self) -> Option<AttemptSummary> {
        if self.state == AttemptState::Submitted {
            return None;
        }
        self.remaining_seconds -= 1;
        self.elapsed_seconds += 1;
        if self.remaining_seconds <= 0 {
            return self.force_submit();
        }
        None
    }

    /// Manual submission, only legal from the last question and only when the
    /// current question is answered. The timeout path bypasses these checks
    /// via `force_submit`.
    pub fn submit(&mut self) -> Result<AttemptSummary, AttemptError> {
        if self.submit_fired {
            return Err(AttemptError::AlreadySubmitted);
        }
        if !self.is_last_question() {
            return Err(AttemptError::NotOnLastQuestion);
        }
        if self.answers[self.current].is_none() {
            return Err(AttemptError::CurrentQuestionUnanswered);
        }
        Ok(self.finish())
    }

    /// Timeout path: submits regardless of unanswered questions (they score
    /// as incorrect). Returns `None` if the guard already fired.
    pub fn force_submit(&mut self) -> Option<AttemptSummary> {
        if self.submit_fired {
            return None;
        }
        Some(self.finish())
    }

    fn finish(&mut self) -> AttemptSummary {
        self.submit_fired = true;
        self.state = AttemptState::Submitted;

        let letters: Vec<String> = self
            .answers
            .iter()
            .map(|a| a.map(String::from).unwrap_or_default())
            .collect();
        let correct_answers = count_correct(
            &self.questions,
            letters.iter().map(|s| (!s.is_empty()).then_some(s.as_str())),
        );
        let total_questions = self.questions.len() as i64;

        AttemptSummary {
            quiz_id: self.quiz.id,
            score: correct_answers * POINTS_PER_QUESTION,
            total_points: total_questions * POINTS_PER_QUESTION,
            correct_answers,
            total_questions,
            completion_time_seconds: self.elapsed_seconds,
        }
    }
}
