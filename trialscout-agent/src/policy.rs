//! What to do after a batch's agent call fails

use crate::batch::Batch;
#[cfg(test)]
use std::collections::VecDeque;
use trialscout_error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    Continue,
    Halt,
}

/// Consulted once per transport failure. The scanner blocks until it answers.
pub trait ContinuePolicy {
    fn decide(&mut self, batch: &Batch, error: &Error) -> Continuation;
}

impl<F> ContinuePolicy for F
where
    F: FnMut(&Batch, &Error) -> Continuation,
{
    fn decide(&mut self, batch: &Batch, error: &Error) -> Continuation {
        self(batch, error)
    }
}

/// Interpret an operator's answer: only an explicit "n"/"no" halts.
pub fn parse_answer(answer: &str) -> Continuation {
    let answer = answer.trim();
    if answer.eq_ignore_ascii_case("n") || answer.eq_ignore_ascii_case("no") {
        Continuation::Halt
    } else {
        Continuation::Continue
    }
}

/// Never stop on failures (`--yes`)
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysContinue;

impl ContinuePolicy for AlwaysContinue {
    fn decide(&mut self, _batch: &Batch, _error: &Error) -> Continuation {
        Continuation::Continue
    }
}

/// Replays canned operator answers; continues once they run out.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptedAnswers {
    answers: VecDeque<String>,
    asked: usize,
}

#[cfg(test)]
impl ScriptedAnswers {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: 0,
        }
    }

    /// How many times the scanner asked
    pub fn asked(&self) -> usize {
        self.asked
    }
}

#[cfg(test)]
impl ContinuePolicy for ScriptedAnswers {
    fn decide(&mut self, _batch: &Batch, _error: &Error) -> Continuation {
        self.asked += 1;
        self.answers
            .pop_front()
            .map(|a| parse_answer(&a))
            .unwrap_or(Continuation::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trialscout_error::ErrorKind;

    #[test]
    fn test_parse_answer() {
        assert_eq!(parse_answer("n"), Continuation::Halt);
        assert_eq!(parse_answer(" NO \n"), Continuation::Halt);
        assert_eq!(parse_answer("y"), Continuation::Continue);
        assert_eq!(parse_answer(""), Continuation::Continue);
        assert_eq!(parse_answer("nope"), Continuation::Continue);
    }

    #[test]
    fn test_scripted_answers() {
        let batch = Batch::new(0, vec!["Close".into()]);
        let err = Error::new(ErrorKind::RateLimited, "429");
        let mut policy = ScriptedAnswers::new(["y", "n"]);

        assert_eq!(policy.decide(&batch, &err), Continuation::Continue);
        assert_eq!(policy.decide(&batch, &err), Continuation::Halt);
        assert_eq!(policy.decide(&batch, &err), Continuation::Continue);
        assert_eq!(policy.asked(), 3);
    }

    #[test]
    fn test_closure_policy() {
        let batch = Batch::new(4, vec!["Close".into()]);
        let err = Error::new(ErrorKind::NetworkFailed, "reset");
        let mut policy = |b: &Batch, _: &Error| {
            if b.index > 2 { Continuation::Halt } else { Continuation::Continue }
        };

        assert_eq!(policy.decide(&batch, &err), Continuation::Halt);
    }
}
