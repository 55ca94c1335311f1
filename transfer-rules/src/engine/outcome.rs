//! Match, phase and verdict values.

use std::fmt;

/// Reason given when the engine meets inconsistent input data.
pub const INTERNAL_ERROR: &str = "INTERNAL PROCESSING ERROR";

/// Outcome of a single predicate.
///
/// `DoesNotApply` and `Match` are equivalent for not-permitted sub-segments
/// but not for required or permitted ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchResult {
    #[default]
    NotChecked,
    Match,
    NotMatch,
    DoesNotApply,
}

impl MatchResult {
    /// `Match` or `DoesNotApply`.
    pub fn is_satisfied(self) -> bool {
        matches!(self, MatchResult::Match | MatchResult::DoesNotApply)
    }

    pub fn from_bool(matched: bool) -> Self {
        if matched {
            MatchResult::Match
        } else {
            MatchResult::NotMatch
        }
    }

    /// Short diagnostic code.
    pub fn code(self) -> &'static str {
        match self {
            MatchResult::NotChecked => "---",
            MatchResult::Match => "MAT",
            MatchResult::NotMatch => "NOT",
            MatchResult::DoesNotApply => "N/A",
        }
    }
}

/// Phase-level control value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingResult {
    Continue,
    Pass,
    SoftPass,
    Fail,
    Skip,
    Stop,
}

/// A phase that ends the validation early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Halt {
    pub result: ProcessingResult,
    pub reason: String,
}

impl Halt {
    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            result: ProcessingResult::Fail,
            reason: reason.into(),
        }
    }

    pub fn stop(reason: impl Into<String>) -> Self {
        Self {
            result: ProcessingResult::Stop,
            reason: reason.into(),
        }
    }

    pub fn skip(reason: impl Into<String>) -> Self {
        Self {
            result: ProcessingResult::Skip,
            reason: reason.into(),
        }
    }
}

/// Final answer for one rule item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    /// Accepted for the fare component; must be re-checked for the pricing unit.
    SoftPass,
    Fail,
    /// The rule does not apply.
    Skip,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::Pass => "PASS",
            Verdict::SoftPass => "SOFTPASS",
            Verdict::Fail => "FAIL",
            Verdict::Skip => "SKIP",
        };
        f.write_str(s)
    }
}

/// Verdict plus the reason for a failure or skip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub verdict: Verdict,
    pub reason: Option<String>,
}

impl ValidationOutcome {
    pub fn pass() -> Self {
        Self {
            verdict: Verdict::Pass,
            reason: None,
        }
    }

    pub fn soft_pass() -> Self {
        Self {
            verdict: Verdict::SoftPass,
            reason: None,
        }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Fail,
            reason: Some(reason.into()),
        }
    }

    pub fn skip(reason: Option<String>) -> Self {
        Self {
            verdict: Verdict::Skip,
            reason,
        }
    }

    pub fn is_fail(&self) -> bool {
        self.verdict == Verdict::Fail
    }
}

impl From<Halt> for ValidationOutcome {
    fn from(halt: Halt) -> Self {
        match halt.result {
            ProcessingResult::Skip => ValidationOutcome::skip(Some(halt.reason)),
            ProcessingResult::Pass | ProcessingResult::Continue => ValidationOutcome::pass(),
            ProcessingResult::SoftPass => ValidationOutcome::soft_pass(),
            ProcessingResult::Fail | ProcessingResult::Stop => ValidationOutcome::fail(halt.reason),
        }
    }
}
