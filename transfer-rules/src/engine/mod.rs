//! Transfer rule validation engine.
//!
//! Validates one transfer rule item against the flown segments of a fare
//! component or a whole pricing unit. Every validation runs the same
//! pipeline: surface sector checks, transfer classification, the carrier
//! pairing filter, sub-segment matching and the count checks, followed by
//! surcharge registration when the rule item passes for a pricing unit.
//!
//! The engine keeps no state between calls. Counters and segment claims that
//! outlive one rule item live in the caller's [`TransferLedger`].
//!
//! [`TransferLedger`]: crate::ledger::TransferLedger

mod classify;
mod config;
mod context;
mod counts;
mod diagnostics;
mod geo;
pub(crate) mod markup;
mod matcher;
pub(crate) mod outcome;
mod predicate;
mod surcharges;
mod surface;
mod transfer_type;
mod validator;

#[cfg(test)]
mod scenario_tests;

pub use config::ValidationConfig;
pub use context::ValidationScope;
pub use diagnostics::{DiagnosticSink, NullSink, TraceBuffer};
pub use markup::{CheckResult, Markup, Markups, StopType, SubSegmentMatch};
pub use outcome::{Halt, INTERNAL_ERROR, MatchResult, ProcessingResult, ValidationOutcome, Verdict};
pub use validator::{PricingUnitRequest, TransferValidator, system_default_assumption};
