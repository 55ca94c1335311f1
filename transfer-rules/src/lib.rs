//! Transfer rule validation.
//!
//! Validates airline fare rule items that restrict transfers (connections
//! and stopovers between flights) against a priced itinerary: how many
//! transfers a fare allows, where they may occur, on which carriers, what
//! surface sectors are acceptable, and what each transfer costs.

pub mod domain;
pub mod engine;
pub mod ledger;
pub mod record;
pub mod reference;
pub mod scenario;
pub mod surcharge;
