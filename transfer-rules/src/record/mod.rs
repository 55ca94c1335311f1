//! The transfer restriction rule record.
//!
//! Records are supplied fully materialized by the caller. Fields keep their
//! filed forms on the wire (`XX` counts, single-letter indicators) and are
//! exposed as enums and options in Rust.

mod count;
mod indicator;
mod rule;

pub use count::{InvalidTransferCount, TransferCount};
pub use indicator::{
    Applicability, CarrierAppl, CarrierTableAppl, ChargeAppl, EmbeddedSurfaces, FareBreakSurface,
    InOutApplication, InOutPortion, InvalidIndicator, Restriction, StopConn, SurfaceOrigDest,
    SurfaceRestriction, UnavailableTag,
};
pub use rule::{
    CarrierApplEntry, CarrierPair, CarrierPairLimits, CarrierSelector, ChargeColumn, LocKey,
    LocType, PairFlags, RuleSubSegment, SurfaceTransferEntry, TransferCharges, TransferRule,
};
