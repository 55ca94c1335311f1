//! Domain error types.
//!
//! These errors represent inconsistencies in the itinerary model handed to
//! the validator. They are distinct from rule validation outcomes.

use super::{ComponentId, SegmentId};

/// Domain-level errors for arena consistency.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Segment id does not index the itinerary
    #[error("unknown segment {0}")]
    UnknownSegment(SegmentId),

    /// Component id does not index the itinerary
    #[error("unknown fare component {0}")]
    UnknownComponent(ComponentId),

    /// Fare component has no segments
    #[error("fare component {0} has no segments")]
    EmptyComponent(ComponentId),
}
