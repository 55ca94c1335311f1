//! The itinerary arena.

use serde::{Deserialize, Serialize};

use super::{ComponentId, DomainError, FareComponent, SegmentId, TravelSegment};

/// Owns every travel segment and fare component of one priced journey.
///
/// Everything else refers into it by index, so it is read-only for the
/// duration of a validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Itinerary {
    pub segments: Vec<TravelSegment>,
    #[serde(default)]
    pub components: Vec<FareComponent>,
}

impl Itinerary {
    /// Create an itinerary with no fare components yet.
    pub fn new(segments: Vec<TravelSegment>) -> Self {
        Self {
            segments,
            components: Vec::new(),
        }
    }

    /// Add a fare component and return its id.
    pub fn add_component(&mut self, component: FareComponent) -> ComponentId {
        self.components.push(component);
        ComponentId(self.components.len() - 1)
    }

    pub fn segment(&self, id: SegmentId) -> Result<&TravelSegment, DomainError> {
        self.segments.get(id.0).ok_or(DomainError::UnknownSegment(id))
    }

    pub fn component(&self, id: ComponentId) -> Result<&FareComponent, DomainError> {
        self.components.get(id.0).ok_or(DomainError::UnknownComponent(id))
    }

    /// The component's segments resolved against the arena.
    pub fn component_segments(
        &self,
        id: ComponentId,
    ) -> Result<Vec<(SegmentId, &TravelSegment)>, DomainError> {
        self.component(id)?
            .segments
            .iter()
            .map(|&sid| self.segment(sid).map(|seg| (sid, seg)))
            .collect()
    }

    /// Check that every component is non-empty and only references known segments.
    pub fn validate(&self) -> Result<(), DomainError> {
        for (idx, component) in self.components.iter().enumerate() {
            if component.segments.is_empty() {
                return Err(DomainError::EmptyComponent(ComponentId(idx)));
            }
            for &sid in component.segments.iter().chain(&component.stopover_segments) {
                self.segment(sid)?;
            }
        }
        Ok(())
    }
}
