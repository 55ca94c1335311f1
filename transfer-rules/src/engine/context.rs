//! Read-only inputs shared by every phase of one validation.

use tracing::warn;

use crate::domain::{
    ComponentId, DomainError, FareComponent, FareUsage, Itinerary, PricingUnit, SegmentId,
    TravelSegment,
};
use crate::record::TransferRule;
use crate::reference::ReferenceData;

use super::config::ValidationConfig;
use super::outcome::{Halt, INTERNAL_ERROR};

/// Which fare path variant is being validated.
#[derive(Debug, Clone, Copy)]
pub enum ValidationScope<'a> {
    /// Only the fare component is known; passes are tentative.
    FareComponent,
    /// The full pricing unit is known.
    PricingUnit(&'a PricingUnit),
}

/// One rule item checked against one fare component.
pub(crate) struct RuleContext<'a> {
    pub rule: &'a TransferRule,
    pub itinerary: &'a Itinerary,
    pub reference: &'a dyn ReferenceData,
    pub config: &'a ValidationConfig,
    pub current: ComponentId,
    pub scope: ValidationScope<'a>,
}

impl<'a> RuleContext<'a> {
    pub fn pricing_unit(&self) -> Option<&'a PricingUnit> {
        match self.scope {
            ValidationScope::FareComponent => None,
            ValidationScope::PricingUnit(pu) => Some(pu),
        }
    }

    /// The fare usage of the current component, in pricing-unit scope.
    pub fn current_usage(&self) -> Option<&'a FareUsage> {
        self.pricing_unit().and_then(|pu| pu.usage_of(self.current))
    }

    pub fn round_the_world(&self) -> bool {
        self.config.round_the_world
    }

    pub fn segment(&self, id: SegmentId) -> Result<&'a TravelSegment, Halt> {
        self.itinerary.segment(id).map_err(internal)
    }

    pub fn component(&self, id: ComponentId) -> Result<&'a FareComponent, Halt> {
        self.itinerary.component(id).map_err(internal)
    }
}

/// Inconsistent arena data fails the rule item.
pub(crate) fn internal(err: DomainError) -> Halt {
    warn!(error = %err, "inconsistent itinerary");
    Halt::fail(INTERNAL_ERROR)
}
