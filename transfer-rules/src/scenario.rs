//! Validation scenarios read from JSON files.
//!
//! A scenario bundles everything one validation needs: the rule item, the
//! itinerary with its fare components, reference tables and, for a
//! pricing-unit validation, the pricing unit.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{ComponentId, DomainError, Itinerary, PricingUnit};
use crate::engine::{PricingUnitRequest, TraceBuffer, TransferValidator, ValidationConfig, ValidationOutcome};
use crate::ledger::TransferLedger;
use crate::record::TransferRule;
use crate::reference::StaticReferenceData;
use crate::surcharge::{ChargeTally, Surcharge};

/// Errors loading a scenario.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// The file could not be read
    #[error("failed to read scenario: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not a valid scenario
    #[error("invalid scenario JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The itinerary refers to segments or components it does not have
    #[error("inconsistent itinerary: {0}")]
    Itinerary(#[from] DomainError),
}

fn default_pax_type() -> String {
    "ADT".to_string()
}

/// One rule item against one itinerary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub rule: TransferRule,
    pub itinerary: Itinerary,
    #[serde(default)]
    pub reference: StaticReferenceData,
    /// Validate for this pricing unit; without one, the fare component is
    /// validated on its own.
    #[serde(default)]
    pub pricing_unit: Option<PricingUnit>,
    /// Component whose rule is validated; defaults to the first fare usage.
    #[serde(default)]
    pub component: Option<ComponentId>,
    #[serde(default = "default_pax_type")]
    pub pax_type: String,
    #[serde(default)]
    pub config: ValidationConfig,
}

/// Result of running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub outcome: ValidationOutcome,
    pub surcharges: Vec<Surcharge>,
    pub trace: TraceBuffer,
}

impl Scenario {
    /// Read and check a scenario file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = serde_json::from_str(json)?;
        scenario.itinerary.validate()?;
        debug!(
            item = scenario.rule.item_no,
            segments = scenario.itinerary.segments.len(),
            components = scenario.itinerary.components.len(),
            "scenario loaded"
        );
        Ok(scenario)
    }

    /// The fare component under validation.
    pub fn current_component(&self) -> ComponentId {
        self.component
            .or_else(|| {
                self.pricing_unit
                    .as_ref()
                    .and_then(|pu| pu.fare_usages.first())
                    .map(|fu| fu.component)
            })
            .unwrap_or(ComponentId(0))
    }

    /// Validate the rule with a fresh ledger and charge tally.
    pub fn run(&self) -> ScenarioReport {
        let validator = TransferValidator::new(&self.reference, &self.config);
        let component = self.current_component();
        let mut trace = TraceBuffer::new();
        let mut tally = ChargeTally::new();

        let outcome = match &self.pricing_unit {
            Some(pu) => {
                let mut ledger = TransferLedger::for_pricing_unit(pu);
                let request = PricingUnitRequest {
                    rule: &self.rule,
                    itinerary: &self.itinerary,
                    pricing_unit: pu,
                    component,
                    pax_type: &self.pax_type,
                };
                validator.validate_pricing_unit(&request, &mut ledger, &mut tally, &mut trace)
            }
            None => validator.validate_fare_component(
                &self.rule,
                &self.itinerary,
                component,
                &mut TransferLedger::new(),
                &mut trace,
            ),
        };

        ScenarioReport {
            outcome,
            surcharges: tally.surcharges().to_vec(),
            trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Verdict;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CHI_CONNECTION: &str = r#"{
        "rule": {
            "vendor": "ATP",
            "item_no": 9001,
            "min_transfers": 0,
            "max_transfers": "01",
            "segments": [
                {"order_no": 1, "applicability": "R", "loc1": {"loc_type": "C", "code": "CHI"}, "charge": "1"}
            ],
            "charges": {
                "first": {"currency": "USD", "charge1": 2500, "charge2": 0, "decimals": 2}
            }
        },
        "itinerary": {
            "segments": [
                {
                    "origin": {"code": "MEM", "city": "MEM", "nation": "US", "area": 1},
                    "destination": {"code": "ORD", "city": "CHI", "nation": "US", "area": 1},
                    "kind": {"type": "air", "carrier": "AA", "number": 100},
                    "departure": "2026-06-01T08:00:00",
                    "arrival": "2026-06-01T09:30:00"
                },
                {
                    "origin": {"code": "ORD", "city": "CHI", "nation": "US", "area": 1},
                    "destination": {"code": "MIA", "city": "MIA", "nation": "US", "area": 1},
                    "kind": {"type": "air", "carrier": "AA", "number": 200},
                    "departure": "2026-06-01T11:00:00",
                    "arrival": "2026-06-01T15:00:00"
                }
            ],
            "components": [
                {"governing_carrier": "AA", "direction": "outbound", "segments": [0, 1], "one_way": true, "currency": "USD"}
            ]
        },
        "pricing_unit": {"fare_usages": [{"component": 0}]}
    }"#;

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn load_and_run_pricing_unit() {
        let file = write_temp(CHI_CONNECTION);
        let scenario = Scenario::load(file.path()).unwrap();
        assert_eq!(scenario.pax_type, "ADT");
        assert_eq!(scenario.current_component(), ComponentId(0));

        let report = scenario.run();
        assert_eq!(report.outcome.verdict, Verdict::Pass);
        assert_eq!(report.surcharges.len(), 1);
        assert_eq!(report.surcharges[0].amount, 2500);
        assert!(report.trace.contains("FARECOMP-1"));
    }

    #[test]
    fn fare_component_without_pricing_unit() {
        let mut value: serde_json::Value = serde_json::from_str(CHI_CONNECTION).unwrap();
        value.as_object_mut().unwrap().remove("pricing_unit");
        let scenario = Scenario::from_json(&value.to_string()).unwrap();

        let report = scenario.run();
        assert_eq!(report.outcome.verdict, Verdict::SoftPass);
        assert!(report.surcharges.is_empty());
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Scenario::load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ScenarioError::Io(_)));
    }

    #[test]
    fn malformed_json() {
        let file = write_temp(r#"{"rule": {"vendor": "ATP"}}"#);
        let err = Scenario::load(file.path()).unwrap_err();
        assert!(matches!(err, ScenarioError::Json(_)));
    }

    #[test]
    fn dangling_segment_reference() {
        let json = CHI_CONNECTION.replace("[0, 1]", "[0, 7]");
        let err = Scenario::from_json(&json).unwrap_err();
        assert!(matches!(err, ScenarioError::Itinerary(_)));
    }
}
