//! Transfer surcharge registration.
//!
//! The engine decides which transfers are chargeable; the accumulator owns
//! the charge ledger and picks the amount. [`ChargeTally`] applies the
//! record's charge-1 / charge-2 limits.

use tracing::debug;

use crate::domain::{ComponentId, SegmentId};
use crate::record::TransferRule;

/// Errors registering a surcharge.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SurchargeError {
    /// Neither charge currency is the fare currency
    #[error("no charge in fare currency {fare}: rule charges {first} and {second}")]
    CurrencyMismatch {
        fare: String,
        first: String,
        second: String,
    },
}

/// A chargeable transfer handed to the accumulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurchargeRequest<'a> {
    pub segment: SegmentId,
    pub component: ComponentId,
    pub pax_type: &'a str,
    pub fare_currency: &'a str,
    /// The charge belongs to this transfer point rather than the component.
    pub segment_specific: bool,
    /// The matched sub-segment asked for the second charge.
    pub force_charge2: bool,
}

/// A registered transfer surcharge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surcharge {
    pub segment: SegmentId,
    pub component: ComponentId,
    pub item_no: u32,
    pub pax_type: String,
    /// Amount in minor units of `currency`.
    pub amount: i64,
    pub currency: String,
    pub decimals: u8,
    pub segment_specific: bool,
    pub is_charge1: bool,
}

/// Receives chargeable transfers.
pub trait SurchargeAccumulator {
    /// Start registering charges for `rule`.
    fn begin_rule(&mut self, rule: &TransferRule);

    /// Forget the charge-1 / charge-2 counts of the current rule.
    fn reset_counts(&mut self);

    fn add_surcharge(
        &mut self,
        rule: &TransferRule,
        request: &SurchargeRequest<'_>,
    ) -> Result<(), SurchargeError>;
}

/// In-memory accumulator applying the record's charge limits.
#[derive(Debug, Clone, Default)]
pub struct ChargeTally {
    surcharges: Vec<Surcharge>,
    charge1_count: u16,
    charge2_count: u16,
}

impl ChargeTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn surcharges(&self) -> &[Surcharge] {
        &self.surcharges
    }

    /// Total of all registered amounts in `currency`, in minor units.
    pub fn total_in(&self, currency: &str) -> i64 {
        self.surcharges
            .iter()
            .filter(|s| s.currency == currency)
            .map(|s| s.amount)
            .sum()
    }
}

impl SurchargeAccumulator for ChargeTally {
    fn begin_rule(&mut self, rule: &TransferRule) {
        let (mut c1, mut c2) = (0, 0);
        for s in self.surcharges.iter().filter(|s| s.item_no == rule.item_no) {
            if s.is_charge1 {
                c1 += 1;
            } else {
                c2 += 1;
            }
        }
        self.charge1_count = c1;
        self.charge2_count = c2;
    }

    fn reset_counts(&mut self) {
        self.charge1_count = 0;
        self.charge2_count = 0;
    }

    fn add_surcharge(
        &mut self,
        rule: &TransferRule,
        request: &SurchargeRequest<'_>,
    ) -> Result<(), SurchargeError> {
        let charges = &rule.charges;
        let column = charges
            .column_for(request.fare_currency)
            .map_err(|(first, second)| SurchargeError::CurrencyMismatch {
                fare: request.fare_currency.to_string(),
                first,
                second,
            })?;
        let Some(column) = column else {
            return Ok(());
        };
        if column.currency.is_empty() {
            return Ok(());
        }

        let use_charge2 = request.force_charge2 || charges.max_charge1.limit() == Some(self.charge1_count);
        let (amount, is_charge1) = if use_charge2 {
            if charges.max_charge2.is_reached_by(self.charge2_count) {
                return Ok(());
            }
            self.charge2_count += 1;
            (column.charge2, false)
        } else {
            self.charge1_count += 1;
            (column.charge1, true)
        };

        debug!(
            segment = %request.segment,
            item = rule.item_no,
            amount,
            currency = %column.currency,
            is_charge1,
            "transfer surcharge registered"
        );
        self.surcharges.push(Surcharge {
            segment: request.segment,
            component: request.component,
            item_no: rule.item_no,
            pax_type: request.pax_type.to_string(),
            amount,
            currency: column.currency.clone(),
            decimals: column.decimals,
            segment_specific: request.segment_specific,
            is_charge1,
        });
        Ok(())
    }
}
