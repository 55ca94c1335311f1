//! Record-level carrier pairing filter.

use crate::record::{CarrierPair, CarrierPairLimits};

use super::context::RuleContext;
use super::markup::Markups;
use super::outcome::MatchResult;

/// Match each transfer's carrier pairing against the record's allowances.
pub(crate) fn filter_transfer_types(ctx: &RuleContext<'_>, markups: &mut Markups) {
    let limits = &ctx.rule.carrier_pairs;
    for idx in markups.processing_order() {
        let Some(markup) = markups.get_mut(idx) else {
            continue;
        };
        let Some(pair) = markup.transfer_type else {
            continue;
        };

        markup.type_match = if !markup.validate_entire_rule && markup.component != ctx.current {
            MatchResult::DoesNotApply
        } else {
            pair_match(limits, pair)
        };
    }
}

pub(crate) fn pair_match(limits: &CarrierPairLimits, pair: CarrierPair) -> MatchResult {
    MatchResult::from_bool(limits.allows(pair))
}
