//! Non-geographic sub-segment predicates.

use crate::domain::{CarrierCode, TravelSegment};
use crate::record::{CarrierAppl, CarrierTableAppl, Restriction, RuleSubSegment, StopConn};
use crate::reference::ReferenceData;

use super::markup::{Markup, StopType};
use super::outcome::MatchResult;

/// Domestic / international restriction on the flights either side of the transfer.
pub(crate) fn restriction_match(
    restriction: Restriction,
    seg: &TravelSegment,
    next: Option<&TravelSegment>,
) -> MatchResult {
    let Some(next) = next else {
        return MatchResult::DoesNotApply;
    };
    let (inbound, outbound) = (seg.is_domestic(), next.is_domestic());
    match restriction {
        Restriction::Blank => MatchResult::DoesNotApply,
        Restriction::Domestic => MatchResult::from_bool(inbound && outbound),
        Restriction::International => MatchResult::from_bool(!inbound && !outbound),
        Restriction::Mixed => MatchResult::from_bool(inbound != outbound),
    }
}

pub(crate) fn stop_conn_match(required: StopConn, stop_type: StopType) -> MatchResult {
    match required {
        StopConn::Either => MatchResult::DoesNotApply,
        StopConn::Stopover => MatchResult::from_bool(stop_type == StopType::Stopover),
        StopConn::Connection => MatchResult::from_bool(stop_type == StopType::Connection),
    }
}

/// Carrier in / carrier out, each checked against its own side.
pub(crate) fn direct_carrier_match(
    reference: &dyn ReferenceData,
    sub: &RuleSubSegment,
    carrier_in: Option<CarrierCode>,
    carrier_out: Option<CarrierCode>,
) -> (MatchResult, MatchResult) {
    (
        side_match(reference, carrier_in, sub.carrier_in, sub.carrier_in_table),
        side_match(reference, carrier_out, sub.carrier_out, sub.carrier_out_table),
    )
}

/// Carrier check honouring the between application, which lets the coded
/// carriers match in either orientation.
pub(crate) fn carrier_match(
    reference: &dyn ReferenceData,
    sub: &RuleSubSegment,
    markup: &Markup,
) -> (MatchResult, MatchResult) {
    let direct = direct_carrier_match(reference, sub, Some(markup.carrier), markup.carrier_out);
    if sub.carrier_appl != CarrierAppl::Between
        || (direct.0 != MatchResult::NotMatch && direct.1 != MatchResult::NotMatch)
    {
        return direct;
    }

    let swapped = direct_carrier_match(reference, sub, markup.carrier_out, Some(markup.carrier));
    if swapped == (MatchResult::Match, MatchResult::Match) {
        swapped
    } else {
        direct
    }
}

fn side_match(
    reference: &dyn ReferenceData,
    carrier: Option<CarrierCode>,
    code: Option<CarrierCode>,
    table: Option<u32>,
) -> MatchResult {
    if code.is_none() && table.is_none() {
        return MatchResult::DoesNotApply;
    }
    let Some(carrier) = carrier else {
        return MatchResult::NotMatch;
    };
    if code == Some(carrier) {
        return MatchResult::Match;
    }
    let Some(table) = table else {
        return MatchResult::NotMatch;
    };

    match reference
        .carrier_table(table)
        .iter()
        .find(|entry| entry.carrier.matches(carrier))
    {
        Some(entry) => MatchResult::from_bool(entry.appl == CarrierTableAppl::Permitted),
        None => MatchResult::NotMatch,
    }
}
