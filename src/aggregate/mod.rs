pub mod constituencies;
pub mod totals;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::storage::ConstituencyResult;

pub use constituencies::{constituency_breakdown, get_constituencies};
pub use totals::{get_total_results, total_results};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyTotals {
    pub total_votes: u64,
    pub total_mps: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartyShare {
    pub party: String,
    pub votes: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstituencySummary {
    pub constituency_name: String,
    pub results: Vec<PartyShare>,
    pub winning_party: String,
}

/// Votes per party, grouped by constituency. Both maps iterate in byte order
/// of their keys, and repeated (constituency, party) rows are summed.
/// Sums saturate at `u64::MAX` instead of wrapping.
pub(crate) fn votes_by_constituency(
    rows: &[ConstituencyResult],
) -> BTreeMap<&str, BTreeMap<&str, u64>> {
    let mut grouped: BTreeMap<&str, BTreeMap<&str, u64>> = BTreeMap::new();
    for row in rows {
        let votes = grouped
            .entry(row.constituency.as_str())
            .or_default()
            .entry(row.party.as_str())
            .or_default();
        *votes = votes.saturating_add(row.votes);
    }
    grouped
}

#[cfg(test)]
pub(crate) fn row(constituency: &str, party: &str, votes: u64) -> ConstituencyResult {
    ConstituencyResult {
        id: 0,
        constituency: constituency.to_string(),
        party: party.to_string(),
        votes,
        percentage: 0.0,
    }
}
