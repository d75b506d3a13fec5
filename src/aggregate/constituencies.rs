use crate::aggregate::{votes_by_constituency, ConstituencySummary, PartyShare};
use crate::error::Result;
use crate::storage::{ConstituencyResult, ResultStore};

/// Per-constituency breakdown, ordered by constituency name.
///
/// Percentages are computed from the votes in each constituency rather than
/// read from storage, and rounded to two decimal places. Parties are listed by
/// votes descending, then name. When several parties share the top tally the
/// alphabetically first one is reported as the winner.
pub fn constituency_breakdown(rows: &[ConstituencyResult]) -> Vec<ConstituencySummary> {
    votes_by_constituency(rows)
        .into_iter()
        .filter_map(|(constituency, parties)| {
            let total = parties
                .values()
                .fold(0u64, |acc, votes| acc.saturating_add(*votes));
            let mut results = parties
                .into_iter()
                .map(|(party, votes)| PartyShare {
                    party: party.to_string(),
                    votes,
                    percentage: share_of(votes, total),
                })
                .collect::<Vec<_>>();
            results.sort_by(|a, b| b.votes.cmp(&a.votes).then_with(|| a.party.cmp(&b.party)));

            let winning_party = results.first()?.party.clone();
            Some(ConstituencySummary {
                constituency_name: constituency.to_string(),
                results,
                winning_party,
            })
        })
        .collect()
}

pub fn get_constituencies(store: &ResultStore) -> Result<Vec<ConstituencySummary>> {
    let rows = store.all_results()?;
    Ok(constituency_breakdown(&rows))
}

fn share_of(votes: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(votes as f64 * 100.0 / total as f64)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
