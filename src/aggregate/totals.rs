use std::collections::BTreeMap;

use crate::aggregate::{votes_by_constituency, PartyTotals};
use crate::error::Result;
use crate::storage::{ConstituencyResult, ResultStore};

/// Total votes and seats per party.
///
/// A party takes a constituency's seat when its votes equal the highest tally
/// there; every party tied at the top is credited with the seat. Parties that
/// won nothing still appear with `total_mps = 0`.
pub fn total_results(rows: &[ConstituencyResult]) -> BTreeMap<String, PartyTotals> {
    let mut totals: BTreeMap<String, PartyTotals> = BTreeMap::new();

    for parties in votes_by_constituency(rows).values() {
        let max_votes = parties.values().copied().max().unwrap_or(0);
        for (party, votes) in parties {
            let entry = totals.entry((*party).to_string()).or_default();
            entry.total_votes = entry.total_votes.saturating_add(*votes);
            if *votes == max_votes {
                entry.total_mps += 1;
            }
        }
    }

    totals
}

pub fn get_total_results(store: &ResultStore) -> Result<BTreeMap<String, PartyTotals>> {
    let rows = store.all_results()?;
    Ok(total_results(&rows))
}

#[cfg(test)]
mod tests {
    use super::total_results;
    use crate::aggregate::{row, PartyTotals};

    #[test]
    fn counts_outright_wins_per_party() {
        let rows = vec![
            row("Leeds Central", "Labour Party", 300),
            row("Leeds Central", "Conservative Party", 100),
            row("Hull North", "Labour Party", 250),
            row("Hull North", "Green Party", 90),
        ];
        let totals = total_results(&rows);

        assert_eq!(
            totals["Labour Party"],
            PartyTotals {
                total_votes: 550,
                total_mps: 2
            }
        );
        assert_eq!(totals["Conservative Party"].total_mps, 0);
        assert_eq!(totals["Green Party"].total_votes, 90);
    }

    #[test]
    fn seat_count_matches_constituency_count_without_ties() {
        let rows = vec![
            row("A", "Labour Party", 10),
            row("A", "SNP", 20),
            row("B", "SNP", 5),
            row("B", "UKIP", 6),
            row("C", "Independent", 1),
        ];
        let seats: u64 = total_results(&rows).values().map(|t| t.total_mps).sum();
        assert_eq!(seats, 3);
    }

    #[test]
    fn tied_leaders_each_take_a_seat() {
        let rows = vec![
            row("Marginal", "Labour Party", 500),
            row("Marginal", "Conservative Party", 500),
            row("Marginal", "Green Party", 20),
        ];
        let totals = total_results(&rows);
        assert_eq!(totals["Labour Party"].total_mps, 1);
        assert_eq!(totals["Conservative Party"].total_mps, 1);
        assert_eq!(totals["Green Party"].total_mps, 0);
    }

    #[test]
    fn huge_tallies_saturate_instead_of_overflowing() {
        let rows = vec![
            row("A", "Labour Party", u64::MAX / 2),
            row("B", "Labour Party", u64::MAX / 2),
            row("C", "Labour Party", u64::MAX / 2),
        ];
        let totals = total_results(&rows);
        assert_eq!(totals["Labour Party"].total_votes, u64::MAX);
        assert_eq!(totals["Labour Party"].total_mps, 3);
    }

    #[test]
    fn empty_rows_give_empty_totals() {
        assert!(total_results(&[]).is_empty());
    }
}
