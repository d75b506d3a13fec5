use std::collections::BTreeMap;

use anyhow::Result;

use crate::aggregate::{ConstituencySummary, PartyTotals};

pub fn totals_to_csv(totals: &BTreeMap<String, PartyTotals>) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(["party", "total_votes", "total_mps"])?;
    for (party, totals) in totals {
        writer.write_record([
            party.clone(),
            totals.total_votes.to_string(),
            totals.total_mps.to_string(),
        ])?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

/// One record per (constituency, party), flagging the winner.
pub fn constituencies_to_csv(summaries: &[ConstituencySummary]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(["constituency", "party", "votes", "percentage", "winner"])?;
    for summary in summaries {
        for share in &summary.results {
            writer.write_record([
                summary.constituency_name.clone(),
                share.party.clone(),
                share.votes.to_string(),
                format!("{:.2}", share.percentage),
                (share.party == summary.winning_party).to_string(),
            ])?;
        }
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{constituencies_to_csv, totals_to_csv};
    use crate::aggregate::{ConstituencySummary, PartyShare, PartyTotals};

    #[test]
    fn writes_totals_with_header() {
        let mut totals = BTreeMap::new();
        totals.insert(
            "Labour Party".to_string(),
            PartyTotals {
                total_votes: 42,
                total_mps: 1,
            },
        );
        let csv = totals_to_csv(&totals).expect("csv");
        assert_eq!(csv, "party,total_votes,total_mps\nLabour Party,42,1\n");
    }

    #[test]
    fn quotes_constituency_names_containing_commas() {
        let summaries = vec![ConstituencySummary {
            constituency_name: "Ross, Skye and Lochaber".to_string(),
            results: vec![PartyShare {
                party: "SNP".to_string(),
                votes: 10,
                percentage: 100.0,
            }],
            winning_party: "SNP".to_string(),
        }];
        let csv = constituencies_to_csv(&summaries).expect("csv");
        assert!(csv.contains("\"Ross, Skye and Lochaber\",SNP,10,100.00,true"));
    }
}
