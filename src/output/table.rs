use std::collections::BTreeMap;

use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Row, Table};

use crate::aggregate::{ConstituencySummary, PartyTotals};
use crate::ingest::IngestReport;

pub fn render_totals_table(totals: &BTreeMap<String, PartyTotals>) -> String {
    let mut rows = totals.iter().collect::<Vec<_>>();
    rows.sort_by(|(a_party, a), (b_party, b)| {
        b.total_mps
            .cmp(&a.total_mps)
            .then_with(|| b.total_votes.cmp(&a.total_votes))
            .then_with(|| a_party.cmp(b_party))
    });

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Party", "Total Votes", "MPs"]);
    for (party, totals) in rows {
        table.add_row(vec![
            party.clone(),
            totals.total_votes.to_string(),
            totals.total_mps.to_string(),
        ]);
    }
    table.to_string()
}

pub fn render_constituencies_table(summaries: &[ConstituencySummary]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Constituency", "Party", "Votes", "Share"]);

    for summary in summaries {
        for (idx, share) in summary.results.iter().enumerate() {
            let name = if idx == 0 {
                summary.constituency_name.as_str()
            } else {
                ""
            };
            let party_cell = if share.party == summary.winning_party {
                Cell::new(&share.party).fg(Color::Green)
            } else {
                Cell::new(&share.party)
            };
            table.add_row(Row::from(vec![
                Cell::new(name),
                party_cell,
                Cell::new(share.votes),
                Cell::new(format!("{:.2}%", share.percentage)),
            ]));
        }
    }
    table.to_string()
}

pub fn render_report_table(report: &IngestReport) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Line", "Skipped because"]);
    for skipped in &report.skipped {
        table.add_row(vec![skipped.line.to_string(), skipped.reason.clone()]);
    }

    let mut out = report.summary();
    if report.ignored_pairs > 0 {
        out.push_str(&format!(
            "\nIgnored {} pairs with unknown party codes",
            report.ignored_pairs
        ));
    }
    if !report.skipped.is_empty() {
        out.push('\n');
        out.push_str(&table.to_string());
    }
    out
}
