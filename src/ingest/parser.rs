use thiserror::Error;

use crate::party::Party;
use crate::storage::NewResult;

/// Escape sequence that lets a constituency name carry a comma without
/// starting a new column.
pub const ESCAPED_COMMA: &str = "\\,";

/// Largest vote count accepted for one party on one line. Keeps every
/// stored tally inside SQLite's signed integer range and every aggregate sum
/// far from `u64` overflow.
pub const MAX_VOTES: u64 = u32::MAX as u64;

// Stands in for an escaped comma while the line is split into columns.
const ESCAPE_MARKER: char = '\u{1f}';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineError {
    #[error("missing constituency name")]
    MissingConstituency,
    #[error("no vote/party pairs after the constituency name")]
    NoPairs,
    #[error("vote count {0:?} has no party code")]
    DanglingVotes(String),
    #[error("invalid vote count {0:?}")]
    InvalidVotes(String),
    #[error("vote count {0} exceeds the maximum of {max}", max = MAX_VOTES)]
    VotesTooLarge(u64),
    #[error("total votes on the line is zero")]
    ZeroTotalVotes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineEntry {
    pub votes: u64,
    pub code: String,
    pub party: Option<Party>,
}

/// A validated CSV line. Percentages are only defined once the line has a
/// non-zero vote total, which `parse_fields` guarantees.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLine {
    pub line: u64,
    pub constituency: String,
    pub entries: Vec<LineEntry>,
    pub total_votes: u64,
}

impl ParsedLine {
    /// Rows to upsert, in input order. Pairs with unknown codes are dropped.
    pub fn results(&self) -> Vec<NewResult> {
        self.entries
            .iter()
            .filter_map(|entry| {
                let party = entry.party?;
                Some(NewResult {
                    constituency: self.constituency.clone(),
                    party: party.full_name().to_string(),
                    votes: entry.votes,
                    percentage: entry.votes as f64 / self.total_votes as f64 * 100.0,
                })
            })
            .collect()
    }

    pub fn unknown_codes(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|entry| entry.party.is_none())
            .map(|entry| entry.code.as_str())
    }
}

/// Splits uploaded text into lines and validates each one.
///
/// There is no header row. Empty lines are dropped; every other line yields
/// its 1-based line number and either a parsed line or the reason it was
/// rejected.
pub fn parse_csv(text: &str) -> Result<Vec<(u64, Result<ParsedLine, LineError>)>, csv::Error> {
    let marked = text.replace(ESCAPED_COMMA, &ESCAPE_MARKER.to_string());
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .trim(csv::Trim::All)
        .from_reader(marked.as_bytes());

    let mut lines = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        // Whitespace-only lines trim down to a single empty field.
        if record.len() == 1 && record[0].is_empty() {
            continue;
        }
        let line = record
            .position()
            .map(|pos| pos.line())
            .unwrap_or(idx as u64 + 1);
        let fields = record.iter().map(unescape_field).collect::<Vec<_>>();
        lines.push((line, parse_fields(line, &fields)));
    }
    Ok(lines)
}

/// Folds escaped commas into single word breaks:
/// `Newcastle\,upon Tyne` becomes `Newcastle upon Tyne`.
pub fn unescape_field(field: &str) -> String {
    if !field.contains(ESCAPE_MARKER) {
        return field.to_string();
    }
    field
        .split(ESCAPE_MARKER)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn parse_fields(line: u64, fields: &[String]) -> Result<ParsedLine, LineError> {
    let Some((constituency, rest)) = fields.split_first() else {
        return Err(LineError::MissingConstituency);
    };
    if constituency.is_empty() {
        return Err(LineError::MissingConstituency);
    }
    if rest.is_empty() {
        return Err(LineError::NoPairs);
    }

    let mut entries = Vec::with_capacity(rest.len() / 2);
    for pair in rest.chunks(2) {
        let [votes, code] = pair else {
            return Err(LineError::DanglingVotes(pair[0].clone()));
        };
        let votes = votes
            .parse::<u64>()
            .map_err(|_| LineError::InvalidVotes(votes.clone()))?;
        if votes > MAX_VOTES {
            return Err(LineError::VotesTooLarge(votes));
        }
        entries.push(LineEntry {
            votes,
            code: code.clone(),
            party: Party::from_code(code),
        });
    }

    let total_votes: u64 = entries.iter().map(|entry| entry.votes).sum();
    if total_votes == 0 {
        return Err(LineError::ZeroTotalVotes);
    }

    Ok(ParsedLine {
        line,
        constituency: constituency.clone(),
        entries,
        total_votes,
    })
}
