use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Parties recognised in uploaded result files.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Party {
    Conservative,
    Labour,
    Ukip,
    LiberalDemocrats,
    Green,
    Independent,
    Snp,
}

impl Party {
    pub const ALL: [Party; 7] = [
        Party::Conservative,
        Party::Labour,
        Party::Ukip,
        Party::LiberalDemocrats,
        Party::Green,
        Party::Independent,
        Party::Snp,
    ];

    /// Short code used in the CSV input format.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Conservative => "C",
            Self::Labour => "L",
            Self::Ukip => "UKIP",
            Self::LiberalDemocrats => "LD",
            Self::Green => "G",
            Self::Independent => "Ind",
            Self::Snp => "SNP",
        }
    }

    /// Canonical name stored against each result row.
    pub fn full_name(&self) -> &'static str {
        match self {
            Self::Conservative => "Conservative Party",
            Self::Labour => "Labour Party",
            Self::Ukip => "UKIP",
            Self::LiberalDemocrats => "Liberal Democrats",
            Self::Green => "Green Party",
            Self::Independent => "Independent",
            Self::Snp => "SNP",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL.into_iter().find(|party| party.code() == code)
    }
}

impl Display for Party {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.full_name())
    }
}

#[derive(Debug, Error)]
#[error("unknown party code: {0}")]
pub struct PartyParseError(pub String);

impl FromStr for Party {
    type Err = PartyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s).ok_or_else(|| PartyParseError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::Party;

    #[test]
    fn maps_codes_to_full_names() {
        assert_eq!(Party::from_code("C").map(|p| p.full_name()), Some("Conservative Party"));
        assert_eq!(Party::from_code(" LD ").map(|p| p.full_name()), Some("Liberal Democrats"));
        assert_eq!(Party::from_code("Ind").map(|p| p.full_name()), Some("Independent"));
        assert_eq!(Party::from_code("SNP").map(|p| p.full_name()), Some("SNP"));
    }

    #[test]
    fn codes_are_case_sensitive() {
        assert!(Party::from_code("c").is_none());
        assert!(Party::from_code("IND").is_none());
        assert!("Reform".parse::<Party>().is_err());
    }
}
