pub mod migrations;
pub mod store;

use serde::{Deserialize, Serialize};

pub use store::ResultStore;

/// One party's tally in one constituency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstituencyResult {
    pub id: i64,
    pub constituency: String,
    pub party: String,
    pub votes: u64,
    pub percentage: f64,
}

/// A row as produced by ingestion, before storage assigns an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewResult {
    pub constituency: String,
    pub party: String,
    pub votes: u64,
    pub percentage: f64,
}
