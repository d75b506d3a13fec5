use std::path::Path;
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{ElectionError, Result};
use crate::storage::migrations::BASE_MIGRATION;
use crate::storage::{ConstituencyResult, NewResult};

/// Handle over the `constituency_results` table.
///
/// Each handle owns one SQLite connection. The server opens a fresh handle per
/// request, so concurrent writers are serialized by SQLite itself and every
/// upsert is a single atomic statement against the unique
/// `(constituency, party)` index.
#[derive(Debug)]
pub struct ResultStore {
    conn: Connection,
}

impl ResultStore {
    pub fn open(path: &Path, busy_timeout: Duration) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    pub fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(BASE_MIGRATION)?;
        Ok(())
    }

    /// Inserts the row, or overwrites votes and percentage of the existing
    /// row for the same constituency and party. Commits immediately.
    pub fn upsert(&self, result: &NewResult) -> Result<()> {
        let votes = i64::try_from(result.votes).map_err(|_| {
            ElectionError::invalid_input(format!(
                "vote count {} for {} in {} is out of range",
                result.votes, result.party, result.constituency
            ))
        })?;
        self.conn.execute(
            r#"
INSERT INTO constituency_results(constituency, party, votes, percentage)
VALUES (?1, ?2, ?3, ?4)
ON CONFLICT(constituency, party) DO UPDATE SET
    votes = excluded.votes,
    percentage = excluded.percentage
"#,
            params![
                result.constituency,
                result.party,
                votes,
                result.percentage
            ],
        )?;
        Ok(())
    }

    pub fn find(&self, constituency: &str, party: &str) -> Result<Option<ConstituencyResult>> {
        let mut stmt = self.conn.prepare(
            r#"
SELECT id, constituency, party, votes, percentage
FROM constituency_results
WHERE constituency = ?1 AND party = ?2
"#,
        )?;
        let row = stmt
            .query_row(params![constituency, party], row_to_result)
            .optional()?;
        Ok(row)
    }

    /// Every stored row, ordered by constituency then party.
    pub fn all_results(&self) -> Result<Vec<ConstituencyResult>> {
        let mut stmt = self.conn.prepare(
            r#"
SELECT id, constituency, party, votes, percentage
FROM constituency_results
ORDER BY constituency, party
"#,
        )?;
        let rows = stmt
            .query_map([], row_to_result)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn count(&self) -> Result<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM constituency_results", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn row_to_result(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConstituencyResult> {
    Ok(ConstituencyResult {
        id: row.get(0)?,
        constituency: row.get(1)?,
        party: row.get(2)?,
        votes: {
            let votes: i64 = row.get(3)?;
            u64::try_from(votes).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(3, votes))?
        },
        percentage: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::ResultStore;
    use crate::error::ElectionError;
    use crate::storage::NewResult;

    fn row(constituency: &str, party: &str, votes: u64, percentage: f64) -> NewResult {
        NewResult {
            constituency: constituency.to_string(),
            party: party.to_string(),
            votes,
            percentage,
        }
    }

    #[test]
    fn upsert_updates_existing_key_in_place() {
        let store = ResultStore::open_in_memory().expect("open store");
        store
            .upsert(&row("Winchester", "Labour Party", 100, 40.0))
            .expect("first upsert");
        let first = store
            .find("Winchester", "Labour Party")
            .expect("find")
            .expect("row present");

        store
            .upsert(&row("Winchester", "Labour Party", 250, 62.5))
            .expect("second upsert");
        let second = store
            .find("Winchester", "Labour Party")
            .expect("find")
            .expect("row present");

        assert_eq!(store.count().expect("count"), 1);
        assert_eq!(first.id, second.id);
        assert_eq!(second.votes, 250);
        assert!((second.percentage - 62.5).abs() < 1e-9);
    }

    #[test]
    fn same_party_in_different_constituencies_are_separate_rows() {
        let store = ResultStore::open_in_memory().expect("open store");
        store.upsert(&row("Bath", "Green Party", 10, 100.0)).expect("upsert");
        store.upsert(&row("Avon", "Green Party", 20, 100.0)).expect("upsert");

        let rows = store.all_results().expect("all results");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].constituency, "Avon");
        assert_eq!(rows[1].constituency, "Bath");
    }

    #[test]
    fn upsert_refuses_votes_outside_integer_range() {
        let store = ResultStore::open_in_memory().expect("open store");
        let result = store.upsert(&row("Bigtown", "Conservative Party", 1 << 63, 100.0));
        assert!(matches!(result, Err(ElectionError::InvalidInput(_))));
        assert_eq!(store.count().expect("count"), 0);
    }

    #[test]
    fn negative_stored_votes_surface_as_errors() {
        let store = ResultStore::open_in_memory().expect("open store");
        store
            .conn
            .execute(
                "INSERT INTO constituency_results(constituency, party, votes, percentage)
                 VALUES ('Bigtown', 'Labour Party', -5, 0.0)",
                [],
            )
            .expect("raw insert");
        assert!(matches!(store.all_results(), Err(ElectionError::Storage(_))));
    }

    #[test]
    fn find_returns_none_for_missing_key() {
        let store = ResultStore::open_in_memory().expect("open store");
        assert!(store.find("Nowhere", "SNP").expect("find").is_none());
    }

    #[test]
    fn on_disk_store_persists_between_handles() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("results.db");
        {
            let store = ResultStore::open(&path, Duration::from_millis(100)).expect("open");
            store.upsert(&row("York", "Labour Party", 5, 100.0)).expect("upsert");
        }
        let reopened = ResultStore::open(&path, Duration::from_millis(100)).expect("reopen");
        assert_eq!(reopened.count().expect("count"), 1);
    }

    #[test]
    fn concurrent_writers_never_duplicate_a_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("results.db");
        ResultStore::open(&path, Duration::from_secs(5)).expect("create schema");

        let handles = (0..4u64)
            .map(|writer| {
                let path = path.clone();
                std::thread::spawn(move || {
                    let store = ResultStore::open(&path, Duration::from_secs(5)).expect("open");
                    for round in 0..25u64 {
                        store
                            .upsert(&row("Hull North", "Labour Party", writer * 100 + round, 50.0))
                            .expect("upsert");
                    }
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.join().expect("writer thread");
        }

        let store = ResultStore::open(&path, Duration::from_secs(5)).expect("open");
        assert_eq!(store.count().expect("count"), 1);
    }
}
