pub const BASE_MIGRATION: &str = r#"
CREATE TABLE IF NOT EXISTS constituency_results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    constituency TEXT NOT NULL,
    party TEXT NOT NULL,
    votes INTEGER NOT NULL,
    percentage REAL NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_constituency_results_constituency
    ON constituency_results(constituency);
CREATE UNIQUE INDEX IF NOT EXISTS idx_constituency_results_key
    ON constituency_results(constituency, party);
"#;
