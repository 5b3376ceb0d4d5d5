//! The scan → aggregate → publish run.

pub mod publisher;
pub mod scanner;

pub use publisher::{PublishOutcome, publish};
pub use scanner::existing_titles;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info, warn};

use crate::ratings::{self, Aggregation, RatingsFile, aggregate_rows};
use crate::services::database_api::DatabaseApi;

/// Per-run settings taken from the command line.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub input: PathBuf,
    pub delimiter: u8,
    pub dry_run: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            input: PathBuf::from("ratings.csv"),
            delimiter: b',',
            dry_run: false,
        }
    }
}

/// One line of the run report.
#[derive(Debug, Serialize)]
pub struct SyncSummary {
    pub timestamp: DateTime<Utc>,
    pub input: String,
    pub status: String,
    pub dry_run: bool,
    pub rows_read: usize,
    pub invalid_rows: usize,
    pub invalid_ratings: usize,
    pub duplicate_ratings: usize,
    pub books: usize,
    pub created: usize,
    pub skipped_existing: usize,
}

impl SyncSummary {
    fn new(options: &SyncOptions, status: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            input: options.input.display().to_string(),
            status: status.to_string(),
            dry_run: options.dry_run,
            rows_read: 0,
            invalid_rows: 0,
            invalid_ratings: 0,
            duplicate_ratings: 0,
            books: 0,
            created: 0,
            skipped_existing: 0,
        }
    }

    fn with_aggregation(mut self, aggregation: &Aggregation) -> Self {
        self.rows_read = aggregation.rows_read;
        self.invalid_rows = aggregation.invalid_rows();
        self.invalid_ratings = aggregation.invalid_ratings();
        self.duplicate_ratings = aggregation.duplicate_ratings;
        self.books = aggregation.books.len();
        self
    }

    fn with_outcome(mut self, outcome: &PublishOutcome) -> Self {
        self.created = outcome.created.len();
        self.skipped_existing = outcome.skipped_existing.len();
        self
    }
}

/// Reads the ratings file and logs every rejected row.
///
/// Returns `None` when the file does not exist.
pub fn load_and_aggregate(options: &SyncOptions) -> Result<Option<Aggregation>> {
    let file = ratings::load(&options.input, options.delimiter)?;

    match &file {
        RatingsFile::Missing => {
            error!("CSV file '{}' not found.", options.input.display());
            return Ok(None);
        }
        RatingsFile::Empty => warn!("CSV file is empty."),
        RatingsFile::Rows(_) => {}
    }

    let aggregation = aggregate_rows(file.rows());
    for rejection in &aggregation.rejections {
        warn!(line = rejection.line(), "{}", rejection);
    }

    Ok(Some(aggregation))
}

/// Runs one full sync against `db`.
///
/// Row-level problems are logged and skipped. A missing input file ends the run early
/// with a `missing_input` summary. Database errors propagate.
#[tracing::instrument(skip(db), fields(input = %options.input.display(), dry_run = options.dry_run))]
pub async fn run<D: DatabaseApi + ?Sized>(
    db: &D,
    database_id: &str,
    options: &SyncOptions,
) -> Result<SyncSummary> {
    let seen = existing_titles(db, database_id).await?;
    info!(existing = seen.len(), "Scanned existing records");

    let Some(aggregation) = load_and_aggregate(options)? else {
        return Ok(SyncSummary::new(options, "missing_input"));
    };
    info!(
        rows = aggregation.rows_read,
        books = aggregation.books.len(),
        rejected = aggregation.rejections.len(),
        duplicates = aggregation.duplicate_ratings,
        "Ratings aggregated"
    );

    let outcome = publish(db, database_id, &aggregation.books, &seen, options.dry_run).await?;
    if !outcome.skipped_existing.is_empty() {
        warn!(
            count = outcome.skipped_existing.len(),
            "Existing books were not updated; the database API offers no update path"
        );
    }

    info!("Database is updated! 🎉");

    Ok(SyncSummary::new(options, "completed")
        .with_aggregation(&aggregation)
        .with_outcome(&outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::database_api::testing::FakeDatabase;
    use std::io::Write;

    fn options_for(content: &str) -> (tempfile::NamedTempFile, SyncOptions) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        let options = SyncOptions {
            input: file.path().to_path_buf(),
            ..Default::default()
        };
        (file, options)
    }

    #[tokio::test]
    async fn test_run_end_to_end() {
        let db = FakeDatabase::with_titles(&["Emma"]);
        let (_file, options) = options_for(
            "Dune,Alice,5\nDune,Bob,5\nEmma,Alice,4\nBad row\nDune,Carol,abc\nDune,Alice,3\n",
        );

        let summary = run(&db, "db1", &options).await.unwrap();

        assert_eq!(summary.status, "completed");
        assert_eq!(summary.rows_read, 6);
        assert_eq!(summary.invalid_rows, 1);
        assert_eq!(summary.invalid_ratings, 1);
        assert_eq!(summary.duplicate_ratings, 1);
        assert_eq!(summary.books, 2);
        assert_eq!(summary.created, 1);
        assert_eq!(summary.skipped_existing, 1);

        let created = db.created.lock().unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].1["Book Name"]["title"][0]["text"]["content"], "dune");
        // Alice's later 3 replaces her 5: (3 + 5) / 2
        assert_eq!(created[0].1["Average Rating"]["number"], 4.0);
        assert_eq!(created[0].1["Favourites"]["number"], 1);
    }

    #[tokio::test]
    async fn test_run_empty_file_creates_nothing() {
        let db = FakeDatabase::default();
        let (_file, options) = options_for("");

        let summary = run(&db, "db1", &options).await.unwrap();

        assert_eq!(summary.status, "completed");
        assert_eq!(summary.books, 0);
        assert!(db.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_blank_line_is_an_invalid_row() {
        let db = FakeDatabase::default();
        let (_file, options) = options_for("Dune,Alice,5\n\n");

        let summary = run(&db, "db1", &options).await.unwrap();

        assert_eq!(summary.rows_read, 2);
        assert_eq!(summary.invalid_rows, 1);
        assert_eq!(summary.created, 1);
    }

    #[tokio::test]
    async fn test_run_missing_file() {
        let db = FakeDatabase::default();
        let dir = tempfile::tempdir().unwrap();
        let options = SyncOptions {
            input: dir.path().join("ratings.csv"),
            ..Default::default()
        };

        let summary = run(&db, "db1", &options).await.unwrap();

        assert_eq!(summary.status, "missing_input");
        assert!(db.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_empty_book_name_matches_empty_remote_title() {
        let db = FakeDatabase::with_titles(&[""]);
        let (_file, options) = options_for(",Alice,4\nDune,Bob,5\n");

        let summary = run(&db, "db1", &options).await.unwrap();

        assert_eq!(summary.skipped_existing, 1);
        assert_eq!(db.created_titles(), vec!["dune"]);
    }

    #[tokio::test]
    async fn test_run_propagates_create_failure() {
        let db = FakeDatabase {
            fail_create_at: Some(0),
            ..Default::default()
        };
        let (_file, options) = options_for("Dune,Alice,5\n");

        assert!(run(&db, "db1", &options).await.is_err());
    }
}
