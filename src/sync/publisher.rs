use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

use crate::ratings::BookStats;
use crate::services::database_api::{DatabaseApi, book_properties};

/// Which books were sent to the database and which were left alone.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PublishOutcome {
    pub created: Vec<String>,
    pub skipped_existing: Vec<String>,
}

/// Creates a record for every book whose normalized name is not in `seen`.
///
/// The normalized name is also the published title.
///
/// Books that already exist are skipped even when their average has changed, since
/// there is no update path. The first failed create aborts the rest.
#[tracing::instrument(skip(db, books, seen), fields(books = books.len(), seen = seen.len()))]
pub async fn publish<D: DatabaseApi + ?Sized>(
    db: &D,
    database_id: &str,
    books: &BTreeMap<String, BookStats>,
    seen: &HashSet<String>,
    dry_run: bool,
) -> Result<PublishOutcome> {
    let mut outcome = PublishOutcome::default();

    for (title, stats) in books {
        if seen.contains(title) {
            debug!(book = %title, "Book already exists, not updating");
            outcome.skipped_existing.push(title.clone());
            continue;
        }

        let average_rating = stats.average_rating();
        if dry_run {
            info!(
                book = %title,
                average_rating,
                favourites = stats.num_favourites,
                "Dry run: would create record"
            );
        } else {
            db.create(
                database_id,
                book_properties(title, average_rating, stats.num_favourites),
            )
            .await
            .with_context(|| format!("Failed to create record for '{title}'"))?;
            info!(
                book = %title,
                average_rating,
                favourites = stats.num_favourites,
                "Record created"
            );
        }
        outcome.created.push(title.clone());
    }

    Ok(outcome)
}
