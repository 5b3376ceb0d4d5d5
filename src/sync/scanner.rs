use anyhow::Result;
use std::collections::HashSet;
use tracing::debug;

use crate::normalize::normalize;
use crate::services::database_api::{DatabaseApi, record_title};

/// Normalized titles of every book already stored under `database_id`.
///
/// Records without a title segment are skipped. An empty title is kept, so it matches an
/// empty book name in the ratings file.
#[tracing::instrument(skip(db))]
pub async fn existing_titles<D: DatabaseApi + ?Sized>(
    db: &D,
    database_id: &str,
) -> Result<HashSet<String>> {
    let records = db.query(database_id).await?;

    let seen: HashSet<String> = records
        .iter()
        .filter_map(record_title)
        .map(normalize)
        .collect();

    debug!(records = records.len(), titles = seen.len(), "Existing titles collected");
    Ok(seen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::database_api::testing::{FakeDatabase, page};
    use serde_json::json;

    #[tokio::test]
    async fn test_titles_are_normalized() {
        let db = FakeDatabase::with_titles(&["Dune", "  The Hobbit "]);
        let seen = existing_titles(&db, "db").await.unwrap();

        assert_eq!(seen.len(), 2);
        assert!(seen.contains("dune"));
        assert!(seen.contains("the hobbit"));
    }

    #[tokio::test]
    async fn test_malformed_records_are_skipped() {
        let db = FakeDatabase {
            records: vec![
                page("Dune"),
                json!({ "properties": {} }),
                json!({ "properties": { "Book Name": { "title": [] } } }),
                json!({ "properties": { "Book Name": { "title": [{ "text": {} }] } } }),
            ],
            ..Default::default()
        };

        let seen = existing_titles(&db, "db").await.unwrap();
        assert_eq!(seen, HashSet::from(["dune".to_string()]));
    }

    #[tokio::test]
    async fn test_blank_title_is_kept_as_empty() {
        let db = FakeDatabase::with_titles(&["   ", "Dune"]);
        let seen = existing_titles(&db, "db").await.unwrap();

        assert_eq!(seen, HashSet::from(["".to_string(), "dune".to_string()]));
    }

    #[tokio::test]
    async fn test_empty_database() {
        let db = FakeDatabase::default();
        assert!(existing_titles(&db, "db").await.unwrap().is_empty());
    }
}
