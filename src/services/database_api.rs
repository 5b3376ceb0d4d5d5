//! Trait and property layout for the remote book database.

use anyhow::Result;
use serde_json::{Value, json};

/// Title property holding the book name.
pub const TITLE_PROPERTY: &str = "Book Name";
pub const AVERAGE_RATING_PROPERTY: &str = "Average Rating";
pub const FAVOURITES_PROPERTY: &str = "Favourites";

/// Abstraction over the hosted database the ratings are published to.
///
/// Records are exchanged as raw JSON. There is no update operation: existing pages could
/// not be located by id, so a book that already exists is never rewritten. Known limitation.
#[async_trait::async_trait]
pub trait DatabaseApi: Send + Sync {
    /// Returns every record stored under `database_id`.
    async fn query(&self, database_id: &str) -> Result<Vec<Value>>;

    /// Creates a record under `database_id` with the given property map.
    async fn create(&self, database_id: &str, properties: Value) -> Result<()>;
}

/// Extracts `properties["Book Name"].title[0].text.content`, if the record has one.
pub fn record_title(record: &Value) -> Option<&str> {
    record
        .get("properties")?
        .get(TITLE_PROPERTY)?
        .get("title")?
        .as_array()?
        .first()?
        .get("text")?
        .get("content")?
        .as_str()
}

/// Property map for a new book record.
pub fn book_properties(title: &str, average_rating: f64, favourites: u32) -> Value {
    json!({
        TITLE_PROPERTY: { "title": [{ "text": { "content": title } }] },
        AVERAGE_RATING_PROPERTY: { "number": average_rating },
        FAVOURITES_PROPERTY: { "number": favourites },
    })
}
