//! Ratings input: reading the delimited file and folding rows into per-book statistics.
//!
//! [`reader`] turns the file into raw rows, [`aggregate`] validates them and keeps the
//! last rating each rater gave each book.

pub mod aggregate;
pub mod reader;

pub use aggregate::{
    Aggregation, Aggregator, BookStats, PERFECT_SCORE, RowRejection, aggregate_rows,
};
pub use reader::{RatingsFile, RawRow, load};
