use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::normalize::normalize;
use crate::ratings::reader::RawRow;

/// A rating equal to this counts as a favourite.
pub const PERFECT_SCORE: f64 = 5.0;

const FIELDS_PER_ROW: usize = 3;

/// Running totals for one book.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BookStats {
    pub total_rating: f64,
    pub num_ratings: u32,
    pub num_favourites: u32,
}

impl BookStats {
    fn add(&mut self, rating: f64) {
        self.total_rating += rating;
        self.num_ratings += 1;
        if rating == PERFECT_SCORE {
            self.num_favourites += 1;
        }
    }

    /// `total_rating / num_ratings`, rounded to two decimals. 0.0 when nothing was counted.
    pub fn average_rating(&self) -> f64 {
        if self.num_ratings == 0 {
            0.0
        } else {
            round2(self.total_rating / self.num_ratings as f64)
        }
    }
}

/// Rounds to two decimal places, ties to even.
///
/// Ties are judged on the exact stored value: 2.125 is a true tie and gives 2.12, while
/// 2.675 is stored slightly below the tie and gives 2.67.
pub fn round2(value: f64) -> f64 {
    let scaled = value * 100.0;
    // exact error of the multiplication above
    let residual = value.mul_add(100.0, -scaled);
    let floor = scaled.floor();

    let rounded = if scaled - floor == 0.5 {
        match residual.partial_cmp(&0.0) {
            Some(Ordering::Greater) => floor + 1.0,
            Some(Ordering::Less) => floor,
            _ => scaled.round_ties_even(),
        }
    } else {
        scaled.round()
    };

    rounded / 100.0
}

/// Why a row did not contribute to any aggregate.
#[derive(Debug, Clone, PartialEq)]
pub enum RowRejection {
    WrongFieldCount { line: u64, found: usize },
    InvalidRating { line: u64, value: String },
}

impl RowRejection {
    pub fn line(&self) -> u64 {
        match self {
            RowRejection::WrongFieldCount { line, .. } | RowRejection::InvalidRating { line, .. } => {
                *line
            }
        }
    }
}

impl fmt::Display for RowRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowRejection::WrongFieldCount { found, .. } => write!(
                f,
                "Invalid row! expected {FIELDS_PER_ROW} fields, found {found}"
            ),
            RowRejection::InvalidRating { value, .. } => write!(f, "Invalid rating: {value}"),
        }
    }
}

/// Result of folding every row of a ratings file.
#[derive(Debug, Default, Serialize)]
pub struct Aggregation {
    /// Keyed by normalized book name.
    pub books: BTreeMap<String, BookStats>,
    #[serde(skip)]
    pub rejections: Vec<RowRejection>,
    pub rows_read: usize,
    /// Older ratings superseded by a later one from the same rater.
    pub duplicate_ratings: usize,
}

impl Aggregation {
    pub fn invalid_rows(&self) -> usize {
        self.rejections
            .iter()
            .filter(|r| matches!(r, RowRejection::WrongFieldCount { .. }))
            .count()
    }

    pub fn invalid_ratings(&self) -> usize {
        self.rejections
            .iter()
            .filter(|r| matches!(r, RowRejection::InvalidRating { .. }))
            .count()
    }
}

/// Folds rows into per-book statistics.
///
/// Rows must be pushed newest first: the first rating seen for a (book, rater) pair wins
/// and every later push for the same pair is counted as a duplicate.
#[derive(Debug, Default)]
pub struct Aggregator {
    books: BTreeMap<String, BookStats>,
    processed: HashSet<(String, String)>,
    rejections: Vec<RowRejection>,
    rows_read: usize,
    duplicate_ratings: usize,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: &RawRow) {
        self.rows_read += 1;

        let [book, rater, rating] = row.fields.as_slice() else {
            self.rejections.push(RowRejection::WrongFieldCount {
                line: row.line,
                found: row.fields.len(),
            });
            return;
        };

        let book_key = normalize(book);
        let rater_key = normalize(rater);

        let rating = match parse_rating(rating) {
            Some(value) => value,
            None => {
                self.rejections.push(RowRejection::InvalidRating {
                    line: row.line,
                    value: rating.clone(),
                });
                return;
            }
        };

        if !self.processed.insert((book_key.clone(), rater_key)) {
            self.duplicate_ratings += 1;
            return;
        }

        self.books.entry(book_key).or_default().add(rating);
    }

    pub fn finish(self) -> Aggregation {
        Aggregation {
            books: self.books,
            rejections: self.rejections,
            rows_read: self.rows_read,
            duplicate_ratings: self.duplicate_ratings,
        }
    }
}

fn parse_rating(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Aggregates rows given in file order, so the last rating per rater and book counts.
pub fn aggregate_rows(rows: &[RawRow]) -> Aggregation {
    let mut aggregator = Aggregator::new();
    for row in rows.iter().rev() {
        aggregator.push(row);
    }
    aggregator.finish()
}
