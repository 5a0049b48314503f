//! Limit/offset windows for list queries.

use std::fmt::Display;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer};

/// A window over an ordered result set.
///
/// Both fields follow the "non-positive means absent" convention: a `limit`
/// of zero or less returns every row, an `offset` of zero or less starts at
/// the first row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Page {
    #[serde(default, deserialize_with = "empty_as_zero")]
    pub limit: i64,
    #[serde(default, deserialize_with = "empty_as_zero")]
    pub offset: i64,
}

impl Page {
    /// Every row.
    pub const ALL: Page = Page {
        limit: 0,
        offset: 0,
    };

    pub fn new(limit: i64, offset: i64) -> Self {
        Self { limit, offset }
    }

    /// Effective row limit, `None` when unbounded.
    pub fn limit(&self) -> Option<i64> {
        (self.limit > 0).then_some(self.limit)
    }

    /// Effective number of rows to skip.
    pub fn offset(&self) -> i64 {
        self.offset.max(0)
    }

    /// Apply the window to an already ordered sequence.
    pub fn slice<T>(&self, items: Vec<T>) -> Vec<T> {
        let skipped = items.into_iter().skip(self.offset() as usize);
        match self.limit() {
            Some(limit) => skipped.take(limit as usize).collect(),
            None => skipped.collect(),
        }
    }
}

/// Deserialize an optional query parameter, treating an empty value as unset.
pub fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => text.parse().map(Some).map_err(de::Error::custom),
    }
}

fn empty_as_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    Ok(empty_as_none(deserializer)?.unwrap_or(0))
}
