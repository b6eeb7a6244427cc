//! Keyset pagination
//!
//! Transactions are paged in `(date, id)` descending order. A page after a
//! cursor holds the rows strictly less than the cursor in that
//! lexicographic order, so inserts of earlier-dated rows between requests
//! never shift rows across page boundaries.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 500;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaginationError {
    #[error("Cursor requires both prev_date and prev_id")]
    IncompleteCursor,
}

/// Sort key of the last row of the previous page.
///
/// Field order matters: the derived `Ord` compares `date` first and breaks
/// ties on `id`, matching the store's row comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cursor {
    pub date: NaiveDate,
    pub id: Uuid,
}

impl Cursor {
    pub fn new(date: NaiveDate, id: Uuid) -> Self {
        Self { date, id }
    }

    /// Build a cursor from optional halves; both or neither must be present.
    pub fn from_parts(
        date: Option<NaiveDate>,
        id: Option<Uuid>,
    ) -> Result<Option<Self>, PaginationError> {
        match (date, id) {
            (Some(date), Some(id)) => Ok(Some(Self { date, id })),
            (None, None) => Ok(None),
            _ => Err(PaginationError::IncompleteCursor),
        }
    }
}

/// One page request: an optional cursor and a bounded page size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub cursor: Option<Cursor>,
    pub limit: i64,
}

impl PageRequest {
    /// First page; `limit` is clamped to `1..=MAX_PAGE_SIZE`
    pub fn first(limit: Option<i64>) -> Self {
        Self {
            cursor: None,
            limit: clamp_limit(limit),
        }
    }

    /// Page following `cursor`
    pub fn after(cursor: Cursor, limit: Option<i64>) -> Self {
        Self {
            cursor: Some(cursor),
            limit: clamp_limit(limit),
        }
    }

    pub fn new(cursor: Option<Cursor>, limit: Option<i64>) -> Self {
        Self {
            cursor,
            limit: clamp_limit(limit),
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first(None)
    }
}

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

/// Keyset predicate over the `"date"` and `id` columns, binding the cursor
/// date at `$first_param` and id at the following placeholder.
pub(crate) fn keyset_predicate(first_param: usize) -> String {
    format!("(\"date\", id) < (${}, ${})", first_param, first_param + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// In-memory model of the paged query: rows below the cursor, newest first.
    fn page(rows: &[Cursor], request: &PageRequest) -> Vec<Cursor> {
        let mut matching: Vec<Cursor> = rows
            .iter()
            .copied()
            .filter(|row| request.cursor.map_or(true, |cursor| *row < cursor))
            .collect();
        matching.sort_by(|a, b| b.cmp(a));
        matching.truncate(request.limit as usize);
        matching
    }

    #[test]
    fn test_limit_defaults_and_bounds() {
        assert_eq!(PageRequest::default().limit, DEFAULT_PAGE_SIZE);
        assert_eq!(PageRequest::first(Some(0)).limit, 1);
        assert_eq!(PageRequest::first(Some(-5)).limit, 1);
        assert_eq!(PageRequest::first(Some(10_000)).limit, MAX_PAGE_SIZE);
        assert_eq!(PageRequest::first(Some(7)).limit, 7);
    }

    #[test]
    fn test_cursor_from_parts() {
        let id = Uuid::new_v4();
        let d = date(2024, 1, 2);

        assert_eq!(Cursor::from_parts(Some(d), Some(id)), Ok(Some(Cursor::new(d, id))));
        assert_eq!(Cursor::from_parts(None, None), Ok(None));
        assert_eq!(
            Cursor::from_parts(Some(d), None),
            Err(PaginationError::IncompleteCursor)
        );
        assert_eq!(
            Cursor::from_parts(None, Some(id)),
            Err(PaginationError::IncompleteCursor)
        );
    }

    #[test]
    fn test_cursor_orders_by_date_then_id() {
        let low = Uuid::from_u128(1);
        let high = Uuid::from_u128(2);

        assert!(Cursor::new(date(2024, 1, 1), high) < Cursor::new(date(2024, 1, 2), low));
        assert!(Cursor::new(date(2024, 1, 2), low) < Cursor::new(date(2024, 1, 2), high));
    }

    #[test]
    fn test_keyset_predicate() {
        assert_eq!(keyset_predicate(2), "(\"date\", id) < ($2, $3)");
    }

    #[test]
    fn test_pages_cover_every_row_once() {
        // Several rows share a date so the id tie-break is exercised.
        let rows: Vec<Cursor> = (0..23u128)
            .map(|i| Cursor::new(date(2024, 1, 1 + (i / 4) as u32), Uuid::from_u128(i * 7919 % 101)))
            .collect();

        let mut expected = rows.clone();
        expected.sort_by(|a, b| b.cmp(a));

        let mut collected = Vec::new();
        let mut request = PageRequest::first(Some(5));
        loop {
            let items = page(&rows, &request);
            if items.is_empty() {
                break;
            }
            let last = *items.last().unwrap();
            collected.extend(items);
            request = PageRequest::after(last, Some(5));
        }

        assert_eq!(collected, expected);
    }

    #[test]
    fn test_earlier_insert_between_pages_is_not_duplicated() {
        let mut rows: Vec<Cursor> = (1..=6u32)
            .map(|d| Cursor::new(date(2024, 1, d), Uuid::from_u128(d as u128)))
            .collect();

        let first = page(&rows, &PageRequest::first(Some(3)));
        assert_eq!(first.iter().map(|c| c.date.day()).collect::<Vec<_>>(), vec![6, 5, 4]);

        // A row dated before the whole first page arrives between requests.
        rows.push(Cursor::new(date(2023, 12, 31), Uuid::from_u128(99)));

        let second = page(&rows, &PageRequest::after(*first.last().unwrap(), Some(3)));
        assert_eq!(second.iter().map(|c| c.date.day()).collect::<Vec<_>>(), vec![3, 2, 1]);
        assert!(second.iter().all(|row| !first.contains(row)));
    }
}
