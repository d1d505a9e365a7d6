use ulid::Ulid;

use crate::limits::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use crate::model::*;

use super::EngineError;

/// Combinable listing filters. Every field is optional; set fields are ANDed.
/// Range bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservationFilter {
    pub account_id: Option<Ulid>,
    pub space_id: Option<Ulid>,
    pub status: Option<Status>,
    pub space_name_contains: Option<String>,
    pub account_name_contains: Option<String>,
    pub start_from: Option<Ms>,
    pub start_until: Option<Ms>,
    pub end_from: Option<Ms>,
    pub end_until: Option<Ms>,
}

impl ReservationFilter {
    fn matches_fields(
        &self,
        space_id: Ulid,
        account_id: Ulid,
        status: Status,
        span: &Span,
        space_name: &str,
        account_name: &str,
    ) -> bool {
        self.account_id.is_none_or(|a| a == account_id)
            && self.space_id.is_none_or(|s| s == space_id)
            && self.status.is_none_or(|s| s == status)
            && self.start_from.is_none_or(|t| span.start >= t)
            && self.start_until.is_none_or(|t| span.start <= t)
            && self.end_from.is_none_or(|t| span.end >= t)
            && self.end_until.is_none_or(|t| span.end <= t)
            && contains_ci(space_name, self.space_name_contains.as_deref())
            && contains_ci(account_name, self.account_name_contains.as_deref())
    }

    pub fn matches(&self, r: &Reservation, space_name: &str, account_name: &str) -> bool {
        self.matches_fields(r.space_id, r.account_id, r.status, &r.span, space_name, account_name)
    }

    pub fn matches_history(&self, h: &HistoryRecord) -> bool {
        self.matches_fields(h.space_id, h.account_id, h.status, &h.span, &h.space_name, &h.account_name)
    }
}

fn contains_ci(haystack: &str, needle: Option<&str>) -> bool {
    match needle {
        None => true,
        Some(n) => haystack.to_lowercase().contains(&n.to_lowercase()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl Page {
    pub fn new(offset: Option<usize>, limit: Option<usize>) -> Result<Self, EngineError> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        if limit > MAX_PAGE_LIMIT {
            return Err(EngineError::LimitExceeded("page limit too large"));
        }
        Ok(Self {
            offset: offset.unwrap_or(0),
            limit,
        })
    }

    /// Sort key is `(created_at, seq)`: creation time, then insertion order.
    pub(crate) fn apply<T>(&self, mut rows: Vec<T>, key: impl Fn(&T) -> (Ms, u64)) -> Vec<T> {
        rows.sort_by_key(|r| key(r));
        rows.into_iter().skip(self.offset).take(self.limit).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpaceFilter {
    pub category: Option<Category>,
    pub active: Option<bool>,
}

impl SpaceFilter {
    pub fn matches(&self, space: &Space) -> bool {
        self.category.is_none_or(|c| c == space.category)
            && self.active.is_none_or(|a| a == space.active)
    }
}
