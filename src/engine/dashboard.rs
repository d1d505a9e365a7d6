use chrono::{NaiveDate, NaiveDateTime};

use crate::model::*;

use super::Engine;

const HOUR_MS: Ms = 3_600_000;
const MINUTE_MS: Ms = 60_000;

/// The UTC span a shift covers on a local calendar day, for a site whose
/// clock runs `utc_offset_minutes` ahead of UTC.
pub fn shift_window(day: NaiveDate, shift: Shift, utc_offset_minutes: i32) -> Span {
    let local_midnight = NaiveDateTime::from(day).and_utc().timestamp_millis();
    let midnight = local_midnight - Ms::from(utc_offset_minutes) * MINUTE_MS;
    let (from, to) = shift.hours();
    Span::new(midnight + Ms::from(from) * HOUR_MS, midnight + Ms::from(to) * HOUR_MS)
}

impl Engine {
    /// Active reservations touching one shift of one day, grouped by space
    /// category and ordered by start within a category.
    pub async fn dashboard(
        &self,
        day: NaiveDate,
        shift: Shift,
        utc_offset_minutes: i32,
        category: Option<Category>,
    ) -> Vec<DashboardRow> {
        let window = shift_window(day, shift, utc_offset_minutes);
        let states: Vec<_> = self.spaces.iter().map(|e| e.value().clone()).collect();

        let mut rows = Vec::new();
        for st in states {
            let guard = st.read().await;
            if category.is_some_and(|c| c != guard.space.category) {
                continue;
            }
            for slot in guard.overlapping(&window) {
                let Some(r) = guard.reservations.get(&slot.id) else {
                    continue;
                };
                rows.push(DashboardRow {
                    space_name: guard.space.name.clone(),
                    category: guard.space.category,
                    start: r.span.start,
                    end: r.span.end,
                    account_name: self.account_name(&r.account_id),
                    reason: r.reason.clone(),
                });
            }
        }

        rows.sort_by(|a, b| {
            a.category
                .as_str()
                .cmp(b.category.as_str())
                .then(a.start.cmp(&b.start))
                .then_with(|| a.space_name.cmp(&b.space_name))
        });
        rows
    }
}
