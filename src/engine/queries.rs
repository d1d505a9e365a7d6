use ulid::Ulid;

use crate::model::*;

use super::conflict::{availability_of, validate_span};
use super::policy::{self, Actor};
use super::{Engine, EngineError, Entity, Page, ReservationFilter};

impl Engine {
    fn info(&self, space_name: &str, r: &Reservation) -> ReservationInfo {
        ReservationInfo {
            id: r.id,
            space_id: r.space_id,
            space_name: space_name.to_string(),
            account_id: r.account_id,
            account_name: self.account_name(&r.account_id),
            start: r.span.start,
            end: r.span.end,
            reason: r.reason.clone(),
            status: r.status,
            created_at: r.created_at,
        }
    }

    pub async fn get_reservation(&self, actor: &Actor, id: Ulid) -> Result<ReservationInfo, EngineError> {
        let guard = self.resolve_reservation_read(&id).await?;
        let r = guard
            .reservations
            .get(&id)
            .ok_or(EngineError::NotFound(Entity::Reservation, id))?;
        policy::can_view(actor, r)?;
        Ok(self.info(&guard.space.name, r))
    }

    /// Filtered, paged listing. Non-admins only ever see their own rows.
    pub async fn list_reservations(
        &self,
        actor: &Actor,
        mut filter: ReservationFilter,
        page: Page,
    ) -> Result<Vec<ReservationInfo>, EngineError> {
        policy::scope_filter(actor, &mut filter)?;

        let states: Vec<_> = match filter.space_id {
            Some(space_id) => self.space_state(&space_id).into_iter().collect(),
            None => self.spaces.iter().map(|e| e.value().clone()).collect(),
        };

        let mut rows = Vec::new();
        for st in states {
            let guard = st.read().await;
            for r in guard.reservations.values() {
                let account_name = self.account_name(&r.account_id);
                if filter.matches(r, &guard.space.name, &account_name) {
                    rows.push((r.created_at, r.seq, self.info(&guard.space.name, r)));
                }
            }
        }

        Ok(page
            .apply(rows, |(created_at, seq, _)| (*created_at, *seq))
            .into_iter()
            .map(|(_, _, info)| info)
            .collect())
    }

    /// Archived snapshots, same filter and visibility rules as reservations.
    pub fn list_history(
        &self,
        actor: &Actor,
        mut filter: ReservationFilter,
        page: Page,
    ) -> Result<Vec<HistoryRecord>, EngineError> {
        policy::scope_filter(actor, &mut filter)?;
        let rows: Vec<HistoryRecord> = self
            .history
            .iter()
            .filter(|h| filter.matches_history(h.value()))
            .map(|h| h.value().clone())
            .collect();
        Ok(page.apply(rows, |h| (h.created_at, h.seq)))
    }

    /// Advisory probe: answers from a read lock, so a write may still lose
    /// the slot to a concurrent booking.
    pub async fn check_availability(
        &self,
        space_id: Ulid,
        span: Span,
        exclude: Option<Ulid>,
    ) -> Result<Availability, EngineError> {
        validate_span(&span)?;
        let st = self
            .space_state(&space_id)
            .ok_or(EngineError::NotFound(Entity::Space, space_id))?;
        let guard = st.read().await;
        Ok(availability_of(&guard, &span, exclude))
    }
}
