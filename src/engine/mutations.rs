use dashmap::mapref::entry::Entry;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::conflict::{check_no_conflict, validate_span};
use super::policy::{self, Actor};
use super::{Engine, EngineError, Entity, WalCommand, transition};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReservation {
    pub id: Ulid,
    pub space_id: Ulid,
    pub span: Span,
    pub reason: String,
    /// Admin-only: book under another account's name.
    pub on_behalf_of: Option<Ulid>,
}

/// Field edits. `None` keeps the current value; a lone `start` or `end`
/// is completed from the stored span under the space's write lock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservationPatch {
    pub space_id: Option<Ulid>,
    pub start: Option<Ms>,
    pub end: Option<Ms>,
    pub reason: Option<String>,
}

impl ReservationPatch {
    /// Move both bounds at once.
    pub fn reschedule(span: Span) -> Self {
        Self {
            start: Some(span.start),
            end: Some(span.end),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.space_id.is_none() && self.start.is_none() && self.end.is_none() && self.reason.is_none()
    }

    fn span_over(&self, current: Span) -> Result<Span, EngineError> {
        let span = Span::try_new(self.start.unwrap_or(current.start), self.end.unwrap_or(current.end))?;
        validate_span(&span)?;
        Ok(span)
    }
}

fn validate_reason(reason: &str) -> Result<(), EngineError> {
    if reason.trim().is_empty() {
        return Err(EngineError::InvalidInput("reason must not be empty".into()));
    }
    if reason.len() > MAX_REASON_LEN {
        return Err(EngineError::LimitExceeded("reason too long"));
    }
    Ok(())
}

impl Engine {
    pub async fn create_reservation(&self, actor: &Actor, new: NewReservation) -> Result<Reservation, EngineError> {
        validate_span(&new.span)?;
        validate_reason(&new.reason)?;
        let account_id = policy::booking_owner(actor, new.on_behalf_of)?;
        let account = self.lookup_account(&account_id)?;
        if !account.active {
            return Err(EngineError::Forbidden("account is inactive"));
        }

        let st = self
            .space_state(&new.space_id)
            .ok_or(EngineError::NotFound(Entity::Space, new.space_id))?;
        let mut guard = st.write().await;
        if !guard.space.active {
            return Err(EngineError::SpaceInactive(new.space_id));
        }
        if guard.reservations.len() >= MAX_RESERVATIONS_PER_SPACE {
            return Err(EngineError::LimitExceeded("too many reservations on space"));
        }
        if self.reservation_to_space.contains_key(&new.id) {
            return Err(EngineError::AlreadyExists(new.id));
        }
        check_no_conflict(&guard, &new.span, None)?;

        // Claim the id across all spaces before the append; another space's
        // writer may be racing with the same id.
        match self.reservation_to_space.entry(new.id) {
            Entry::Occupied(_) => return Err(EngineError::AlreadyExists(new.id)),
            Entry::Vacant(slot) => {
                slot.insert(new.space_id);
            }
        }

        let event = Event::ReservationCreated {
            id: new.id,
            space_id: new.space_id,
            account_id,
            span: new.span,
            reason: new.reason,
            created_at: now_ms(),
        };
        if let Err(e) = self.persist_and_apply(&mut guard, &event).await {
            self.reservation_to_space.remove(&new.id);
            return Err(e);
        }
        tracing::debug!("reservation {} created on space {}", new.id, new.space_id);
        reservation_in(&guard, &new.id)
    }

    /// Edit span, reason and/or space. The slot is re-checked against the
    /// target space, excluding the reservation itself, whenever it moves.
    pub async fn update_reservation(
        &self,
        actor: &Actor,
        id: Ulid,
        patch: ReservationPatch,
    ) -> Result<Reservation, EngineError> {
        if let (Some(start), Some(end)) = (patch.start, patch.end) {
            validate_span(&Span::try_new(start, end)?)?;
        }
        if let Some(reason) = &patch.reason {
            validate_reason(reason)?;
        }

        for _ in 0..super::RESOLVE_ATTEMPTS {
            let from_id = self
                .space_of(&id)
                .ok_or(EngineError::NotFound(Entity::Reservation, id))?;
            let to_id = patch.space_id.unwrap_or(from_id);
            let from_st = self
                .space_state(&from_id)
                .ok_or(EngineError::NotFound(Entity::Space, from_id))?;

            if to_id == from_id {
                let mut guard = from_st.write().await;
                let Some(current) = guard.reservations.get(&id).cloned() else {
                    continue;
                };
                let event = plan_update(actor, &current, &patch, from_id)?;
                if let Event::ReservationUpdated { span, .. } = &event
                    && *span != current.span
                {
                    if !guard.space.active {
                        return Err(EngineError::SpaceInactive(from_id));
                    }
                    check_no_conflict(&guard, span, Some(id))?;
                }
                self.persist_and_apply(&mut guard, &event).await?;
                return reservation_in(&guard, &id);
            }

            let to_st = self
                .space_state(&to_id)
                .ok_or(EngineError::NotFound(Entity::Space, to_id))?;
            // Sorted lock order, as for any multi-space write.
            let (mut from_guard, mut to_guard) = if from_id < to_id {
                let f = from_st.write_owned().await;
                let t = to_st.write_owned().await;
                (f, t)
            } else {
                let t = to_st.write_owned().await;
                let f = from_st.write_owned().await;
                (f, t)
            };
            let Some(current) = from_guard.reservations.get(&id).cloned() else {
                continue;
            };
            let event = plan_update(actor, &current, &patch, from_id)?;
            if !to_guard.space.active {
                return Err(EngineError::SpaceInactive(to_id));
            }
            if to_guard.reservations.len() >= MAX_RESERVATIONS_PER_SPACE {
                return Err(EngineError::LimitExceeded("too many reservations on space"));
            }
            if let Event::ReservationUpdated { span, .. } = &event {
                check_no_conflict(&to_guard, span, Some(id))?;
            }
            self.persist_move(&mut from_guard, &mut to_guard, &event).await?;
            tracing::debug!("reservation {id} moved from space {from_id} to {to_id}");
            return reservation_in(&to_guard, &id);
        }
        Err(EngineError::NotFound(Entity::Reservation, id))
    }

    /// Drive the state machine. Entering a terminal status archives the
    /// reservation in the same log record.
    pub async fn change_status(&self, actor: &Actor, id: Ulid, to: Status) -> Result<Reservation, EngineError> {
        let mut guard = self.resolve_reservation_write(&id).await?;
        let current = reservation_in(&guard, &id)?;
        transition::check(current.status, to)?;
        policy::can_transition(actor, &current, to, now_ms())?;

        let event = if to == Status::Confirmed {
            Event::ReservationConfirmed {
                id,
                space_id: current.space_id,
            }
        } else {
            Event::ReservationClosed {
                id,
                space_id: current.space_id,
                status: to,
                space_name: guard.space.name.clone(),
                account_name: self.account_name(&current.account_id),
                at: now_ms(),
            }
        };
        self.persist_and_apply(&mut guard, &event).await?;
        tracing::debug!("reservation {id}: {} -> {to}", current.status);
        reservation_in(&guard, &id)
    }

    /// Confirmed reservations whose end has passed. Spaces currently locked
    /// by a writer are skipped until the next sweep.
    pub fn collect_elapsed(&self, now: Ms) -> Vec<Ulid> {
        let mut elapsed = Vec::new();
        for entry in self.spaces.iter() {
            if let Ok(guard) = entry.value().try_read() {
                elapsed.extend(
                    guard
                        .reservations
                        .values()
                        .filter(|r| r.status == Status::Confirmed && r.span.end <= now)
                        .map(|r| r.id),
                );
            }
        }
        elapsed
    }

    /// Finalize everything `collect_elapsed` reports. Returns how many moved.
    pub async fn finalize_elapsed(&self, now: Ms) -> usize {
        let mut finalized = 0;
        for id in self.collect_elapsed(now) {
            match self.change_status(&Actor::Sweeper, id, Status::Finalized).await {
                Ok(_) => finalized += 1,
                // Cancelled or finalized by someone else in the meantime.
                Err(e) if e.is_rejection() => tracing::debug!("sweep skip {id}: {e}"),
                Err(e) => tracing::error!("sweep failed for {id}: {e}"),
            }
        }
        finalized
    }

    /// Rewrite the WAL with only the events needed to recreate current state:
    /// accounts, then spaces, then reservations in insertion order.
    ///
    /// The directory lock and every space's read lock are held until the
    /// writer has swapped files, so no append can land between the snapshot
    /// and the swap.
    pub async fn compact_wal(&self) -> Result<(), EngineError> {
        let _directory = self.directory_lock.lock().await;
        let mut space_ids: Vec<Ulid> = self.spaces.iter().map(|e| *e.key()).collect();
        space_ids.sort();
        let mut guards = Vec::with_capacity(space_ids.len());
        for id in &space_ids {
            if let Some(st) = self.space_state(id) {
                guards.push(st.read_owned().await);
            }
        }

        let mut events = Vec::new();

        let mut accounts: Vec<Account> = self.accounts.iter().map(|e| e.value().clone()).collect();
        accounts.sort_by_key(|a| (a.created_at, a.id));
        for a in accounts {
            events.push(Event::AccountCreated {
                id: a.id,
                name: a.name.clone(),
                email: a.email.clone(),
                role: a.role,
                created_at: a.created_at,
            });
            if !a.active {
                events.push(Event::AccountUpdated {
                    id: a.id,
                    name: a.name,
                    email: a.email,
                    role: a.role,
                    active: false,
                });
            }
        }

        let mut reservations = Vec::new();
        for guard in &guards {
            let s = &guard.space;
            events.push(Event::SpaceCreated {
                id: s.id,
                name: s.name.clone(),
                capacity: s.capacity,
                description: s.description.clone(),
                category: s.category,
                tv: s.tv,
                projector: s.projector,
                air_conditioning: s.air_conditioning,
            });
            if !s.active {
                events.push(Event::SpaceUpdated {
                    id: s.id,
                    name: s.name.clone(),
                    capacity: s.capacity,
                    description: s.description.clone(),
                    category: s.category,
                    active: false,
                    tv: s.tv,
                    projector: s.projector,
                    air_conditioning: s.air_conditioning,
                });
            }
            reservations.extend(guard.reservations.values().cloned());
        }

        reservations.sort_by_key(|r| r.seq);
        for r in reservations {
            events.push(Event::ReservationCreated {
                id: r.id,
                space_id: r.space_id,
                account_id: r.account_id,
                span: r.span,
                reason: r.reason.clone(),
                created_at: r.created_at,
            });
            match r.status {
                Status::Pending => {}
                Status::Confirmed => events.push(Event::ReservationConfirmed {
                    id: r.id,
                    space_id: r.space_id,
                }),
                Status::Cancelled | Status::Finalized => {
                    let (space_name, account_name, at) = match self.history.get(&r.id) {
                        Some(h) => (h.space_name.clone(), h.account_name.clone(), h.archived_at),
                        None => (String::new(), self.account_name(&r.account_id), r.span.end),
                    };
                    events.push(Event::ReservationClosed {
                        id: r.id,
                        space_id: r.space_id,
                        status: r.status,
                        space_name,
                        account_name,
                        at,
                    });
                }
            }
        }

        let event_count = events.len();
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact { events, response: tx })
            .await
            .map_err(|_| EngineError::Unavailable("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::Unavailable("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::Unavailable(e.to_string()))?;
        tracing::info!("compacted WAL to {event_count} events");
        drop(guards);
        Ok(())
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = tokio::sync::oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}

/// Editability, then permission, then the resulting event.
fn plan_update(
    actor: &Actor,
    current: &Reservation,
    patch: &ReservationPatch,
    from_space_id: Ulid,
) -> Result<Event, EngineError> {
    transition::check_editable(current.status)?;
    policy::can_edit(actor, current)?;
    Ok(Event::ReservationUpdated {
        id: current.id,
        from_space_id,
        space_id: patch.space_id.unwrap_or(from_space_id),
        span: patch.span_over(current.span)?,
        reason: patch.reason.clone().unwrap_or_else(|| current.reason.clone()),
    })
}

fn reservation_in(st: &SpaceState, id: &Ulid) -> Result<Reservation, EngineError> {
    st.reservations
        .get(id)
        .cloned()
        .ok_or(EngineError::NotFound(Entity::Reservation, *id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_rules() {
        assert!(validate_reason("weekly lecture").is_ok());
        assert!(matches!(validate_reason("   "), Err(EngineError::InvalidInput(_))));
        assert!(validate_reason(&"x".repeat(MAX_REASON_LEN)).is_ok());
        assert!(matches!(
            validate_reason(&"x".repeat(MAX_REASON_LEN + 1)),
            Err(EngineError::LimitExceeded(_))
        ));
    }

    #[test]
    fn empty_patch() {
        assert!(ReservationPatch::default().is_empty());
        assert!(!ReservationPatch { reason: Some("r".into()), ..Default::default() }.is_empty());
    }
}
