//! Who may do what. Every engine entry point asks here instead of
//! re-deriving owner/admin rules inline.

use ulid::Ulid;

use crate::model::*;

use super::EngineError;
use super::filter::ReservationFilter;

/// Request context: the party on whose authority an operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Account { id: Ulid, role: Role },
    /// The configured service login. Administers the directory and may act
    /// on behalf of any account, but owns no reservations.
    Service,
    /// The background finalizer.
    Sweeper,
}

impl Actor {
    pub fn from_account(account: &Account) -> Self {
        Actor::Account {
            id: account.id,
            role: account.role,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(
            self,
            Actor::Service | Actor::Account { role: Role::Admin, .. }
        )
    }

    pub fn account_id(&self) -> Option<Ulid> {
        match self {
            Actor::Account { id, .. } => Some(*id),
            Actor::Service | Actor::Sweeper => None,
        }
    }

    fn owns(&self, reservation: &Reservation) -> bool {
        self.account_id() == Some(reservation.account_id)
    }
}

pub(crate) fn require_admin(actor: &Actor) -> Result<(), EngineError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(EngineError::Forbidden("administrator privileges required"))
    }
}

/// Resolve whose name a new reservation goes under.
pub(crate) fn booking_owner(actor: &Actor, on_behalf_of: Option<Ulid>) -> Result<Ulid, EngineError> {
    match (actor.account_id(), on_behalf_of) {
        (Some(me), None) => Ok(me),
        (Some(me), Some(other)) if other == me => Ok(me),
        (_, Some(other)) if actor.is_admin() => Ok(other),
        (Some(_), Some(_)) => Err(EngineError::Forbidden(
            "only administrators may book on behalf of another account",
        )),
        (None, None) => Err(EngineError::InvalidInput(
            "account_id is required when booking as the service user".into(),
        )),
        (None, Some(_)) => Err(EngineError::Forbidden("actor cannot create reservations")),
    }
}

/// Field edits: owner while pending, admin while pending or confirmed.
/// The caller has already rejected terminal reservations.
pub(crate) fn can_edit(actor: &Actor, reservation: &Reservation) -> Result<(), EngineError> {
    if actor.is_admin() {
        return Ok(());
    }
    if actor.owns(reservation) && reservation.status == Status::Pending {
        return Ok(());
    }
    Err(EngineError::Forbidden(
        "only the owner of a pending reservation or an administrator may edit it",
    ))
}

/// Status changes. Legality of `from -> to` is checked beforehand in
/// `transition::check`.
pub(crate) fn can_transition(
    actor: &Actor,
    reservation: &Reservation,
    to: Status,
    now: Ms,
) -> Result<(), EngineError> {
    if actor.is_admin() {
        return Ok(());
    }
    match (actor, reservation.status, to) {
        (Actor::Account { .. }, Status::Pending, Status::Cancelled) if actor.owns(reservation) => Ok(()),
        (Actor::Sweeper, Status::Confirmed, Status::Finalized) if reservation.span.end <= now => Ok(()),
        _ => Err(EngineError::Forbidden(
            "not permitted to change this reservation to the requested status",
        )),
    }
}

pub(crate) fn can_view(actor: &Actor, reservation: &Reservation) -> Result<(), EngineError> {
    if actor.is_admin() || actor.owns(reservation) {
        Ok(())
    } else {
        Err(EngineError::Forbidden("reservation belongs to another account"))
    }
}

/// Pin a listing to the caller's own account unless they are an admin.
/// Asking for somebody else's rows is refused outright.
pub(crate) fn scope_filter(actor: &Actor, filter: &mut ReservationFilter) -> Result<(), EngineError> {
    if actor.is_admin() {
        return Ok(());
    }
    let Some(me) = actor.account_id() else {
        return Err(EngineError::Forbidden("actor cannot list reservations"));
    };
    match filter.account_id {
        Some(other) if other != me => Err(EngineError::Forbidden(
            "non-administrators may only list their own reservations",
        )),
        _ => {
            filter.account_id = Some(me);
            Ok(())
        }
    }
}
