use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use ulid::Ulid;

use crate::model::*;

/// Build the immutable snapshot of a reservation entering a terminal status.
pub(crate) fn snapshot(
    reservation: &Reservation,
    space_name: &str,
    account_name: &str,
    archived_at: Ms,
) -> HistoryRecord {
    HistoryRecord {
        id: reservation.id,
        space_id: reservation.space_id,
        account_id: reservation.account_id,
        span: reservation.span,
        reason: reservation.reason.clone(),
        status: reservation.status,
        created_at: reservation.created_at,
        space_name: space_name.to_string(),
        account_name: account_name.to_string(),
        archived_at,
        seq: reservation.seq,
    }
}

/// Insert a snapshot keyed by reservation id. Returns `false` and leaves the
/// existing record untouched if one is already there.
pub(crate) fn archive(history: &DashMap<Ulid, HistoryRecord>, record: HistoryRecord) -> bool {
    match history.entry(record.id) {
        Entry::Occupied(_) => false,
        Entry::Vacant(slot) => {
            slot.insert(record);
            true
        }
    }
}
