mod archive;
mod conflict;
mod dashboard;
mod directory;
mod error;
mod filter;
mod mutations;
mod policy;
mod queries;
pub mod transition;

pub use dashboard::shift_window;
pub use directory::{AccountPatch, NewAccount, NewSpace, SpacePatch};
pub use error::{EngineError, Entity};
pub use filter::{Page, ReservationFilter, SpaceFilter};
pub use mutations::{NewReservation, ReservationPatch};
pub use policy::Actor;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock, mpsc, oneshot};
use ulid::Ulid;

use crate::model::*;
use crate::wal::Wal;

pub type SharedSpaceState = Arc<RwLock<SpaceState>>;

/// How often a lookup chases a reservation that moved to another space
/// between the index read and the lock.
const RESOLVE_ATTEMPTS: usize = 4;

// ── Group-commit WAL channel ─────────────────────────────

pub(super) enum WalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

/// Background task that owns the WAL and batches appends for group commit.
/// Blocks for the first append, drains whatever else is already queued,
/// then does a single fsync and answers every sender with the same result.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            WalCommand::Append { event, response } => {
                let mut batch = vec![(event, response)];
                let mut deferred = None;

                loop {
                    match rx.try_recv() {
                        Ok(WalCommand::Append { event, response }) => batch.push((event, response)),
                        Ok(other) => {
                            deferred = Some(other);
                            break;
                        }
                        Err(_) => break,
                    }
                }

                metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE)
                    .record(batch.len() as f64);
                let flush_start = std::time::Instant::now();
                let result = flush_batch(&mut wal, &batch);
                metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
                    .record(flush_start.elapsed().as_secs_f64());
                if let Err(e) = &result {
                    tracing::error!("wal flush failed for {} events: {e}", batch.len());
                }
                respond_batch(batch, &result);

                if let Some(other) = deferred {
                    handle_non_append(&mut wal, other);
                }
            }
            other => handle_non_append(&mut wal, other),
        }
    }
}

fn flush_batch(wal: &mut Wal, batch: &[(Event, oneshot::Sender<io::Result<()>>)]) -> io::Result<()> {
    let mut append_err = None;
    for (event, _) in batch {
        if let Err(e) = wal.append_buffered(event) {
            append_err = Some(e);
            break;
        }
    }
    // Flush even after a failed append so the partial batch does not leak
    // into the next one.
    let flush_err = wal.flush_sync().err();
    match (append_err, flush_err) {
        (Some(e), _) | (None, Some(e)) => Err(e),
        (None, None) => Ok(()),
    }
}

fn respond_batch(batch: Vec<(Event, oneshot::Sender<io::Result<()>>)>, result: &io::Result<()>) {
    for (_, tx) in batch {
        let r = match result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn handle_non_append(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { events, response } => {
            let result = Wal::write_compact_file(wal.path(), &events)
                .and_then(|()| wal.swap_compact_file());
            let _ = response.send(result);
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
        WalCommand::Append { event, response } => {
            let result = wal.append_buffered(&event).and_then(|()| wal.flush_sync());
            let _ = response.send(result);
        }
    }
}

/// One tenant's reservation state: the space directory with each space's
/// timeline behind its own lock, accounts, and the history table.
pub struct Engine {
    pub(super) spaces: DashMap<Ulid, SharedSpaceState>,
    pub(super) accounts: DashMap<Ulid, Account>,
    /// Lowercased email → account id.
    pub(super) emails: DashMap<String, Ulid>,
    pub(super) history: DashMap<Ulid, HistoryRecord>,
    /// Reverse lookup: reservation id → space id.
    pub(super) reservation_to_space: DashMap<Ulid, Ulid>,
    /// Serializes directory writes (uniqueness checks span several maps).
    pub(super) directory_lock: Mutex<()>,
    next_seq: AtomicU64,
    pub(super) wal_tx: mpsc::Sender<WalCommand>,
}

impl Engine {
    pub fn new(wal_path: PathBuf) -> io::Result<Self> {
        let events = Wal::replay(&wal_path)?;
        let wal = Wal::open(&wal_path)?;
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        let engine = Self {
            spaces: DashMap::new(),
            accounts: DashMap::new(),
            emails: DashMap::new(),
            history: DashMap::new(),
            reservation_to_space: DashMap::new(),
            directory_lock: Mutex::new(()),
            next_seq: AtomicU64::new(0),
            wal_tx,
        };

        // Nothing else holds these locks yet, so try_write always succeeds.
        // Never block here: this may run inside the runtime on lazy tenant creation.
        for event in &events {
            engine.replay_event(event)?;
        }
        if !events.is_empty() {
            tracing::info!(
                "replayed {} events: {} spaces, {} accounts, {} reservations",
                events.len(),
                engine.spaces.len(),
                engine.accounts.len(),
                engine.reservation_to_space.len()
            );
        }

        Ok(engine)
    }

    fn replay_event(&self, event: &Event) -> io::Result<()> {
        let contended = || io::Error::other("replay: space state contended");
        match event {
            Event::SpaceCreated { .. } | Event::AccountCreated { .. } | Event::AccountUpdated { .. } => {
                self.apply_directory(event);
            }
            Event::ReservationUpdated { from_space_id, space_id, .. } if from_space_id != space_id => {
                if let (Some(from), Some(to)) = (self.space_state(from_space_id), self.space_state(space_id)) {
                    let mut from = from.try_write().map_err(|_| contended())?;
                    let mut to = to.try_write().map_err(|_| contended())?;
                    self.apply_move(&mut from, &mut to, event);
                }
            }
            other => {
                if let Some(space_id) = event_space_id(other)
                    && let Some(st) = self.space_state(&space_id)
                {
                    let mut guard = st.try_write().map_err(|_| contended())?;
                    self.apply_to_space(&mut guard, other);
                }
            }
        }
        Ok(())
    }

    /// Directory events live outside any space lock.
    pub(super) fn apply_directory(&self, event: &Event) {
        match event {
            Event::SpaceCreated {
                id,
                name,
                capacity,
                description,
                category,
                tv,
                projector,
                air_conditioning,
            } => {
                let space = Space {
                    id: *id,
                    name: name.clone(),
                    capacity: *capacity,
                    description: description.clone(),
                    category: *category,
                    active: true,
                    tv: *tv,
                    projector: *projector,
                    air_conditioning: *air_conditioning,
                };
                self.spaces.insert(*id, Arc::new(RwLock::new(SpaceState::new(space))));
            }
            Event::AccountCreated { id, name, email, role, created_at } => {
                self.emails.insert(email.to_lowercase(), *id);
                self.accounts.insert(
                    *id,
                    Account {
                        id: *id,
                        name: name.clone(),
                        email: email.clone(),
                        role: *role,
                        active: true,
                        created_at: *created_at,
                    },
                );
            }
            Event::AccountUpdated { id, name, email, role, active } => {
                if let Some(mut account) = self.accounts.get_mut(id) {
                    if !account.email.eq_ignore_ascii_case(email) {
                        self.emails.remove(&account.email.to_lowercase());
                        self.emails.insert(email.to_lowercase(), *id);
                    }
                    account.name = name.clone();
                    account.email = email.clone();
                    account.role = *role;
                    account.active = *active;
                }
            }
            _ => {}
        }
    }

    /// Apply a space-scoped event. The caller holds the space's write lock.
    pub(super) fn apply_to_space(&self, st: &mut SpaceState, event: &Event) {
        match event {
            Event::SpaceUpdated {
                name,
                capacity,
                description,
                category,
                active,
                tv,
                projector,
                air_conditioning,
                ..
            } => {
                st.space.name = name.clone();
                st.space.capacity = *capacity;
                st.space.description = description.clone();
                st.space.category = *category;
                st.space.active = *active;
                st.space.tv = *tv;
                st.space.projector = *projector;
                st.space.air_conditioning = *air_conditioning;
            }
            Event::ReservationCreated {
                id,
                space_id,
                account_id,
                span,
                reason,
                created_at,
            } => {
                st.insert_reservation(Reservation {
                    id: *id,
                    space_id: *space_id,
                    account_id: *account_id,
                    span: *span,
                    reason: reason.clone(),
                    status: Status::Pending,
                    created_at: *created_at,
                    seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
                });
                self.reservation_to_space.insert(*id, *space_id);
            }
            Event::ReservationUpdated { id, span, reason, .. } => {
                st.reschedule(*id, *span, reason.clone());
            }
            Event::ReservationConfirmed { id, .. } => {
                st.set_status(*id, Status::Confirmed);
            }
            Event::ReservationClosed {
                id,
                status,
                space_name,
                account_name,
                at,
                ..
            } => {
                if let Some(reservation) = st.set_status(*id, *status) {
                    let record = archive::snapshot(reservation, space_name, account_name, *at);
                    archive::archive(&self.history, record);
                }
            }
            Event::SpaceCreated { .. } | Event::AccountCreated { .. } | Event::AccountUpdated { .. } => {}
        }
    }

    /// Move a reservation between two spaces. Both write locks are held.
    pub(super) fn apply_move(&self, from: &mut SpaceState, to: &mut SpaceState, event: &Event) {
        let Event::ReservationUpdated { id, space_id, span, reason, .. } = event else {
            return;
        };
        if let Some(mut reservation) = from.take_reservation(*id) {
            reservation.space_id = *space_id;
            reservation.span = *span;
            reservation.reason = reason.clone();
            to.insert_reservation(reservation);
            self.reservation_to_space.insert(*id, *space_id);
        }
    }

    /// Write event to WAL via the background group-commit writer.
    async fn wal_append(&self, event: &Event) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Append {
                event: event.clone(),
                response: tx,
            })
            .await
            .map_err(|_| EngineError::Unavailable("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::Unavailable("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::Unavailable(e.to_string()))
    }

    /// WAL-append, then apply under the caller's space lock.
    pub(super) async fn persist_and_apply(&self, st: &mut SpaceState, event: &Event) -> Result<(), EngineError> {
        self.wal_append(event).await?;
        self.apply_to_space(st, event);
        Ok(())
    }

    pub(super) async fn persist_move(
        &self,
        from: &mut SpaceState,
        to: &mut SpaceState,
        event: &Event,
    ) -> Result<(), EngineError> {
        self.wal_append(event).await?;
        self.apply_move(from, to, event);
        Ok(())
    }

    /// Caller holds `directory_lock`.
    pub(super) async fn persist_directory(&self, event: &Event) -> Result<(), EngineError> {
        self.wal_append(event).await?;
        self.apply_directory(event);
        Ok(())
    }

    pub(super) fn space_state(&self, id: &Ulid) -> Option<SharedSpaceState> {
        self.spaces.get(id).map(|e| e.value().clone())
    }

    pub(super) fn space_of(&self, reservation_id: &Ulid) -> Option<Ulid> {
        self.reservation_to_space.get(reservation_id).map(|e| *e.value())
    }

    pub(super) fn account_name(&self, id: &Ulid) -> String {
        self.accounts
            .get(id)
            .map(|a| a.name.clone())
            .unwrap_or_default()
    }

    /// Lookup reservation → space, then write-lock that space. Retries if
    /// the reservation moved between the lookup and the lock.
    pub(super) async fn resolve_reservation_write(
        &self,
        id: &Ulid,
    ) -> Result<OwnedRwLockWriteGuard<SpaceState>, EngineError> {
        for _ in 0..RESOLVE_ATTEMPTS {
            let space_id = self
                .space_of(id)
                .ok_or(EngineError::NotFound(Entity::Reservation, *id))?;
            let st = self
                .space_state(&space_id)
                .ok_or(EngineError::NotFound(Entity::Space, space_id))?;
            let guard = st.write_owned().await;
            if guard.reservations.contains_key(id) {
                return Ok(guard);
            }
        }
        Err(EngineError::NotFound(Entity::Reservation, *id))
    }

    pub(super) async fn resolve_reservation_read(
        &self,
        id: &Ulid,
    ) -> Result<OwnedRwLockReadGuard<SpaceState>, EngineError> {
        for _ in 0..RESOLVE_ATTEMPTS {
            let space_id = self
                .space_of(id)
                .ok_or(EngineError::NotFound(Entity::Reservation, *id))?;
            let st = self
                .space_state(&space_id)
                .ok_or(EngineError::NotFound(Entity::Space, space_id))?;
            let guard = st.read_owned().await;
            if guard.reservations.contains_key(id) {
                return Ok(guard);
            }
        }
        Err(EngineError::NotFound(Entity::Reservation, *id))
    }
}

/// The space a space-scoped event belongs to. Directory events have none.
fn event_space_id(event: &Event) -> Option<Ulid> {
    match event {
        Event::SpaceUpdated { id, .. } => Some(*id),
        Event::ReservationCreated { space_id, .. }
        | Event::ReservationUpdated { space_id, .. }
        | Event::ReservationConfirmed { space_id, .. }
        | Event::ReservationClosed { space_id, .. } => Some(*space_id),
        Event::SpaceCreated { .. } | Event::AccountCreated { .. } | Event::AccountUpdated { .. } => None,
    }
}
