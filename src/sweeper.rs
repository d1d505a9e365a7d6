use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::engine::Engine;
use crate::model::now_ms;

const COMPACT_CHECK_INTERVAL: Duration = Duration::from_secs(10);

/// Finalize confirmed reservations once their end has passed.
pub async fn run_sweeper(engine: Arc<Engine>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let finalized = engine.finalize_elapsed(now_ms()).await;
        if finalized > 0 {
            info!("finalized {finalized} elapsed reservations");
            metrics::counter!(crate::observability::RESERVATIONS_FINALIZED_TOTAL)
                .increment(finalized as u64);
        }
    }
}

/// Compact the WAL whenever enough appends have piled up since the last pass.
pub async fn run_compactor(engine: Arc<Engine>, threshold: u64) {
    let mut interval = tokio::time::interval(COMPACT_CHECK_INTERVAL);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        compact_if_due(&engine, threshold).await;
    }
}

/// Returns whether a compaction ran.
async fn compact_if_due(engine: &Engine, threshold: u64) -> bool {
    let appends = engine.wal_appends_since_compact().await;
    if appends == 0 || appends < threshold {
        return false;
    }
    match engine.compact_wal().await {
        Ok(()) => {
            debug!("compacted after {appends} appends");
            metrics::counter!(crate::observability::WAL_COMPACTIONS_TOTAL).increment(1);
            true
        }
        Err(e) => {
            error!("WAL compaction failed: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Actor, NewAccount, NewReservation, NewSpace, Page, ReservationFilter};
    use crate::model::*;
    use std::path::PathBuf;
    use ulid::Ulid;

    fn test_wal_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("reservad_test_sweeper");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let _ = std::fs::remove_file(&path);
        path
    }

    async fn confirmed_booking(engine: &Engine, span: Span) -> Ulid {
        let space_id = Ulid::new();
        engine
            .create_space(
                &Actor::Service,
                NewSpace {
                    id: space_id,
                    name: format!("Room {space_id}"),
                    capacity: 10,
                    description: String::new(),
                    category: Category::FablabMeeting,
                    tv: false,
                    projector: false,
                    air_conditioning: false,
                },
            )
            .await
            .unwrap();
        let account_id = Ulid::new();
        engine
            .create_account(
                &Actor::Service,
                NewAccount {
                    id: account_id,
                    name: "Ana".into(),
                    email: format!("{account_id}@example.org"),
                    role: Role::User,
                },
            )
            .await
            .unwrap();
        let r = engine
            .create_reservation(
                &Actor::Service,
                NewReservation {
                    id: Ulid::new(),
                    space_id,
                    span,
                    reason: "standup".into(),
                    on_behalf_of: Some(account_id),
                },
            )
            .await
            .unwrap();
        engine.change_status(&Actor::Service, r.id, Status::Confirmed).await.unwrap();
        r.id
    }

    #[tokio::test]
    async fn sweeper_finalizes_elapsed() {
        let engine = Arc::new(Engine::new(test_wal_path("sweep.wal")).unwrap());
        let now = now_ms();
        let past = confirmed_booking(&engine, Span::new(now - 7_200_000, now - 3_600_000)).await;
        let ongoing = confirmed_booking(&engine, Span::new(now - 60_000, now + 3_600_000)).await;

        let handle = tokio::spawn(run_sweeper(engine.clone(), Duration::from_millis(20)));
        for _ in 0..100 {
            if !engine.history.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.abort();

        let history = engine
            .list_history(&Actor::Service, ReservationFilter::default(), Page::default())
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, past);
        assert_eq!(history[0].status, Status::Finalized);
        let still = engine.get_reservation(&Actor::Service, ongoing).await.unwrap();
        assert_eq!(still.status, Status::Confirmed);
    }

    #[tokio::test]
    async fn compactor_waits_for_threshold() {
        let engine = Engine::new(test_wal_path("compactor.wal")).unwrap();
        let now = now_ms();
        confirmed_booking(&engine, Span::new(now, now + 60_000)).await;
        // space + account + create + confirm
        assert_eq!(engine.wal_appends_since_compact().await, 4);

        assert!(!compact_if_due(&engine, 5).await);
        assert!(compact_if_due(&engine, 4).await);
        assert_eq!(engine.wal_appends_since_compact().await, 0);
        assert!(!compact_if_due(&engine, 1).await);
    }
}
