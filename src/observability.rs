use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::engine::EngineError;
use crate::sql::Command;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total queries executed. Labels: command, status.
pub const QUERIES_TOTAL: &str = "reservad_queries_total";

/// Histogram: query latency in seconds. Labels: command.
pub const QUERY_DURATION_SECONDS: &str = "reservad_query_duration_seconds";

/// Counter: business rejections. Labels: kind.
pub const REJECTIONS_TOTAL: &str = "reservad_rejections_total";

// ── Lifecycle ───────────────────────────────────────────────────

/// Counter: reservations finalized by the sweeper.
pub const RESERVATIONS_FINALIZED_TOTAL: &str = "reservad_reservations_finalized_total";

/// Counter: WAL compactions completed.
pub const WAL_COMPACTIONS_TOTAL: &str = "reservad_wal_compactions_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: active TCP connections.
pub const CONNECTIONS_ACTIVE: &str = "reservad_connections_active";

/// Counter: total connections accepted.
pub const CONNECTIONS_TOTAL: &str = "reservad_connections_total";

/// Counter: connections rejected due to limit.
pub const CONNECTIONS_REJECTED_TOTAL: &str = "reservad_connections_rejected_total";

/// Gauge: number of loaded tenants.
pub const TENANTS_ACTIVE: &str = "reservad_tenants_active";

/// Counter: startup/auth failures.
pub const AUTH_FAILURES_TOTAL: &str = "reservad_auth_failures_total";

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "reservad_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "reservad_wal_flush_batch_size";

/// Install the Prometheus exporter on `port`. No-op if `port` is None.
pub fn init(port: Option<u16>) -> Result<(), BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

pub fn command_label(cmd: &Command) -> &'static str {
    match cmd {
        Command::InsertSpace(_) => "insert_space",
        Command::UpdateSpace { .. } => "update_space",
        Command::SelectSpaces { .. } => "select_spaces",
        Command::InsertAccount(_) => "insert_account",
        Command::UpdateAccount { .. } => "update_account",
        Command::SelectAccounts { .. } => "select_accounts",
        Command::InsertReservation { .. } => "insert_reservation",
        Command::UpdateReservation { .. } => "update_reservation",
        Command::UpdateReservationStatus { .. } => "update_reservation_status",
        Command::GetReservation { .. } => "get_reservation",
        Command::SelectReservations { .. } => "select_reservations",
        Command::SelectHistory { .. } => "select_history",
        Command::SelectAvailability { .. } => "select_availability",
        Command::SelectDashboard { .. } => "select_dashboard",
    }
}

pub fn error_label(e: &EngineError) -> &'static str {
    match e {
        EngineError::InvalidInterval(_) => "invalid_interval",
        EngineError::InvalidInput(_) => "invalid_input",
        EngineError::LimitExceeded(_) => "limit_exceeded",
        EngineError::NotFound(..) => "not_found",
        EngineError::AlreadyExists(_) => "already_exists",
        EngineError::EmailTaken(_) => "email_taken",
        EngineError::Conflict(_) => "conflict",
        EngineError::Forbidden(_) => "forbidden",
        EngineError::SpaceInactive(_) => "space_inactive",
        EngineError::InvalidTransition { .. } => "invalid_transition",
        EngineError::Unavailable(_) => "unavailable",
    }
}
