use std::fmt::Debug;
use std::io;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat};
use futures::Sink;
use futures::stream;
use pgwire::api::auth::cleartext::CleartextPasswordAuthStartupHandler;
use pgwire::api::auth::{DefaultServerParameterProvider, StartupHandler};
use pgwire::api::copy::CopyHandler;
use pgwire::api::portal::{Format, Portal};
use pgwire::api::query::{ExtendedQueryHandler, SimpleQueryHandler};
use pgwire::api::results::{
    DataRowEncoder, DescribePortalResponse, DescribeStatementResponse, FieldFormat, FieldInfo, QueryResponse,
    Response, Tag,
};
use pgwire::api::stmt::{QueryParser, StoredStatement};
use pgwire::api::store::PortalStore;
use pgwire::api::{ClientInfo, ClientPortalStore, NoopHandler, PgWireServerHandlers, Type};
use pgwire::error::{ErrorInfo, PgWireError, PgWireResult};
use pgwire::messages::PgWireBackendMessage;
use pgwire::messages::data::DataRow;
use pgwire::tokio::TlsAcceptor;
use tokio::net::TcpStream;

use crate::auth::ReservadAuthSource;
use crate::engine::{
    Actor, Engine, EngineError, NewReservation, Page, ReservationPatch,
};
use crate::model::*;
use crate::observability;
use crate::sql::{self, Command};
use crate::tenant::TenantManager;

pub struct ReservadHandler {
    tenant_manager: Arc<TenantManager>,
    service_user: String,
    utc_offset_minutes: i32,
    query_parser: Arc<ReservadQueryParser>,
}

impl ReservadHandler {
    pub fn new(tenant_manager: Arc<TenantManager>, service_user: String, utc_offset_minutes: i32) -> Self {
        Self {
            tenant_manager,
            service_user,
            utc_offset_minutes,
            query_parser: Arc::new(ReservadQueryParser),
        }
    }

    /// Tenant from the database name, actor from the login. The login is
    /// re-resolved per query so deactivation takes effect immediately.
    fn resolve<C: ClientInfo>(&self, client: &C) -> PgWireResult<(Arc<Engine>, Actor)> {
        let metadata = client.metadata();
        let db = metadata.get("database").map(String::as_str).unwrap_or("default");
        let user = metadata.get("user").map(String::as_str).unwrap_or_default();
        let tenant_err = |msg: String| {
            PgWireError::UserError(Box::new(ErrorInfo::new("ERROR".into(), "08006".into(), msg)))
        };
        if user == self.service_user {
            let engine = self
                .tenant_manager
                .get_or_create(db)
                .map_err(|e| tenant_err(format!("tenant error: {e}")))?;
            return Ok((engine, Actor::Service));
        }
        let engine = self
            .tenant_manager
            .get_existing(db)
            .map_err(|e| tenant_err(format!("tenant error: {e}")))?
            .ok_or_else(|| tenant_err(format!("unknown tenant {db}")))?;
        let actor = engine.actor_for_login(user).map_err(engine_err)?;
        Ok((engine, actor))
    }

    async fn run<C: ClientInfo>(&self, client: &C, sql: &str) -> PgWireResult<Response> {
        let (engine, actor) = self.resolve(client)?;
        let cmd = sql::parse_sql(sql).map_err(sql_err)?;
        let label = observability::command_label(&cmd);
        let started = Instant::now();
        let result = self.execute_command(&engine, &actor, cmd).await;
        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(observability::QUERIES_TOTAL, "command" => label, "status" => status).increment(1);
        metrics::histogram!(observability::QUERY_DURATION_SECONDS, "command" => label)
            .record(started.elapsed().as_secs_f64());
        result
    }

    async fn execute_command(&self, engine: &Engine, actor: &Actor, cmd: Command) -> PgWireResult<Response> {
        match cmd {
            Command::InsertSpace(new) => {
                engine.create_space(actor, new).await.map_err(engine_err)?;
                Ok(Response::Execution(Tag::new("INSERT").with_rows(1)))
            }
            Command::UpdateSpace { id, patch } => {
                engine.update_space(actor, id, patch).await.map_err(engine_err)?;
                Ok(Response::Execution(Tag::new("UPDATE").with_rows(1)))
            }
            Command::SelectSpaces { filter } => {
                let spaces = engine.list_spaces(&filter).await;
                rows(spaces_schema(), spaces.iter(), encode_space)
            }
            Command::InsertAccount(new) => {
                engine.create_account(actor, new).await.map_err(engine_err)?;
                Ok(Response::Execution(Tag::new("INSERT").with_rows(1)))
            }
            Command::UpdateAccount { id, patch } => {
                engine.update_account(actor, id, patch).await.map_err(engine_err)?;
                Ok(Response::Execution(Tag::new("UPDATE").with_rows(1)))
            }
            Command::SelectAccounts { id } => {
                let accounts = match (id, actor.account_id()) {
                    (Some(id), _) => vec![engine.get_account(actor, &id).map_err(engine_err)?],
                    (None, Some(me)) if !actor.is_admin() => {
                        vec![engine.get_account(actor, &me).map_err(engine_err)?]
                    }
                    (None, _) => engine.list_accounts(actor).map_err(engine_err)?,
                };
                rows(accounts_schema(), accounts.iter(), encode_account)
            }
            Command::InsertReservation {
                id,
                space_id,
                start,
                end,
                reason,
                account_id,
            } => {
                let span = Span::try_new(start, end).map_err(|e| engine_err(e.into()))?;
                let new = NewReservation {
                    id,
                    space_id,
                    span,
                    reason,
                    on_behalf_of: account_id,
                };
                engine.create_reservation(actor, new).await.map_err(engine_err)?;
                Ok(Response::Execution(Tag::new("INSERT").with_rows(1)))
            }
            Command::UpdateReservation {
                id,
                space_id,
                start,
                end,
                reason,
            } => {
                let patch = ReservationPatch {
                    space_id,
                    start,
                    end,
                    reason,
                };
                if patch.is_empty() {
                    return Err(engine_err(EngineError::InvalidInput("nothing to update".into())));
                }
                engine.update_reservation(actor, id, patch).await.map_err(engine_err)?;
                Ok(Response::Execution(Tag::new("UPDATE").with_rows(1)))
            }
            Command::UpdateReservationStatus { id, status } => {
                engine.change_status(actor, id, status).await.map_err(engine_err)?;
                Ok(Response::Execution(Tag::new("UPDATE").with_rows(1)))
            }
            Command::GetReservation { id } => {
                let info = engine.get_reservation(actor, id).await.map_err(engine_err)?;
                rows(reservations_schema(), std::iter::once(&info), encode_reservation)
            }
            Command::SelectReservations { filter, offset, limit } => {
                let page = Page::new(offset, limit).map_err(engine_err)?;
                let infos = engine.list_reservations(actor, filter, page).await.map_err(engine_err)?;
                rows(reservations_schema(), infos.iter(), encode_reservation)
            }
            Command::SelectHistory { filter, offset, limit } => {
                let page = Page::new(offset, limit).map_err(engine_err)?;
                let records = engine.list_history(actor, filter, page).map_err(engine_err)?;
                rows(history_schema(), records.iter(), encode_history)
            }
            Command::SelectAvailability {
                space_id,
                start,
                end,
                exclude_id,
            } => {
                let span = Span::try_new(start, end).map_err(|e| engine_err(e.into()))?;
                let availability = engine
                    .check_availability(space_id, span, exclude_id)
                    .await
                    .map_err(engine_err)?;
                let schema = Arc::new(availability_schema());
                let mut encoder = DataRowEncoder::new(schema.clone());
                encoder.encode_field(&space_id.to_string())?;
                encoder.encode_field(&rfc3339(start))?;
                encoder.encode_field(&rfc3339(end))?;
                match availability {
                    Availability::Available => {
                        encoder.encode_field(&true)?;
                        encoder.encode_field(&None::<String>)?;
                    }
                    Availability::Conflict(id) => {
                        encoder.encode_field(&false)?;
                        encoder.encode_field(&Some(id.to_string()))?;
                    }
                }
                let row = encoder.take_row();
                Ok(Response::Query(QueryResponse::new(schema, stream::iter(vec![Ok(row)]))))
            }
            Command::SelectDashboard { day, shift, category } => {
                let dashboard = engine.dashboard(day, shift, self.utc_offset_minutes, category).await;
                rows(dashboard_schema(), dashboard.iter(), encode_dashboard_row)
            }
        }
    }
}

// ── Result encoding ──────────────────────────────────────────────

fn rfc3339(ms: Ms) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| ms.to_string())
}

fn text(name: &str) -> FieldInfo {
    FieldInfo::new(name.into(), None, None, Type::VARCHAR, FieldFormat::Text)
}

fn int8(name: &str) -> FieldInfo {
    FieldInfo::new(name.into(), None, None, Type::INT8, FieldFormat::Text)
}

fn boolean(name: &str) -> FieldInfo {
    FieldInfo::new(name.into(), None, None, Type::BOOL, FieldFormat::Text)
}

fn spaces_schema() -> Vec<FieldInfo> {
    vec![
        text("id"),
        text("name"),
        int8("capacity"),
        text("category"),
        text("description"),
        boolean("active"),
        boolean("tv"),
        boolean("projector"),
        boolean("air_conditioning"),
    ]
}

fn accounts_schema() -> Vec<FieldInfo> {
    vec![
        text("id"),
        text("name"),
        text("email"),
        text("role"),
        boolean("active"),
        text("created_at"),
    ]
}

fn reservations_schema() -> Vec<FieldInfo> {
    vec![
        text("id"),
        text("space_id"),
        text("space_name"),
        text("account_id"),
        text("account_name"),
        text("start"),
        text("end"),
        text("reason"),
        text("status"),
        text("created_at"),
    ]
}

fn history_schema() -> Vec<FieldInfo> {
    let mut schema = reservations_schema();
    schema.push(text("archived_at"));
    schema
}

fn availability_schema() -> Vec<FieldInfo> {
    vec![
        text("space_id"),
        text("start"),
        text("end"),
        boolean("available"),
        text("conflict_id"),
    ]
}

fn dashboard_schema() -> Vec<FieldInfo> {
    vec![
        text("space_name"),
        text("category"),
        text("start"),
        text("end"),
        text("account_name"),
        text("reason"),
    ]
}

/// Result columns for a statement, judged by the table it reads.
fn result_schema(sql: &str) -> Vec<FieldInfo> {
    match sql::query_table(sql).as_deref() {
        Some("spaces") => spaces_schema(),
        Some("accounts") => accounts_schema(),
        Some("reservations") => reservations_schema(),
        Some("history") => history_schema(),
        Some("availability") => availability_schema(),
        Some("dashboard") => dashboard_schema(),
        _ => vec![],
    }
}

fn rows<'a, T: 'a>(
    schema: Vec<FieldInfo>,
    items: impl Iterator<Item = &'a T>,
    encode: fn(&mut DataRowEncoder, &T) -> PgWireResult<()>,
) -> PgWireResult<Response> {
    let schema = Arc::new(schema);
    let data: Vec<PgWireResult<DataRow>> = items
        .map(|item| {
            let mut encoder = DataRowEncoder::new(schema.clone());
            encode(&mut encoder, item)?;
            Ok(encoder.take_row())
        })
        .collect();
    Ok(Response::Query(QueryResponse::new(schema, stream::iter(data))))
}

fn encode_space(e: &mut DataRowEncoder, s: &Space) -> PgWireResult<()> {
    e.encode_field(&s.id.to_string())?;
    e.encode_field(&s.name)?;
    e.encode_field(&i64::from(s.capacity))?;
    e.encode_field(&s.category.as_str())?;
    e.encode_field(&s.description)?;
    e.encode_field(&s.active)?;
    e.encode_field(&s.tv)?;
    e.encode_field(&s.projector)?;
    e.encode_field(&s.air_conditioning)
}

fn encode_account(e: &mut DataRowEncoder, a: &Account) -> PgWireResult<()> {
    e.encode_field(&a.id.to_string())?;
    e.encode_field(&a.name)?;
    e.encode_field(&a.email)?;
    e.encode_field(&a.role.as_str())?;
    e.encode_field(&a.active)?;
    e.encode_field(&rfc3339(a.created_at))
}

fn encode_reservation(e: &mut DataRowEncoder, r: &ReservationInfo) -> PgWireResult<()> {
    e.encode_field(&r.id.to_string())?;
    e.encode_field(&r.space_id.to_string())?;
    e.encode_field(&r.space_name)?;
    e.encode_field(&r.account_id.to_string())?;
    e.encode_field(&r.account_name)?;
    e.encode_field(&rfc3339(r.start))?;
    e.encode_field(&rfc3339(r.end))?;
    e.encode_field(&r.reason)?;
    e.encode_field(&r.status.as_str())?;
    e.encode_field(&rfc3339(r.created_at))
}

fn encode_history(e: &mut DataRowEncoder, h: &HistoryRecord) -> PgWireResult<()> {
    e.encode_field(&h.id.to_string())?;
    e.encode_field(&h.space_id.to_string())?;
    e.encode_field(&h.space_name)?;
    e.encode_field(&h.account_id.to_string())?;
    e.encode_field(&h.account_name)?;
    e.encode_field(&rfc3339(h.span.start))?;
    e.encode_field(&rfc3339(h.span.end))?;
    e.encode_field(&h.reason)?;
    e.encode_field(&h.status.as_str())?;
    e.encode_field(&rfc3339(h.created_at))?;
    e.encode_field(&rfc3339(h.archived_at))
}

fn encode_dashboard_row(e: &mut DataRowEncoder, d: &DashboardRow) -> PgWireResult<()> {
    e.encode_field(&d.space_name)?;
    e.encode_field(&d.category.as_str())?;
    e.encode_field(&rfc3339(d.start))?;
    e.encode_field(&rfc3339(d.end))?;
    e.encode_field(&d.account_name)?;
    e.encode_field(&d.reason)
}

// ── Simple Query Protocol ────────────────────────────────────────

#[async_trait]
impl SimpleQueryHandler for ReservadHandler {
    async fn do_query<C>(&self, client: &mut C, query: &str) -> PgWireResult<Vec<Response>>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        Ok(vec![self.run(client, query).await?])
    }
}

// ── Extended Query Protocol ──────────────────────────────────────

#[derive(Debug)]
pub struct ReservadQueryParser;

#[async_trait]
impl QueryParser for ReservadQueryParser {
    type Statement = String;

    async fn parse_sql<C>(&self, _client: &C, sql: &str, _types: &[Option<Type>]) -> PgWireResult<String>
    where
        C: ClientInfo + Unpin + Send + Sync,
    {
        Ok(sql.to_string())
    }

    fn get_parameter_types(&self, stmt: &String) -> PgWireResult<Vec<Type>> {
        Ok(vec![Type::VARCHAR; count_params(stmt)])
    }

    fn get_result_schema(&self, stmt: &String, _column_format: Option<&Format>) -> PgWireResult<Vec<FieldInfo>> {
        Ok(result_schema(stmt))
    }
}

#[async_trait]
impl ExtendedQueryHandler for ReservadHandler {
    type Statement = String;
    type QueryParser = ReservadQueryParser;

    fn query_parser(&self) -> Arc<Self::QueryParser> {
        self.query_parser.clone()
    }

    async fn do_query<C>(
        &self,
        client: &mut C,
        portal: &Portal<Self::Statement>,
        _max_rows: usize,
    ) -> PgWireResult<Response>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let sql = substitute_params(portal);
        self.run(client, &sql).await
    }

    async fn do_describe_statement<C>(
        &self,
        _client: &mut C,
        target: &StoredStatement<Self::Statement>,
    ) -> PgWireResult<DescribeStatementResponse>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let param_types = vec![Type::VARCHAR; count_params(&target.statement)];
        Ok(DescribeStatementResponse::new(param_types, result_schema(&target.statement)))
    }

    async fn do_describe_portal<C>(
        &self,
        _client: &mut C,
        target: &Portal<Self::Statement>,
    ) -> PgWireResult<DescribePortalResponse>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        Ok(DescribePortalResponse::new(result_schema(&target.statement.statement)))
    }
}

/// `$N` placeholders outside quoted literals and identifiers, as
/// (byte range, N) in statement order.
fn placeholders(sql: &str) -> Vec<(std::ops::Range<usize>, usize)> {
    let bytes = sql.as_bytes();
    let mut found = Vec::new();
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            // A doubled quote is an escaped one and stays inside the literal.
            if b == q && bytes.get(i + 1) != Some(&q) {
                quote = None;
            } else if b == q {
                i += 1;
            }
            i += 1;
            continue;
        }
        match b {
            b'\'' | b'"' => {
                quote = Some(b);
                i += 1;
            }
            b'$' => {
                let start = i;
                i += 1;
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
                if let Ok(n) = sql[start + 1..i].parse::<usize>() {
                    found.push((start..i, n));
                }
            }
            _ => i += 1,
        }
    }
    found
}

/// Highest `$N` placeholder in the statement.
fn count_params(sql: &str) -> usize {
    placeholders(sql).into_iter().map(|(_, n)| n).max().unwrap_or(0)
}

/// Inline bound text parameters as quoted literals in one left-to-right
/// pass. Substituted text is never scanned again.
fn bind_params<P: AsRef<[u8]>>(sql: &str, params: &[Option<P>]) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut copied = 0;
    for (range, n) in placeholders(sql) {
        let Some(param) = n.checked_sub(1).and_then(|i| params.get(i)) else {
            continue;
        };
        out.push_str(&sql[copied..range.start]);
        match param {
            Some(bytes) => {
                out.push('\'');
                out.push_str(&String::from_utf8_lossy(bytes.as_ref()).replace('\'', "''"));
                out.push('\'');
            }
            None => out.push_str("NULL"),
        }
        copied = range.end;
    }
    out.push_str(&sql[copied..]);
    out
}

fn substitute_params(portal: &Portal<String>) -> String {
    bind_params(&portal.statement.statement, &portal.parameters)
}

// ── Factory ──────────────────────────────────────────────────────

#[derive(Clone)]
pub struct ReservadFactory {
    handler: Arc<ReservadHandler>,
    auth_handler: Arc<CleartextPasswordAuthStartupHandler<ReservadAuthSource, DefaultServerParameterProvider>>,
    noop: Arc<NoopHandler>,
}

impl ReservadFactory {
    pub fn new(
        tenant_manager: Arc<TenantManager>,
        password: String,
        service_user: String,
        utc_offset_minutes: i32,
    ) -> Self {
        let auth_source = ReservadAuthSource::new(password, service_user.clone(), tenant_manager.clone());
        Self {
            handler: Arc::new(ReservadHandler::new(tenant_manager, service_user, utc_offset_minutes)),
            auth_handler: Arc::new(CleartextPasswordAuthStartupHandler::new(
                auth_source,
                DefaultServerParameterProvider::default(),
            )),
            noop: Arc::new(NoopHandler),
        }
    }
}

impl PgWireServerHandlers for ReservadFactory {
    fn simple_query_handler(&self) -> Arc<impl SimpleQueryHandler> {
        self.handler.clone()
    }

    fn extended_query_handler(&self) -> Arc<impl ExtendedQueryHandler> {
        self.handler.clone()
    }

    fn startup_handler(&self) -> Arc<impl StartupHandler> {
        self.auth_handler.clone()
    }

    fn copy_handler(&self) -> Arc<impl CopyHandler> {
        self.noop.clone()
    }
}

/// Serve one client connection to completion.
pub async fn process_connection(
    socket: TcpStream,
    factory: Arc<ReservadFactory>,
    tls: Option<TlsAcceptor>,
) -> io::Result<()> {
    pgwire::tokio::process_socket(socket, tls, ReservadFactory::clone(&factory)).await
}

// ── Errors ───────────────────────────────────────────────────────

pub fn sqlstate(e: &EngineError) -> &'static str {
    match e {
        EngineError::InvalidInterval(_) => "22007",
        EngineError::InvalidInput(_) => "22023",
        EngineError::LimitExceeded(_) => "54000",
        EngineError::NotFound(..) => "P0002",
        EngineError::AlreadyExists(_) | EngineError::EmailTaken(_) => "23505",
        EngineError::Conflict(_) => "23P01",
        EngineError::Forbidden(_) => "42501",
        EngineError::SpaceInactive(_) => "55000",
        EngineError::InvalidTransition { .. } => "22P02",
        EngineError::Unavailable(_) => "58030",
    }
}

fn engine_err(e: EngineError) -> PgWireError {
    let kind = observability::error_label(&e);
    if e.is_rejection() {
        tracing::debug!("rejected ({kind}): {e}");
        metrics::counter!(observability::REJECTIONS_TOTAL, "kind" => kind).increment(1);
    } else {
        tracing::error!("{e}");
    }
    PgWireError::UserError(Box::new(ErrorInfo::new("ERROR".into(), sqlstate(&e).into(), e.to_string())))
}

fn sql_err(e: sql::SqlError) -> PgWireError {
    tracing::debug!("bad statement: {e}");
    PgWireError::UserError(Box::new(ErrorInfo::new("ERROR".into(), e.sqlstate().into(), e.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    #[test]
    fn sqlstates_are_distinct_per_kind() {
        let id = Ulid::new();
        let errors = [
            EngineError::InvalidInterval(InvalidSpan { start: 2, end: 1 }),
            EngineError::InvalidInput("x".into()),
            EngineError::LimitExceeded("x"),
            EngineError::NotFound(crate::engine::Entity::Space, id),
            EngineError::AlreadyExists(id),
            EngineError::Conflict(id),
            EngineError::Forbidden("x"),
            EngineError::SpaceInactive(id),
            EngineError::InvalidTransition { from: Status::Finalized, to: Some(Status::Pending) },
            EngineError::Unavailable("disk".into()),
        ];
        let codes: Vec<_> = errors.iter().map(sqlstate).collect();
        assert_eq!(
            codes,
            ["22007", "22023", "54000", "P0002", "23505", "23P01", "42501", "55000", "22P02", "58030"]
        );
        assert_eq!(sqlstate(&EngineError::EmailTaken("a@b".into())), "23505");
    }

    #[test]
    fn timestamps_render_as_utc_millis() {
        assert_eq!(rfc3339(1_736_499_600_000), "2025-01-10T09:00:00.000Z");
        assert_eq!(rfc3339(1_736_499_600_123), "2025-01-10T09:00:00.123Z");
    }

    #[test]
    fn count_params_finds_highest() {
        assert_eq!(count_params("SELECT * FROM spaces"), 0);
        assert_eq!(count_params("UPDATE reservations SET status = $2 WHERE id = $1"), 2);
        assert_eq!(count_params("SELECT * FROM history LIMIT $10"), 10);
        assert_eq!(count_params("SELECT '$' FROM x"), 0);
        assert_eq!(count_params("SELECT * FROM x WHERE a = 'it''s $3' AND b = $1"), 1);
    }

    #[test]
    fn bound_text_is_not_rescanned() {
        let sql = r#"INSERT INTO reservations (id, reason, "$9") VALUES ($1, $2, '$1')"#;
        let params: Vec<Option<&[u8]>> = vec![Some(&b"costs $2 per seat"[..]), Some(&b"it's $1"[..])];
        assert_eq!(
            bind_params(sql, &params),
            r#"INSERT INTO reservations (id, reason, "$9") VALUES ('costs $2 per seat', 'it''s $1', '$1')"#
        );
    }

    #[test]
    fn null_and_double_digit_params() {
        let mut params: Vec<Option<&[u8]>> = vec![Some(&b"x"[..]); 10];
        params[0] = None;
        assert_eq!(bind_params("SELECT $1, $10, $11", &params), "SELECT NULL, 'x', $11");
    }

    #[test]
    fn result_schema_follows_table() {
        let names = |sql: &str| result_schema(sql).iter().map(|f| f.name().to_string()).collect::<Vec<_>>();
        assert_eq!(names("SELECT * FROM availability WHERE space_id = $1")[3], "available");
        assert_eq!(names("SELECT * FROM history").last().map(String::as_str), Some("archived_at"));
        assert!(names("INSERT INTO spaces (id) VALUES ($1)").is_empty());
    }
}
