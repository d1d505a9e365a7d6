use chrono::{DateTime, NaiveDate};
use sqlparser::ast::{
    self, AssignmentTarget, Expr, LimitClause, ObjectNamePart, SetExpr, Statement, TableFactor, TableObject,
    Value, ValueWithSpan,
};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use ulid::Ulid;

use crate::engine::{AccountPatch, NewAccount, NewSpace, ReservationFilter, SpaceFilter, SpacePatch};
use crate::model::*;

/// Parsed command from SQL input.
#[derive(Debug, PartialEq)]
pub enum Command {
    InsertSpace(NewSpace),
    UpdateSpace {
        id: Ulid,
        patch: SpacePatch,
    },
    SelectSpaces {
        filter: SpaceFilter,
    },
    InsertAccount(NewAccount),
    UpdateAccount {
        id: Ulid,
        patch: AccountPatch,
    },
    SelectAccounts {
        id: Option<Ulid>,
    },
    /// Span bounds stay raw so the engine reports inverted intervals.
    InsertReservation {
        id: Ulid,
        space_id: Ulid,
        start: Ms,
        end: Ms,
        reason: String,
        account_id: Option<Ulid>,
    },
    UpdateReservation {
        id: Ulid,
        space_id: Option<Ulid>,
        start: Option<Ms>,
        end: Option<Ms>,
        reason: Option<String>,
    },
    UpdateReservationStatus {
        id: Ulid,
        status: Status,
    },
    GetReservation {
        id: Ulid,
    },
    SelectReservations {
        filter: ReservationFilter,
        offset: Option<usize>,
        limit: Option<usize>,
    },
    SelectHistory {
        filter: ReservationFilter,
        offset: Option<usize>,
        limit: Option<usize>,
    },
    SelectAvailability {
        space_id: Ulid,
        start: Ms,
        end: Ms,
        exclude_id: Option<Ulid>,
    },
    SelectDashboard {
        day: NaiveDate,
        shift: Shift,
        category: Option<Category>,
    },
}

/// Column order assumed by an INSERT without a column list.
const SPACE_COLUMNS: &[&str] = &[
    "id",
    "name",
    "capacity",
    "category",
    "description",
    "tv",
    "projector",
    "air_conditioning",
];
const ACCOUNT_COLUMNS: &[&str] = &["id", "name", "email", "role"];
const RESERVATION_COLUMNS: &[&str] = &["id", "space_id", "start", "end", "reason", "account_id"];

pub fn parse_sql(sql: &str) -> Result<Command, SqlError> {
    let dialect = PostgreSqlDialect {};
    let stmts = Parser::parse_sql(&dialect, sql).map_err(|e| SqlError::Parse(e.to_string()))?;
    let stmt = match stmts.as_slice() {
        [] => return Err(SqlError::Empty),
        [one] => one,
        _ => return Err(SqlError::Unsupported("multiple statements".into())),
    };

    match stmt {
        Statement::Insert(insert) => parse_insert(insert),
        Statement::Update {
            table,
            assignments,
            selection,
            ..
        } => parse_update(&table.relation, assignments, selection),
        Statement::Query(query) => parse_select(query),
        other => Err(SqlError::Unsupported(format!("{other}"))),
    }
}

/// Table a SELECT reads from, without interpreting its filters. Lets the
/// extended protocol describe result columns before parameters are bound.
pub fn query_table(sql: &str) -> Option<String> {
    let stmts = Parser::parse_sql(&PostgreSqlDialect {}, sql).ok()?;
    let Some(Statement::Query(query)) = stmts.first() else {
        return None;
    };
    let SetExpr::Select(select) = query.body.as_ref() else {
        return None;
    };
    table_factor_name(&select.from.first()?.relation).ok()
}

// ── INSERT ────────────────────────────────────────────────────

/// Column → value pairs of a single-row INSERT.
struct Row<'a> {
    table: &'static str,
    cells: Vec<(String, &'a Expr)>,
}

impl<'a> Row<'a> {
    fn get(&self, column: &str) -> Option<&'a Expr> {
        self.cells.iter().find(|(c, _)| c == column).map(|(_, e)| *e)
    }

    fn require(&self, column: &'static str) -> Result<&'a Expr, SqlError> {
        self.get(column).ok_or(SqlError::MissingColumn(self.table, column))
    }

    /// `None` when the column is absent or NULL.
    fn optional(&self, column: &str) -> Option<&'a Expr> {
        self.get(column).filter(|e| !is_null(e))
    }
}

fn parse_insert(insert: &ast::Insert) -> Result<Command, SqlError> {
    let table = insert_table_name(insert)?;
    let (table, known): (&'static str, &[&str]) = match table.as_str() {
        "spaces" => ("spaces", SPACE_COLUMNS),
        "accounts" => ("accounts", ACCOUNT_COLUMNS),
        "reservations" => ("reservations", RESERVATION_COLUMNS),
        _ => return Err(SqlError::UnknownTable(table)),
    };

    let values = single_values_row(insert)?;
    let columns: Vec<String> = if insert.columns.is_empty() {
        known.iter().take(values.len()).map(|c| c.to_string()).collect()
    } else {
        insert.columns.iter().map(|c| unquote(&c.to_string())).collect()
    };
    if columns.len() != values.len() {
        return Err(SqlError::WrongArity(table, columns.len(), values.len()));
    }
    if let Some(unknown) = columns.iter().find(|c| !known.contains(&c.as_str())) {
        return Err(SqlError::UnknownColumn(table, unknown.clone()));
    }
    let row = Row {
        table,
        cells: columns.into_iter().zip(values.iter()).collect(),
    };

    match table {
        "spaces" => Ok(Command::InsertSpace(NewSpace {
            id: parse_ulid(row.require("id")?)?,
            name: parse_string(row.require("name")?)?,
            capacity: parse_u32(row.require("capacity")?)?,
            category: parse_tag(row.require("category")?)?,
            description: row.optional("description").map(parse_string).transpose()?.unwrap_or_default(),
            tv: row.optional("tv").map(parse_bool).transpose()?.unwrap_or(false),
            projector: row.optional("projector").map(parse_bool).transpose()?.unwrap_or(false),
            air_conditioning: row
                .optional("air_conditioning")
                .map(parse_bool)
                .transpose()?
                .unwrap_or(false),
        })),
        "accounts" => Ok(Command::InsertAccount(NewAccount {
            id: parse_ulid(row.require("id")?)?,
            name: parse_string(row.require("name")?)?,
            email: parse_string(row.require("email")?)?,
            role: row.optional("role").map(parse_tag).transpose()?.unwrap_or(Role::User),
        })),
        _ => Ok(Command::InsertReservation {
            id: parse_ulid(row.require("id")?)?,
            space_id: parse_ulid(row.require("space_id")?)?,
            start: parse_timestamp(row.require("start")?)?,
            end: parse_timestamp(row.require("end")?)?,
            reason: parse_string(row.require("reason")?)?,
            account_id: row.optional("account_id").map(parse_ulid).transpose()?,
        }),
    }
}

fn single_values_row(insert: &ast::Insert) -> Result<&[Expr], SqlError> {
    let body = insert.source.as_ref().ok_or(SqlError::Parse("no VALUES".into()))?;
    match body.body.as_ref() {
        SetExpr::Values(values) => match values.rows.as_slice() {
            [] => Err(SqlError::Parse("empty VALUES".into())),
            [row] => Ok(row),
            _ => Err(SqlError::Unsupported("multi-row INSERT".into())),
        },
        _ => Err(SqlError::Parse("expected VALUES".into())),
    }
}

// ── UPDATE ────────────────────────────────────────────────────

fn parse_update(
    relation: &TableFactor,
    assignments: &[ast::Assignment],
    selection: &Option<Expr>,
) -> Result<Command, SqlError> {
    let table = table_factor_name(relation)?;
    let id = extract_where_id(selection)?;

    let mut sets = Vec::with_capacity(assignments.len());
    for a in assignments {
        let column = match &a.target {
            AssignmentTarget::ColumnName(name) => {
                object_name_last(name).ok_or_else(|| SqlError::Parse("empty column name".into()))?
            }
            AssignmentTarget::Tuple(_) => return Err(SqlError::Unsupported("tuple assignment".into())),
        };
        sets.push((column, &a.value));
    }

    match table.as_str() {
        "spaces" => {
            let mut patch = SpacePatch::default();
            for (column, value) in sets {
                match column.as_str() {
                    "name" => patch.name = Some(parse_string(value)?),
                    "capacity" => patch.capacity = Some(parse_u32(value)?),
                    "description" => patch.description = Some(parse_string(value)?),
                    "category" => patch.category = Some(parse_tag(value)?),
                    "active" => patch.active = Some(parse_bool(value)?),
                    "tv" => patch.tv = Some(parse_bool(value)?),
                    "projector" => patch.projector = Some(parse_bool(value)?),
                    "air_conditioning" => patch.air_conditioning = Some(parse_bool(value)?),
                    _ => return Err(SqlError::UnknownColumn("spaces", column)),
                }
            }
            Ok(Command::UpdateSpace { id, patch })
        }
        "accounts" => {
            let mut patch = AccountPatch::default();
            for (column, value) in sets {
                match column.as_str() {
                    "name" => patch.name = Some(parse_string(value)?),
                    "email" => patch.email = Some(parse_string(value)?),
                    "role" => patch.role = Some(parse_tag(value)?),
                    "active" => patch.active = Some(parse_bool(value)?),
                    _ => return Err(SqlError::UnknownColumn("accounts", column)),
                }
            }
            Ok(Command::UpdateAccount { id, patch })
        }
        "reservations" => {
            if let Some((_, value)) = sets.iter().find(|(c, _)| c == "status") {
                if sets.len() > 1 {
                    return Err(SqlError::Unsupported(
                        "status cannot be updated together with other columns".into(),
                    ));
                }
                return Ok(Command::UpdateReservationStatus {
                    id,
                    status: parse_tag(value)?,
                });
            }
            let (mut space_id, mut start, mut end, mut reason) = (None, None, None, None);
            for (column, value) in sets {
                match column.as_str() {
                    "space_id" => space_id = Some(parse_ulid(value)?),
                    "start" => start = Some(parse_timestamp(value)?),
                    "end" => end = Some(parse_timestamp(value)?),
                    "reason" => reason = Some(parse_string(value)?),
                    _ => return Err(SqlError::UnknownColumn("reservations", column)),
                }
            }
            Ok(Command::UpdateReservation {
                id,
                space_id,
                start,
                end,
                reason,
            })
        }
        _ => Err(SqlError::UnknownTable(table)),
    }
}

// ── SELECT ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Eq,
    GtEq,
    LtEq,
    Like,
}

/// One `column <op> value` term of a WHERE conjunction.
struct Predicate<'a> {
    column: String,
    op: Op,
    value: &'a Expr,
}

fn parse_select(query: &ast::Query) -> Result<Command, SqlError> {
    let select = match query.body.as_ref() {
        SetExpr::Select(s) => s,
        _ => return Err(SqlError::Unsupported("non-SELECT query".into())),
    };
    let from = select.from.first().ok_or(SqlError::Parse("SELECT without FROM".into()))?;
    let table = table_factor_name(&from.relation)?;

    let mut predicates = Vec::new();
    if let Some(selection) = &select.selection {
        collect_predicates(selection, &mut predicates)?;
    }
    let (offset, limit) = parse_limit_clause(query.limit_clause.as_ref())?;

    match table.as_str() {
        "spaces" => {
            let mut filter = SpaceFilter::default();
            for p in predicates {
                match (p.column.as_str(), p.op) {
                    ("category", Op::Eq) => filter.category = Some(parse_tag(p.value)?),
                    ("active", Op::Eq) => filter.active = Some(parse_bool(p.value)?),
                    _ => return Err(unsupported_predicate("spaces", &p)),
                }
            }
            Ok(Command::SelectSpaces { filter })
        }
        "accounts" => {
            let mut id = None;
            for p in predicates {
                match (p.column.as_str(), p.op) {
                    ("id", Op::Eq) => id = Some(parse_ulid(p.value)?),
                    _ => return Err(unsupported_predicate("accounts", &p)),
                }
            }
            Ok(Command::SelectAccounts { id })
        }
        "reservations" => {
            if let [only] = predicates.as_slice()
                && only.column == "id"
                && only.op == Op::Eq
            {
                return Ok(Command::GetReservation { id: parse_ulid(only.value)? });
            }
            let filter = reservation_filter("reservations", predicates)?;
            Ok(Command::SelectReservations { filter, offset, limit })
        }
        "history" => {
            let filter = reservation_filter("history", predicates)?;
            Ok(Command::SelectHistory { filter, offset, limit })
        }
        "availability" => {
            let (mut space_id, mut start, mut end, mut exclude_id) = (None, None, None, None);
            for p in predicates {
                match (p.column.as_str(), p.op) {
                    ("space_id", Op::Eq) => space_id = Some(parse_ulid(p.value)?),
                    ("start", Op::Eq) => start = Some(parse_timestamp(p.value)?),
                    ("end", Op::Eq) => end = Some(parse_timestamp(p.value)?),
                    ("exclude_id", Op::Eq) if !is_null(p.value) => exclude_id = Some(parse_ulid(p.value)?),
                    ("exclude_id", Op::Eq) => {}
                    _ => return Err(unsupported_predicate("availability", &p)),
                }
            }
            Ok(Command::SelectAvailability {
                space_id: space_id.ok_or(SqlError::MissingFilter("space_id"))?,
                start: start.ok_or(SqlError::MissingFilter("start"))?,
                end: end.ok_or(SqlError::MissingFilter("end"))?,
                exclude_id,
            })
        }
        "dashboard" => {
            let (mut day, mut shift, mut category) = (None, None, None);
            for p in predicates {
                match (p.column.as_str(), p.op) {
                    ("day", Op::Eq) => day = Some(parse_day(p.value)?),
                    ("shift", Op::Eq) => shift = Some(parse_tag(p.value)?),
                    ("category", Op::Eq) => category = Some(parse_tag(p.value)?),
                    _ => return Err(unsupported_predicate("dashboard", &p)),
                }
            }
            Ok(Command::SelectDashboard {
                day: day.ok_or(SqlError::MissingFilter("day"))?,
                shift: shift.ok_or(SqlError::MissingFilter("shift"))?,
                category,
            })
        }
        _ => Err(SqlError::UnknownTable(table)),
    }
}

fn reservation_filter(table: &'static str, predicates: Vec<Predicate<'_>>) -> Result<ReservationFilter, SqlError> {
    let mut f = ReservationFilter::default();
    for p in predicates {
        match (p.column.as_str(), p.op) {
            ("account_id", Op::Eq) => f.account_id = Some(parse_ulid(p.value)?),
            ("space_id", Op::Eq) => f.space_id = Some(parse_ulid(p.value)?),
            ("status", Op::Eq) => f.status = Some(parse_tag(p.value)?),
            ("space_name", Op::Like) => f.space_name_contains = Some(parse_contains_pattern(p.value)?),
            ("account_name", Op::Like) => f.account_name_contains = Some(parse_contains_pattern(p.value)?),
            ("start", Op::GtEq) => f.start_from = Some(parse_timestamp(p.value)?),
            ("start", Op::LtEq) => f.start_until = Some(parse_timestamp(p.value)?),
            ("end", Op::GtEq) => f.end_from = Some(parse_timestamp(p.value)?),
            ("end", Op::LtEq) => f.end_until = Some(parse_timestamp(p.value)?),
            _ => return Err(unsupported_predicate(table, &p)),
        }
    }
    Ok(f)
}

fn unsupported_predicate(table: &'static str, p: &Predicate<'_>) -> SqlError {
    SqlError::Unsupported(format!("{table}: cannot filter on {} with {:?}", p.column, p.op))
}

/// Flatten an AND tree of simple comparisons. OR and anything fancier is refused.
fn collect_predicates<'a>(expr: &'a Expr, out: &mut Vec<Predicate<'a>>) -> Result<(), SqlError> {
    match expr {
        Expr::Nested(inner) => collect_predicates(inner, out),
        Expr::BinaryOp { left, op, right } => {
            let op = match op {
                ast::BinaryOperator::And => {
                    collect_predicates(left, out)?;
                    return collect_predicates(right, out);
                }
                ast::BinaryOperator::Eq => Op::Eq,
                ast::BinaryOperator::GtEq => Op::GtEq,
                ast::BinaryOperator::LtEq => Op::LtEq,
                other => return Err(SqlError::Unsupported(format!("operator {other}"))),
            };
            let column = expr_column_name(left).ok_or_else(|| SqlError::Unsupported(format!("{left}")))?;
            out.push(Predicate { column, op, value: right });
            Ok(())
        }
        Expr::Like { negated: false, expr, pattern, .. } | Expr::ILike { negated: false, expr, pattern, .. } => {
            let column = expr_column_name(expr).ok_or_else(|| SqlError::Unsupported(format!("{expr}")))?;
            out.push(Predicate {
                column,
                op: Op::Like,
                value: pattern,
            });
            Ok(())
        }
        other => Err(SqlError::Unsupported(format!("WHERE {other}"))),
    }
}

fn parse_limit_clause(clause: Option<&LimitClause>) -> Result<(Option<usize>, Option<usize>), SqlError> {
    match clause {
        None => Ok((None, None)),
        Some(LimitClause::LimitOffset { limit, offset, .. }) => {
            let limit = limit.as_ref().filter(|e| !is_null(e)).map(parse_usize).transpose()?;
            let offset = offset.as_ref().map(|o| parse_usize(&o.value)).transpose()?;
            Ok((offset, limit))
        }
        Some(LimitClause::OffsetCommaLimit { offset, limit }) => Ok((Some(parse_usize(offset)?), Some(parse_usize(limit)?))),
    }
}

// ── Helpers ───────────────────────────────────────────────────

fn unquote(name: &str) -> String {
    name.trim_matches('"').to_lowercase()
}

fn object_name_last(name: &ast::ObjectName) -> Option<String> {
    name.0.last().and_then(|part| match part {
        ObjectNamePart::Identifier(ident) => Some(ident.value.to_lowercase()),
        _ => None,
    })
}

fn insert_table_name(insert: &ast::Insert) -> Result<String, SqlError> {
    match &insert.table {
        TableObject::TableName(name) => object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into())),
        _ => Err(SqlError::Parse("unsupported table object in INSERT".into())),
    }
}

fn table_factor_name(tf: &TableFactor) -> Result<String, SqlError> {
    match tf {
        TableFactor::Table { name, .. } => object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into())),
        _ => Err(SqlError::Parse("complex table expression".into())),
    }
}

fn extract_where_id(selection: &Option<Expr>) -> Result<Ulid, SqlError> {
    let sel = selection.as_ref().ok_or(SqlError::MissingFilter("id"))?;
    let mut predicates = Vec::new();
    collect_predicates(sel, &mut predicates)?;
    match predicates.as_slice() {
        [p] if p.column == "id" && p.op == Op::Eq => parse_ulid(p.value),
        _ => Err(SqlError::MissingFilter("id")),
    }
}

fn expr_column_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Identifier(ident) => Some(ident.value.to_lowercase()),
        Expr::CompoundIdentifier(parts) => parts.last().map(|i| i.value.to_lowercase()),
        _ => None,
    }
}

fn extract_value(expr: &Expr) -> Option<&Value> {
    match expr {
        Expr::Value(ValueWithSpan { value, .. }) => Some(value),
        _ => None,
    }
}

fn is_null(expr: &Expr) -> bool {
    matches!(extract_value(expr), Some(Value::Null))
}

/// Quoted strings and bare numbers both read as text.
fn value_text(expr: &Expr) -> Result<String, SqlError> {
    match extract_value(expr) {
        Some(Value::SingleQuotedString(s) | Value::Number(s, _)) => Ok(s.clone()),
        Some(other) => Err(SqlError::BadValue(format!("expected string, got {other}"))),
        None => Err(SqlError::BadValue(format!("expected literal, got {expr}"))),
    }
}

fn parse_string(expr: &Expr) -> Result<String, SqlError> {
    match extract_value(expr) {
        Some(Value::SingleQuotedString(s)) => Ok(s.clone()),
        _ => Err(SqlError::BadValue(format!("expected string, got {expr}"))),
    }
}

fn parse_ulid(expr: &Expr) -> Result<Ulid, SqlError> {
    let s = value_text(expr)?;
    Ulid::from_string(&s).map_err(|e| SqlError::BadValue(format!("bad ULID {s:?}: {e}")))
}

fn parse_i64(expr: &Expr) -> Result<i64, SqlError> {
    if let Expr::UnaryOp {
        op: ast::UnaryOperator::Minus,
        expr,
    } = expr
    {
        return Ok(-parse_i64(expr)?);
    }
    let s = value_text(expr)?;
    s.trim().parse().map_err(|e| SqlError::BadValue(format!("bad integer {s:?}: {e}")))
}

fn parse_u32(expr: &Expr) -> Result<u32, SqlError> {
    let v = parse_i64(expr)?;
    u32::try_from(v).map_err(|_| SqlError::BadValue(format!("{v} out of range")))
}

fn parse_usize(expr: &Expr) -> Result<usize, SqlError> {
    let v = parse_i64(expr)?;
    usize::try_from(v).map_err(|_| SqlError::BadValue(format!("{v} out of range")))
}

fn parse_bool(expr: &Expr) -> Result<bool, SqlError> {
    match extract_value(expr) {
        Some(Value::Boolean(b)) => Ok(*b),
        Some(Value::SingleQuotedString(s)) => match s.to_lowercase().as_str() {
            "true" | "t" | "1" => Ok(true),
            "false" | "f" | "0" => Ok(false),
            _ => Err(SqlError::BadValue(format!("bad bool: {s}"))),
        },
        Some(Value::Number(n, _)) => Ok(n != "0"),
        _ => Err(SqlError::BadValue(format!("expected bool, got {expr}"))),
    }
}

/// Any enum tag with a `FromStr` impl: status, role, category, shift.
fn parse_tag<T>(expr: &Expr) -> Result<T, SqlError>
where
    T: std::str::FromStr<Err = UnknownTag>,
{
    parse_string(expr)?.parse().map_err(|e: UnknownTag| SqlError::BadValue(e.to_string()))
}

/// Unix milliseconds, or an RFC 3339 string carrying an explicit offset.
/// Naive local times are refused.
fn parse_timestamp(expr: &Expr) -> Result<Ms, SqlError> {
    if matches!(extract_value(expr), Some(Value::Number(..))) || matches!(expr, Expr::UnaryOp { .. }) {
        return parse_i64(expr);
    }
    let s = value_text(expr)?;
    let s = s.trim();
    if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
        return s.parse().map_err(|_| SqlError::BadTimestamp(s.to_string()));
    }
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.timestamp_millis())
        .map_err(|_| SqlError::BadTimestamp(s.to_string()))
}

fn parse_day(expr: &Expr) -> Result<NaiveDate, SqlError> {
    let s = parse_string(expr)?;
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| SqlError::BadTimestamp(s))
}

/// `'%lab%'` and `'lab'` both mean "contains lab". Inner wildcards are refused.
fn parse_contains_pattern(expr: &Expr) -> Result<String, SqlError> {
    let raw = parse_string(expr)?;
    let needle = raw.trim_matches('%');
    if needle.contains(['%', '_']) {
        return Err(SqlError::Unsupported(format!("LIKE pattern {raw:?}: only substring matches")));
    }
    Ok(needle.to_string())
}

// ── Errors ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum SqlError {
    Parse(String),
    Empty,
    Unsupported(String),
    UnknownTable(String),
    UnknownColumn(&'static str, String),
    MissingColumn(&'static str, &'static str),
    WrongArity(&'static str, usize, usize),
    MissingFilter(&'static str),
    BadValue(String),
    BadTimestamp(String),
}

impl SqlError {
    pub fn sqlstate(&self) -> &'static str {
        match self {
            SqlError::Parse(_) | SqlError::Empty | SqlError::WrongArity(..) => "42601",
            SqlError::Unsupported(_) => "0A000",
            SqlError::UnknownTable(_) => "42P01",
            SqlError::UnknownColumn(..) => "42703",
            SqlError::MissingColumn(..) => "23502",
            SqlError::MissingFilter(_) => "42P10",
            SqlError::BadValue(_) => "22023",
            SqlError::BadTimestamp(_) => "22007",
        }
    }
}

impl std::fmt::Display for SqlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlError::Parse(s) => write!(f, "parse error: {s}"),
            SqlError::Empty => write!(f, "empty query"),
            SqlError::Unsupported(s) => write!(f, "unsupported: {s}"),
            SqlError::UnknownTable(t) => write!(f, "unknown table: {t}"),
            SqlError::UnknownColumn(t, c) => write!(f, "{t}: unknown column {c}"),
            SqlError::MissingColumn(t, c) => write!(f, "{t}: missing value for {c}"),
            SqlError::WrongArity(t, expected, got) => {
                write!(f, "{t}: {expected} columns but {got} values")
            }
            SqlError::MissingFilter(col) => write!(f, "missing filter: {col}"),
            SqlError::BadValue(s) => write!(f, "bad value: {s}"),
            SqlError::BadTimestamp(s) => {
                write!(f, "bad timestamp {s:?}: expected unix milliseconds or RFC 3339 with offset")
            }
        }
    }
}

impl std::error::Error for SqlError {}
