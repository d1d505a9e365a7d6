use ulid::Ulid;

use crate::model::{InvalidSpan, Status};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Space,
    Account,
    Reservation,
}

impl Entity {
    fn as_str(self) -> &'static str {
        match self {
            Entity::Space => "space",
            Entity::Account => "account",
            Entity::Reservation => "reservation",
        }
    }
}

#[derive(Debug)]
pub enum EngineError {
    InvalidInterval(InvalidSpan),
    InvalidInput(String),
    LimitExceeded(&'static str),
    NotFound(Entity, Ulid),
    AlreadyExists(Ulid),
    EmailTaken(String),
    Conflict(Ulid),
    Forbidden(&'static str),
    SpaceInactive(Ulid),
    /// `to == None` means a field edit was attempted.
    InvalidTransition {
        from: Status,
        to: Option<Status>,
    },
    /// Storage failure; the request may be retried by the caller.
    Unavailable(String),
}

impl EngineError {
    /// Business rejections are expected outcomes, not faults.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, EngineError::Unavailable(_))
    }
}

impl From<InvalidSpan> for EngineError {
    fn from(e: InvalidSpan) -> Self {
        EngineError::InvalidInterval(e)
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::InvalidInterval(e) => write!(f, "invalid interval: {e}"),
            EngineError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::NotFound(entity, id) => write!(f, "{} not found: {id}", entity.as_str()),
            EngineError::AlreadyExists(id) => write!(f, "already exists: {id}"),
            EngineError::EmailTaken(email) => write!(f, "email already registered: {email}"),
            EngineError::Conflict(id) => write!(f, "conflict with reservation: {id}"),
            EngineError::Forbidden(msg) => write!(f, "forbidden: {msg}"),
            EngineError::SpaceInactive(id) => write!(f, "space is inactive: {id}"),
            EngineError::InvalidTransition { from, to: Some(to) } => {
                write!(f, "invalid transition: {from} -> {to}")
            }
            EngineError::InvalidTransition { from, to: None } => {
                write!(f, "invalid transition: cannot edit a {from} reservation")
            }
            EngineError::Unavailable(e) => write!(f, "storage unavailable: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
