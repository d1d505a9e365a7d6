use ulid::Ulid;

use crate::model::*;

use super::EngineError;

pub(crate) fn validate_span(span: &Span) -> Result<(), EngineError> {
    use crate::limits::*;
    Span::try_new(span.start, span.end)?;
    if span.start < MIN_VALID_TIMESTAMP_MS || span.end > MAX_VALID_TIMESTAMP_MS {
        return Err(EngineError::LimitExceeded("timestamp out of range"));
    }
    if span.duration_ms() > MAX_SPAN_DURATION_MS {
        return Err(EngineError::LimitExceeded("reservation too long"));
    }
    Ok(())
}

/// First active reservation on the space overlapping `span`, ignoring `exclude`.
pub(crate) fn find_conflict(st: &SpaceState, span: &Span, exclude: Option<Ulid>) -> Option<Ulid> {
    st.overlapping(span)
        .find(|slot| Some(slot.id) != exclude)
        .map(|slot| slot.id)
}

pub(crate) fn check_no_conflict(
    st: &SpaceState,
    span: &Span,
    exclude: Option<Ulid>,
) -> Result<(), EngineError> {
    match find_conflict(st, span, exclude) {
        Some(id) => Err(EngineError::Conflict(id)),
        None => Ok(()),
    }
}

pub(crate) fn availability_of(st: &SpaceState, span: &Span, exclude: Option<Ulid>) -> Availability {
    match find_conflict(st, span, exclude) {
        Some(id) => Availability::Conflict(id),
        None => Availability::Available,
    }
}
