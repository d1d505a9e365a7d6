use crate::model::Status;

use super::EngineError;

/// The legal status moves. Everything else, same-state pairs included, is
/// rejected; terminal states have no way out.
pub fn is_legal(from: Status, to: Status) -> bool {
    matches!(
        (from, to),
        (Status::Pending, Status::Confirmed)
            | (Status::Pending, Status::Cancelled)
            | (Status::Confirmed, Status::Cancelled)
            | (Status::Confirmed, Status::Finalized)
    )
}

pub(crate) fn check(from: Status, to: Status) -> Result<(), EngineError> {
    if is_legal(from, to) {
        Ok(())
    } else {
        Err(EngineError::InvalidTransition { from, to: Some(to) })
    }
}

/// Field edits are only possible while the reservation still holds a slot.
pub(crate) fn check_editable(status: Status) -> Result<(), EngineError> {
    if status.is_active() {
        Ok(())
    } else {
        Err(EngineError::InvalidTransition { from: status, to: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_four_legal_pairs() {
        let mut legal = Vec::new();
        for from in Status::ALL {
            for to in Status::ALL {
                if is_legal(from, to) {
                    legal.push((from, to));
                }
            }
        }
        assert_eq!(
            legal,
            vec![
                (Status::Pending, Status::Confirmed),
                (Status::Pending, Status::Cancelled),
                (Status::Confirmed, Status::Cancelled),
                (Status::Confirmed, Status::Finalized),
            ]
        );
    }

    #[test]
    fn every_other_pair_is_invalid_transition() {
        let mut rejected = 0;
        for from in Status::ALL {
            for to in Status::ALL {
                if is_legal(from, to) {
                    continue;
                }
                rejected += 1;
                match check(from, to) {
                    Err(EngineError::InvalidTransition { from: f, to: Some(t) }) => {
                        assert_eq!((f, t), (from, to));
                    }
                    other => panic!("{from} -> {to}: expected InvalidTransition, got {other:?}"),
                }
            }
        }
        assert_eq!(rejected, 12);
    }

    #[test]
    fn terminal_states_are_not_editable() {
        assert!(check_editable(Status::Pending).is_ok());
        assert!(check_editable(Status::Confirmed).is_ok());
        assert!(matches!(
            check_editable(Status::Finalized),
            Err(EngineError::InvalidTransition { to: None, .. })
        ));
        assert!(check_editable(Status::Cancelled).is_err());
    }
}
