use crate::error::MigrationError;

/// Phase of a bucket migration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    Start,
    Iterating,
    Decoding,
    Enriching,
    Encoding,
    Writing,
    Done,
    Aborted,
}

impl RunState {
    /// Every state, in pipeline order
    pub const ALL: [Self; 8] = [
        Self::Start,
        Self::Iterating,
        Self::Decoding,
        Self::Enriching,
        Self::Encoding,
        Self::Writing,
        Self::Done,
        Self::Aborted,
    ];

    /// Check if no transition leaves this state
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }
}

/// Validates a runner transition.
///
/// # Errors
/// Returns [`MigrationError::IllegalTransition`] if `to` is not reachable
/// from `from` in one step
pub fn validate_transition(from: RunState, to: RunState) -> Result<(), MigrationError> {
    if allowed(from, to) {
        Ok(())
    } else {
        Err(MigrationError::IllegalTransition { from, to })
    }
}

#[must_use]
pub fn allowed_transitions(from: RunState) -> Vec<RunState> {
    use RunState::*;
    match from {
        Start => vec![Iterating, Aborted],
        Iterating => vec![Decoding, Done, Aborted],
        Decoding => vec![Enriching, Encoding, Aborted],
        Enriching => vec![Encoding, Aborted],
        Encoding => vec![Writing, Aborted],
        Writing => vec![Iterating, Aborted],
        Done => vec![],
        Aborted => vec![],
    }
}

fn allowed(from: RunState, to: RunState) -> bool {
    allowed_transitions(from).into_iter().any(|s| s == to)
}
