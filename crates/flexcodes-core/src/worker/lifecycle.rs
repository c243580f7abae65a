//! Worker lifecycle states and the transitions allowed between them.

/// Lifecycle of one worker generation:
/// `Parsed -> Installing -> Installed -> Activating -> Active`, with
/// `Redundant` reachable from any state once the generation is abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Constructed, nothing cached yet
    Parsed,
    /// Pre-caching shell assets
    Installing,
    /// Shell cached, waiting to take control
    Installed,
    /// Removing stale generations
    Activating,
    /// Intercepting requests
    Active,
    /// Install failed or superseded
    Redundant,
}

impl WorkerState {
    pub fn is_active(&self) -> bool {
        matches!(self, WorkerState::Active)
    }
}

/// Check whether a worker may move from `from` to `to`
pub fn is_valid_transition(from: WorkerState, to: WorkerState) -> bool {
    use self::WorkerState::*;

    matches!(
        (from, to),
        (Parsed, Installing)
            | (Installing, Installed)
            | (Installed, Activating)
            | (Activating, Active)
            | (Parsed | Installing | Installed | Activating | Active, Redundant)
    )
}
