/// Inclusive timestamp range handed to a log processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Time_Window {
    pub from: u64,
    pub to: u64,
}

/// Window starting at `from`, clamped to `max_range` past it and to `now`.
pub fn time_window(from: u64, now: u64, max_range: u64) -> Option<Time_Window> {
    let to = now.min(from.saturating_add(max_range));

    if from > to {
        return None;
    }

    Some(Time_Window { from, to })
}

/// An empty window only moves the checkpoint when newer logs exist past
/// it, so logs still being ingested at the edge are not skipped.
pub fn empty_window_checkpoint(
    window: &Time_Window,
    last_log: Option<u64>,
) -> Option<u64> {
    match last_log {
        Some(last) if window.to < last => Some(window.to),
        _ => None,
    }
}

/// Checkpoint after a run that stopped at the first failing log: never past
/// the last success, and strictly before the failure. Successes sharing the
/// failing timestamp are replayed, so only idempotent writes may use it.
pub fn processed_checkpoint(
    last_success: Option<u64>,
    first_failure: Option<u64>,
) -> Option<u64> {
    let last_success = last_success?;

    match first_failure {
        Some(failure) => {
            Some(last_success.min(failure.checked_sub(1)?))
        },
        None => Some(last_success),
    }
}
