use objectstore_kv::KvError;

use crate::reducer::ReducerError;

/// Composite result of a [`crate::Dispatcher::dispatch`] call.
///
/// `Critical` means the event never made it to the log — dispatch aborted
/// before any reducer ran, and the caller should escalate. `Warning` means
/// the event is durable but one or more reducers failed to apply it; the
/// log is intact and `Dispatcher::replay` can repair view state later.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("critical: event persistence failed: {0}")]
    Critical(#[from] KvError),

    #[error("warning: {} reducer(s) failed", .0.len())]
    Warning(Vec<ReducerError>),
}
