use objectstore_events::Event;

/// Boxed error from a reducer; reducer failures are tagged "warning" and
/// never prevent the event from being durable (see [`crate::DispatchError`]).
pub type ReducerError = Box<dyn std::error::Error + Send + Sync>;

/// Applies a persisted event to some materialized state.
///
/// In this crate, `Model` is the production implementation: it ignores
/// events whose type doesn't match its own schema ref and otherwise
/// delegates to an [`objectstore_events::EventCodec`].
pub trait Reducer: Send + Sync {
    fn reduce(&self, event: &Event) -> Result<(), ReducerError>;
}
