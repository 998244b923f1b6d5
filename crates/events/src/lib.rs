//! The persisted event log: actions accumulated in a transaction, the
//! immutable events they turn into, the JSON-patch codec that encodes and
//! replays them, and the broadcast fan-out used to notify listeners.

mod action;
mod broadcast;
mod codec;
mod event;

pub use action::{Action, ActionKind};
pub use broadcast::{BroadcastError, Broadcaster, Listener};
pub use codec::{CodecError, EventCodec, JsonPatchCodec};
pub use event::{encode_time_key, Event};
