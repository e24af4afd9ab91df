//! Deterministic single-threaded UI host runtime for scripted test scenarios:
//! logical-clock timers, a deferred-continuation (microtask) queue with a
//! fixed drain protocol, and a retained scene graph with attributes, event
//! dispatch, and a pure layout pass.
//!
//! The script interpreter that drives the API lives outside this crate;
//! callbacks here are plain closures over [`Runtime`].

mod error;
mod events;
mod layout;
mod runtime;
mod runtime_state;
mod scene;
mod scheduler;
mod value;

pub use error::{Error, Result};
pub use events::{Event, ListenerCallback, listener};
pub use layout::Rect;
pub use runtime::Runtime;
pub use runtime_state::{PendingTimer, TimerHandle};
pub use scene::{NodeId, NodeKind};
pub use value::{AttrValue, Color, FlexDirection, JustifyContent, SizeValue};

#[cfg(test)]
mod tests;
