//! # Runtime
//!
//! The single-threaded execution context and the host that owns it.
//!
//! - [`Dispatcher`] - FIFO task queue drained by one named thread
//! - [`PaintHost`] - explicit `init()`/`shutdown()` for the whole system

mod dispatcher;
mod host;

pub(crate) use dispatcher::panic_message;
pub use dispatcher::{Completion, DispatchError, DispatchThread, Dispatcher};
pub use host::{HostSettings, PaintHost};
