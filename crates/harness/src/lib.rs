//! Test doubles and fixtures for exercising the draft engine end to end.

mod logging;
mod network;
mod session;
mod storage;

pub use logging::init_tracing;
pub use network::{RemoteCall, ScriptedRemote};
pub use session::{SESSION_EPOCH_MS, SessionBuilder, TestSession, complete_payload, settle, wait};
pub use storage::FailingKvStore;
