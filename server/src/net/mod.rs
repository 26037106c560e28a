//! BZRC protocol server: one listener per team, one session per connection.

pub mod commands;
pub mod listener;
pub mod session;

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::game::Map;

/// The map shared by the tick loop and every session.
pub type SharedMap = Arc<Mutex<Map>>;

pub use commands::{CommandTable, DispatchError, Reply, Response};
pub use listener::TeamListener;
pub use session::{Session, SessionState};
