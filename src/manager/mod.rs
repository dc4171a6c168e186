mod actions;
mod engine;
mod events;
mod machine;
mod service;
mod snapshot;

pub use actions::ApplyStatus;
pub use events::AttemptOrigin;
pub use service::{ConnectionManager, StateListener};
pub use snapshot::{read_connection_state, read_manager_snapshot, ManagerSnapshot};
