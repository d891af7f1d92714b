pub mod errors;
pub mod events;
pub mod id;
pub mod types;

pub use errors::{ConfigError, HuddleError};
pub use events::{Event, EventBus};
pub use id::new_correlation_id;
pub use types::{ConnectionState, MediaKind};

pub type Result<T> = std::result::Result<T, HuddleError>;
