pub mod bus;
pub mod events;

pub use bus::{EventBus, EventResult, ListenerEntry, Priority};
pub use events::GameEvent;
