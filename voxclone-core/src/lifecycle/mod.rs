//! The voice-clone lifecycle: states, the events it emits and the
//! controller that drives one instance from submission to speech.

pub mod controller;
pub mod events;
pub mod state;

pub use controller::CloneLifecycle;
pub use events::{EventSender, LifecycleEvent, NotificationLevel};
pub use state::CloneState;
