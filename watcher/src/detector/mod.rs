pub mod brightness;
pub mod buffer;
pub mod state;

pub use state::DoorStateMachine;
